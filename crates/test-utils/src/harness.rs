//! Pre-wired orchestrator for integration tests.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use testwatch::events::{ChannelSink, RunEvent};
use testwatch::exec::ProcessBackend;
use testwatch::orchestrator::{Orchestrator, OrchestratorOptions};
use testwatch::types::{BusyBehaviour, RunParameters};

use crate::fakes::{FakeLister, FakeNotifier};

/// An orchestrator wired to fakes: a channel sink for awaiting events, a
/// recording notifier, and a fixed package lister.
pub struct TestHarness {
    pub orch: Arc<Orchestrator>,
    pub events: mpsc::UnboundedReceiver<RunEvent>,
    pub notifier: FakeNotifier,
}

pub fn harness(
    cwd: &Path,
    backend: Box<dyn ProcessBackend>,
    busy_behaviour: BusyBehaviour,
) -> TestHarness {
    let (sink, events) = ChannelSink::pair();
    let notifier = FakeNotifier::new();

    let orch = Orchestrator::new(
        cwd,
        RunParameters::default(),
        OrchestratorOptions { busy_behaviour },
        backend,
        Arc::new(sink),
        Arc::new(notifier.clone()),
        Box::new(FakeLister::with_packages(&["example.com/mod/pkg"])),
    );

    TestHarness {
        orch,
        events,
        notifier,
    }
}
