// src/orchestrator.rs

//! Public facade over the shared state, the process runner and the watch
//! loop. External callers (CLI, a UI adapter) go through these operations
//! and nothing else.
//!
//! The orchestrator is an explicitly constructed object: it owns its state
//! and lock and is shared by reference, no process-wide singleton. All
//! collaborators (process backend, event sink, notifier, package lister)
//! are injected at construction.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{Result, TestwatchError};
use crate::events::EventSink;
use crate::exec::{self, ProcessBackend};
use crate::listing::{self, PackageLister, PackageTests};
use crate::notifier::Notifier;
use crate::state::{RunState, SharedState};
use crate::types::{BusyBehaviour, RunParameters};
use crate::watch::{self, WatchSignal};

/// Acknowledgement returned by [`Orchestrator::run`] / [`Orchestrator::watch`].
///
/// This is not the result: completion is reported asynchronously through the
/// event sink. The ack only identifies what was triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAck {
    pub action: &'static str,
    pub package: String,
}

impl RunAck {
    fn test(pkg: &str) -> Self {
        RunAck {
            action: "test",
            package: pkg.to_string(),
        }
    }
}

/// Options fixed at construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    /// What the watch loop does with change notifications that arrive while
    /// a run is in progress.
    pub busy_behaviour: BusyBehaviour,
}

pub struct Orchestrator {
    state: Arc<SharedState>,
    backend: Box<dyn ProcessBackend>,
    sink: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
    lister: Box<dyn PackageLister>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        cwd: impl Into<PathBuf>,
        defaults: RunParameters,
        options: OrchestratorOptions,
        backend: Box<dyn ProcessBackend>,
        sink: Arc<dyn EventSink>,
        notifier: Arc<dyn Notifier>,
        lister: Box<dyn PackageLister>,
    ) -> Arc<Self> {
        Arc::new(Orchestrator {
            state: SharedState::new(cwd, defaults),
            backend,
            sink,
            notifier,
            lister,
            options,
        })
    }

    /// The shared state; exposed for collaborators that only need the flags.
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Start one test run. Fails with `AlreadyRunning` if a run is in
    /// progress and with `Spawn` if the process cannot be started; both
    /// leave `running` false. On success the run proceeds in the background
    /// and completion arrives through the event sink.
    pub async fn run(self: &Arc<Self>, params: RunParameters) -> Result<RunAck> {
        let Some(guard) = self.state.try_set_running() else {
            return Err(TestwatchError::AlreadyRunning);
        };
        self.state.set_test_params(&params);

        let cwd = self.state.cwd();
        let handle = exec::execute(
            &params,
            &cwd,
            self.backend.as_ref(),
            Arc::clone(&self.sink),
            Arc::clone(&self.notifier),
            guard,
        )?;

        // Forward completion into an active watch session so a queued rerun
        // can fire. An in-flight run itself cannot be cancelled; it always
        // runs to process completion.
        let orch = Arc::clone(self);
        tokio::spawn(async move {
            match handle.completion.await {
                Ok(verdict) => debug!(%verdict, "test run completed"),
                Err(_) => warn!("run supervisor dropped without reporting a verdict"),
            }
            orch.signal_run_finished();
        });

        Ok(RunAck::test(&params.pkg))
    }

    /// Start watching the working directory and run once immediately.
    ///
    /// Fails with `AlreadyWatching` if a session is active. The priming run
    /// is independent of any filesystem event; if it fails, the error is
    /// returned but the session stays registered, matching a caller that
    /// retries with `run` while keeping the watch.
    pub async fn watch(self: &Arc<Self>, params: RunParameters) -> Result<RunAck> {
        let cwd = self.state.cwd();
        let (handle, signal_tx, signal_rx) = watch::subscribe(&cwd)?;

        // Registration is atomic: a concurrent `watch` loses here and the
        // just-created subscription is dropped with `handle`.
        let (session_id, cancel) = self.state.begin_watch(signal_tx)?;
        info!(pkg = %params.pkg, dir = %cwd.display(), "watching for changes");

        tokio::spawn(watch::run_watch_loop(
            Arc::clone(self),
            Arc::clone(&self.state),
            session_id,
            params.clone(),
            self.options.busy_behaviour,
            handle,
            signal_rx,
            cancel,
        ));

        self.run(params).await
    }

    /// Stop the active watch session. Fire-and-forget: the stop signal is
    /// delivered once and this returns without waiting for the loop to
    /// unwind. An in-flight run is not affected.
    pub async fn unwatch(&self) -> Result<()> {
        match self.state.take_watch_cancel() {
            Some(cancel) => {
                debug!("stop watching");
                cancel.cancel();
                Ok(())
            }
            None => Err(TestwatchError::NotWatching),
        }
    }

    /// Snapshot the orchestrator state with a freshly refreshed package
    /// list. The lister runs outside the lock; only the update and the
    /// snapshot happen under it.
    pub async fn get_state(&self) -> Result<RunState> {
        let pkgs = self.lister.list_packages(&self.state.cwd()).await?;
        Ok(self.state.update_pkg_list(pkgs))
    }

    /// List test functions per package for the given target pattern.
    pub async fn list_test_funcs(&self, params: &RunParameters) -> Result<Vec<PackageTests>> {
        listing::list_test_funcs(&self.state.cwd(), params).await
    }

    fn signal_run_finished(&self) {
        if let Some(tx) = self.state.watch_signal_tx() {
            let _ = tx.send(WatchSignal::RunFinished);
        }
    }
}
