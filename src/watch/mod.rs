// src/watch/mod.rs

//! Change-triggered rerun loop.
//!
//! This module turns filesystem notifications on the working directory into
//! new test runs. It does not know how tests are executed; it only calls
//! back into the orchestrator when a rerun is due.
//!
//! Busy semantics: a change arriving while a run is in progress is either
//! dropped (default) or coalesced into a single pending rerun, depending on
//! [`BusyBehaviour`]. Watch-source errors are logged and the session keeps
//! listening. The stop token always wins over queued signals.

pub mod watcher;

pub use watcher::{subscribe, WatchSignal, WatcherHandle};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::orchestrator::Orchestrator;
use crate::state::SharedState;
use crate::types::{BusyBehaviour, RunParameters};

/// Drive one watch session until the stop token fires or the signal source
/// closes. Owns the watcher handle for the lifetime of the session; every
/// exit path clears the session registration, which is idempotent with
/// respect to an `unwatch` that already did.
pub(crate) async fn run_watch_loop(
    orch: Arc<Orchestrator>,
    state: Arc<SharedState>,
    session_id: u64,
    params: RunParameters,
    behaviour: BusyBehaviour,
    handle: WatcherHandle,
    mut signals: mpsc::UnboundedReceiver<WatchSignal>,
    cancel: CancellationToken,
) {
    // Moved in to keep the subscription alive for the session.
    let _handle = handle;
    let mut rerun_pending = false;

    loop {
        tokio::select! {
            // Stop takes priority over already-queued signals.
            biased;

            () = cancel.cancelled() => {
                debug!(session = session_id, "stop requested; leaving watch loop");
                break;
            }

            signal = signals.recv() => {
                match signal {
                    Some(WatchSignal::Changed(event)) => {
                        if state.is_running() {
                            match behaviour {
                                BusyBehaviour::Ignore => {
                                    debug!(?event, "ignoring change event (tests already running)");
                                }
                                BusyBehaviour::Queue => {
                                    debug!(?event, "change event while running; rerun queued");
                                    rerun_pending = true;
                                }
                            }
                            continue;
                        }
                        debug!(?event, "change event");
                        start_run(&orch, &params).await;
                    }
                    Some(WatchSignal::SourceError(err)) => {
                        error!(error = %err, "watch error");
                    }
                    Some(WatchSignal::RunFinished) => {
                        if rerun_pending && !state.is_running() {
                            rerun_pending = false;
                            debug!("starting queued rerun");
                            start_run(&orch, &params).await;
                        }
                    }
                    None => {
                        debug!(session = session_id, "watch signal source closed");
                        break;
                    }
                }
            }
        }
    }

    state.end_watch(session_id);
}

async fn start_run(orch: &Arc<Orchestrator>, params: &RunParameters) {
    match orch.run(params.clone()).await {
        Ok(ack) => debug!(pkg = %ack.package, "triggered test run"),
        Err(err) => error!(error = %err, "error running tests"),
    }
}
