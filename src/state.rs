// src/state.rs

//! Shared orchestrator state.
//!
//! `SharedState` is the single source of truth for "is a run in progress" /
//! "is a watch session active". All reads take the shared side of the
//! reader/writer lock, all transitions the exclusive side.
//!
//! Lock discipline: the lock is only ever held around the state transition
//! itself, never across a process spawn, an await point, or a filesystem
//! wait. A long-running test must never be able to deadlock the watch loop
//! through this lock.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, TestwatchError};
use crate::types::RunParameters;
use crate::watch::WatchSignal;

/// Snapshot of the orchestrator state, as reported to callers and the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub cwd: String,
    pub pkg_list: Vec<String>,
    pub watching: bool,
    pub running: bool,
    /// The parameters most recently used for a run or watch.
    pub test_params: RunParameters,
}

/// Registration of the active watch session.
///
/// The notify watcher handle itself is owned by the watch-loop task; the
/// shared state only keeps what other tasks need: the stop token and the
/// sender used to inject run-completion signals into the loop.
#[derive(Debug)]
struct WatchRegistration {
    id: u64,
    cancel: CancellationToken,
    signal_tx: mpsc::UnboundedSender<WatchSignal>,
}

#[derive(Debug)]
struct Inner {
    running: bool,
    watching: bool,
    cwd: PathBuf,
    pkg_list: Vec<String>,
    test_params: RunParameters,
    watch: Option<WatchRegistration>,
    next_watch_id: u64,
}

/// Reader/writer-locked orchestrator state. Create once, share via `Arc`.
#[derive(Debug)]
pub struct SharedState {
    inner: RwLock<Inner>,
}

impl SharedState {
    pub fn new(cwd: impl Into<PathBuf>, defaults: RunParameters) -> Arc<Self> {
        Arc::new(SharedState {
            inner: RwLock::new(Inner {
                running: false,
                watching: false,
                cwd: cwd.into(),
                pkg_list: Vec::new(),
                test_params: defaults,
                watch: None,
                next_watch_id: 0,
            }),
        })
    }

    pub fn is_running(&self) -> bool {
        self.inner.read().unwrap().running
    }

    pub fn is_watching(&self) -> bool {
        self.inner.read().unwrap().watching
    }

    pub fn cwd(&self) -> PathBuf {
        self.inner.read().unwrap().cwd.clone()
    }

    /// Claim the `running` flag. Returns `None` if a run is already in
    /// progress; otherwise the flag is set and the returned guard clears it
    /// on drop, whichever way the run ends.
    pub fn try_set_running(self: &Arc<Self>) -> Option<RunningGuard> {
        let mut inner = self.inner.write().unwrap();
        if inner.running {
            return None;
        }
        inner.running = true;
        Some(RunningGuard {
            state: Arc::clone(self),
        })
    }

    fn clear_running(&self) {
        self.inner.write().unwrap().running = false;
    }

    /// Record the parameters a run/watch was requested with.
    pub fn set_test_params(&self, params: &RunParameters) {
        self.inner.write().unwrap().test_params = params.clone();
    }

    /// Replace the package list and return a fresh snapshot in one critical
    /// section.
    pub fn update_pkg_list(&self, pkg_list: Vec<String>) -> RunState {
        let mut inner = self.inner.write().unwrap();
        inner.pkg_list = pkg_list;
        snapshot_of(&inner)
    }

    pub fn snapshot(&self) -> RunState {
        snapshot_of(&self.inner.read().unwrap())
    }

    /// Register a watch session: flips `watching` and stores the session's
    /// stop token and signal sender. Fails with `AlreadyWatching` if a
    /// session is active.
    ///
    /// A stale registration while `watching` is false is a coding invariant
    /// violation, not a reportable error.
    pub fn begin_watch(
        &self,
        signal_tx: mpsc::UnboundedSender<WatchSignal>,
    ) -> Result<(u64, CancellationToken)> {
        let mut inner = self.inner.write().unwrap();
        if inner.watching {
            return Err(TestwatchError::AlreadyWatching);
        }
        if inner.watch.is_some() {
            panic!("watch registration present while not watching");
        }
        let id = inner.next_watch_id;
        inner.next_watch_id += 1;
        let cancel = CancellationToken::new();
        inner.watch = Some(WatchRegistration {
            id,
            cancel: cancel.clone(),
            signal_tx,
        });
        inner.watching = true;
        Ok((id, cancel))
    }

    /// Take the active session's stop token, clearing the registration.
    /// Returns `None` when no session is active, which makes a second
    /// `unwatch` deterministic.
    pub fn take_watch_cancel(&self) -> Option<CancellationToken> {
        let mut inner = self.inner.write().unwrap();
        if !inner.watching {
            return None;
        }
        inner.watching = false;
        inner.watch.take().map(|w| w.cancel)
    }

    /// Clear the registration from inside the watch loop, on any exit path.
    ///
    /// Guarded by the session id so a loop that is still unwinding after
    /// `unwatch` cannot clobber a session registered afterwards.
    pub fn end_watch(&self, id: u64) {
        let mut inner = self.inner.write().unwrap();
        match &inner.watch {
            Some(w) if w.id == id => {
                inner.watch = None;
                inner.watching = false;
                debug!(session = id, "watch session cleared");
            }
            _ => {}
        }
    }

    /// Sender into the active watch loop, if any.
    pub fn watch_signal_tx(&self) -> Option<mpsc::UnboundedSender<WatchSignal>> {
        self.inner
            .read()
            .unwrap()
            .watch
            .as_ref()
            .map(|w| w.signal_tx.clone())
    }
}

fn snapshot_of(inner: &Inner) -> RunState {
    RunState {
        cwd: inner.cwd.display().to_string(),
        pkg_list: inner.pkg_list.clone(),
        watching: inner.watching,
        running: inner.running,
        test_params: inner.test_params.clone(),
    }
}

/// Holds the `running` flag for one run; dropping it releases the flag.
/// Exactly one exists per successful [`SharedState::try_set_running`].
#[derive(Debug)]
pub struct RunningGuard {
    state: Arc<SharedState>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.state.clear_running();
    }
}
