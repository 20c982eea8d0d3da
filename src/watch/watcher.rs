// src/watch/watcher.rs

//! Filesystem subscription plumbing.

use std::path::Path;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;

/// Signals consumed by the watch loop.
#[derive(Debug)]
pub enum WatchSignal {
    /// A filesystem change under the watched directory.
    Changed(Event),
    /// The watch mechanism reported an error. The session keeps listening.
    SourceError(notify::Error),
    /// A test run started by this orchestrator finished.
    RunFinished,
}

/// Keeps the underlying `RecommendedWatcher` alive for the session.
/// Dropping this handle ends the subscription.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Register a subscription on `dir`.
///
/// Only the top-level tree entry is watched (non-recursive). Changes and
/// errors are forwarded from notify's blocking callback into the returned
/// channel; the sender half is handed back too so the orchestrator can
/// inject [`WatchSignal::RunFinished`] into the same feed.
pub fn subscribe(
    dir: &Path,
) -> Result<(
    WatcherHandle,
    mpsc::UnboundedSender<WatchSignal>,
    mpsc::UnboundedReceiver<WatchSignal>,
)> {
    let (tx, rx) = mpsc::unbounded_channel::<WatchSignal>();

    let mut watcher = RecommendedWatcher::new(
        {
            let tx = tx.clone();
            move |res: notify::Result<Event>| {
                let signal = match res {
                    Ok(event) => WatchSignal::Changed(event),
                    Err(err) => WatchSignal::SourceError(err),
                };
                // The loop side may already be gone during teardown.
                let _ = tx.send(signal);
            }
        },
        Config::default(),
    )
    .map_err(anyhow::Error::from)?;

    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(anyhow::Error::from)?;

    debug!(dir = %dir.display(), "filesystem subscription registered");

    Ok((WatcherHandle { _inner: watcher }, tx, rx))
}
