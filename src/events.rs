// src/events.rs

//! The per-run event feed and the sink it is delivered through.
//!
//! Every run produces one ordered feed of [`RunEvent`]s: a `ClearScreen`
//! marker, then output lines, then a `StreamDone` per stream, then exactly
//! one `RunResult`. Ordering is guaranteed within a stream but stdout and
//! stderr interleave however the test process emits them.
//!
//! Delivery toward a UI or CLI consumer goes through [`EventSink`], which is
//! fire-and-forget: no acknowledgement, no backpressure, and implementations
//! must never block the runner.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::Verdict;

/// Which output stream of the test process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted over the lifetime of one test run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// Sent once per run, before any output, so a consumer can reset its
    /// display.
    ClearScreen,
    /// One completed output line.
    Line { source: StreamSource, text: String },
    /// The line decoder failed on this stream; the other stream is
    /// unaffected.
    StreamError { source: StreamSource, message: String },
    /// This stream reached end-of-input.
    StreamDone { source: StreamSource },
    /// The process exited. Follows all line events of the run. `message`
    /// carries the exit-error text for failed runs.
    RunResult {
        verdict: Verdict,
        message: Option<String>,
    },
}

/// Fire-and-forget event delivery toward the consumer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Sink that forwards events into an unbounded channel.
///
/// The unbounded sender never blocks, which is exactly the contract the
/// runner assumes. A dropped receiver just discards events.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Create the sink together with the receiving half of its channel.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver gone; discarding event");
        }
    }
}
