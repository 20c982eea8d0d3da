// src/exec/runner.rs

//! Single test-run process supervision.
//!
//! One run is three cooperating tasks: a line reader per output stream and a
//! supervisor that joins both readers, waits for the process to exit,
//! publishes the verdict and releases the `running` flag.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, TestwatchError};
use crate::events::{EventSink, RunEvent, StreamSource};
use crate::exec::backend::{ProcessBackend, StreamReader};
use crate::notifier::Notifier;
use crate::state::RunningGuard;
use crate::types::{RunParameters, Verdict};

/// One in-flight run: the supervisor task plus the completion future.
///
/// Callers observe results through the event sink; the completion receiver
/// exists so the orchestrator can react once the run is fully finished.
pub struct RunHandle {
    pub completion: oneshot::Receiver<Verdict>,
    pub supervisor: JoinHandle<()>,
}

/// Build the `go test` argument vector for `params`.
///
/// `-count=1` disables go's test result caching so a rerun after a file
/// change always executes. The flag order is fixed to keep invocations
/// reproducible.
pub fn build_args(params: &RunParameters) -> Vec<String> {
    let mut argv = vec![
        "go".to_string(),
        "test".to_string(),
        "-json".to_string(),
        "-count=1".to_string(),
    ];
    if params.race {
        argv.push("-race".to_string());
    }
    if params.verbose {
        argv.push("-v".to_string());
    }
    if let Some(filter) = params.run_filter.as_deref() {
        if !filter.is_empty() {
            argv.push("-run".to_string());
            argv.push(filter.to_string());
        }
    }
    argv.push(params.pkg.clone());
    argv
}

/// Spawn the test process for `params` and supervise it to completion.
///
/// On success the process is started, a `ClearScreen` event has been
/// emitted, and both stream readers are draining. The `running` guard
/// travels into the supervisor and is released there after the verdict is
/// computed; on spawn failure it is released here, before the error returns,
/// with no events emitted.
pub fn execute(
    params: &RunParameters,
    cwd: &Path,
    backend: &dyn ProcessBackend,
    sink: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
    guard: RunningGuard,
) -> Result<RunHandle> {
    let argv = build_args(params);
    info!(pkg = %params.pkg, cmd = %argv.join(" "), "starting test run");

    let process = match backend.spawn(&argv, cwd) {
        Ok(process) => process,
        Err(err) => {
            // Roll the running flag back before reporting.
            drop(guard);
            return Err(TestwatchError::Spawn(err));
        }
    };

    sink.emit(RunEvent::ClearScreen);

    let stdout_task =
        spawn_stream_reader(StreamSource::Stdout, process.stdout, Arc::clone(&sink));
    let stderr_task =
        spawn_stream_reader(StreamSource::Stderr, process.stderr, Arc::clone(&sink));

    let exit = process.exit;
    let (done_tx, done_rx) = oneshot::channel();

    let supervisor = tokio::spawn(async move {
        // Join both readers first so the result event always follows the
        // last line event of the run.
        if let Err(err) = stdout_task.await {
            warn!(error = %err, "stdout reader task failed");
        }
        if let Err(err) = stderr_task.await {
            warn!(error = %err, "stderr reader task failed");
        }

        let (verdict, message) = match exit.await {
            Ok(status) if status.success() => (Verdict::Pass, None),
            Ok(status) => {
                let message = match status.code {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                };
                (Verdict::Fail, Some(message))
            }
            Err(err) => (Verdict::Fail, Some(err.to_string())),
        };
        debug!(%verdict, "test process exited");

        sink.emit(RunEvent::RunResult { verdict, message });

        let title = format!("test result - {verdict}");
        let body = format!("test finished. test {verdict}ED");
        if let Err(err) = notifier.notify(&title, &body, verdict.into()) {
            warn!(error = %err, "failed to send notification");
        }

        drop(guard);
        let _ = done_tx.send(verdict);
    });

    Ok(RunHandle {
        completion: done_rx,
        supervisor,
    })
}

/// Read `stream` line by line, emitting each completed line immediately.
///
/// A decode error stops this reader but not its sibling; `StreamDone` is
/// emitted on every exit path, mirroring end-of-input.
fn spawn_stream_reader(
    source: StreamSource,
    stream: StreamReader,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => sink.emit(RunEvent::Line { source, text }),
                Ok(None) => break,
                Err(err) => {
                    warn!(%source, error = %err, "error reading stream");
                    sink.emit(RunEvent::StreamError {
                        source,
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }
        sink.emit(RunEvent::StreamDone { source });
    })
}
