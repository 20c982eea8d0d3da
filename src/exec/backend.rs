// src/exec/backend.rs

//! Pluggable process-spawning abstraction.
//!
//! The runner talks to a `ProcessBackend` instead of `tokio::process`
//! directly. This makes it easy to swap in a scripted backend in tests while
//! keeping the production spawner here.
//!
//! - [`GoProcessBackend`] is the real implementation: it launches the
//!   argument vector with both output streams piped.
//! - Tests provide their own `ProcessBackend` that serves deterministic
//!   stream contents and exit codes without starting OS processes.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::debug;

/// Exit information of a finished process. `code` is `None` when the process
/// was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

/// Boxed async reader over one output stream of a spawned process.
pub type StreamReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed future resolving when the process has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send>>;

/// A process started by a [`ProcessBackend`]. The two streams must be
/// readable independently and concurrently.
pub struct SpawnedProcess {
    pub stdout: StreamReader,
    pub stderr: StreamReader,
    pub exit: ExitFuture,
}

/// Trait abstracting how the external test command is started.
pub trait ProcessBackend: Send + Sync {
    /// Start `argv` (program followed by its arguments) in `cwd`.
    fn spawn(&self, argv: &[String], cwd: &Path) -> io::Result<SpawnedProcess>;
}

/// Real backend: launches the argument vector via `tokio::process::Command`.
///
/// `kill_on_drop` is set so an abandoned exit future cannot leak the child.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoProcessBackend;

impl ProcessBackend for GoProcessBackend {
    fn spawn(&self, argv: &[String], cwd: &Path) -> io::Result<SpawnedProcess> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector")
        })?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not piped"))?;

        debug!(%program, ?args, "test process spawned");

        let exit: ExitFuture = Box::pin(async move {
            let status = child.wait().await?;
            Ok(ProcessExit {
                code: status.code(),
            })
        });

        Ok(SpawnedProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit,
        })
    }
}
