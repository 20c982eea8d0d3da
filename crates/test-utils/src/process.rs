//! Scripted process backend.
//!
//! Serves deterministic stream contents and exit codes without starting OS
//! processes, so runner and orchestrator tests are timing-independent.

use std::io::{self, Cursor};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use testwatch::exec::{ExitFuture, ProcessBackend, ProcessExit, SpawnedProcess};

/// A fake [`ProcessBackend`] that:
/// - records every argv it is asked to spawn
/// - serves fixed stdout/stderr bytes
/// - exits with a chosen code, optionally only after the test releases a gate
#[derive(Clone)]
pub struct ScriptedBackend {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: i32,
    gate: Option<Arc<Notify>>,
    fail_spawn: bool,
    spawned: Arc<AtomicUsize>,
    argvs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedBackend {
    pub fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
        ScriptedBackend {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            exit_code,
            gate: None,
            fail_spawn: false,
            spawned: Arc::new(AtomicUsize::new(0)),
            argvs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend whose processes pass instantly with no output.
    pub fn passing() -> Self {
        ScriptedBackend::new("", "", 0)
    }

    /// A backend that refuses to spawn, as if the executable were missing.
    pub fn failing_spawn() -> Self {
        let mut backend = ScriptedBackend::passing();
        backend.fail_spawn = true;
        backend
    }

    /// Hold every spawned process "running" until the returned gate is
    /// notified once per process.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// How many processes have been spawned so far.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Every argv passed to `spawn`, in order.
    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.argvs.lock().unwrap().clone()
    }
}

impl ProcessBackend for ScriptedBackend {
    fn spawn(&self, argv: &[String], _cwd: &Path) -> io::Result<SpawnedProcess> {
        if self.fail_spawn {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "scripted spawn failure",
            ));
        }

        self.argvs.lock().unwrap().push(argv.to_vec());
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let exit_code = self.exit_code;
        let gate = self.gate.clone();
        let exit: ExitFuture = Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(ProcessExit {
                code: Some(exit_code),
            })
        });

        Ok(SpawnedProcess {
            stdout: Box::new(Cursor::new(self.stdout.clone())),
            stderr: Box::new(Cursor::new(self.stderr.clone())),
            exit,
        })
    }
}
