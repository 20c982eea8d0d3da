// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `ProcessBackend` trait and the real
//!   `tokio::process` implementation.
//! - [`runner`] builds the `go test` argument vector and supervises one run:
//!   two concurrent stream readers plus an exit waiter, all joined before
//!   the run counts as complete.

pub mod backend;
pub mod runner;

pub use backend::{ExitFuture, GoProcessBackend, ProcessBackend, ProcessExit, SpawnedProcess, StreamReader};
pub use runner::{build_args, execute, RunHandle};
