// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestwatchError {
    /// A run is already in progress; at most one run exists at a time.
    #[error("already running")]
    AlreadyRunning,

    /// A watch session is already active; at most one exists at a time.
    #[error("already watching")]
    AlreadyWatching,

    /// `unwatch` was called with no active watch session.
    #[error("not watching")]
    NotWatching,

    /// The test process could not be started at all.
    #[error("failed to start test process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Package or test-function listing failed.
    #[error("listing failed: {0}")]
    Listing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TestwatchError>;
