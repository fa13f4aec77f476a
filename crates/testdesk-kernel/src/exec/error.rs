//! Execution error types.

use std::io;
use thiserror::Error;

use crate::vfs::VfsError;

/// Errors from starting or stopping test runs.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No active run carries this test id.
    #[error("no running test with id: {0}")]
    NotFound(String),

    /// A run with this test id is still active.
    #[error("test already running: {0}")]
    AlreadyRunning(String),

    /// The runner program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The target path was rejected or missing.
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// I/O error while waiting on or reading from the process.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExecError {
    /// Create a NotFound error.
    pub fn not_found(test_id: impl Into<String>) -> Self {
        Self::NotFound(test_id.into())
    }

    /// Create an AlreadyRunning error.
    pub fn already_running(test_id: impl Into<String>) -> Self {
        Self::AlreadyRunning(test_id.into())
    }

    /// Create a Spawn error.
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Execution result type.
pub type ExecResult<T> = Result<T, ExecError>;
