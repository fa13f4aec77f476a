//! Workspace error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a workspace operation. Paths are shown as the caller gave them.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// The OS refused access. Reads report this as `locked` instead.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("workspace root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    /// A file operation was pointed at a directory.
    #[error("expected a file, found a directory: {0}")]
    ExpectedFile(String),

    /// The normalized path lands outside the workspace root.
    #[error("path outside workspace: {0}")]
    PathRejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn expected_file(path: impl Into<String>) -> Self {
        Self::ExpectedFile(path.into())
    }

    pub fn rejected(path: impl Into<String>) -> Self {
        Self::PathRejected(path.into())
    }

    /// Classify an I/O error raised while touching `path`.
    ///
    /// Missing and permission errors carry the caller's path; anything else
    /// keeps the OS error.
    pub(crate) fn from_io(path: &str, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::Io(e),
        }
    }

    /// True when the path was refused before touching the filesystem.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::PathRejected(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
