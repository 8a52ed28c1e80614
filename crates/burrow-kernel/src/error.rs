//! Errors reported by sandbox operations.

use std::io;
use std::time::Duration;

use burrow_types::ErrorKind;
use thiserror::Error;

/// Reasons attached to [`FsError::InvalidPath`].
///
/// They say why a path was refused, never which host path it resolved to.
pub mod reason {
    pub const ESCAPES_ROOT: &str = "path escapes sandbox root";
    pub const MALFORMED: &str = "malformed path";
    pub const BAD_FILE_NAME: &str = "file name must be a single path segment";
    pub const MISSING_PARENT: &str = "parent directory does not exist";
    pub const ROOT_IMMUTABLE: &str = "the sandbox root cannot be removed or renamed";
    pub const INTO_ITSELF: &str = "cannot move a directory into itself";
}

/// A failed sandbox operation.
///
/// Path details are the caller's own root-relative path (shown as `/` for
/// the root), so an error never reveals where a tenant lives on the host.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid path: {0}")]
    InvalidPath(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("no sandbox root is provisioned for identity {0:?}")]
    Unprovisioned(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Map an I/O failure on `path` (a display-ready relative path).
    pub fn from_io(err: io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path),
            io::ErrorKind::NotADirectory => FsError::NotADirectory(path),
            io::ErrorKind::IsADirectory => FsError::IsADirectory(path),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty(path),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path),
            _ => FsError::Io { path, source: err },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::InvalidPath(_) => ErrorKind::InvalidPath,
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::NotADirectory(_) => ErrorKind::NotADirectory,
            FsError::IsADirectory(_) => ErrorKind::IsADirectory,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            FsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            FsError::TooLarge { .. } => ErrorKind::TooLarge,
            FsError::TimedOut(_) => ErrorKind::TimedOut,
            FsError::Unprovisioned(_) => ErrorKind::Unprovisioned,
            FsError::Io { source, .. } if source.kind() == io::ErrorKind::TimedOut => {
                ErrorKind::TimedOut
            }
            FsError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind().is_retriable()
    }
}
