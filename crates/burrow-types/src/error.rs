//! Error taxonomy visible to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a failed sandbox operation.
///
/// This is the wire-stable half of an error; the kernel pairs it with a
/// human-readable detail that never contains a resolved host path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Confinement violation or malformed path/segment.
    InvalidPath,
    NotFound,
    NotADirectory,
    IsADirectory,
    AlreadyExists,
    DirectoryNotEmpty,
    PermissionDenied,
    /// Payload exceeds the configured upload limit.
    TooLarge,
    /// The operation outlived its deadline.
    TimedOut,
    /// Authenticated identity with no registered root. A provisioning bug.
    Unprovisioned,
    /// Any other storage failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotADirectory => "not_a_directory",
            ErrorKind::IsADirectory => "is_a_directory",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::DirectoryNotEmpty => "directory_not_empty",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::Unprovisioned => "unprovisioned",
            ErrorKind::Io => "io",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::TimedOut)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
