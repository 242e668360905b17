//! Error types for sandboxed filesystem access.
//!
//! Every error names the client-relative path that was requested, never the
//! host path it maps to, so errors can be logged or returned to clients
//! without revealing the layout of the host filesystem.
//!
//! Front ends do not match on individual variants. They use
//! [`RootError::category`] and map the resulting [`ErrorCategory`] to their
//! own status codes (HTTP status, `dav_server::fs::FsError`).

use std::io;
use thiserror::Error;

/// Errors returned by the sandbox and the read-only facade.
#[derive(Debug, Error)]
pub enum RootError {
    /// The client path refers to something outside the served root.
    #[error("Path escapes the served root: {path}")]
    EscapeAttempt { path: String },

    /// The resolved path does not exist.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// The host filesystem refused access, or the capability directory
    /// refused to follow a link out of the root.
    #[error("Access denied: {path}")]
    Denied { path: String },

    /// A write-class operation was attempted.
    #[error("Read-only filesystem: {operation} is not permitted")]
    ReadOnly { operation: &'static str },

    /// Any other I/O failure on an existing path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Semantic category for [`RootError`].
///
/// Both protocol front ends translate errors through this enum so a given
/// failure yields the same outcome regardless of the protocol used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing resource or outside-root reference (HTTP 404).
    NotFound,
    /// Host filesystem refused access.
    PermissionDenied,
    /// Write-class operation on the read-only tree (HTTP 403).
    ReadOnly,
    /// Unexpected I/O failure (HTTP 500).
    Internal,
}

impl RootError {
    /// Classifies this error for status-code mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EscapeAttempt { .. } | Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Denied { .. } => ErrorCategory::PermissionDenied,
            Self::ReadOnly { .. } => ErrorCategory::ReadOnly,
            Self::Io { .. } => ErrorCategory::Internal,
        }
    }

    /// Wraps an I/O error from the host filesystem.
    ///
    /// `path` is the client-relative path the operation was performed on.
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound { path },
            // cap-std reports escapes (`..` past the root, absolute symlinks)
            // as PermissionDenied as well.
            io::ErrorKind::PermissionDenied => Self::Denied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Returns true if this error is the read-only rejection.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }
}

/// Result type for sandbox and facade operations.
pub type RootResult<T> = Result<T, RootError>;
