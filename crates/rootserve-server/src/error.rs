//! Error handling and mapping for the listeners.
//!
//! Filesystem failures arrive as [`RootError`] and are translated through
//! [`ErrorCategory`] so the browse and WebDAV front ends agree on outcomes:
//! a missing or outside-root path is "not found" on both, a write attempt is
//! "forbidden" on both.

use crate::server::Protocol;
use dav_server::fs::FsError;
use hyper::StatusCode;
use rootserve_core::{ErrorCategory, RootError};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Terminal failure of a listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be created.
    #[error("{protocol} listener failed to bind {addr}: {source}")]
    Bind {
        protocol: Protocol,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The accept loop hit a non-transient error.
    #[error("{protocol} listener stopped accepting connections: {source}")]
    Accept {
        protocol: Protocol,
        #[source]
        source: io::Error,
    },

    /// The listener task panicked.
    #[error("{protocol} listener task crashed: {message}")]
    Crashed { protocol: Protocol, message: String },
}

impl ServerError {
    /// The listener this error came from.
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Bind { protocol, .. }
            | Self::Accept { protocol, .. }
            | Self::Crashed { protocol, .. } => *protocol,
        }
    }

    /// Returns true if the error happened while creating the socket.
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}

/// Convert a filesystem error to a dav-server `FsError`.
pub fn to_fs_error(err: &RootError) -> FsError {
    match err.category() {
        ErrorCategory::NotFound => FsError::NotFound,
        ErrorCategory::PermissionDenied | ErrorCategory::ReadOnly => FsError::Forbidden,
        ErrorCategory::Internal => FsError::GeneralFailure,
    }
}

/// Convert an I/O error on an already-open file to a dav-server `FsError`.
pub fn io_error_to_fs_error(err: &io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        io::ErrorKind::PermissionDenied => FsError::Forbidden,
        _ => FsError::GeneralFailure,
    }
}

/// HTTP status for a browse request that failed with `err`.
///
/// Host permission errors are reported as 404 so a browser cannot probe for
/// the existence of unreadable entries.
pub fn browse_status(err: &RootError) -> StatusCode {
    match err.category() {
        ErrorCategory::NotFound | ErrorCategory::PermissionDenied => StatusCode::NOT_FOUND,
        ErrorCategory::ReadOnly => StatusCode::FORBIDDEN,
        ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
