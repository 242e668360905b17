//! WebDAV metadata implementation.

use dav_server::fs::{DavMetaData, FsError};
use rootserve_core::EntryMetadata;
use std::time::SystemTime;

/// [`EntryMetadata`] as seen by dav-server.
///
/// The sandbox does not track creation or access times, so both report the
/// modification time.
#[derive(Debug, Clone)]
pub struct SandboxMetaData(EntryMetadata);

impl SandboxMetaData {
    pub fn new(meta: EntryMetadata) -> Self {
        Self(meta)
    }
}

impl From<EntryMetadata> for SandboxMetaData {
    fn from(meta: EntryMetadata) -> Self {
        Self(meta)
    }
}

impl DavMetaData for SandboxMetaData {
    fn len(&self) -> u64 {
        if self.0.is_dir { 0 } else { self.0.len }
    }

    fn modified(&self) -> Result<SystemTime, FsError> {
        Ok(self.0.modified)
    }

    fn is_dir(&self) -> bool {
        self.0.is_dir
    }

    fn is_file(&self) -> bool {
        self.0.is_file()
    }

    // In-root symlinks are followed before metadata is produced.
    fn is_symlink(&self) -> bool {
        false
    }

    fn created(&self) -> Result<SystemTime, FsError> {
        self.modified()
    }

    fn accessed(&self) -> Result<SystemTime, FsError> {
        self.modified()
    }
}
