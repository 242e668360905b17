//! WebDAV directory entry implementation.

use crate::metadata::SandboxMetaData;
use dav_server::fs::{DavDirEntry, DavMetaData, FsFuture};
use rootserve_core::DirectoryEntry;

/// A directory entry for WebDAV listings.
///
/// Metadata was captured when the directory was read, so no further
/// filesystem access happens here.
#[derive(Debug, Clone)]
pub struct SandboxDirEntry(DirectoryEntry);

impl SandboxDirEntry {
    pub fn new(entry: DirectoryEntry) -> Self {
        Self(entry)
    }
}

impl DavDirEntry for SandboxDirEntry {
    fn name(&self) -> Vec<u8> {
        self.0.name.as_bytes().to_vec()
    }

    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let meta = SandboxMetaData::new(self.0.metadata());
        Box::pin(async move { Ok(Box::new(meta) as Box<dyn DavMetaData>) })
    }

    fn is_dir(&self) -> FsFuture<'_, bool> {
        let is_dir = self.0.is_dir;
        Box::pin(async move { Ok(is_dir) })
    }

    fn is_file(&self) -> FsFuture<'_, bool> {
        let is_file = !self.0.is_dir;
        Box::pin(async move { Ok(is_file) })
    }

    fn is_symlink(&self) -> FsFuture<'_, bool> {
        Box::pin(async { Ok(false) })
    }
}
