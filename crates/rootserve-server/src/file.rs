//! WebDAV file handle implementation.
//!
//! Handles are read-only. They wrap a host file that was opened through the
//! sandbox, so reads and seeks never touch anything but that one file.

use crate::error::io_error_to_fs_error;
use crate::metadata::SandboxMetaData;
use bytes::Bytes;
use dav_server::fs::{DavFile, DavMetaData, FsError, FsFuture};
use rootserve_core::EntryMetadata;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Upper bound for a single read buffer allocation.
const MAX_READ_CHUNK: usize = 256 * 1024;

/// A read-only file handle for WebDAV and browse downloads.
#[derive(Debug)]
pub struct SandboxFile {
    file: tokio::fs::File,
    meta: EntryMetadata,
    path: String,
}

impl SandboxFile {
    pub fn new(file: std::fs::File, meta: EntryMetadata, path: String) -> Self {
        Self {
            file: tokio::fs::File::from_std(file),
            meta,
            path,
        }
    }

    /// Client path this handle was opened for.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DavFile for SandboxFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let meta = SandboxMetaData::new(self.meta.clone());
        Box::pin(async move { Ok(Box::new(meta) as Box<dyn DavMetaData>) })
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        Box::pin(async move {
            let mut buf = Vec::with_capacity(count.min(MAX_READ_CHUNK));
            (&mut self.file)
                .take(count as u64)
                .read_to_end(&mut buf)
                .await
                .map_err(|e| io_error_to_fs_error(&e))?;
            Ok(Bytes::from(buf))
        })
    }

    fn write_bytes(&mut self, _buf: Bytes) -> FsFuture<'_, ()> {
        debug!(path = %self.path, "Rejected write on read-only handle");
        Box::pin(async { Err(FsError::Forbidden) })
    }

    fn write_buf(&mut self, _buf: Box<dyn bytes::Buf + Send>) -> FsFuture<'_, ()> {
        debug!(path = %self.path, "Rejected write on read-only handle");
        Box::pin(async { Err(FsError::Forbidden) })
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        Box::pin(async move {
            self.file
                .seek(pos)
                .await
                .map_err(|e| io_error_to_fs_error(&e))
        })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
