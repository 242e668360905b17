//! WebDAV filesystem implementation over the read-only root.
//!
//! [`ReadOnlyDav`] implements `DavFileSystem` by delegating to
//! [`ReadOnlyRoot`]. Blocking filesystem calls run on tokio's blocking pool.
//! Every mutating method forwards to the facade, which rejects it, so the
//! WebDAV listener and the browse listener share one enforcement point.

use crate::dir_entry::SandboxDirEntry;
use crate::error::to_fs_error;
use crate::file::SandboxFile;
use crate::metadata::SandboxMetaData;
use dav_server::davpath::DavPath;
use dav_server::fs::{
    DavDirEntry, DavFile, DavFileSystem, DavMetaData, FsError, FsFuture, FsStream, OpenOptions,
    ReadDirMeta,
};
use futures::stream;
use percent_encoding::percent_decode_str;
use rootserve_core::{EntryMetadata, OpenIntent, ReadOnlyFilesystem, ReadOnlyRoot, RootError, RootResult};
use std::io;
use tracing::{debug, instrument, trace};

/// Run a blocking facade call on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> RootResult<T>
where
    F: FnOnce() -> RootResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(RootError::Io {
            path: String::new(),
            source: io::Error::other(e),
        }),
    }
}

/// dav-server filesystem exposing a [`ReadOnlyRoot`].
#[derive(Debug, Clone)]
pub struct ReadOnlyDav {
    fs: ReadOnlyRoot,
}

impl ReadOnlyDav {
    pub fn new(fs: ReadOnlyRoot) -> Self {
        Self { fs }
    }

    /// Decoded client path for a dav-server path, always with a leading slash.
    fn parse_path(path: &DavPath) -> String {
        let url = path.as_url_string();
        let decoded = percent_decode_str(&url).decode_utf8_lossy();
        let normalized = decoded.trim_start_matches('/').trim_end_matches('/');
        trace!(raw_path = %url, normalized = %normalized, "parse_path");
        format!("/{normalized}")
    }

    async fn stat(&self, client_path: String) -> Result<EntryMetadata, FsError> {
        let fs = self.fs.clone();
        run_blocking(move || fs.stat(&client_path))
            .await
            .map_err(|e| to_fs_error(&e))
    }
}

fn intent_from(options: &OpenOptions) -> OpenIntent {
    OpenIntent {
        read: options.read,
        write: options.write,
        append: options.append,
        truncate: options.truncate,
        create: options.create,
        create_new: options.create_new,
    }
}

impl DavFileSystem for ReadOnlyDav {
    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn open<'a>(&'a self, path: &'a DavPath, options: OpenOptions) -> FsFuture<'a, Box<dyn DavFile>> {
        Box::pin(async move {
            let client_path = Self::parse_path(path);
            let intent = intent_from(&options);
            debug!(client_path = %client_path, intent = ?intent, "Opening file");

            let fs = self.fs.clone();
            let target = client_path.clone();
            let (file, meta) = run_blocking(move || {
                let file = fs.open(&target, intent)?;
                let meta = file
                    .metadata()
                    .map_err(|e| RootError::from_io(target.as_str(), e))?;
                Ok((file, EntryMetadata::from(&meta)))
            })
            .await
            .map_err(|e| to_fs_error(&e))?;

            if meta.is_dir {
                return Err(FsError::Forbidden);
            }
            Ok(Box::new(SandboxFile::new(file, meta, client_path)) as Box<dyn DavFile>)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn read_dir<'a>(
        &'a self,
        path: &'a DavPath,
        _: ReadDirMeta,
    ) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(async move {
            let client_path = Self::parse_path(path);
            let fs = self.fs.clone();
            let entries = run_blocking(move || fs.read_dir(&client_path))
                .await
                .map_err(|e| to_fs_error(&e))?;

            trace!(count = entries.len(), "Directory entries found");
            let entries: Vec<Box<dyn DavDirEntry>> = entries
                .into_iter()
                .map(|entry| Box::new(SandboxDirEntry::new(entry)) as Box<dyn DavDirEntry>)
                .collect();
            Ok(Box::pin(stream::iter(entries.into_iter().map(Ok))) as FsStream<_>)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let meta = self.stat(Self::parse_path(path)).await?;
            Ok(Box::new(SandboxMetaData::new(meta)) as Box<dyn DavMetaData>)
        })
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .create_dir(&Self::parse_path(path))
                .map_err(|e| to_fs_error(&e))
        })
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .remove_dir(&Self::parse_path(path))
                .map_err(|e| to_fs_error(&e))
        })
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .remove_file(&Self::parse_path(path))
                .map_err(|e| to_fs_error(&e))
        })
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .rename(&Self::parse_path(from), &Self::parse_path(to))
                .map_err(|e| to_fs_error(&e))
        })
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .copy(&Self::parse_path(from), &Self::parse_path(to))
                .map_err(|e| to_fs_error(&e))
        })
    }

    fn have_props<'a>(
        &'a self,
        _path: &'a DavPath,
    ) -> std::pin::Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async { false })
    }
}
