//! Read-only filesystem facade over a [`RootSandbox`].
//!
//! [`ReadOnlyRoot`] is the single capability both protocol front ends hold.
//! It accepts raw client paths, resolves them through the sandbox exactly
//! once, and only ever reads. Every mutating operation returns
//! [`RootError::ReadOnly`] before any path is resolved, so the outcome is the
//! same whether the target exists or not and nothing on disk changes.

use crate::entry::{DirectoryEntry, EntryMetadata};
use crate::error::{RootError, RootResult};
use crate::sandbox::{ConfinedPath, RootSandbox};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Access flags requested when opening a file.
///
/// Protocol adapters translate their own open options into this type so the
/// facade can reject write intent uniformly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OpenIntent {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenIntent {
    /// Plain read access.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Returns true if any flag would allow modifying the filesystem.
    pub fn is_mutating(&self) -> bool {
        self.write || self.append || self.truncate || self.create || self.create_new
    }
}

/// Filesystem contract exposed to the protocol front ends.
///
/// Only `stat`, `read_dir` and read-only `open` can succeed. The remaining
/// operations exist so adapters have one place to send write attempts to.
pub trait ReadOnlyFilesystem: Send + Sync {
    /// Metadata for a client path.
    fn stat(&self, client_path: &str) -> RootResult<EntryMetadata>;

    /// All entries of a directory, in enumeration order.
    fn read_dir(&self, client_path: &str) -> RootResult<Vec<DirectoryEntry>>;

    /// Opens a file. Any mutating intent is rejected.
    fn open(&self, client_path: &str, intent: OpenIntent) -> RootResult<std::fs::File>;

    fn create_dir(&self, _client_path: &str) -> RootResult<()> {
        Err(read_only("create_dir"))
    }

    fn remove_file(&self, _client_path: &str) -> RootResult<()> {
        Err(read_only("remove_file"))
    }

    fn remove_dir(&self, _client_path: &str) -> RootResult<()> {
        Err(read_only("remove_dir"))
    }

    fn remove_all(&self, _client_path: &str) -> RootResult<()> {
        Err(read_only("remove_all"))
    }

    fn rename(&self, _from: &str, _to: &str) -> RootResult<()> {
        Err(read_only("rename"))
    }

    fn copy(&self, _from: &str, _to: &str) -> RootResult<()> {
        Err(read_only("copy"))
    }

    fn set_modified(&self, _client_path: &str, _time: SystemTime) -> RootResult<()> {
        Err(read_only("set_modified"))
    }
}

fn read_only(operation: &'static str) -> RootError {
    debug!(operation, "Rejected write-class operation");
    RootError::ReadOnly { operation }
}

/// Shared read-only view of a sandbox.
///
/// Cloning is cheap; all clones refer to the same sandbox.
#[derive(Debug, Clone)]
pub struct ReadOnlyRoot {
    sandbox: Arc<RootSandbox>,
}

impl ReadOnlyRoot {
    pub fn new(sandbox: RootSandbox) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
        }
    }

    /// The canonical base directory being served.
    pub fn base(&self) -> &Path {
        self.sandbox.base()
    }

    /// Resolves a client path without touching the filesystem.
    pub fn resolve(&self, client_path: &str) -> RootResult<ConfinedPath> {
        self.sandbox.resolve(client_path)
    }
}

impl ReadOnlyFilesystem for ReadOnlyRoot {
    fn stat(&self, client_path: &str) -> RootResult<EntryMetadata> {
        let path = self.sandbox.resolve(client_path)?;
        self.sandbox.stat(&path)
    }

    fn read_dir(&self, client_path: &str) -> RootResult<Vec<DirectoryEntry>> {
        let path = self.sandbox.resolve(client_path)?;
        self.sandbox.list_dir(&path)
    }

    fn open(&self, client_path: &str, intent: OpenIntent) -> RootResult<std::fs::File> {
        if intent.is_mutating() {
            return Err(read_only("open_for_write"));
        }
        let path = self.sandbox.resolve(client_path)?;
        self.sandbox.open(&path)
    }
}
