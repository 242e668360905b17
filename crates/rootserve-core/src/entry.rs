//! Metadata types produced by the sandbox.

use std::time::SystemTime;

/// Result of a `stat` on a confined path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// True for directories (including the served root).
    pub is_dir: bool,
    /// Size in bytes. Not meaningful for directories.
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl From<&std::fs::Metadata> for EntryMetadata {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            len: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

impl EntryMetadata {
    pub(crate) fn from_cap(meta: &cap_std::fs::Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            len: meta.len(),
            modified: modified_time(meta),
        }
    }

    /// Returns true for regular files (anything that is not a directory).
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// One entry of a directory listing.
///
/// Entries are read from the filesystem on every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// File name within its parent directory.
    pub name: String,
    /// True if the entry is a directory (after following an in-root symlink).
    pub is_dir: bool,
    /// Size in bytes. Ignored for directories.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl DirectoryEntry {
    /// Creates a file entry.
    pub fn file(name: impl Into<String>, size: u64, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified,
        }
    }

    /// Creates a directory entry.
    pub fn directory(name: impl Into<String>, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
            modified,
        }
    }

    pub(crate) fn from_cap(name: String, meta: &cap_std::fs::Metadata) -> Self {
        Self {
            name,
            is_dir: meta.is_dir(),
            size: meta.len(),
            modified: modified_time(meta),
        }
    }

    /// Returns this entry's metadata in `stat` form.
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            is_dir: self.is_dir,
            len: if self.is_dir { 0 } else { self.size },
            modified: self.modified,
        }
    }
}

// Platforms without mtime support report the epoch.
fn modified_time(meta: &cap_std::fs::Metadata) -> SystemTime {
    meta.modified()
        .map(cap_std::time::SystemTime::into_std)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
