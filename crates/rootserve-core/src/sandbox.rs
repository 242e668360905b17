//! Confinement of client paths to a single base directory.
//!
//! [`RootSandbox`] binds an absolute base directory once, as a capability
//! directory handle, and performs every later lookup relative to that handle.
//! Two layers keep lookups inside the base:
//!
//! 1. [`ConfinedPath::parse`] normalizes the client string lexically and
//!    rejects any `..` that would climb above the base, as well as root or
//!    drive prefixes.
//! 2. The capability directory (`cap_std::fs::Dir`) refuses to resolve any
//!    path, including symlink targets, that leaves the base.
//!
//! The first layer gives a precise [`RootError::EscapeAttempt`] for hostile
//! input; the second one covers symlink indirection.

use crate::entry::{DirectoryEntry, EntryMetadata};
use crate::error::{RootError, RootResult};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use relative_path::{Component, RelativePath, RelativePathBuf};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// How symbolic links inside the served tree are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Follow symlinks as long as their target stays inside the base.
    #[default]
    Follow,
    /// Treat every symlink as absent: lookups through one fail with
    /// `NotFound` and listings omit them.
    Deny,
}

/// A normalized path relative to the sandbox base.
///
/// Never contains `.` or `..` components, a root, or a drive prefix. The
/// base directory itself is the empty path and displays as `"."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfinedPath(RelativePathBuf);

impl ConfinedPath {
    /// The base directory itself.
    pub fn root() -> Self {
        Self(RelativePathBuf::new())
    }

    /// Normalizes a client-supplied path.
    ///
    /// Leading separators are stripped and an empty result maps to the
    /// base. Fails with [`RootError::EscapeAttempt`] when a `..` segment would
    /// leave the base or when a segment is not a plain file name.
    pub fn parse(client_path: &str) -> RootResult<Self> {
        let trimmed = client_path.trim_start_matches('/');
        let mut normalized = RelativePathBuf::new();

        for component in RelativePath::new(trimmed).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(RootError::EscapeAttempt {
                            path: client_path.to_string(),
                        });
                    }
                }
                Component::Normal(segment) => {
                    if segment.contains('\0') {
                        return Err(RootError::NotFound {
                            path: client_path.to_string(),
                        });
                    }
                    if !is_plain_segment(segment) {
                        return Err(RootError::EscapeAttempt {
                            path: client_path.to_string(),
                        });
                    }
                    normalized.push(segment);
                }
            }
        }

        trace!(raw = %client_path, normalized = %normalized, "resolved client path");
        Ok(Self(normalized))
    }

    /// Returns true if this is the base directory.
    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    /// The relative path as a string (`"."` for the base).
    pub fn as_str(&self) -> &str {
        if self.is_root() { "." } else { self.0.as_str() }
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.components().filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            Component::CurDir | Component::ParentDir => None,
        })
    }

    /// Appends a single file name read from a directory of this path.
    pub(crate) fn child(&self, name: &str) -> Self {
        Self(self.0.join(name))
    }

    /// Joins this path onto `base`.
    ///
    /// For diagnostics and tests only; lookups go through the sandbox.
    pub fn to_host_path(&self, base: &Path) -> PathBuf {
        self.0.to_path(base)
    }

    fn as_std_path(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl fmt::Display for ConfinedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment is plain when the host OS sees it as one normal file name.
///
/// On Windows this rejects drive prefixes such as `C:` and backslashes.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

/// A base directory that all lookups are confined to.
#[derive(Debug)]
pub struct RootSandbox {
    dir: Dir,
    base: PathBuf,
    symlinks: SymlinkPolicy,
}

impl RootSandbox {
    /// Binds the sandbox to `base`.
    ///
    /// The path is canonicalized first, so the announced base is absolute
    /// and free of symlinks.
    pub fn bind(base: impl AsRef<Path>, symlinks: SymlinkPolicy) -> RootResult<Self> {
        let base = base.as_ref();
        let display = base.display().to_string();
        let canonical =
            std::fs::canonicalize(base).map_err(|e| RootError::from_io(display.clone(), e))?;
        let dir = Dir::open_ambient_dir(&canonical, ambient_authority())
            .map_err(|e| RootError::from_io(display, e))?;

        debug!(base = %canonical.display(), ?symlinks, "Sandbox bound");
        Ok(Self {
            dir,
            base: canonical,
            symlinks,
        })
    }

    /// The canonical base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolves a client path to a confined path.
    pub fn resolve(&self, client_path: &str) -> RootResult<ConfinedPath> {
        ConfinedPath::parse(client_path)
    }

    /// Returns metadata for a confined path, following in-root symlinks.
    pub fn stat(&self, path: &ConfinedPath) -> RootResult<EntryMetadata> {
        self.check_symlinks(path)?;
        let meta = self
            .dir
            .metadata(path.as_std_path())
            .map_err(|e| RootError::from_io(path.as_str(), e))?;
        Ok(EntryMetadata::from_cap(&meta))
    }

    /// Opens a confined path for reading.
    pub fn open(&self, path: &ConfinedPath) -> RootResult<std::fs::File> {
        self.check_symlinks(path)?;
        let file = self
            .dir
            .open(path.as_std_path())
            .map_err(|e| RootError::from_io(path.as_str(), e))?;
        Ok(file.into_std())
    }

    /// Lists a confined directory in enumeration order.
    ///
    /// Entries whose metadata cannot be read from inside the sandbox
    /// (dangling links, links out of the base, entries removed meanwhile) and
    /// entries with non UTF-8 names are skipped.
    pub fn list_dir(&self, path: &ConfinedPath) -> RootResult<Vec<DirectoryEntry>> {
        self.check_symlinks(path)?;
        let read_dir = self
            .dir
            .read_dir(path.as_std_path())
            .map_err(|e| RootError::from_io(path.as_str(), e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| RootError::Io {
                path: path.as_str().to_string(),
                source,
            })?;

            let Ok(name) = entry.file_name().into_string() else {
                debug!(dir = %path, "Skipping entry with non UTF-8 name");
                continue;
            };

            let is_symlink = entry.file_type().is_ok_and(|t| t.is_symlink());
            if is_symlink && self.symlinks == SymlinkPolicy::Deny {
                trace!(dir = %path, name = %name, "Hiding symlink");
                continue;
            }

            let meta = if is_symlink {
                self.dir.metadata(path.child(&name).as_std_path())
            } else {
                entry.metadata()
            };
            match meta {
                Ok(meta) => entries.push(DirectoryEntry::from_cap(name, &meta)),
                Err(e) => {
                    debug!(dir = %path, name = %name, error = %e, "Skipping unreadable entry");
                }
            }
        }

        trace!(dir = %path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    /// Under [`SymlinkPolicy::Deny`], fails if any prefix of `path` is a
    /// symlink.
    fn check_symlinks(&self, path: &ConfinedPath) -> RootResult<()> {
        if self.symlinks == SymlinkPolicy::Follow {
            return Ok(());
        }

        let mut prefix = RelativePathBuf::new();
        for segment in path.segments() {
            prefix.push(segment);
            let meta = self
                .dir
                .symlink_metadata(prefix.as_str())
                .map_err(|e| RootError::from_io(path.as_str(), e))?;
            if meta.is_symlink() {
                return Err(RootError::NotFound {
                    path: path.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}
