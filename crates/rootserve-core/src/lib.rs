//! Confined, read-only access to a directory subtree.
//!
//! This crate holds the protocol-independent part of rootserve:
//!
//! - [`RootSandbox`] binds a base directory and resolves client paths so that
//!   no lookup can leave it (no `..` escape, no absolute override, no symlink
//!   escape).
//! - [`ReadOnlyRoot`] wraps the sandbox and rejects every mutating operation
//!   with [`RootError::ReadOnly`].
//! - [`listing`] turns directory entries into a deterministic index page.
//!
//! # Example
//!
//! ```no_run
//! use rootserve_core::{ReadOnlyFilesystem, ReadOnlyRoot, RootSandbox, SymlinkPolicy};
//!
//! let sandbox = RootSandbox::bind("/srv/data", SymlinkPolicy::Follow)?;
//! let fs = ReadOnlyRoot::new(sandbox);
//!
//! let entries = fs.read_dir("/")?;
//! let page = rootserve_core::listing::render_listing("/", entries);
//! println!("{page}");
//!
//! assert!(fs.remove_file("/notes.txt").unwrap_err().is_read_only());
//! # Ok::<(), rootserve_core::RootError>(())
//! ```

mod entry;
mod error;
pub mod listing;
mod readonly;
mod sandbox;

pub use entry::{DirectoryEntry, EntryMetadata};
pub use error::{ErrorCategory, RootError, RootResult};
pub use listing::{ListingPage, ListingRow};
pub use readonly::{OpenIntent, ReadOnlyFilesystem, ReadOnlyRoot};
pub use sandbox::{ConfinedPath, RootSandbox, SymlinkPolicy};
