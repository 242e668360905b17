//! Read-only HTTP and WebDAV listeners for rootserve.
//!
//! Two front ends share one [`ReadOnlyRoot`](rootserve_core::ReadOnlyRoot):
//!
//! - the browse listener ([`BrowseHandler`]) renders directory index pages
//!   and serves file contents to browsers;
//! - the sync listener ([`SyncHandler`]) speaks WebDAV through
//!   [`ReadOnlyDav`] and refuses every write method with 403.
//!
//! Every request is logged by [`AccessLog`] before it is handled.
//!
//! # Example
//!
//! ```no_run
//! use rootserve_core::{ReadOnlyRoot, RootSandbox, SymlinkPolicy};
//! use rootserve_server::{ListenConfig, Listeners};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = ReadOnlyRoot::new(RootSandbox::bind("/srv/data", SymlinkPolicy::Follow)?);
//! let listeners = Listeners::start(fs, &ListenConfig::default()).await?;
//! println!("browse at {}, sync at {}", listeners.browse_url(), listeners.sync_url());
//! let err = listeners.wait_first_failure().await;
//! eprintln!("{err}");
//! # Ok(())
//! # }
//! ```

mod access_log;
mod browse;
mod dir_entry;
mod error;
mod file;
mod filesystem;
mod listeners;
mod metadata;
mod response;
mod server;
mod sync;

pub use access_log::AccessLog;
pub use browse::{BrowseHandler, BrowseMode};
pub use dir_entry::SandboxDirEntry;
pub use error::{ServerError, browse_status, io_error_to_fs_error, to_fs_error};
pub use file::SandboxFile;
pub use filesystem::ReadOnlyDav;
pub use listeners::{ListenConfig, Listeners};
pub use metadata::SandboxMetaData;
pub use response::ResponseBody;
pub use server::{Protocol, RequestHandler, Server, ServerConfig};
pub use sync::{SyncHandler, is_write_method};
