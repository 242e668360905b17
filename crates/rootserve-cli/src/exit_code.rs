//! Process exit codes.

pub const SUCCESS: u8 = 0;
/// Anything not covered below.
pub const GENERAL_ERROR: u8 = 1;
/// Invalid flags, environment values or config file.
pub const CONFIG_ERROR: u8 = 2;
/// The directory to serve does not exist or is not a directory.
pub const PATH_NOT_FOUND: u8 = 3;
/// A listener could not bind or stopped accepting connections.
pub const LISTENER_FAILED: u8 = 4;
