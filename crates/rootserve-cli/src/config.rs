//! Effective configuration: command line and environment over an optional
//! TOML file over defaults.

use rootserve_core::SymlinkPolicy;
use rootserve_server::{BrowseMode, ListenConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DAV_PORT: u16 = 8081;

/// Errors reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Browse and WebDAV listeners cannot share port {0}")]
    PortConflict(u16),
}

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub path: Option<PathBuf>,
    pub port: Option<u16>,
    pub dav_port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub file_server: Option<bool>,
    pub no_symlinks: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub path: Option<PathBuf>,
    pub port: Option<u16>,
    pub dav_port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub file_server: bool,
    pub no_symlinks: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub path: PathBuf,
    pub port: u16,
    pub dav_port: u16,
    pub bind: IpAddr,
    pub file_server: bool,
    pub no_symlinks: bool,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self, ConfigError> {
        let settings = Self {
            path: overrides
                .path
                .or(file.path)
                .unwrap_or_else(|| PathBuf::from(".")),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            dav_port: overrides
                .dav_port
                .or(file.dav_port)
                .unwrap_or(DEFAULT_DAV_PORT),
            bind: overrides
                .bind
                .or(file.bind)
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            file_server: overrides.file_server || file.file_server.unwrap_or(false),
            no_symlinks: overrides.no_symlinks || file.no_symlinks.unwrap_or(false),
        };

        if settings.port != 0 && settings.port == settings.dav_port {
            return Err(ConfigError::PortConflict(settings.port));
        }
        Ok(settings)
    }

    pub fn symlink_policy(&self) -> SymlinkPolicy {
        if self.no_symlinks {
            SymlinkPolicy::Deny
        } else {
            SymlinkPolicy::Follow
        }
    }

    pub fn listen_config(&self) -> ListenConfig {
        ListenConfig {
            bind_address: self.bind,
            browse_port: self.port,
            sync_port: self.dav_port,
            mode: if self.file_server {
                BrowseMode::FileServer
            } else {
                BrowseMode::Listing
            },
        }
    }
}
