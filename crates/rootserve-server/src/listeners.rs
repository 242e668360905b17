//! Running the browse and sync listeners side by side.

use crate::browse::{BrowseHandler, BrowseMode};
use crate::error::ServerError;
use crate::server::{Protocol, Server, ServerConfig};
use crate::sync::SyncHandler;
use rootserve_core::ReadOnlyRoot;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::sync::mpsc;
use tracing::error;

/// Addresses and presentation for both listeners.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub bind_address: IpAddr,
    /// Browse listener port.
    pub browse_port: u16,
    /// Sync (WebDAV) listener port.
    pub sync_port: u16,
    pub mode: BrowseMode,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            browse_port: 8080,
            sync_port: 8081,
            mode: BrowseMode::Listing,
        }
    }
}

impl ListenConfig {
    fn server_config(&self, port: u16) -> ServerConfig {
        ServerConfig {
            port,
            bind_address: self.bind_address,
        }
    }
}

/// The two running listeners over one shared read-only root.
#[derive(Debug)]
pub struct Listeners {
    browse: Server,
    sync: Server,
}

impl Listeners {
    /// Bind both listeners concurrently.
    ///
    /// If either bind fails, the other listener is shut down and the bind
    /// error is returned.
    pub async fn start(fs: ReadOnlyRoot, config: &ListenConfig) -> Result<Self, ServerError> {
        let browse_config = config.server_config(config.browse_port);
        let sync_config = config.server_config(config.sync_port);
        let (browse, sync) = tokio::try_join!(
            Server::start(
                Protocol::Http,
                BrowseHandler::new(fs.clone(), config.mode),
                &browse_config,
            ),
            Server::start(Protocol::WebDav, SyncHandler::new(fs), &sync_config),
        )?;
        Ok(Self { browse, sync })
    }

    pub fn browse_addr(&self) -> SocketAddr {
        self.browse.addr()
    }

    pub fn sync_addr(&self) -> SocketAddr {
        self.sync.addr()
    }

    pub fn browse_url(&self) -> String {
        self.browse.url()
    }

    pub fn sync_url(&self) -> String {
        self.sync.url()
    }

    /// Wait for the first listener to terminate and return its error.
    ///
    /// The other listener is stopped when this returns.
    pub async fn wait_first_failure(self) -> ServerError {
        let Self { browse, sync } = self;
        let (tx, mut rx) = mpsc::channel(2);

        let mut waiters = Vec::with_capacity(2);
        for server in [browse, sync] {
            let tx = tx.clone();
            waiters.push(tokio::spawn(async move {
                let protocol = server.protocol();
                let err = match server.wait().await {
                    Ok(()) => ServerError::Crashed {
                        protocol,
                        message: "listener exited".into(),
                    },
                    Err(e) => e,
                };
                let _ = tx.send(err).await;
            }));
        }
        drop(tx);

        let err = rx.recv().await.unwrap_or_else(|| ServerError::Crashed {
            protocol: Protocol::Http,
            message: "listener tasks vanished".into(),
        });
        error!(protocol = %err.protocol(), error = %err, "Listener failed");

        // Aborting a waiter drops its Server, which stops that accept loop.
        for waiter in waiters {
            waiter.abort();
        }
        err
    }
}
