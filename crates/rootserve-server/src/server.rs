//! HTTP listener lifecycle.
//!
//! A [`Server`] owns one TCP listener and the task running its accept loop.
//! Connections are served with hyper's auto builder (HTTP/1.1 and HTTP/2),
//! each request is recorded by [`AccessLog`] and then passed to a
//! [`RequestHandler`].

use crate::access_log::AccessLog;
use crate::error::ServerError;
use crate::response::ResponseBody;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Which front end a listener serves. Used as the tag in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Browse listener: directory listings and file downloads.
    Http,
    /// Sync listener: WebDAV.
    WebDav,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "HTTP",
            Self::WebDav => "WEBDAV",
        })
    }
}

/// Configuration for a single listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 = auto-assign).
    pub port: u16,
    /// Bind address.
    pub bind_address: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Serves requests for one listener.
///
/// `peer` is the remote address of the connection the request arrived on.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(
        &self,
        req: Request<Incoming>,
        peer: SocketAddr,
    ) -> impl Future<Output = Response<ResponseBody>> + Send;
}

/// A running listener.
///
/// Dropping the server aborts its accept loop.
#[derive(Debug)]
pub struct Server {
    protocol: Protocol,
    addr: SocketAddr,
    task: Option<JoinHandle<Result<(), ServerError>>>,
}

impl Server {
    /// Bind the listener and start accepting connections.
    pub async fn start<H: RequestHandler>(
        protocol: Protocol,
        handler: H,
        config: &ServerConfig,
    ) -> Result<Self, ServerError> {
        let requested = config.socket_addr();
        let bind_error = |source| ServerError::Bind {
            protocol,
            addr: requested,
            source,
        };
        let listener = TcpListener::bind(requested).await.map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;

        info!(protocol = %protocol, addr = %addr, "Listener started");

        let handler = Arc::new(AccessLog::new(protocol, handler));
        let task = tokio::spawn(run_server(protocol, listener, handler));

        Ok(Self {
            protocol,
            addr,
            task: Some(task),
        })
    }

    /// The actual bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Get the base URL for this listener.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until the accept loop terminates and return its failure.
    pub async fn wait(mut self) -> Result<(), ServerError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(ServerError::Crashed {
                protocol: self.protocol,
                message: e.to_string(),
            }),
        }
    }

    /// Stop accepting connections.
    pub fn stop(mut self) {
        self.abort();
        info!(protocol = %self.protocol, "Listener stopped");
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Accept errors that say nothing about the listening socket itself.
fn is_transient(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) {
        return true;
    }
    is_resource_exhaustion(err)
}

#[cfg(unix)]
fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(_err: &io::Error) -> bool {
    false
}

/// Run the accept loop until a non-transient error.
async fn run_server<H: RequestHandler>(
    protocol: Protocol,
    listener: TcpListener,
    handler: Arc<H>,
) -> Result<(), ServerError> {
    let mut backoff = ACCEPT_BACKOFF_START;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                backoff = ACCEPT_BACKOFF_START;
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let handler = Arc::clone(&handler);
                        async move { Ok::<_, Infallible>(handler.handle(req, peer).await) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        debug!(protocol = %protocol, peer = %peer, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) if is_transient(&e) => {
                warn!(
                    protocol = %protocol,
                    error = %e,
                    retry_in = ?backoff,
                    "Accept failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
            }
            Err(source) => return Err(ServerError::Accept { protocol, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response;
    use hyper::StatusCode;

    struct Teapot;

    impl RequestHandler for Teapot {
        async fn handle(&self, _req: Request<Incoming>, _peer: SocketAddr) -> Response<ResponseBody> {
            let mut response = Response::new(response::full("short and stout"));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            response
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 0);
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_protocol_tags() {
        assert_eq!(Protocol::Http.to_string(), "HTTP");
        assert_eq!(Protocol::WebDav.to_string(), "WEBDAV");
    }

    #[test]
    fn test_transient_accept_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::InvalidInput)));
        #[cfg(unix)]
        assert!(is_transient(&io::Error::from_raw_os_error(libc::EMFILE)));
    }

    #[tokio::test]
    async fn test_start_serves_and_stops() {
        let server = Server::start(Protocol::Http, Teapot, &ServerConfig::default())
            .await
            .unwrap();
        assert_ne!(server.addr().port(), 0);
        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(server.url()).await.unwrap();
        assert_eq!(response.status().as_u16(), 418);
        assert_eq!(response.text().await.unwrap(), "short and stout");

        let addr = server.addr();
        server.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = Server::start(Protocol::Http, Teapot, &ServerConfig::default())
            .await
            .unwrap();
        let config = ServerConfig {
            port: first.addr().port(),
            ..ServerConfig::default()
        };
        let err = Server::start(Protocol::WebDav, Teapot, &config)
            .await
            .unwrap_err();
        assert!(err.is_bind());
        assert_eq!(err.protocol(), Protocol::WebDav);
    }
}
