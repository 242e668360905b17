//! Test harness running both listeners over a temporary directory.
//!
//! The fixture tree is:
//!
//! ```text
//! notes.txt          "hello rootserve\n"
//! docs/
//!   guide.md         "# Guide\n"
//! Archive/           (empty)
//! ```

use bytes::Bytes;
use reqwest::{Client, Method, Response, StatusCode};
use rootserve_core::{ReadOnlyRoot, RootSandbox, SymlinkPolicy};
use rootserve_server::{BrowseMode, ListenConfig, Listeners};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const NOTES: &[u8] = b"hello rootserve\n";
pub const GUIDE: &[u8] = b"# Guide\n";

/// Both listeners on ephemeral ports, with an HTTP client that does not
/// follow redirects.
pub struct TestServers {
    listeners: Listeners,
    client: Client,
    temp_dir: TempDir,
}

impl TestServers {
    /// Start with the default listing presentation.
    pub async fn start() -> Self {
        Self::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, |_| {}).await
    }

    /// Start with the given presentation and symlink policy. `setup` runs
    /// after the fixture tree is written and before the servers start.
    pub async fn with_options(
        mode: BrowseMode,
        symlinks: SymlinkPolicy,
        setup: impl FnOnce(&Path),
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        std::fs::write(root.join("notes.txt"), NOTES).unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs/guide.md"), GUIDE).unwrap();
        std::fs::create_dir(root.join("Archive")).unwrap();
        setup(root);

        let sandbox = RootSandbox::bind(root, symlinks).expect("Failed to bind sandbox");
        let config = ListenConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            browse_port: 0,
            sync_port: 0,
            mode,
        };
        let listeners = Listeners::start(ReadOnlyRoot::new(sandbox), &config)
            .await
            .expect("Failed to start listeners");

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            listeners,
            client,
            temp_dir,
        }
    }

    /// Host directory being served.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn browse_addr(&self) -> SocketAddr {
        self.listeners.browse_addr()
    }

    pub fn sync_addr(&self) -> SocketAddr {
        self.listeners.sync_addr()
    }

    pub fn browse_url(&self, path: &str) -> String {
        format!("{}{}", self.listeners.browse_url(), path)
    }

    pub fn sync_url(&self, path: &str) -> String {
        format!("{}{}", self.listeners.sync_url(), path)
    }

    // ========== Browse listener ==========

    pub async fn browse(&self, method: Method, path: &str) -> Response {
        self.client
            .request(method, self.browse_url(path))
            .send()
            .await
            .expect("browse request failed")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.browse(Method::GET, path).await
    }

    /// GET on the browse listener, returning the body on success.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes, (StatusCode, String)> {
        let resp = self.get(path).await;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await.expect("Failed to read response bytes"))
        } else {
            Err((status, resp.text().await.unwrap_or_default()))
        }
    }

    pub async fn get_range(&self, path: &str, range: &str) -> Response {
        self.client
            .get(self.browse_url(path))
            .header("Range", range)
            .send()
            .await
            .expect("range request failed")
    }

    // ========== Sync listener ==========

    pub async fn dav(&self, method: &str, path: &str) -> Response {
        self.client
            .request(Method::from_bytes(method.as_bytes()).unwrap(), self.sync_url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} request failed: {e}"))
    }

    pub async fn propfind(&self, path: &str, depth: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .request(Method::from_bytes(b"PROPFIND").unwrap(), self.sync_url(path))
            .header("Depth", depth)
            .send()
            .await
            .expect("PROPFIND request failed");
        let status = resp.status();
        (status, resp.text().await.unwrap_or_default())
    }

    pub async fn put(&self, path: &str, body: impl Into<reqwest::Body>) -> Response {
        self.client
            .put(self.sync_url(path))
            .body(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// MOVE or COPY with a Destination header on the sync listener.
    pub async fn transfer(&self, method: &str, from: &str, to: &str) -> Response {
        self.client
            .request(Method::from_bytes(method.as_bytes()).unwrap(), self.sync_url(from))
            .header("Destination", self.sync_url(to))
            .header("Overwrite", "T")
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} request failed: {e}"))
    }
}

/// Send a request line verbatim, bypassing client-side path normalization,
/// and return the full response text.
pub async fn raw_request(addr: SocketAddr, method: &str, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let request = format!("{method} {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
