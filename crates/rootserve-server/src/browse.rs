//! Browse listener: directory index pages and file downloads.
//!
//! In [`BrowseMode::Listing`] directories are rendered with
//! [`rootserve_core::listing`] and files are delegated to a dav-server
//! handler restricted to `GET`/`HEAD`, which provides content types, ranges
//! and conditional requests. [`BrowseMode::FileServer`] sends everything to
//! that handler with its own auto-index enabled.
//!
//! Any request method other than `HEAD` is answered as if it were `GET`.

use crate::error::browse_status;
use crate::filesystem::{ReadOnlyDav, run_blocking};
use crate::response::{self, ResponseBody};
use crate::server::RequestHandler;
use dav_server::{DavHandler, DavMethodSet, body::Body as DavBody, fakels::FakeLs};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::http::uri::PathAndQuery;
use hyper::{Method, Request, Response, Uri};
use percent_encoding::percent_decode_str;
use rootserve_core::listing::{ListingPage, encode_segment};
use rootserve_core::{ConfinedPath, ReadOnlyFilesystem, ReadOnlyRoot, RootError};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// How the browse listener presents directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowseMode {
    /// Fixed-width index page with a `../` link, dirs first.
    #[default]
    Listing,
    /// Plain file server with the handler's built-in index.
    FileServer,
}

/// Handler for the browse listener.
pub struct BrowseHandler {
    fs: ReadOnlyRoot,
    files: DavHandler,
    mode: BrowseMode,
}

impl std::fmt::Debug for BrowseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowseHandler")
            .field("base", &self.fs.base())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl BrowseHandler {
    pub fn new(fs: ReadOnlyRoot, mode: BrowseMode) -> Self {
        let files = DavHandler::builder()
            .filesystem(Box::new(ReadOnlyDav::new(fs.clone())))
            .locksystem(FakeLs::new())
            .methods(DavMethodSet::HTTP_RO)
            .autoindex(mode == BrowseMode::FileServer)
            .build_handler();
        Self { fs, files, mode }
    }

    async fn serve_listing(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let raw_path = req.uri().path().to_string();
        let client_path = percent_decode_str(&raw_path).decode_utf8_lossy().into_owned();

        let fs = self.fs.clone();
        let target = client_path.clone();
        let meta = match run_blocking(move || fs.stat(&target)).await {
            Ok(meta) => meta,
            Err(e) => return error_response(&e),
        };

        if meta.is_file() {
            return self.serve_file(req).await;
        }

        if !raw_path.ends_with('/') {
            let location = match req.uri().query() {
                Some(query) => format!("{raw_path}/?{query}"),
                None => format!("{raw_path}/"),
            };
            return response::moved_permanently(&location);
        }

        let fs = self.fs.clone();
        let target = client_path.clone();
        let entries = match run_blocking(move || fs.read_dir(&target)).await {
            Ok(entries) => entries,
            Err(e) => return error_response(&e),
        };

        debug!(path = %client_path, entries = entries.len(), "Rendering listing");
        let page = ListingPage::build(client_path, entries);
        response::html(page.render(), req.method() == Method::HEAD)
    }

    async fn serve_file(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let response: Response<DavBody> = self.files.handle(req).await;
        response.map(BodyExt::boxed_unsync)
    }
}

impl RequestHandler for BrowseHandler {
    async fn handle(&self, mut req: Request<Incoming>, _peer: SocketAddr) -> Response<ResponseBody> {
        if req.method() != Method::HEAD {
            *req.method_mut() = Method::GET;
        }

        // Outside-root references are rejected here so both modes answer
        // them identically.
        let resolved = {
            let client_path = percent_decode_str(req.uri().path()).decode_utf8_lossy();
            self.fs.resolve(&client_path)
        };
        let path = match resolved {
            Ok(path) => path,
            Err(e) => return error_response(&e),
        };
        if let Some(uri) = normalized_uri(req.uri(), &path) {
            *req.uri_mut() = uri;
        }

        match self.mode {
            BrowseMode::Listing => self.serve_listing(req).await,
            BrowseMode::FileServer => self.serve_file(req).await,
        }
    }
}

/// Rebuilds `uri` with its path replaced by the resolved, re-encoded form,
/// so in-root `..` and `.` segments are gone before the file handler parses
/// the path. A trailing slash is kept.
fn normalized_uri(uri: &Uri, path: &ConfinedPath) -> Option<Uri> {
    let mut normalized = String::from("/");
    normalized.push_str(
        &path
            .segments()
            .map(encode_segment)
            .collect::<Vec<_>>()
            .join("/"),
    );
    if !path.is_root() && uri.path().ends_with('/') {
        normalized.push('/');
    }
    if let Some(query) = uri.query() {
        normalized.push('?');
        normalized.push_str(query);
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(normalized.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

fn error_response(err: &RootError) -> Response<ResponseBody> {
    let status = browse_status(err);
    if status.is_server_error() {
        warn!(error = %err, "Browse request failed");
    } else {
        debug!(error = %err, status = status.as_u16(), "Browse request rejected");
    }
    response::status_text(status)
}
