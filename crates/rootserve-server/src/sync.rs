//! Sync listener: WebDAV over the read-only root.

use crate::filesystem::ReadOnlyDav;
use crate::response::{self, ResponseBody};
use crate::server::RequestHandler;
use dav_server::{DavHandler, body::Body as DavBody, fakels::FakeLs};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use rootserve_core::ReadOnlyRoot;
use std::net::SocketAddr;
use tracing::debug;

/// Methods that could modify the tree. They are refused with 403 before
/// dav-server sees them, regardless of whether the target exists.
const WRITE_METHODS: &[&str] = &[
    "PUT",
    "DELETE",
    "MKCOL",
    "MOVE",
    "COPY",
    "PROPPATCH",
    "PATCH",
];

/// Returns true for request methods that are refused on the sync listener.
pub fn is_write_method(method: &Method) -> bool {
    WRITE_METHODS.contains(&method.as_str())
}

/// Handler for the sync (WebDAV) listener.
///
/// `LOCK`/`UNLOCK` are answered by a fake lock system so clients that insist
/// on locking can still mount the share.
pub struct SyncHandler {
    dav: DavHandler,
}

impl std::fmt::Debug for SyncHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandler").finish_non_exhaustive()
    }
}

impl SyncHandler {
    pub fn new(fs: ReadOnlyRoot) -> Self {
        let dav = DavHandler::builder()
            .filesystem(Box::new(ReadOnlyDav::new(fs)))
            .locksystem(FakeLs::new())
            .build_handler();
        Self { dav }
    }
}

impl RequestHandler for SyncHandler {
    async fn handle(&self, req: Request<Incoming>, peer: SocketAddr) -> Response<ResponseBody> {
        if is_write_method(req.method()) {
            debug!(method = %req.method(), path = %req.uri().path(), client = %peer, "Refused write method");
            return response::status_text(StatusCode::FORBIDDEN);
        }
        let response: Response<DavBody> = self.dav.handle(req).await;
        response.map(BodyExt::boxed_unsync)
    }
}
