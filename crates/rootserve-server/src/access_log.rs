//! Per-request access logging.

use crate::response::ResponseBody;
use crate::server::{Protocol, RequestHandler};
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use tracing::info;

/// Wraps a handler and emits one `info` event per request before the request
/// is processed.
///
/// The event carries the protocol tag, method, request path and client
/// address as structured fields.
#[derive(Debug)]
pub struct AccessLog<H> {
    protocol: Protocol,
    inner: H,
}

impl<H> AccessLog<H> {
    pub fn new(protocol: Protocol, inner: H) -> Self {
        Self { protocol, inner }
    }
}

impl<H: RequestHandler> RequestHandler for AccessLog<H> {
    async fn handle(&self, req: Request<Incoming>, peer: SocketAddr) -> Response<ResponseBody> {
        info!(
            protocol = %self.protocol,
            method = %req.method(),
            path = %req.uri().path(),
            client = %peer,
            "Request"
        );
        self.inner.handle(req, peer).await
    }
}
