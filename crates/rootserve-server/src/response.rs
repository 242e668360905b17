//! Response construction shared by the listeners.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full, combinators::UnsyncBoxBody};
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use std::io;

/// Body type of every response the listeners produce.
///
/// dav-server bodies and locally built bodies are boxed into this one type so
/// a handler can return either.
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub(crate) fn full(body: impl Into<Bytes>) -> ResponseBody {
    Full::new(body.into())
        .map_err(|never: Infallible| -> io::Error { match never {} })
        .boxed_unsync()
}

pub(crate) fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never: Infallible| -> io::Error { match never {} })
        .boxed_unsync()
}

fn build(status: StatusCode, content_type: &'static str, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static(content_type));
    response
}

/// Plain-text response whose body is the status line, e.g. `404 page not found`.
pub(crate) fn status_text(status: StatusCode) -> Response<ResponseBody> {
    let text = match status {
        StatusCode::NOT_FOUND => "404 page not found\n".to_string(),
        other => format!(
            "{} {}\n",
            other.as_u16(),
            other.canonical_reason().unwrap_or("Error")
        ),
    };
    build(status, "text/plain; charset=utf-8", full(text))
}

pub(crate) fn html(body: String, head_only: bool) -> Response<ResponseBody> {
    let len = body.len();
    let payload = if head_only { empty() } else { full(body) };
    let mut response = build(StatusCode::OK, "text/html; charset=utf-8", payload);
    response
        .headers_mut()
        .insert(hyper::header::CONTENT_LENGTH, len.into());
    response
}

/// Permanent redirect, used to add the trailing slash to directory URLs.
pub(crate) fn moved_permanently(location: &str) -> Response<ResponseBody> {
    let mut response = build(
        StatusCode::MOVED_PERMANENTLY,
        "text/html; charset=utf-8",
        full(format!("<a href=\"{location}\">Moved Permanently</a>.\n")),
    );
    if let Ok(value) = hyper::header::HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}
