//! Custom assertions for listener integration tests.

use crate::common::TestServers;
use reqwest::{Response, StatusCode};

/// Assert that a file is served by the browse listener with this content.
pub async fn assert_file_content(servers: &TestServers, path: &str, expected: &[u8]) {
    match servers.get_bytes(path).await {
        Ok(actual) => assert_eq!(
            actual.as_ref(),
            expected,
            "File content mismatch at {path}: expected {} bytes, got {} bytes",
            expected.len(),
            actual.len()
        ),
        Err((status, body)) => panic!("Failed to read file {path}: status={status}, body={body}"),
    }
}

/// Assert that the browse listener answers 404 for a path.
pub async fn assert_not_found(servers: &TestServers, path: &str) {
    let resp = servers.get(path).await;
    assert_eq!(
        resp.status(),
        StatusCode::NOT_FOUND,
        "Expected 404 for {path}, got {}",
        resp.status()
    );
}

/// Assert a write attempt was refused with 403.
pub fn assert_forbidden(resp: &Response, context: &str) {
    assert_eq!(
        resp.status(),
        StatusCode::FORBIDDEN,
        "{context}: expected 403, got {}",
        resp.status()
    );
}

/// Assert that a raw HTTP response starts with the given status code.
pub fn assert_raw_status(response: &str, status: u16) {
    let prefix = format!("HTTP/1.1 {status}");
    assert!(
        response.starts_with(&prefix),
        "expected {prefix}, got: {}",
        response.lines().next().unwrap_or_default()
    );
}
