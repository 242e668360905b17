//! Browse listener tests.
//!
//! These tests verify listing pages, file delivery and confinement:
//! - directories render as index pages, dirs first, with a `../` link
//! - files are served with ranges and content types
//! - missing and outside-root paths are 404

mod common;

use common::{
    GUIDE, NOTES, TestServers, assert_file_content, assert_not_found, assert_raw_status,
    raw_request,
};
use reqwest::{Method, StatusCode};
use rootserve_core::SymlinkPolicy;
use rootserve_server::BrowseMode;

// ============================================================================
// Listing pages
// ============================================================================

#[tokio::test]
async fn test_root_listing() {
    let servers = TestServers::start().await;

    let resp = servers.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    let body = resp.text().await.unwrap();

    assert!(body.starts_with(
        "<title>Index of /</title><h1>Index of /</h1><hr><pre><a href=\"../\">../</a>\n"
    ));
    assert!(body.ends_with("</pre><hr>"));

    let archive = body.find("<a href=\"Archive/\">Archive/</a>").unwrap();
    let docs = body.find("<a href=\"docs/\">docs/</a>").unwrap();
    let notes = body.find("<a href=\"notes.txt\">notes.txt</a>").unwrap();
    assert!(archive < docs && docs < notes, "directories first, then case-insensitive name order");
}

#[tokio::test]
async fn test_listing_row_layout() {
    let servers = TestServers::start().await;
    let body = servers.get("/").await.text().await.unwrap();

    let row = body
        .lines()
        .find(|line| line.starts_with("<a href=\"notes.txt\">"))
        .unwrap();
    let name = "notes.txt";
    let after_anchor = &row["<a href=\"notes.txt\">notes.txt</a>".len()..];
    // Name column is padded to 51 characters.
    assert!(after_anchor.starts_with(&" ".repeat(51 - name.len())));
    assert!(row.ends_with(&format!(" {}", NOTES.len())));

    let dir_row = body
        .lines()
        .find(|line| line.starts_with("<a href=\"docs/\">"))
        .unwrap();
    assert!(dir_row.ends_with(" -"));
}

#[tokio::test]
async fn test_subdirectory_listing() {
    let servers = TestServers::start().await;
    let body = servers.get("/docs/").await.text().await.unwrap();
    assert!(body.contains("<title>Index of /docs/</title>"));
    assert!(body.contains("<a href=\"guide.md\">guide.md</a>"));
}

#[tokio::test]
async fn test_directory_without_slash_redirects() {
    let servers = TestServers::start().await;
    let resp = servers.get("/docs").await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()["location"], "/docs/");
}

#[tokio::test]
async fn test_empty_directory_listing() {
    let servers = TestServers::start().await;
    let body = servers.get("/Archive/").await.text().await.unwrap();
    assert!(body.ends_with("<pre><a href=\"../\">../</a>\n</pre><hr>"));
}

#[tokio::test]
async fn test_listing_reflects_filesystem_changes() {
    let servers = TestServers::start().await;
    let before = servers.get("/").await.text().await.unwrap();
    assert!(!before.contains("later.txt"));

    std::fs::write(servers.root().join("later.txt"), b"new").unwrap();
    let after = servers.get("/").await.text().await.unwrap();
    assert!(after.contains("<a href=\"later.txt\">later.txt</a>"));
}

#[tokio::test]
async fn test_listing_escapes_names() {
    let servers = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, |root| {
        std::fs::write(root.join("a&b <c>.txt"), b"x").unwrap();
    })
    .await;
    let body = servers.get("/").await.text().await.unwrap();
    assert!(body.contains(">a&amp;b &lt;c&gt;.txt</a>"));
    assert!(body.contains("href=\"a&amp;b%20%3Cc%3E.txt\""));
}

#[tokio::test]
async fn test_listing_with_far_future_mtime() {
    let servers = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, |root| {
        let file = std::fs::File::create(root.join("future.txt")).unwrap();
        // Filesystems without 64-bit timestamps clamp or refuse this; the
        // listing must render either way.
        let _ = file.set_modified(
            std::time::UNIX_EPOCH + std::time::Duration::from_secs(9_000_000_000_000),
        );
    })
    .await;

    let resp = servers.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<a href=\"future.txt\">future.txt</a>"));
    assert!(body.contains("<a href=\"notes.txt\">notes.txt</a>"));
}

#[tokio::test]
async fn test_head_listing_has_no_body() {
    let servers = TestServers::start().await;
    let resp = servers.browse(Method::HEAD, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.bytes().await.unwrap().is_empty());
}

// ============================================================================
// Files
// ============================================================================

#[tokio::test]
async fn test_file_contents() {
    let servers = TestServers::start().await;
    assert_file_content(&servers, "/notes.txt", NOTES).await;
    assert_file_content(&servers, "/docs/guide.md", GUIDE).await;
}

#[tokio::test]
async fn test_file_content_type() {
    let servers = TestServers::start().await;
    let resp = servers.get("/notes.txt").await;
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
}

#[tokio::test]
async fn test_file_range_request() {
    let servers = TestServers::start().await;
    let resp = servers.get_range("/notes.txt", "bytes=0-4").await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"hello");
}

#[tokio::test]
async fn test_percent_encoded_file_name() {
    let servers = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, |root| {
        std::fs::write(root.join("read me.txt"), b"spaced").unwrap();
    })
    .await;
    assert_file_content(&servers, "/read%20me.txt", b"spaced").await;
}

#[tokio::test]
async fn test_other_methods_are_served_as_get() {
    let servers = TestServers::start().await;
    let resp = servers.browse(Method::POST, "/notes.txt").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), NOTES);
    assert_eq!(std::fs::read(servers.root().join("notes.txt")).unwrap(), NOTES);
}

// ============================================================================
// Not found and confinement
// ============================================================================

#[tokio::test]
async fn test_missing_paths() {
    let servers = TestServers::start().await;
    assert_not_found(&servers, "/missing.txt").await;
    assert_not_found(&servers, "/docs/missing/deeper").await;
    assert_not_found(&servers, "/notes.txt/child").await;

    let body = servers.get("/missing.txt").await.text().await.unwrap();
    assert_eq!(body, "404 page not found\n");
}

#[tokio::test]
async fn test_dot_dot_traversal_is_not_found() {
    let servers = TestServers::start().await;
    let response = raw_request(servers.browse_addr(), "GET", "/docs/../../etc/passwd").await;
    assert_raw_status(&response, 404);
    assert!(!response.contains("root:"));
}

#[tokio::test]
async fn test_encoded_traversal_is_not_found() {
    let servers = TestServers::start().await;
    let response = raw_request(servers.browse_addr(), "GET", "/%2e%2e/%2e%2e/etc/passwd").await;
    assert_raw_status(&response, 404);
}

#[tokio::test]
async fn test_in_root_dot_dot_resolves() {
    let servers = TestServers::start().await;
    let response = raw_request(servers.browse_addr(), "GET", "/docs/../notes.txt").await;
    assert_raw_status(&response, 200);
    assert!(response.ends_with("hello rootserve\n"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_not_found() {
    let outside = tempfile::TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret.txt"), b"top secret").unwrap();
    let target = outside.path().to_path_buf();

    let servers = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, |root| {
        std::os::unix::fs::symlink(&target, root.join("escape")).unwrap();
    })
    .await;

    assert_not_found(&servers, "/escape/secret.txt").await;
    let body = servers.get("/").await.text().await.unwrap();
    assert!(!body.contains("secret"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_in_root_symlink_policy() {
    let link = |root: &std::path::Path| {
        std::os::unix::fs::symlink("notes.txt", root.join("alias.txt")).unwrap();
    };

    let follow = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Follow, link).await;
    assert_file_content(&follow, "/alias.txt", NOTES).await;

    let deny = TestServers::with_options(BrowseMode::Listing, SymlinkPolicy::Deny, link).await;
    assert_not_found(&deny, "/alias.txt").await;
    let body = deny.get("/").await.text().await.unwrap();
    assert!(!body.contains("alias.txt"));
}

// ============================================================================
// File-server presentation
// ============================================================================

#[tokio::test]
async fn test_file_server_mode() {
    let servers =
        TestServers::with_options(BrowseMode::FileServer, SymlinkPolicy::Follow, |_| {}).await;

    assert_file_content(&servers, "/notes.txt", NOTES).await;

    let resp = servers.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("notes.txt"));
    assert!(!body.contains("<a href=\"../\">../</a>\n<a"), "not the fixed-width listing");

    assert_not_found(&servers, "/missing.txt").await;
    let response = raw_request(servers.browse_addr(), "GET", "/docs/../../etc/passwd").await;
    assert_raw_status(&response, 404);
}
