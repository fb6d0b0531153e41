//! Object store serving through the data endpoint.
//!
//! Tests verify:
//! - `s3://bucket/key` parsing, plain and percent-encoded
//! - One store call for full and unsatisfiable reads, two for ranges
//! - Missing objects stop after the first call
//! - Store faults are server errors
//! - A body failing after the response head aborts the stream

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use zarr_gateway::range::ByteWindow;

use super::test_utils::{build_router, files_uri, get, MockAuthorizer, MockObjectStore};

fn store_with_object() -> Arc<MockObjectStore> {
    Arc::new(MockObjectStore::new().with_object("bucket", "plate.zarr/0/.zarray", b"012345"))
}

fn allow() -> Arc<MockAuthorizer> {
    Arc::new(MockAuthorizer::allow())
}

// =============================================================================
// Reads and Call Counts
// =============================================================================

#[tokio::test]
async fn test_full_read_uses_one_call() {
    let store = store_with_object();
    let router = build_router(store.clone(), allow());

    let response = get(router, &files_uri("s3://bucket/plate.zarr/0/.zarray"), None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-length"), Some("6"));
    assert_eq!(&response.body[..], b"012345");
    assert_eq!(
        store.calls(),
        vec![(
            "bucket".to_string(),
            "plate.zarr/0/.zarray".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn test_ranged_read_uses_two_calls() {
    let store = store_with_object();
    let router = build_router(store.clone(), allow());

    let response = get(
        router,
        &files_uri("s3://bucket/plate.zarr/0/.zarray"),
        Some("bytes=1-3"),
    )
    .await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.header("content-range"), Some("bytes 1-3/6"));
    assert_eq!(response.header("content-length"), Some("3"));
    assert_eq!(&response.body[..], b"123");

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].2, None);
    assert_eq!(calls[1].2, Some(ByteWindow::new(1, 3)));
}

#[tokio::test]
async fn test_unsatisfiable_range_uses_one_call() {
    let store = store_with_object();
    let router = build_router(store.clone(), allow());

    let response = get(
        router,
        &files_uri("s3://bucket/plate.zarr/0/.zarray"),
        Some("bytes=10-20"),
    )
    .await;

    assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.header("content-range"), Some("bytes */6"));
    assert!(response.body.is_empty());
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_missing_object_is_not_found_after_one_call() {
    let store = store_with_object();
    let router = build_router(store.clone(), allow());

    let response = get(router, &files_uri("s3://bucket/missing"), Some("bytes=1-3")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Not Found");
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_missing_bucket_is_not_found() {
    let store = store_with_object();
    let router = build_router(store, allow());

    let response = get(router, &files_uri("s3://other/plate.zarr/0/.zarray"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Address Parsing
// =============================================================================

#[tokio::test]
async fn test_percent_encoded_s3_uri() {
    let store = store_with_object();
    let router = build_router(store.clone(), allow());

    let response = get(
        router,
        "/data/files/s3%3A%2F%2Fbucket%2Fplate.zarr%2F0%2F.zarray",
        None,
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(store.calls()[0].1, "plate.zarr/0/.zarray");
}

#[tokio::test]
async fn test_invalid_s3_uri() {
    let store = store_with_object();

    for uri in [
        "/data/files/s3://bucket",
        "/data/files/s3://bucket/",
        "/data/files/s3:///key",
    ] {
        let router = build_router(store.clone(), allow());
        let response = get(router, uri, None).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert!(response.text().starts_with("Invalid S3 URI format: s3://"));
        assert!(response.text().ends_with("Expected format: s3://bucket/key"));
    }

    assert_eq!(store.call_count(), 0);
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn test_store_fault_is_server_error() {
    let store = Arc::new(MockObjectStore::new().with_fault("connection reset"));
    let router = build_router(store, allow());

    let response = get(router, &files_uri("s3://bucket/key"), None).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Internal Server Error");
}

#[tokio::test]
async fn test_body_failure_after_head_aborts_stream() {
    let store = Arc::new(
        MockObjectStore::new()
            .with_object("bucket", "plate.zarr/0/0.0", b"0123456789")
            .with_broken_body(),
    );
    let router = build_router(store.clone(), allow());

    let request = Request::builder()
        .uri(files_uri("s3://bucket/plate.zarr/0/0.0"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    // The head is final before the first byte
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-length").unwrap(), "10");

    let collected = response.into_body().collect().await;
    assert!(collected.is_err());
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_ranged_body_failure_after_head_aborts_stream() {
    let store = Arc::new(
        MockObjectStore::new()
            .with_object("bucket", "key", b"0123456789")
            .with_broken_body(),
    );
    let router = build_router(store.clone(), allow());

    let request = Request::builder()
        .uri(files_uri("s3://bucket/key"))
        .header("range", "bytes=2-7")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers().get("content-range").unwrap(), "bytes 2-7/10");
    assert!(response.into_body().collect().await.is_err());
    assert_eq!(store.call_count(), 2);
}
