//! Upstream user server authorizer tests.
//!
//! A small axum app on an ephemeral port plays the upstream server:
//!
//! - `Bearer good` / cookie `good` - active user
//! - `inactive` - inactive user
//! - `boom` - upstream answers 500
//! - anything else - 401

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, request::Parts, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use url::Url;

use zarr_gateway::path::StorageAddress;
use zarr_gateway::{AuthError, Authorizer, FractalServerAuthorizer};

use super::test_utils::{
    build_router, create_fixture, files_uri, fixture_path, send, MockObjectStore,
};

// =============================================================================
// Fake Upstream
// =============================================================================

#[derive(Clone)]
struct Upstream {
    allowed: Arc<Vec<String>>,
    user_hits: Arc<AtomicUsize>,
    path_hits: Arc<AtomicUsize>,
}

fn token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
    }
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie
        .strip_prefix("fastapiusersauth=")
        .map(str::to_string)
}

async fn current_user(State(upstream): State<Upstream>, headers: HeaderMap) -> Response {
    upstream.user_hits.fetch_add(1, Ordering::SeqCst);
    match token(&headers).as_deref() {
        Some("good") => {
            Json(json!({"id": 1, "email": "good@example.com", "is_active": true})).into_response()
        }
        Some("inactive") => {
            Json(json!({"id": 2, "email": "old@example.com", "is_active": false})).into_response()
        }
        Some("boom") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn allowed_paths(State(upstream): State<Upstream>, headers: HeaderMap) -> Response {
    upstream.path_hits.fetch_add(1, Ordering::SeqCst);
    match token(&headers).as_deref() {
        Some("good") => Json(upstream.allowed.as_ref().clone()).into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Start the fake upstream; returns its URL and the hit counter state.
async fn spawn_upstream(allowed: Vec<String>) -> (Url, Upstream) {
    let upstream = Upstream {
        allowed: Arc::new(allowed),
        user_hits: Arc::new(AtomicUsize::new(0)),
        path_hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/auth/current-user/", get(current_user))
        .route("/auth/current-user/allowed-viewer-paths/", get(allowed_paths))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = Url::parse(&format!("http://{}", addr)).unwrap();
    (url, upstream)
}

fn authorizer(url: Url) -> FractalServerAuthorizer {
    FractalServerAuthorizer::new(url, Duration::from_secs(60), 100)
}

fn bearer(token: &str) -> Parts {
    Request::builder()
        .uri("/data/files/x")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn cookie(token: &str) -> Parts {
    Request::builder()
        .uri("/data/files/x")
        .header(header::COOKIE, format!("fastapiusersauth={}", token))
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn local(path: &str) -> StorageAddress {
    StorageAddress::Local {
        path: path.to_string(),
    }
}

// =============================================================================
// Validity
// =============================================================================

#[tokio::test]
async fn test_active_user_is_valid() {
    let (url, _) = spawn_upstream(vec![]).await;
    let auth = authorizer(url);

    assert!(auth.is_user_valid(&bearer("good")).await.unwrap());
    assert!(auth.is_user_valid(&cookie("good")).await.unwrap());
}

#[tokio::test]
async fn test_rejected_and_inactive_users_are_invalid() {
    let (url, _) = spawn_upstream(vec![]).await;
    let auth = authorizer(url);

    assert!(!auth.is_user_valid(&bearer("stranger")).await.unwrap());
    assert!(!auth.is_user_valid(&bearer("inactive")).await.unwrap());
}

#[tokio::test]
async fn test_missing_credential_skips_upstream() {
    let (url, upstream) = spawn_upstream(vec![]).await;
    let auth = authorizer(url);
    let (parts, _) = Request::builder().uri("/x").body(()).unwrap().into_parts();

    assert!(!auth.is_user_valid(&parts).await.unwrap());
    assert_eq!(upstream.user_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_an_error() {
    let (url, _) = spawn_upstream(vec![]).await;
    let auth = authorizer(url);

    let result = auth.is_user_valid(&bearer("boom")).await;
    assert!(matches!(result, Err(AuthError::Upstream(_))));
}

#[tokio::test]
async fn test_unreachable_upstream_is_an_error() {
    // Bind and drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let auth = authorizer(Url::parse(&format!("http://{}", addr)).unwrap());
    let result = auth.is_user_valid(&bearer("good")).await;
    assert!(matches!(result, Err(AuthError::Upstream(_))));
}

// =============================================================================
// Access
// =============================================================================

#[tokio::test]
async fn test_allowed_paths_are_authorized() {
    let (url, _) = spawn_upstream(vec![
        "/data/project".to_string(),
        "s3://bucket/project".to_string(),
    ])
    .await;
    let auth = authorizer(url);
    let request = bearer("good");

    assert!(auth
        .is_user_authorized(&local("/data/project/plate.zarr/0/0.0"), &request)
        .await
        .unwrap());
    assert!(auth
        .is_user_authorized(
            &StorageAddress::Remote {
                bucket: "bucket".to_string(),
                key: "project/plate.zarr/.zattrs".to_string(),
            },
            &request
        )
        .await
        .unwrap());
}

#[tokio::test]
async fn test_paths_outside_are_not_authorized() {
    let (url, _) = spawn_upstream(vec!["/data/project".to_string()]).await;
    let auth = authorizer(url);
    let request = bearer("good");

    for path in ["/data/other/x", "/data/project-b/x", "/data/project/../other/x"] {
        assert!(
            !auth.is_user_authorized(&local(path), &request).await.unwrap(),
            "path {}",
            path
        );
    }
}

#[tokio::test]
async fn test_rejected_user_has_no_paths() {
    let (url, _) = spawn_upstream(vec!["/data".to_string()]).await;
    let auth = authorizer(url);

    assert!(!auth
        .is_user_authorized(&local("/data/x"), &bearer("stranger"))
        .await
        .unwrap());
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_answers_are_cached_per_credential() {
    let (url, upstream) = spawn_upstream(vec!["/data".to_string()]).await;
    let auth = authorizer(url);

    for _ in 0..3 {
        assert!(auth.is_user_valid(&bearer("good")).await.unwrap());
        assert!(auth
            .is_user_authorized(&local("/data/x"), &bearer("good"))
            .await
            .unwrap());
    }
    assert_eq!(upstream.user_hits.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.path_hits.load(Ordering::SeqCst), 1);

    // A different credential is looked up on its own
    assert!(!auth.is_user_valid(&bearer("stranger")).await.unwrap());
    assert_eq!(upstream.user_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_expires() {
    let (url, upstream) = spawn_upstream(vec![]).await;
    let auth = FractalServerAuthorizer::new(url, Duration::from_millis(50), 100);

    assert!(auth.is_user_valid(&bearer("good")).await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(auth.is_user_valid(&bearer("good")).await.unwrap());

    assert_eq!(upstream.user_hits.load(Ordering::SeqCst), 2);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_gateway_with_upstream_authorizer() {
    let dir = create_fixture();
    let allowed_root = fixture_path(&dir, "directory");
    let (url, _) = spawn_upstream(vec![allowed_root]).await;

    let router = build_router(Arc::new(MockObjectStore::new()), Arc::new(authorizer(url)));
    let allowed = files_uri(&fixture_path(&dir, "directory/foo"));

    let request = |uri: &str, token: Option<&str>| {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    };

    let response = send(router.clone(), request(&allowed, None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(router.clone(), request(&allowed, Some("good"))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"012345");

    // Outside the allowed root: forbidden even though it does not exist
    let outside = files_uri(&fixture_path(&dir, "elsewhere/missing"));
    let response = send(router.clone(), request(&outside, Some("good"))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(router, request(&allowed, Some("boom"))).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}
