//! Router configuration for the data gateway.
//!
//! # Route Structure
//!
//! ```text
//! {base}alive             - Liveness probe (public)
//! {base}files/{*path}     - Data endpoint (authorized per request)
//! {base}vizarr/...        - Viewer static files (optional)
//! ```
//!
//! `{base}` is the configured base path, normalized to `/.../` (default `/data/`).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zarr_gateway::auth::AllowAll;
//! use zarr_gateway::server::{create_router, RouterConfig};
//! use zarr_gateway::storage::Storage;
//!
//! let storage = Storage::with_object_store(store);
//! let config = RouterConfig::new("/data")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(storage, Arc::new(AllowAll), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{ACCEPT_RANGES, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{alive_handler, files_handler, AppState};
use crate::auth::Authorizer;
use crate::config::{normalize_base_path, DEFAULT_BASE_PATH};
use crate::storage::Storage;

/// Path segment under the base path where viewer assets are mounted.
pub const VIEWER_MOUNT: &str = "vizarr";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// URL prefix for every route
    pub base_path: String,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Directory served at `{base}vizarr`, if any
    pub viewer_static_files_path: Option<PathBuf>,
}

impl RouterConfig {
    /// Create a router configuration mounted at `base_path`.
    ///
    /// By default CORS allows any origin, tracing is enabled and no viewer
    /// is mounted.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            cors_origins: None,
            enable_tracing: true,
            viewer_static_files_path: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Serve the viewer's static files from `path`.
    pub fn with_viewer(mut self, path: impl Into<PathBuf>) -> Self {
        self.viewer_static_files_path = Some(path.into());
        self
    }

    /// Normalized base path, always `/` or `/.../`.
    pub fn base(&self) -> String {
        normalize_base_path(&self.base_path)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PATH)
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router(
    storage: Storage,
    authorizer: Arc<dyn Authorizer>,
    config: RouterConfig,
) -> Router {
    let base = config.base();
    let app_state = AppState::new(storage, authorizer);

    // Nested so the handler sees only the still-encoded path after `files`
    let file_routes = Router::new()
        .route("/{*path}", get(files_handler))
        .with_state(app_state);

    let mut router = Router::new()
        .route(&format!("{}alive", base), get(alive_handler))
        .nest(&format!("{}files", base), file_routes);

    if let Some(ref viewer_path) = config.viewer_static_files_path {
        let mount = format!("{}{}", base, VIEWER_MOUNT);
        router = router.nest_service(&mount, ServeDir::new(viewer_path));
    }

    let router = router.layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, RANGE])
        .expose_headers([ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
