//! HTTP request handlers for the data gateway.
//!
//! # Endpoints
//!
//! - `GET {base}files/{*path}` - Stream a local file or S3 object, honoring `Range`
//! - `GET {base}alive` - Liveness probe
//!
//! # Request pipeline
//!
//! ```text
//! resolve ──▶ is_user_valid ──▶ is_user_authorized ──▶ stat ──▶ negotiate ──▶ stream
//!   400            401                 403            404/400      416
//! ```
//!
//! Every step short-circuits with a [`ServeError`]; anything unexpected is a
//! 500. Nothing about the file system is revealed before both authorization
//! checks pass.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, trace, Instrument};

use crate::auth::Authorizer;
use crate::error::{PathError, ServeError, StorageError};
use crate::path::resolve;
use crate::range::negotiate;
use crate::storage::Storage;

/// Content type of every data response.
const OCTET_STREAM: &str = "application/octet-stream";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state: the storage backends and the authorizer.
///
/// Both are process-lifetime and read-only; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    pub fn new(storage: Storage, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            storage,
            authorizer,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Liveness probe response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AliveResponse {
    pub alive: bool,
    pub version: String,
}

// =============================================================================
// Error Handling
// =============================================================================

impl ServeError {
    /// The single HTTP status this error resolves to.
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Path(_) => StatusCode::BAD_REQUEST,
            ServeError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServeError::Forbidden => StatusCode::FORBIDDEN,
            ServeError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServeError::Storage(StorageError::IsDirectory(_)) => StatusCode::BAD_REQUEST,
            ServeError::Storage(StorageError::Io(_) | StorageError::S3(_)) | ServeError::Auth(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Plain-text body sent to the client.
    ///
    /// Only the invalid S3 address message echoes the request; nothing else
    /// carries paths, credentials or backend details.
    fn public_message(&self) -> String {
        match self {
            ServeError::Path(err @ PathError::InvalidAddress(_)) => err.to_string(),
            ServeError::Path(PathError::BadEncoding) => "Bad Request".to_string(),
            ServeError::Unauthenticated => "Unauthorized".to_string(),
            ServeError::Forbidden => "Forbidden".to_string(),
            ServeError::Storage(StorageError::NotFound(_)) => "Not Found".to_string(),
            ServeError::Storage(StorageError::IsDirectory(_)) => "Is directory".to_string(),
            ServeError::Storage(_) | ServeError::Auth(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log errors based on severity
        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", self);
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            info!(status = status.as_u16(), "Access denied: {}", self);
        } else {
            debug!(status = status.as_u16(), "Client error: {}", self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `GET {base}files/{*path}`.
///
/// Mounted under `{base}files`, so the request URI seen here is the raw,
/// still percent-encoded remainder (e.g. `/s3%3A%2F%2Fbucket%2Fkey`).
/// `HEAD` runs the same pipeline and axum drops the body.
pub async fn files_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let raw_path = parts.uri.path().to_string();
    let span = info_span!("files", path = %raw_path);

    async move {
        match serve(&state, &raw_path, &parts).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Run the request pipeline up to the response head.
async fn serve(state: &AppState, raw_path: &str, parts: &Parts) -> Result<Response, ServeError> {
    let address = resolve(raw_path)?;

    if !state.authorizer.is_user_valid(parts).await? {
        return Err(ServeError::Unauthenticated);
    }
    if !state.authorizer.is_user_authorized(&address, parts).await? {
        return Err(ServeError::Forbidden);
    }

    let object = state.storage.stat(&address).await?;

    let range_header = parts
        .headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());
    let negotiation = negotiate(range_header, object.size());
    let mut headers = negotiation.headers();

    if !negotiation.has_body() {
        debug!(
            address = %address,
            range = range_header.unwrap_or_default(),
            size = negotiation.total_size,
            "Range not satisfiable"
        );
        return Ok((negotiation.status(), headers).into_response());
    }

    trace!(address = %address, window = ?negotiation.window(), size = negotiation.total_size, "Streaming");

    let stream = object.open_stream(negotiation.window()).await?;
    let target = address.to_string();
    let stream = stream.inspect_err(move |err| {
        // Status and headers are already sent; the connection is cut
        error!(address = %target, error = %err, "Stream aborted after response head");
    });

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    Ok((negotiation.status(), headers, Body::from_stream(stream)).into_response())
}

/// Liveness probe.
///
/// Returns a simple JSON response indicating the server is up. Not
/// authenticated.
pub async fn alive_handler() -> Json<AliveResponse> {
    Json(AliveResponse {
        alive: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
