//! # Zarr Gateway
//!
//! An authorizing HTTP gateway for chunked array datasets (Zarr-style
//! hierarchies) stored on the local filesystem or in S3-compatible object
//! storage.
//!
//! Browser-based viewers issue many small, concurrent, range-scoped GETs.
//! Each request is resolved to a storage address, checked by an injected
//! authorizer, and answered by streaming exactly the requested bytes; no
//! file or object is ever buffered whole.
//!
//! ## Features
//!
//! - **Dual backend**: `/data/files/tmp/a.zarr/0/0.0` reads a local file,
//!   `/data/files/s3://bucket/a.zarr/0/0.0` reads an S3 object
//! - **Range requests**: single `bytes=` ranges answered with 206 or 416
//! - **Pluggable authorization**: upstream user server, fixed Basic user, or none
//! - **Viewer hosting**: optional static file mount next to the data endpoint
//!
//! ## Architecture
//!
//! - [`path`] - Request path decoding, local/S3 classification, containment checks
//! - [`range`] - Byte-range negotiation
//! - [`storage`] - Local and remote backends behind one stat/stream contract
//! - [`io`] - Object store client abstraction and its S3 implementation
//! - [`auth`] - The [`Authorizer`] capability and its implementations
//! - [`server`] - Axum handlers and router
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zarr_gateway::{create_router, create_s3_client, AllowAll, RouterConfig, S3ObjectStore, Storage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = create_s3_client(None, "us-east-1").await;
//!     let storage = Storage::with_object_store(Arc::new(S3ObjectStore::new(client)));
//!     let router = create_router(storage, Arc::new(AllowAll), RouterConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod range;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use auth::{
    AllowAll, AuthorizationScheme, Authorizer, BasicAuthorizer, FractalServerAuthorizer, User,
};
pub use config::Config;
pub use error::{AuthError, PathError, ServeError, StorageError};
pub use io::{create_s3_client, ByteStream, ObjectBody, ObjectStore, S3ObjectStore};
pub use path::{contains_path, resolve, StorageAddress};
pub use range::{negotiate, ByteWindow, Negotiation, RangeOutcome};
pub use server::{create_router, AppState, RouterConfig};
pub use storage::{LocalBackend, RemoteBackend, Storage, StoredObject};
