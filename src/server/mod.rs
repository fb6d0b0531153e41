//! HTTP server layer for the data gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                GET {base}files/{*path}  (+ Range)               │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (pipeline, error → HTTP) │  │ (base path, CORS, viewer)   │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                 │                    │
//!          path              auth                storage
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{alive_handler, files_handler, AliveResponse, AppState};
pub use routes::{create_router, RouterConfig};
