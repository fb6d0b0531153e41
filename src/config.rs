//! Configuration management for the gateway.
//!
//! Every option can be given on the command line or through an environment
//! variable; the command line wins.
//!
//! # Environment Variables
//!
//! - `BIND_ADDRESS` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `BASE_PATH` - URL prefix for every route (default: /data)
//! - `AUTHORIZATION_SCHEME` - `fractal-server`, `testing-basic-auth` or `none` (required)
//! - `FRACTAL_SERVER_URL` - Upstream user server (required for `fractal-server`)
//! - `CACHE_EXPIRATION_TIME` - Seconds an upstream answer stays cached (default: 60)
//! - `AUTH_CACHE_SIZE` - Max credentials kept in the auth cache (default: 1000)
//! - `AUTH_COOKIE_NAME` - Session cookie forwarded upstream (default: fastapiusersauth)
//! - `TESTING_USERNAME` / `TESTING_PASSWORD` - Credentials for `testing-basic-auth`
//! - `VIZARR_STATIC_FILES_PATH` - Directory of viewer assets served at `{base}vizarr`
//! - `S3_ENDPOINT` - Custom endpoint for S3-compatible services
//! - `S3_REGION` - AWS region (default: us-east-1)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::Path;

use clap::Parser;
use url::Url;

use crate::auth::{AuthorizationScheme, DEFAULT_AUTH_CACHE_CAPACITY, DEFAULT_SESSION_COOKIE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default URL prefix.
pub const DEFAULT_BASE_PATH: &str = "/data";

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default lifetime of cached upstream auth answers, in seconds.
pub const DEFAULT_CACHE_EXPIRATION_TIME: u64 = 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Zarr Gateway - authorizing HTTP access to array datasets.
///
/// Serves files and chunks from the local filesystem or S3 with HTTP range
/// requests, after checking every request with the configured authorizer.
#[derive(Parser, Debug, Clone)]
#[command(name = "zarr-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BIND_ADDRESS")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// URL prefix for every route, e.g. `/data` serves `/data/files/...`.
    #[arg(long, default_value = DEFAULT_BASE_PATH, env = "BASE_PATH")]
    pub base_path: String,

    // =========================================================================
    // Authorization Configuration
    // =========================================================================
    /// How requests are authenticated and authorized.
    #[arg(long, value_enum, env = "AUTHORIZATION_SCHEME")]
    pub authorization_scheme: AuthorizationScheme,

    /// Base URL of the upstream user server (`fractal-server` scheme).
    #[arg(long, env = "FRACTAL_SERVER_URL")]
    pub fractal_server_url: Option<String>,

    /// Seconds an upstream auth answer stays cached.
    #[arg(long, default_value_t = DEFAULT_CACHE_EXPIRATION_TIME, env = "CACHE_EXPIRATION_TIME")]
    pub cache_expiration_time: u64,

    /// Maximum number of credentials kept in the auth cache.
    #[arg(long, default_value_t = DEFAULT_AUTH_CACHE_CAPACITY, env = "AUTH_CACHE_SIZE")]
    pub auth_cache_size: usize,

    /// Name of the session cookie forwarded to the upstream server.
    #[arg(long, default_value = DEFAULT_SESSION_COOKIE, env = "AUTH_COOKIE_NAME")]
    pub auth_cookie_name: String,

    /// Username accepted by the `testing-basic-auth` scheme.
    #[arg(long, env = "TESTING_USERNAME")]
    pub testing_username: Option<String>,

    /// Password accepted by the `testing-basic-auth` scheme.
    #[arg(long, env = "TESTING_PASSWORD", hide_env_values = true)]
    pub testing_password: Option<String>,

    // =========================================================================
    // Viewer Configuration
    // =========================================================================
    /// Directory with the viewer's static files, served at `{base}vizarr`.
    #[arg(long, env = "VIZARR_STATIC_FILES_PATH")]
    pub vizarr_static_files_path: Option<String>,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.authorization_scheme {
            AuthorizationScheme::FractalServer => {
                self.upstream_url()?;
            }
            AuthorizationScheme::TestingBasicAuth => {
                let has_username = self.testing_username.as_deref().is_some_and(|u| !u.is_empty());
                let has_password = self.testing_password.as_deref().is_some_and(|p| !p.is_empty());
                if !has_username || !has_password {
                    return Err(
                        "The testing-basic-auth scheme needs credentials. \
                         Set TESTING_USERNAME and TESTING_PASSWORD"
                            .to_string(),
                    );
                }
            }
            AuthorizationScheme::None => {}
        }

        if self.auth_cache_size == 0 {
            return Err("auth_cache_size must be greater than 0".to_string());
        }

        if self.auth_cookie_name.is_empty() {
            return Err("auth_cookie_name must not be empty".to_string());
        }

        if let Some(ref viewer_path) = self.vizarr_static_files_path {
            if !Path::new(viewer_path).is_dir() {
                return Err(format!(
                    "VIZARR_STATIC_FILES_PATH is not a directory: {}",
                    viewer_path
                ));
            }
        }

        Ok(())
    }

    /// Parsed upstream user server URL.
    pub fn upstream_url(&self) -> Result<Url, String> {
        let raw = self
            .fractal_server_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                "The fractal-server scheme needs an upstream URL. Set FRACTAL_SERVER_URL"
                    .to_string()
            })?;

        Url::parse(raw).map_err(|e| format!("Invalid FRACTAL_SERVER_URL {:?}: {}", raw, e))
    }

    /// The base path with exactly one leading and one trailing `/`.
    pub fn normalized_base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Normalize a URL prefix to `/segment/.../`; an empty prefix becomes `/`.
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

// =============================================================================
// Tests
// =============================================================================
