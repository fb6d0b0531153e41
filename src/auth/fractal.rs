//! Authorizer backed by the upstream user server.
//!
//! # Protocol
//!
//! The caller's credential is forwarded the way it arrived, either as
//! `Authorization: Bearer <token>` or as the session cookie:
//!
//! ```text
//! GET {server}/auth/current-user/                       -> 200 User | 401
//! GET {server}/auth/current-user/allowed-viewer-paths/  -> 200 ["/data/project", "s3://bucket/x"] | 401
//! ```
//!
//! A user is valid when the first call returns an active user. An address
//! is authorized when one of the allowed paths contains it
//! (see [`contains_path`]).
//!
//! # Caching
//!
//! Both answers are cached per credential for the configured TTL. The cache
//! key is the SHA-256 of the credential, so raw tokens are never kept.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, request::Parts, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use super::cache::ExpiringCache;
use super::Authorizer;
use crate::error::AuthError;
use crate::path::{contains_path, StorageAddress};

/// Session cookie set by the upstream server's cookie transport.
pub const DEFAULT_SESSION_COOKIE: &str = "fastapiusersauth";

const CURRENT_USER_ENDPOINT: &str = "auth/current-user/";
const ALLOWED_PATHS_ENDPOINT: &str = "auth/current-user/allowed-viewer-paths/";

/// User record returned by the upstream server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// How the caller presented its token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Credential {
    Bearer(String),
    Cookie(String),
}

impl Credential {
    /// Bearer header first, then the session cookie.
    fn from_request(request: &Parts, cookie_name: &str) -> Option<Self> {
        if let Some(token) = bearer_token(request) {
            return Some(Credential::Bearer(token));
        }
        session_cookie(request, cookie_name).map(Credential::Cookie)
    }

    fn cache_key(&self) -> String {
        let (kind, token) = match self {
            Credential::Bearer(token) => ("bearer", token),
            Credential::Cookie(token) => ("cookie", token),
        };
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b":");
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn attach(&self, request: reqwest::RequestBuilder, cookie_name: &str) -> reqwest::RequestBuilder {
        match self {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::Cookie(token) => {
                request.header(header::COOKIE, format!("{}={}", cookie_name, token))
            }
        }
    }
}

fn bearer_token(request: &Parts) -> Option<String> {
    let value = request.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn session_cookie(request: &Parts, cookie_name: &str) -> Option<String> {
    request
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Authorizer that asks the upstream user server.
pub struct FractalServerAuthorizer {
    client: reqwest::Client,
    server_url: Url,
    cookie_name: String,
    users: ExpiringCache<Option<User>>,
    allowed_paths: ExpiringCache<Arc<Vec<String>>>,
}

impl FractalServerAuthorizer {
    /// Create an authorizer for `server_url` caching answers for `ttl`.
    pub fn new(server_url: Url, ttl: Duration, max_entries: usize) -> Self {
        Self::with_client(reqwest::Client::new(), server_url, ttl, max_entries)
    }

    /// Same as [`new`](Self::new) with a caller-supplied HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        mut server_url: Url,
        ttl: Duration,
        max_entries: usize,
    ) -> Self {
        // Url::join replaces the last segment unless the base ends with '/'
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        Self {
            client,
            server_url,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            users: ExpiringCache::new(max_entries, ttl),
            allowed_paths: ExpiringCache::new(max_entries, ttl),
        }
    }

    /// Read the session token from a different cookie.
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Current user for a credential, `None` if the upstream rejects it.
    async fn current_user(&self, credential: &Credential) -> Result<Option<User>, AuthError> {
        let cache_key = credential.cache_key();
        if let Some(user) = self.users.get(&cache_key).await {
            return Ok(user);
        }

        let user = self.get_json::<User>(CURRENT_USER_ENDPOINT, credential).await?;
        self.users.insert(cache_key, user.clone()).await;
        Ok(user)
    }

    /// Path prefixes the credential's user may read; empty if rejected.
    async fn user_allowed_paths(
        &self,
        credential: &Credential,
    ) -> Result<Arc<Vec<String>>, AuthError> {
        let cache_key = credential.cache_key();
        if let Some(paths) = self.allowed_paths.get(&cache_key).await {
            return Ok(paths);
        }

        let paths = self
            .get_json::<Vec<String>>(ALLOWED_PATHS_ENDPOINT, credential)
            .await?
            .unwrap_or_default();
        let paths = Arc::new(paths);
        self.allowed_paths.insert(cache_key, Arc::clone(&paths)).await;
        Ok(paths)
    }

    /// GET an upstream endpoint; 401/403 map to `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        credential: &Credential,
    ) -> Result<Option<T>, AuthError> {
        let url = self
            .server_url
            .join(endpoint)
            .map_err(|e| AuthError::Upstream(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let request = credential.attach(self.client.get(url.clone()), &self.cookie_name);
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("GET {} failed: {}", url, e)))?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| AuthError::InvalidResponse(format!("GET {}: {}", url, e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(url = %url, status = response.status().as_u16(), "Upstream rejected credential");
                Ok(None)
            }
            status => {
                warn!(url = %url, status = status.as_u16(), "Unexpected upstream status");
                Err(AuthError::Upstream(format!(
                    "GET {} returned {}",
                    url,
                    status.as_u16()
                )))
            }
        }
    }
}

#[async_trait]
impl Authorizer for FractalServerAuthorizer {
    async fn is_user_valid(&self, request: &Parts) -> Result<bool, AuthError> {
        let Some(credential) = Credential::from_request(request, &self.cookie_name) else {
            debug!("No credential in request");
            return Ok(false);
        };

        let user = self.current_user(&credential).await?;
        Ok(user.map(|u| u.is_active).unwrap_or(false))
    }

    async fn is_user_authorized(
        &self,
        address: &StorageAddress,
        request: &Parts,
    ) -> Result<bool, AuthError> {
        let Some(credential) = Credential::from_request(request, &self.cookie_name) else {
            return Ok(false);
        };

        let target = address.to_string();
        let allowed = self.user_allowed_paths(&credential).await?;
        Ok(allowed.iter().any(|root| contains_path(root, &target)))
    }
}
