//! Authorization capability.
//!
//! The data handler never decides who may read what. It asks an injected
//! [`Authorizer`] two questions, in order:
//!
//! 1. [`Authorizer::is_user_valid`]: is the caller a known, active user? (401 if not)
//! 2. [`Authorizer::is_user_authorized`]: may this user read this address? (403 if not)
//!
//! Three implementations are provided, selected by [`AuthorizationScheme`]:
//!
//! | scheme               | implementation              |
//! |----------------------|-----------------------------|
//! | `fractal-server`     | [`FractalServerAuthorizer`] |
//! | `testing-basic-auth` | [`BasicAuthorizer`]         |
//! | `none`               | [`AllowAll`]                |

mod basic;
mod cache;
mod fractal;

use async_trait::async_trait;
use axum::http::request::Parts;
use clap::ValueEnum;

use crate::error::AuthError;
use crate::path::StorageAddress;

pub use basic::BasicAuthorizer;
pub use cache::{ExpiringCache, DEFAULT_AUTH_CACHE_CAPACITY};
pub use fractal::{FractalServerAuthorizer, User, DEFAULT_SESSION_COOKIE};

/// Decides whether a request may read a storage address.
///
/// Implementations are shared by every in-flight request and must not rely
/// on per-request mutation. Any caching they do is internal.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether the request comes from a valid user.
    async fn is_user_valid(&self, request: &Parts) -> Result<bool, AuthError>;

    /// Whether the request's user may read `address`.
    async fn is_user_authorized(
        &self,
        address: &StorageAddress,
        request: &Parts,
    ) -> Result<bool, AuthError>;
}

/// Supported authorization schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthorizationScheme {
    /// Delegate to the upstream user server
    #[value(name = "fractal-server")]
    FractalServer,

    /// A single fixed user with HTTP Basic credentials
    #[value(name = "testing-basic-auth")]
    TestingBasicAuth,

    /// No authorization at all
    #[value(name = "none")]
    None,
}

impl std::fmt::Display for AuthorizationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthorizationScheme::FractalServer => "fractal-server",
            AuthorizationScheme::TestingBasicAuth => "testing-basic-auth",
            AuthorizationScheme::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Lets every request through.
///
/// **Warning**: only for local development and testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn is_user_valid(&self, _request: &Parts) -> Result<bool, AuthError> {
        Ok(true)
    }

    async fn is_user_authorized(
        &self,
        _address: &StorageAddress,
        _request: &Parts,
    ) -> Result<bool, AuthError> {
        Ok(true)
    }
}
