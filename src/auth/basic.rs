//! HTTP Basic authorizer for a single fixed test user.

use async_trait::async_trait;
use axum::http::{header, request::Parts};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::Authorizer;
use crate::error::AuthError;
use crate::path::StorageAddress;

/// Accepts exactly one username/password pair sent as `Authorization: Basic`.
///
/// A valid user may read every address. Meant for test deployments, not
/// for production.
#[derive(Clone)]
pub struct BasicAuthorizer {
    username: String,
    password: String,
}

impl BasicAuthorizer {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn credentials_match(&self, request: &Parts) -> bool {
        let Some((username, password)) = basic_credentials(request) else {
            return false;
        };

        // Compare both halves so timing does not reveal which one failed
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        (user_ok & pass_ok).into()
    }
}

#[async_trait]
impl Authorizer for BasicAuthorizer {
    async fn is_user_valid(&self, request: &Parts) -> Result<bool, AuthError> {
        let valid = self.credentials_match(request);
        if !valid {
            debug!("Basic credentials missing or wrong");
        }
        Ok(valid)
    }

    async fn is_user_authorized(
        &self,
        _address: &StorageAddress,
        request: &Parts,
    ) -> Result<bool, AuthError> {
        Ok(self.credentials_match(request))
    }
}

/// Extract `(username, password)` from an `Authorization: Basic` header.
fn basic_credentials(request: &Parts) -> Option<(String, String)> {
    let value = request.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
