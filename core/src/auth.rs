//! Authentication strategies.
//!
//! An [`Authenticator`] only ever receives the outgoing header collection.
//! It cannot see the path, method, or body, so each strategy can be tested
//! on its own against a bare [`Headers`] value.

use std::fmt;

use crate::error::ConfigError;
use crate::http::Headers;

const AUTHORIZATION: &str = "Authorization";

/// Stamps credentials onto the headers of an outgoing request.
///
/// Invoked once per call. Implementations hold immutable credential
/// material and can be shared across threads.
pub trait Authenticator: fmt::Debug + Send + Sync {
    fn apply(&self, headers: &mut Headers);
}

/// Sends requests without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn apply(&self, _headers: &mut Headers) {}
}

/// `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if `token` is blank.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = non_blank(token.into(), "Bearer")?;
        Ok(Self { token })
    }
}

impl Authenticator for BearerToken {
    fn apply(&self, headers: &mut Headers) {
        headers.insert(AUTHORIZATION, format!("Bearer {}", self.token));
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken").field("token", &"<redacted>").finish()
    }
}

/// `Authorization: <scheme> <credential>` for schemes such as `Token` or
/// `OAuth` that APIs use instead of `Bearer`.
#[derive(Clone)]
pub struct TokenScheme {
    scheme: String,
    credential: String,
}

impl TokenScheme {
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if `scheme` or
    /// `credential` is blank.
    pub fn new(scheme: impl Into<String>, credential: impl Into<String>) -> Result<Self, ConfigError> {
        let scheme = non_blank(scheme.into(), "Authorization scheme")?;
        let credential = non_blank(credential.into(), "Authorization")?;
        Ok(Self { scheme, credential })
    }
}

impl Authenticator for TokenScheme {
    fn apply(&self, headers: &mut Headers) {
        headers.insert(AUTHORIZATION, format!("{} {}", self.scheme, self.credential));
    }
}

impl fmt::Debug for TokenScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenScheme")
            .field("scheme", &self.scheme)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// API key sent in a dedicated header, e.g. `X-API-Key: <key>`.
#[derive(Clone)]
pub struct ApiKeyHeader {
    header: String,
    key: String,
}

impl ApiKeyHeader {
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if `header` or `key` is blank.
    pub fn new(header: impl Into<String>, key: impl Into<String>) -> Result<Self, ConfigError> {
        let header = non_blank(header.into(), "API key header name")?;
        let key = non_blank(key.into(), "API key")?;
        Ok(Self { header, key })
    }
}

impl Authenticator for ApiKeyHeader {
    fn apply(&self, headers: &mut Headers) {
        headers.insert(self.header.as_str(), self.key.as_str());
    }
}

impl fmt::Debug for ApiKeyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHeader")
            .field("header", &self.header)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn non_blank(value: String, scheme: &'static str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingCredential { scheme });
    }
    Ok(value)
}
