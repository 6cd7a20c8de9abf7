//! Error types for compiling configurations and dispatching calls.
//!
//! # Design
//! Errors are split by the stage that raises them. `ConfigError` is returned
//! while a definition or an authenticator is being constructed and is fatal
//! to composition. `CallError` is returned per dispatch. Anything that
//! reached or attempted the network is an `ApiException`, so callers handle
//! one type whether the transport failed or the server answered non-2xx.

use serde_json::Value;
use thiserror::Error;

use crate::http::Headers;
use crate::transport::TransportError;

/// Failure of a call that reached, or attempted to reach, the network.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "API call failed ({}): {data}",
    .status_code.map_or_else(|| "network error".to_string(), |status| format!("HTTP {status}"))
)]
pub struct ApiException {
    /// Parsed response payload, the raw body, or a description of the
    /// network failure.
    pub data: Value,
    pub headers: Headers,
    /// `None` when no HTTP status was received.
    pub status_code: Option<u16>,
}

impl ApiException {
    /// Exception for a call that never produced an HTTP status.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            data: Value::String(message.into()),
            headers: Headers::new(),
            status_code: None,
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.status_code.is_none()
    }
}

impl From<TransportError> for ApiException {
    fn from(err: TransportError) -> Self {
        ApiException::network(err.to_string())
    }
}

/// Errors raised while compiling an API definition or building a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Contradictory or incomplete compiler input.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("endpoint record {index} is not an object")]
    InvalidRecord { index: usize },

    #[error("endpoint record {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("unsupported HTTP method `{0}`")]
    UnsupportedMethod(String),

    #[error("invalid options for endpoint `{name}`: {source}")]
    InvalidOptions {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("operation `{method} {path}` has no operationId")]
    MissingOperationId { path: String, method: String },

    #[error("API definition does not declare a base URL")]
    MissingBaseUrl,

    #[error("{scheme} credential must not be empty")]
    MissingCredential { scheme: &'static str },

    #[error("failed to parse configuration text: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to fetch API definition: {0}")]
    Fetch(#[from] ApiException),
}

/// Errors raised by a single dispatched call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("no endpoint named `{name}`; available endpoints: {}", .available.join(", "))]
    UnknownEndpoint { name: String, available: Vec<String> },

    #[error("endpoint `{endpoint}` takes {expected} path argument(s) but {given} were supplied")]
    ArgumentCount {
        endpoint: String,
        expected: usize,
        given: usize,
    },

    #[error("failed to encode request payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiException),
}

impl CallError {
    /// The exception carried by a call that reached the transport.
    pub fn as_api_exception(&self) -> Option<&ApiException> {
        match self {
            CallError::Api(exception) => Some(exception),
            _ => None,
        }
    }
}
