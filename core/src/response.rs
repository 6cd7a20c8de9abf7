//! Uniform success value and status classification.

use std::ops::Range;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiException;
use crate::http::{Headers, HttpResponse};

/// Status codes treated as success. Redirects the transport did not follow
/// count as success; everything else fails.
pub const SUCCESS_STATUS: Range<u16> = 200..400;

/// Successful outcome of a dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    payload: Value,
    headers: Headers,
    status_code: u16,
}

impl ApiResponse {
    /// Parsed JSON body, or the raw body as a string when it is not JSON.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Decode the payload into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Parse a body as JSON, substituting the raw text when it is not valid JSON.
pub fn parse_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Classify a transport response as success or failure.
///
/// A status of `0` is what some transports report when no response was
/// received; it is mapped to the network-failure exception.
pub fn classify(response: HttpResponse) -> Result<ApiResponse, ApiException> {
    let payload = parse_payload(&response.body);

    if SUCCESS_STATUS.contains(&response.status) {
        return Ok(ApiResponse {
            payload,
            headers: response.headers,
            status_code: response.status,
        });
    }

    Err(ApiException {
        data: payload,
        headers: response.headers,
        status_code: (response.status != 0).then_some(response.status),
    })
}
