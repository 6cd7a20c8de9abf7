//! Configuration-driven REST client.
//!
//! # Overview
//! Endpoint descriptions are compiled into an [`ApiDefinition`] from a list
//! of records, from YAML/JSON text, or from an OpenAPI / Swagger document.
//! A [`RestClient`] composed with that definition dispatches calls by
//! endpoint name: it fills `{}` path markers from positional arguments,
//! places keyword arguments in the query string or the body as the
//! endpoint's options say, lets an [`Authenticator`] stamp the headers, and
//! sends one request through a [`Transport`].
//!
//! # Design
//! - Every call returns either an [`ApiResponse`] (status in `200..400`) or
//!   a [`CallError`]; anything that touched the network fails as an
//!   [`ApiException`], with `status_code: None` when no response arrived.
//! - The endpoint table is immutable after compilation and shared by every
//!   client composed from the same definition.
//! - The transport is injected. [`UreqTransport`] is the blocking default;
//!   request building and response classification are usable without it.
//!
//! ```no_run
//! use dynrest_core::{ApiDefinition, BaseUrlDescriptor, CallArgs, RestClient};
//! use serde_json::json;
//!
//! let definition = ApiDefinition::from_records(
//!     &[
//!         json!({"path": "/pets", "name": "list_pets"}),
//!         json!({"path": "/pets/{}", "name": "get_pet"}),
//!     ],
//!     BaseUrlDescriptor::new("http://localhost:3000"),
//! )?;
//! let client = RestClient::builder().definition(definition).build()?;
//! let pet = client.call("get_pet", CallArgs::new().arg("42"))?;
//! println!("{}", pet.payload());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod auth;
pub mod client;
pub mod compile;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{ApiKeyHeader, Authenticator, BearerToken, NoAuth, TokenScheme};
pub use client::{BoundEndpoint, CallArgs, RestClient, RestClientBuilder, SANDBOX_ENV};
pub use compile::{ApiDefinition, OpenApiSource};
pub use descriptor::{
    BaseUrlDescriptor, BodyFormat, EndpointDescriptor, EndpointOptions, EndpointTable, ParamsOrData,
};
pub use error::{ApiException, CallError, ConfigError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use response::{classify, ApiResponse};
pub use transport::{Transport, TransportError, UreqTransport};
