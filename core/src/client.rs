//! Composed client and per-call dispatch.
//!
//! # Design
//! A `RestClient` is an [`ApiDefinition`] composed with a transport, an
//! authenticator, and default headers. Endpoints are not methods: a name is
//! resolved against the endpoint table into a [`BoundEndpoint`], which fills
//! the path, places keyword arguments, and performs one transport call.
//! Every call starts from scratch; the client holds no per-call state, so it
//! can be shared between threads as-is.
//!
//! `BoundEndpoint::build_request` and [`classify`] are public so callers that
//! own their I/O can build requests and classify responses themselves.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, Span};

use crate::auth::{Authenticator, NoAuth};
use crate::compile::ApiDefinition;
use crate::descriptor::{BodyFormat, EndpointDescriptor, ParamsOrData};
use crate::error::{ApiException, CallError, ConfigError};
use crate::http::{Headers, HttpRequest};
use crate::response::{classify, ApiResponse};
use crate::transport::{Transport, UreqTransport};

/// Environment variable that turns sandbox mode on for
/// [`RestClientBuilder::sandbox_from_env`].
pub const SANDBOX_ENV: &str = "DYNREST_SANDBOX";

/// Operations `RestClient` declares itself.
const DECLARED_MEMBERS: &[&str] = &[
    "base_url",
    "call",
    "definition",
    "endpoint",
    "endpoint_names",
    "is_sandbox",
    "members",
    "prepare",
    "recompose",
];

/// Arguments of one call: positional path arguments, keyword arguments, and
/// header overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<String>,
    keyword: Map<String, Value>,
    headers: Headers,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument for the next `{}` marker.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    pub fn kwargs(mut self, values: Map<String, Value>) -> Self {
        self.keyword.extend(values);
        self
    }

    /// Header for this call only; overrides default and auth headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self) -> &Map<String, Value> {
        &self.keyword
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

/// Builder for a [`RestClient`].
pub struct RestClientBuilder {
    definition: Option<ApiDefinition>,
    transport: Option<Arc<dyn Transport>>,
    auth: Arc<dyn Authenticator>,
    default_headers: Headers,
    sandbox: bool,
}

impl RestClientBuilder {
    fn new() -> Self {
        Self {
            definition: None,
            transport: None,
            auth: Arc::new(NoAuth),
            default_headers: [("Accept", "application/json")].into_iter().collect(),
            sandbox: false,
        }
    }

    /// Compose with `definition`, replacing any definition set earlier.
    pub fn definition(mut self, definition: ApiDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Defaults to [`UreqTransport`] when unset.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to [`NoAuth`] when unset.
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Header sent with every call unless the call overrides it.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn without_default_header(mut self, name: &str) -> Self {
        self.default_headers.remove(name);
        self
    }

    /// Route calls to the sandbox URL when the definition has one.
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Enable sandbox mode when [`SANDBOX_ENV`] is `1`, `true`, `yes` or `on`.
    pub fn sandbox_from_env(self) -> Self {
        let enabled = std::env::var(SANDBOX_ENV).is_ok_and(|value| is_truthy(&value));
        self.sandbox(enabled)
    }

    /// ## Errors
    ///
    /// Returns [`ConfigError::Configuration`] if no definition was composed.
    pub fn build(self) -> Result<RestClient, ConfigError> {
        let definition = self
            .definition
            .ok_or_else(|| ConfigError::Configuration("no API definition was composed".to_string()))?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));

        debug!(
            endpoints = definition.endpoints().len(),
            base_url = definition.base_url().resolve(self.sandbox),
            sandbox = self.sandbox,
            "composed client"
        );
        Ok(RestClient {
            definition,
            transport,
            auth: self.auth,
            default_headers: self.default_headers,
            sandbox: self.sandbox,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Client whose operations come from a compiled [`ApiDefinition`].
#[derive(Clone)]
pub struct RestClient {
    definition: ApiDefinition,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn Authenticator>,
    default_headers: Headers,
    sandbox: bool,
}

impl RestClient {
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    /// Compose `definition` with `transport`, no authentication, and the
    /// default headers.
    pub fn compose(definition: ApiDefinition, transport: impl Transport + 'static) -> Self {
        Self {
            definition,
            transport: Arc::new(transport),
            auth: Arc::new(NoAuth),
            default_headers: RestClientBuilder::new().default_headers,
            sandbox: false,
        }
    }

    /// Replace the endpoint table and base URL wholesale, keeping transport,
    /// authentication, and headers.
    pub fn recompose(mut self, definition: ApiDefinition) -> Self {
        self.definition = definition;
        self
    }

    pub fn definition(&self) -> &ApiDefinition {
        &self.definition
    }

    /// Root URL calls are sent to.
    pub fn base_url(&self) -> &str {
        self.definition.base_url().resolve(self.sandbox)
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    /// Names that can be dispatched, sorted.
    pub fn endpoint_names(&self) -> impl Iterator<Item = &str> {
        self.definition.endpoints().names()
    }

    /// Declared operations and endpoint names together, sorted.
    pub fn members(&self) -> Vec<String> {
        let mut members: Vec<String> = DECLARED_MEMBERS.iter().map(|m| m.to_string()).collect();
        members.extend(self.endpoint_names().map(str::to_string));
        members.sort_unstable();
        members.dedup();
        members
    }

    /// Resolve `name` to a callable endpoint.
    ///
    /// ## Errors
    ///
    /// Returns [`CallError::UnknownEndpoint`] listing the configured names.
    pub fn endpoint(&self, name: &str) -> Result<BoundEndpoint<'_>, CallError> {
        match self.definition.endpoints().get(name) {
            Some(descriptor) => Ok(BoundEndpoint {
                client: self,
                descriptor,
            }),
            None => Err(CallError::UnknownEndpoint {
                name: name.to_string(),
                available: self.endpoint_names().map(str::to_string).collect(),
            }),
        }
    }

    /// Dispatch `name` with `args` and classify the response.
    pub fn call(&self, name: &str, args: CallArgs) -> Result<ApiResponse, CallError> {
        self.endpoint(name)?.call(args)
    }

    /// Build the request `call` would send, without sending it.
    pub fn prepare(&self, name: &str, args: &CallArgs) -> Result<HttpRequest, CallError> {
        self.endpoint(name)?.build_request(args)
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url())
            .field("endpoints", &self.definition.endpoints().len())
            .field("auth", &self.auth)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}

/// An endpoint resolved on a client, ready to be called.
#[derive(Debug, Clone, Copy)]
pub struct BoundEndpoint<'a> {
    client: &'a RestClient,
    descriptor: &'a EndpointDescriptor,
}

impl<'a> BoundEndpoint<'a> {
    pub fn descriptor(&self) -> &'a EndpointDescriptor {
        self.descriptor
    }

    /// Assemble the outgoing request.
    ///
    /// ## Errors
    ///
    /// Returns [`CallError::ArgumentCount`] when the positional arguments do
    /// not match the path markers, and [`CallError::Serialization`] if a
    /// body cannot be encoded.
    pub fn build_request(&self, args: &CallArgs) -> Result<HttpRequest, CallError> {
        let descriptor = self.descriptor;
        let path = descriptor
            .fill_path(args.positional.as_slice())
            .map_err(|arity| CallError::ArgumentCount {
                endpoint: descriptor.name().to_string(),
                expected: arity.expected,
                given: arity.given,
            })?;
        let url = self.client.definition.base_url().join(self.client.sandbox, &path);

        let mut headers = self.client.default_headers.clone();
        self.client.auth.apply(&mut headers);

        let options = descriptor.options();
        let mut query = Vec::new();
        let mut body = None;
        match options.params_or_data {
            ParamsOrData::Params => query = query_pairs(&args.keyword),
            ParamsOrData::Data if args.keyword.is_empty() => {}
            ParamsOrData::Data => {
                body = Some(encode_body(options.body_format, &args.keyword)?);
                headers.insert("Content-Type", options.body_format.content_type());
            }
        }
        headers.merge(&args.headers);

        Ok(HttpRequest {
            method: descriptor.method(),
            url,
            headers,
            query,
            body,
        })
    }

    /// Build the request, send it once, and classify the response.
    #[instrument(
        name = "endpoint_call",
        skip(self, args),
        fields(
            endpoint = %self.descriptor.name(),
            http.method = %self.descriptor.method(),
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub fn call(&self, args: CallArgs) -> Result<ApiResponse, CallError> {
        let request = self.build_request(&args)?;
        Span::current().record("http.url", request.url.as_str());

        let response = match self.client.transport.send(&request) {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "transport failed");
                return Err(ApiException::from(err).into());
            }
        };
        Span::current().record("http.status_code", response.status);
        debug!(status = response.status, "received response");

        Ok(classify(response)?)
    }
}

/// Flatten keyword arguments into query pairs. Nulls are dropped, arrays
/// repeat the key, strings are used verbatim, other values as JSON text.
fn query_pairs(keyword: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(keyword.len());
    for (key, value) in keyword {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| (key.clone(), scalar_text(item))),
            ),
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn encode_body(format: BodyFormat, keyword: &Map<String, Value>) -> Result<String, CallError> {
    match format {
        BodyFormat::Json => Ok(serde_json::to_string(keyword)?),
        BodyFormat::Form => Ok(url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query_pairs(keyword))
            .finish()),
    }
}
