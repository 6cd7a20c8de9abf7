//! Normalized endpoint and base-URL descriptors.
//!
//! # Design
//! Every configuration front-end produces the same shapes defined here, so
//! the dispatcher never knows where an endpoint came from. Options that the
//! dispatcher acts on are typed fields; anything else a configuration
//! carries is kept verbatim in `EndpointOptions::extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::http::HttpMethod;

/// Marker a path template uses for one positional argument.
pub const PLACEHOLDER: &str = "{}";

/// Where keyword arguments of a call are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamsOrData {
    /// Query string.
    Params,
    /// Request body.
    Data,
}

impl ParamsOrData {
    /// Convention used when a configuration does not say: GET sends query
    /// parameters, every other verb sends a body.
    pub fn for_method(method: HttpMethod) -> Self {
        if method == HttpMethod::Get {
            ParamsOrData::Params
        } else {
            ParamsOrData::Data
        }
    }
}

/// Encoding of a request body built from keyword arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
}

impl BodyFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            BodyFormat::Json => "application/json",
            BodyFormat::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// Per-endpoint options, fixed when the configuration is compiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointOptions {
    /// Set when the source path template carried a named placeholder.
    pub has_query_params: bool,
    /// Literal name of that placeholder, e.g. `petId`.
    pub query_param_name: Option<String>,
    pub params_or_data: ParamsOrData,
    pub body_format: BodyFormat,
    pub description: Option<String>,
    /// Options this crate does not interpret.
    pub extra: BTreeMap<String, Value>,
}

impl EndpointOptions {
    pub fn for_method(method: HttpMethod) -> Self {
        Self {
            has_query_params: false,
            query_param_name: None,
            params_or_data: ParamsOrData::for_method(method),
            body_format: BodyFormat::default(),
            description: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Options as written in a configuration record, before defaults apply.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawOptions {
    #[serde(default)]
    has_query_params: bool,
    #[serde(default)]
    query_param_name: Option<String>,
    #[serde(default)]
    params_or_data: Option<ParamsOrData>,
    #[serde(default)]
    body_format: Option<BodyFormat>,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl RawOptions {
    pub(crate) fn resolve(self, method: HttpMethod) -> EndpointOptions {
        EndpointOptions {
            has_query_params: self.has_query_params,
            query_param_name: self.query_param_name,
            params_or_data: self
                .params_or_data
                .unwrap_or_else(|| ParamsOrData::for_method(method)),
            body_format: self.body_format.unwrap_or_default(),
            description: self.description,
            extra: self.extra,
        }
    }
}

/// Path-argument count mismatch reported by [`EndpointDescriptor::fill_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathArity {
    pub expected: usize,
    pub given: usize,
}

/// One API operation in normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    path: String,
    name: String,
    method: HttpMethod,
    options: EndpointOptions,
}

impl EndpointDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            method,
            options: EndpointOptions::for_method(method),
        }
    }

    pub fn with_options(mut self, options: EndpointOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Number of `{}` markers in the path template.
    pub fn placeholder_count(&self) -> usize {
        self.path.matches(PLACEHOLDER).count()
    }

    /// Substitute `args` into the `{}` markers in order.
    ///
    /// The number of arguments must equal the number of markers exactly.
    pub fn fill_path<S: AsRef<str>>(&self, args: &[S]) -> Result<String, PathArity> {
        let expected = self.placeholder_count();
        if args.len() != expected {
            return Err(PathArity {
                expected,
                given: args.len(),
            });
        }

        let mut filled = String::with_capacity(self.path.len());
        let mut rest = self.path.as_str();
        for arg in args {
            // Count matched above, so every argument has a marker.
            let Some(at) = rest.find(PLACEHOLDER) else {
                break;
            };
            filled.push_str(&rest[..at]);
            filled.push_str(arg.as_ref());
            rest = &rest[at + PLACEHOLDER.len()..];
        }
        filled.push_str(rest);
        Ok(filled)
    }
}

/// Immutable `name → descriptor` map a client dispatches against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointTable {
    endpoints: BTreeMap<String, EndpointDescriptor>,
}

impl EndpointTable {
    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Endpoint names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.values()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Later descriptors replace earlier ones with the same name.
impl FromIterator<EndpointDescriptor> for EndpointTable {
    fn from_iter<I: IntoIterator<Item = EndpointDescriptor>>(iter: I) -> Self {
        let mut endpoints = BTreeMap::new();
        for descriptor in iter {
            if let Some(previous) = endpoints.insert(descriptor.name.clone(), descriptor) {
                debug!(endpoint = %previous.name, "duplicate endpoint name, keeping the later definition");
            }
        }
        Self { endpoints }
    }
}

/// Production and sandbox root URLs of an API.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseUrlDescriptor {
    base_url: String,
    sandbox_url: Option<String>,
    options: BTreeMap<String, Value>,
}

impl BaseUrlDescriptor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sandbox_url: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_sandbox(mut self, sandbox_url: impl Into<String>) -> Self {
        self.sandbox_url = Some(sandbox_url.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sandbox_url(&self) -> Option<&str> {
        self.sandbox_url.as_deref()
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Root URL to use: the sandbox URL in sandbox mode when one exists,
    /// the production URL otherwise.
    pub fn resolve(&self, sandbox: bool) -> &str {
        match (&self.sandbox_url, sandbox) {
            (Some(url), true) => url,
            _ => &self.base_url,
        }
    }

    /// Join the resolved root with an endpoint path.
    pub fn join(&self, sandbox: bool, path: &str) -> String {
        let root = self.resolve(sandbox).trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            format!("{root}{path}")
        } else {
            format!("{root}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> EndpointDescriptor {
        EndpointDescriptor::new("/widgets/{}", "get_widget", HttpMethod::Get)
    }

    #[test]
    fn fill_path_substitutes_in_order() {
        let descriptor = EndpointDescriptor::new("/shops/{}/widgets/{}", "w", HttpMethod::Get);
        assert_eq!(descriptor.placeholder_count(), 2);
        assert_eq!(descriptor.fill_path(&["7", "42"]).unwrap(), "/shops/7/widgets/42");
    }

    #[test]
    fn fill_path_rejects_too_few_and_too_many() {
        let none: [&str; 0] = [];
        assert_eq!(
            widget().fill_path(&none),
            Err(PathArity {
                expected: 1,
                given: 0
            })
        );
        assert_eq!(
            widget().fill_path(&["1", "2"]),
            Err(PathArity {
                expected: 1,
                given: 2
            })
        );
    }

    #[test]
    fn fill_path_without_markers() {
        let descriptor = EndpointDescriptor::new("/widgets", "list", HttpMethod::Get);
        let none: [&str; 0] = [];
        assert_eq!(descriptor.fill_path(&none).unwrap(), "/widgets");
    }

    #[test]
    fn default_options_follow_method() {
        assert_eq!(widget().options().params_or_data, ParamsOrData::Params);
        let create = EndpointDescriptor::new("/widgets", "create", HttpMethod::Post);
        assert_eq!(create.options().params_or_data, ParamsOrData::Data);
        assert_eq!(create.options().body_format, BodyFormat::Json);
    }

    #[test]
    fn raw_options_keep_explicit_placement_and_extras() {
        let raw: RawOptions = serde_json::from_value(serde_json::json!({
            "params_or_data": "data",
            "paginated": true
        }))
        .unwrap();
        let options = raw.resolve(HttpMethod::Get);
        assert_eq!(options.params_or_data, ParamsOrData::Data);
        assert_eq!(options.extra.get("paginated"), Some(&Value::Bool(true)));
    }

    #[test]
    fn table_keeps_later_duplicate() {
        let table: EndpointTable = [
            EndpointDescriptor::new("/a", "dup", HttpMethod::Get),
            EndpointDescriptor::new("/b", "dup", HttpMethod::Post),
            EndpointDescriptor::new("/c", "other", HttpMethod::Get),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("dup").unwrap().path(), "/b");
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["dup", "other"]);
    }

    #[test]
    fn base_url_prefers_sandbox_only_in_sandbox_mode() {
        let base = BaseUrlDescriptor::new("https://api.example.com")
            .with_sandbox("https://sandbox.example.com");
        assert_eq!(base.resolve(false), "https://api.example.com");
        assert_eq!(base.resolve(true), "https://sandbox.example.com");

        let production_only = BaseUrlDescriptor::new("https://api.example.com");
        assert_eq!(production_only.resolve(true), "https://api.example.com");
    }

    #[test]
    fn join_handles_slashes() {
        let base = BaseUrlDescriptor::new("https://api.example.com/v1/");
        assert_eq!(base.join(false, "/pets"), "https://api.example.com/v1/pets");
        assert_eq!(base.join(false, "pets"), "https://api.example.com/v1/pets");
    }
}
