//! OpenAPI / Swagger front-end.
//!
//! Each `paths → {verb → operation}` entry becomes one endpoint. Only the
//! first `{...}` placeholder of a path is normalized to a positional `{}`
//! marker; later placeholders are left in the template verbatim.

use serde_json::Value;
use tracing::{debug, trace};

use super::ApiDefinition;
use crate::descriptor::{BaseUrlDescriptor, EndpointDescriptor, EndpointOptions, ParamsOrData};
use crate::error::ConfigError;
use crate::http::{HttpMethod, HttpRequest};
use crate::response::classify;
use crate::transport::Transport;

/// Path-item keys that describe the path rather than an operation.
const PATH_ITEM_FIELDS: &[&str] = &["summary", "description", "servers", "$ref"];

/// Where to read an OpenAPI document from.
///
/// Exactly one of `definition` and `url` must be set.
#[derive(Debug, Clone, Default)]
pub struct OpenApiSource {
    definition: Option<Value>,
    url: Option<String>,
    base_url: Option<BaseUrlDescriptor>,
}

impl OpenApiSource {
    pub fn new(definition: Option<Value>, url: Option<String>) -> Self {
        Self {
            definition,
            url,
            base_url: None,
        }
    }

    pub fn from_definition(definition: Value) -> Self {
        Self::new(Some(definition), None)
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(None, Some(url.into()))
    }

    /// Use `base_url` instead of the servers declared by the document.
    pub fn with_base_url(mut self, base_url: BaseUrlDescriptor) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// A path template split at its first `{name}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    /// Template with the first placeholder replaced by `{}`.
    pub path: String,
    /// Name found between the braces, if any.
    pub name: Option<String>,
}

/// Replace the first `{name}` in `template` with `{}` and return the name.
pub fn split_path_parameter(template: &str) -> PathParameter {
    if let Some(open) = template.find('{') {
        if let Some(len) = template[open + 1..].find('}') {
            let close = open + 1 + len;
            return PathParameter {
                path: format!("{}{{}}{}", &template[..open], &template[close + 1..]),
                name: Some(template[open + 1..close].to_string()),
            };
        }
    }
    PathParameter {
        path: template.to_string(),
        name: None,
    }
}

/// Convert an `operationId` such as `getPetById` into `get_pet_by_id`.
///
/// The first character is lowercased; every later uppercase letter becomes
/// `_` followed by its lowercase form. Runs of capitals are not collapsed:
/// `getHTTPStatus` becomes `get_h_t_t_p_status`.
pub fn operation_name(operation_id: &str) -> String {
    let mut chars = operation_id.chars();
    let mut name = String::with_capacity(operation_id.len() + 8);
    if let Some(first) = chars.next() {
        name.extend(first.to_lowercase());
    }
    for c in chars {
        if c.is_uppercase() {
            name.push('_');
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

impl ApiDefinition {
    /// Compile an OpenAPI 3 or Swagger 2 document.
    ///
    /// When `source` carries a URL the document is fetched with a single GET
    /// through `transport` and parsed as JSON, or as YAML when it is not JSON.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::Configuration`] if both or neither of definition and
    ///   URL are supplied, or the document has no `paths` object
    /// - [`ConfigError::Fetch`] if the fetch fails or returns a failure status
    /// - [`ConfigError::Parse`] if the fetched body is neither JSON nor YAML
    /// - [`ConfigError::MissingOperationId`] / [`ConfigError::UnsupportedMethod`]
    ///   for malformed operations
    /// - [`ConfigError::MissingBaseUrl`] if no base URL can be determined
    pub fn from_openapi(source: OpenApiSource, transport: &dyn Transport) -> Result<Self, ConfigError> {
        let (document, fetched_from) = match (source.definition, source.url) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Configuration(
                    "supply either an OpenAPI definition or a URL to fetch it from, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Configuration(
                    "an OpenAPI definition or a URL to fetch it from is required".to_string(),
                ))
            }
            (Some(definition), None) => (definition, None),
            (None, Some(url)) => (fetch_document(&url, transport)?, Some(url)),
        };

        let descriptors = descriptors_from_document(&document)?;
        let base_url = match source.base_url {
            Some(base_url) => base_url,
            None => base_url_from_document(&document, fetched_from.as_deref())?,
        };

        debug!(
            endpoints = descriptors.len(),
            base_url = base_url.base_url(),
            fetched = fetched_from.is_some(),
            "compiled OpenAPI definition"
        );
        Ok(Self::new(descriptors, base_url))
    }
}

fn fetch_document(url: &str, transport: &dyn Transport) -> Result<Value, ConfigError> {
    let mut request = HttpRequest::get(url);
    request
        .headers
        .insert("Accept", "application/json, application/yaml;q=0.9");

    let response = transport
        .send(&request)
        .map_err(crate::error::ApiException::from)?;
    match classify(response)?.into_payload() {
        Value::String(text) => Ok(serde_yaml::from_str(&text)?),
        document => Ok(document),
    }
}

fn descriptors_from_document(document: &Value) -> Result<Vec<EndpointDescriptor>, ConfigError> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ConfigError::Configuration("OpenAPI definition has no `paths` object".to_string()))?;

    let mut descriptors = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            trace!(path = %path, "skipping path item that is not an object");
            continue;
        };
        for (verb, operation) in item {
            if verb == "parameters" {
                trace!(path = %path, "skipping shared parameters entry");
                continue;
            }
            if PATH_ITEM_FIELDS.contains(&verb.as_str()) || verb.starts_with("x-") {
                continue;
            }
            let method = HttpMethod::parse(verb).ok_or_else(|| ConfigError::UnsupportedMethod(verb.clone()))?;
            descriptors.push(descriptor_from_operation(path, method, operation)?);
        }
    }
    Ok(descriptors)
}

fn descriptor_from_operation(
    path: &str,
    method: HttpMethod,
    operation: &Value,
) -> Result<EndpointDescriptor, ConfigError> {
    let operation_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::MissingOperationId {
            path: path.to_string(),
            method: method.to_string(),
        })?;

    let PathParameter { path: template, name } = split_path_parameter(path);
    let description = operation
        .get("description")
        .or_else(|| operation.get("summary"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut options = EndpointOptions::for_method(method);
    options.has_query_params = name.is_some();
    options.query_param_name = name;
    options.params_or_data = ParamsOrData::for_method(method);
    options.description = description;
    options
        .extra
        .insert("operation_id".to_string(), Value::String(operation_id.to_string()));

    Ok(EndpointDescriptor::new(template, operation_name(operation_id), method).with_options(options))
}

fn base_url_from_document(document: &Value, fetched_from: Option<&str>) -> Result<BaseUrlDescriptor, ConfigError> {
    // OpenAPI 3
    if let Some(server) = document.pointer("/servers/0/url").and_then(Value::as_str) {
        return resolve_against(server, fetched_from).map(BaseUrlDescriptor::new);
    }

    // Swagger 2
    let base_path = document.get("basePath").and_then(Value::as_str).unwrap_or("");
    match document.get("host").and_then(Value::as_str) {
        Some(host) => {
            let scheme = document
                .pointer("/schemes/0")
                .and_then(Value::as_str)
                .unwrap_or("https");
            Ok(BaseUrlDescriptor::new(format!("{scheme}://{host}{base_path}")))
        }
        None if fetched_from.is_some() => {
            let base_path = if base_path.is_empty() { "/" } else { base_path };
            resolve_against(base_path, fetched_from).map(BaseUrlDescriptor::new)
        }
        None => Err(ConfigError::MissingBaseUrl),
    }
}

/// Resolve a possibly relative server URL against the document's own URL.
fn resolve_against(server: &str, fetched_from: Option<&str>) -> Result<String, ConfigError> {
    if url::Url::parse(server).is_ok() {
        return Ok(server.to_string());
    }
    let Some(document_url) = fetched_from else {
        return Err(ConfigError::MissingBaseUrl);
    };
    url::Url::parse(document_url)
        .and_then(|base| base.join(server))
        .map(|joined| joined.to_string())
        .map_err(|e| ConfigError::Configuration(format!("cannot resolve server URL `{server}`: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::HttpResponse;
    use crate::test_support::SpyTransport;
    use crate::transport::TransportError;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.3",
            "servers": [{"url": "https://petstore.example.com/v1"}],
            "paths": {
                "/pets": {
                    "get": {"operationId": "listPets", "summary": "List all pets"},
                    "post": {"operationId": "createPet"}
                },
                "/pets/{petId}": {
                    "parameters": [{"name": "petId", "in": "path", "required": true}],
                    "get": {"operationId": "getPetById", "description": "Info for a specific pet"},
                    "delete": {"operationId": "deletePet"}
                }
            }
        })
    }

    fn compile(document: Value) -> Result<ApiDefinition, ConfigError> {
        let unused = SpyTransport::replying(HttpResponse::new(500, ""));
        ApiDefinition::from_openapi(OpenApiSource::from_definition(document), &unused)
    }

    #[test]
    fn path_parameter_is_extracted() {
        let def = compile(petstore()).unwrap();
        let get = def.endpoints().get("get_pet_by_id").unwrap();
        assert_eq!(get.method(), HttpMethod::Get);
        assert_eq!(get.path(), "/pets/{}");
        assert_eq!(get.placeholder_count(), 1);
        assert!(get.options().has_query_params);
        assert_eq!(get.options().query_param_name.as_deref(), Some("petId"));
        assert_eq!(get.options().params_or_data, ParamsOrData::Params);
        assert_eq!(get.options().description.as_deref(), Some("Info for a specific pet"));
        assert_eq!(get.options().extra.get("operation_id"), Some(&json!("getPetById")));
    }

    #[test]
    fn parameters_key_is_not_an_operation() {
        let def = compile(petstore()).unwrap();
        let mut names: Vec<_> = def.endpoints().names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["create_pet", "delete_pet", "get_pet_by_id", "list_pets"]);
        assert!(def.endpoints().iter().all(|e| !e.name().contains("parameters")));
    }

    #[test]
    fn placement_is_fixed_by_verb() {
        let def = compile(petstore()).unwrap();
        let list = def.endpoints().get("list_pets").unwrap();
        assert!(!list.options().has_query_params);
        assert_eq!(list.options().query_param_name, None);
        assert_eq!(list.options().params_or_data, ParamsOrData::Params);
        assert_eq!(list.options().description.as_deref(), Some("List all pets"));
        let delete = def.endpoints().get("delete_pet").unwrap();
        assert_eq!(delete.method(), HttpMethod::Delete);
        assert_eq!(delete.options().params_or_data, ParamsOrData::Data);
    }

    #[test]
    fn only_first_placeholder_is_normalized() {
        let split = split_path_parameter("/owners/{ownerId}/pets/{petId}");
        assert_eq!(split.path, "/owners/{}/pets/{petId}");
        assert_eq!(split.name.as_deref(), Some("ownerId"));

        let plain = split_path_parameter("/pets");
        assert_eq!(plain.path, "/pets");
        assert_eq!(plain.name, None);
    }

    #[test]
    fn operation_names_follow_capital_letters() {
        assert_eq!(operation_name("getPetById"), "get_pet_by_id");
        assert_eq!(operation_name("ListPets"), "list_pets");
        assert_eq!(operation_name("getHTTPStatus"), "get_h_t_t_p_status");
        assert_eq!(operation_name("health"), "health");
        assert_eq!(operation_name(""), "");
    }

    #[test]
    fn neither_source_is_configuration_error() {
        let spy = SpyTransport::replying(HttpResponse::new(200, "{}"));
        let err = ApiDefinition::from_openapi(OpenApiSource::new(None, None), &spy).unwrap_err();
        assert!(matches!(err, ConfigError::Configuration(_)));
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn both_sources_is_configuration_error() {
        let spy = SpyTransport::replying(HttpResponse::new(200, "{}"));
        let source = OpenApiSource::new(Some(petstore()), Some("https://petstore.example.com/openapi.json".to_string()));
        let err = ApiDefinition::from_openapi(source, &spy).unwrap_err();
        assert!(matches!(err, ConfigError::Configuration(_)));
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn url_source_fetches_once() {
        let spy = SpyTransport::replying(HttpResponse::new(200, petstore().to_string()));
        let def = ApiDefinition::from_openapi(
            OpenApiSource::from_url("https://petstore.example.com/openapi.json"),
            &spy,
        )
        .unwrap();
        assert_eq!(def.endpoints().len(), 4);

        let requests = spy.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "https://petstore.example.com/openapi.json");
    }

    #[test]
    fn yaml_document_is_accepted() {
        let yaml = "\
swagger: '2.0'
host: api.example.com
basePath: /v2
schemes: [http]
paths:
  /users/{userId}:
    put:
      operationId: updateUser
";
        let spy = SpyTransport::replying(HttpResponse::new(200, yaml));
        let def = ApiDefinition::from_openapi(OpenApiSource::from_url("http://api.example.com/swagger.yaml"), &spy)
            .unwrap();
        let update = def.endpoints().get("update_user").unwrap();
        assert_eq!(update.method(), HttpMethod::Put);
        assert_eq!(update.path(), "/users/{}");
        assert_eq!(def.base_url().base_url(), "http://api.example.com/v2");
    }

    #[test]
    fn failed_fetch_is_reported() {
        let spy = SpyTransport::failing(TransportError::Connection("refused".to_string()));
        let err = ApiDefinition::from_openapi(OpenApiSource::from_url("http://127.0.0.1:9/openapi.json"), &spy)
            .unwrap_err();
        match err {
            ConfigError::Fetch(exception) => assert!(exception.is_network_error()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fetch_with_failure_status_is_reported() {
        let spy = SpyTransport::replying(HttpResponse::new(404, r#"{"error":"not found"}"#));
        let err = ApiDefinition::from_openapi(OpenApiSource::from_url("http://api.example.com/openapi.json"), &spy)
            .unwrap_err();
        match err {
            ConfigError::Fetch(exception) => assert_eq!(exception.status_code, Some(404)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn relative_server_url_resolves_against_fetch_url() {
        let document = json!({
            "servers": [{"url": "/api"}],
            "paths": {"/ping": {"get": {"operationId": "ping"}}}
        });
        let spy = SpyTransport::replying(HttpResponse::new(200, document.to_string()));
        let def = ApiDefinition::from_openapi(OpenApiSource::from_url("http://localhost:8080/docs/openapi.json"), &spy)
            .unwrap();
        assert_eq!(def.base_url().base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn base_url_override_wins() {
        let source = OpenApiSource::from_definition(petstore())
            .with_base_url(BaseUrlDescriptor::new("http://localhost:3000").with_sandbox("http://localhost:3001"));
        let def = ApiDefinition::from_openapi(source, &SpyTransport::replying(HttpResponse::new(500, ""))).unwrap();
        assert_eq!(def.base_url().base_url(), "http://localhost:3000");
        assert_eq!(def.base_url().sandbox_url(), Some("http://localhost:3001"));
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let err = compile(json!({"paths": {}})).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseUrl));
    }

    #[test]
    fn missing_paths_is_rejected() {
        let err = compile(json!({"servers": [{"url": "https://x.example.com"}]})).unwrap_err();
        assert!(matches!(err, ConfigError::Configuration(_)));
    }

    #[test]
    fn missing_operation_id_is_rejected() {
        let err = compile(json!({
            "servers": [{"url": "https://x.example.com"}],
            "paths": {"/a": {"get": {"summary": "no id"}}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingOperationId { ref method, .. } if method == "GET"));
    }

    #[test]
    fn path_item_metadata_is_skipped_but_unknown_keys_are_not() {
        let def = compile(json!({
            "servers": [{"url": "https://x.example.com"}],
            "paths": {"/a": {
                "summary": "A",
                "x-internal": true,
                "get": {"operationId": "getA"}
            }}
        }))
        .unwrap();
        assert_eq!(def.endpoints().names().collect::<Vec<_>>(), vec!["get_a"]);

        let err = compile(json!({
            "servers": [{"url": "https://x.example.com"}],
            "paths": {"/a": {"fetch": {"operationId": "fetchA"}}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedMethod(ref verb) if verb == "fetch"));
    }
}
