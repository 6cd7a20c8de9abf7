//! List-of-records and serialized-text front-ends.

use serde_json::{Map, Value};
use tracing::debug;

use super::ApiDefinition;
use crate::descriptor::{BaseUrlDescriptor, EndpointDescriptor, RawOptions};
use crate::error::ConfigError;
use crate::http::HttpMethod;

impl ApiDefinition {
    /// Compile a list of `{path, name, method?, options?}` records.
    ///
    /// `method` defaults to `GET` and `options` to `{}`. Records sharing a
    /// name are allowed; the later one wins.
    ///
    /// ## Errors
    ///
    /// Returns an error if a record is not an object, lacks a string `path`
    /// or `name`, names an unknown verb, or carries ill-typed options.
    pub fn from_records(records: &[Value], base_url: BaseUrlDescriptor) -> Result<Self, ConfigError> {
        let descriptors = records
            .iter()
            .enumerate()
            .map(|(index, record)| descriptor_from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(endpoints = descriptors.len(), base_url = base_url.base_url(), "compiled endpoint records");
        Ok(Self::new(descriptors, base_url))
    }

    /// Compile a YAML (or JSON) text holding the same list of records.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text does not deserialize into a
    /// list, and any [`from_records`](Self::from_records) error otherwise.
    pub fn from_text(text: &str, base_url: BaseUrlDescriptor) -> Result<Self, ConfigError> {
        let records: Vec<Value> = serde_yaml::from_str(text)?;
        Self::from_records(&records, base_url)
    }
}

fn descriptor_from_record(index: usize, record: &Value) -> Result<EndpointDescriptor, ConfigError> {
    let record = record.as_object().ok_or(ConfigError::InvalidRecord { index })?;
    let path = required_str(record, index, "path")?;
    let name = required_str(record, index, "name")?;

    let method = match record.get("method") {
        None | Some(Value::Null) => HttpMethod::Get,
        Some(Value::String(verb)) => {
            HttpMethod::parse(verb).ok_or_else(|| ConfigError::UnsupportedMethod(verb.clone()))?
        }
        Some(other) => return Err(ConfigError::UnsupportedMethod(other.to_string())),
    };

    let raw = match record.get("options") {
        None | Some(Value::Null) => RawOptions::default(),
        Some(options) => serde_json::from_value(options.clone()).map_err(|source| {
            ConfigError::InvalidOptions {
                name: name.to_string(),
                source,
            }
        })?,
    };

    Ok(EndpointDescriptor::new(path, name, method).with_options(raw.resolve(method)))
}

fn required_str<'a>(
    record: &'a Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingField { index, field })
}
