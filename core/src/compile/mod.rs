//! Configuration compilers.
//!
//! # Overview
//! Three front-ends turn endpoint descriptions into one [`ApiDefinition`]:
//! - [`ApiDefinition::from_records`] for an in-memory list of records,
//! - [`ApiDefinition::from_text`] for a YAML or JSON text of that list,
//! - [`ApiDefinition::from_openapi`] for an OpenAPI / Swagger document,
//!   given inline or fetched once through a [`Transport`](crate::Transport).

mod openapi;
mod records;

use std::sync::Arc;

use crate::descriptor::{BaseUrlDescriptor, EndpointDescriptor, EndpointTable};

pub use openapi::{operation_name, split_path_parameter, OpenApiSource, PathParameter};

/// A compiled configuration: the endpoint table plus the base-URL descriptor.
///
/// Cloning is cheap; the table is shared read-only between clones and every
/// client composed from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDefinition {
    endpoints: Arc<EndpointTable>,
    base_url: BaseUrlDescriptor,
}

impl ApiDefinition {
    pub fn new(
        descriptors: impl IntoIterator<Item = EndpointDescriptor>,
        base_url: BaseUrlDescriptor,
    ) -> Self {
        Self {
            endpoints: Arc::new(descriptors.into_iter().collect()),
            base_url,
        }
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    pub fn base_url(&self) -> &BaseUrlDescriptor {
        &self.base_url
    }

    /// Whether `self` and `other` share the same endpoint table allocation.
    pub fn shares_table_with(&self, other: &ApiDefinition) -> bool {
        Arc::ptr_eq(&self.endpoints, &other.endpoints)
    }
}
