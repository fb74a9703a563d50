//! Descriptor model, profile registry and schema validation for data packages.
//!
//! This crate is the leaf layer of the workspace: the mutable JSON
//! [`Descriptor`] every other layer reads and writes, the profile
//! [`Registry`] mapping profile identifiers to bundled or registered JSON
//! schemas, the [`validate_against`] wrapper around the `jsonschema` crate, and
//! the structured [`ValidationError`] report type shared by the validator
//! pipeline.

pub mod descriptor;
pub mod error;
pub mod http;
pub mod registry;
pub mod validate;

pub use descriptor::{is_http_source, is_json_string, Descriptor, DescriptorKind};
pub use error::{ValidationError, ValidationErrorKind, ValidationErrors};
pub use registry::{
    package_equivalent, Registry, RegistryEntry, SchemaLocation, DATA_PACKAGE, DATA_RESOURCE,
    DEFAULT_PROFILE, TABULAR_DATA_PACKAGE, TABULAR_DATA_RESOURCE,
};
pub use validate::{load_schema, pointer_to_property, validate_against, Violation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to find schema file: '{0}'")]
    SchemaNotFound(String),
    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid JSON in '{location}': {reason}")]
    Parse { location: String, reason: String },
    #[error("failed to compile schema '{location}': {reason}")]
    Compile { location: String, reason: String },
    #[error("descriptor must be a JSON object, got {0}")]
    NotAnObject(String),
}
