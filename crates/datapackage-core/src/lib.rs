//! Loading, validating and streaming data packages.
//!
//! The [`Factory`] turns a raw source (descriptor, JSON text, URL or file
//! path) into a validated [`Package`], picking the package and resource
//! variants from the declared profiles and any registered handlers. Packages
//! hand out [`Resource`]s, which in turn open one data stream per declared
//! source. [`Factory::validate`] runs the whole pipeline without ever
//! returning an error: every problem becomes an entry of the report.

pub mod archive;
pub mod factory;
pub mod handler;
pub mod package;
pub mod resource;
pub mod sampling;
pub mod source;
pub mod validator;

pub use archive::{load_archive, save_archive, unpack_archive, DESCRIPTOR_FILE};
pub use factory::{DescriptorPredicate, Factory, Flavor, PackageVariant, ResourceVariant};
pub use handler::{PackageHandler, PredicateHandler, ResourceHandler};
pub use package::Package;
pub use resource::Resource;
pub use sampling::{ValidateOptions, VALIDATE_PEEK_ROWS};
pub use source::Source;

pub use datapackage_schema::{
    Descriptor, Registry, RegistryEntry, ValidationError, ValidationErrorKind, ValidationErrors,
};
pub use datapackage_stream::{DataSource, DataStream, StreamError};

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    LoadFailed(String),
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("Datapackage validation failed: {0}")]
    PackageValidationFailed(ValidationErrors),
    #[error("Resource validation failed: {0}")]
    ResourceValidationFailed(ValidationErrors),
    #[error("couldn't find matching resource with name '{0}'")]
    ResourceNotFound(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("schema error: {0}")]
    Schema(#[from] datapackage_schema::SchemaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Archive(String),
}

impl CoreError {
    /// The structured errors carried by a validation failure, if any.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::PackageValidationFailed(errors) | Self::ResourceValidationFailed(errors) => {
                Some(errors)
            }
            _ => None,
        }
    }
}

/// Load and validate a package with the built-in profiles and handlers.
pub fn load_package(
    source: impl Into<Source>,
    base_path: Option<&Path>,
) -> Result<Package, CoreError> {
    Factory::default().load_package(source, base_path)
}

/// Validate a package source, sampling the default number of rows per data
/// stream. Never fails; problems are returned as the report.
pub fn validate(source: impl Into<Source>, base_path: Option<&Path>) -> Vec<ValidationError> {
    Factory::default().validate(source, base_path, &ValidateOptions::default())
}

/// Build and validate a standalone resource.
pub fn load_resource(
    descriptor: Descriptor,
    base_path: Option<&Path>,
) -> Result<Resource, CoreError> {
    Factory::default().resource(descriptor, base_path, false)
}

/// Build a standalone resource without validating it.
pub fn create_resource(descriptor: Descriptor, base_path: Option<&Path>) -> Resource {
    Factory::default().create_resource(descriptor, base_path)
}
