//! Run-time registered package and resource variants.
//!
//! A handler claims descriptors through [`PackageHandler::handles`] /
//! [`ResourceHandler::handles`] and can then change how the claimed entity is
//! built: normalize the descriptor before it is validated, add checks on top
//! of the profile validation, and (for resources) open data streams its own
//! way. Every hook has a default that keeps the built-in behavior.

use crate::factory::{DescriptorPredicate, Flavor};
use datapackage_schema::{Descriptor, ValidationError};
use datapackage_stream::{DataSource, DataStream, StreamError};
use std::path::Path;
use std::sync::Arc;

pub trait PackageHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handles(&self, descriptor: &Descriptor) -> bool;

    /// Adjust a package descriptor before it is first validated.
    fn prepare(&self, _descriptor: &mut Descriptor) {}

    /// Checks run after the profile validation of the package succeeded.
    fn validate(
        &self,
        _descriptor: &Descriptor,
        _base_path: Option<&Path>,
    ) -> Vec<ValidationError> {
        Vec::new()
    }
}

pub trait ResourceHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handles(&self, descriptor: &Descriptor) -> bool;

    fn flavor(&self) -> Flavor {
        Flavor::Default
    }

    /// Adjust a resource descriptor when the resource entity is built.
    fn prepare(&self, _descriptor: &mut Descriptor) {}

    /// Checks run after the profile validation of the resource succeeded.
    fn validate(
        &self,
        _descriptor: &Descriptor,
        _base_path: Option<&Path>,
    ) -> Vec<ValidationError> {
        Vec::new()
    }

    /// Open the stream for one source. `None` opens the flavor's built-in
    /// stream.
    fn open_data_stream(
        &self,
        _descriptor: &Descriptor,
        _source: &DataSource,
    ) -> Option<Result<DataStream, StreamError>> {
        None
    }
}

/// A handler defined by a name, a predicate and, for resources, a flavor.
/// All other hooks keep their defaults.
#[derive(Clone)]
pub struct PredicateHandler {
    name: String,
    flavor: Flavor,
    predicate: DescriptorPredicate,
}

impl PredicateHandler {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Descriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            flavor: Flavor::Default,
            predicate: Arc::new(predicate),
        }
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }
}

impl PackageHandler for PredicateHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        (self.predicate)(descriptor)
    }
}

impl ResourceHandler for PredicateHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        (self.predicate)(descriptor)
    }

    fn flavor(&self) -> Flavor {
        self.flavor
    }
}
