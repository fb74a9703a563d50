//! Profile-driven construction of packages and resources.

use crate::handler::{PackageHandler, PredicateHandler, ResourceHandler};
use crate::source::{load_source, Source};
use crate::validator::{validate_package_with, validate_resource};
use crate::{CoreError, Package, Resource};
use datapackage_schema::{
    Descriptor, DescriptorKind, Registry, ValidationError, DATA_PACKAGE, DATA_RESOURCE,
    TABULAR_DATA_PACKAGE, TABULAR_DATA_RESOURCE,
};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Decides whether a registered handler takes a descriptor.
pub type DescriptorPredicate = Arc<dyn Fn(&Descriptor) -> bool + Send + Sync>;

/// How a resource's data sources are streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// Raw lines, or the elements of inline data.
    #[default]
    Default,
    /// Typed records under the resource's table schema.
    Tabular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageVariant {
    Default,
    Tabular,
    /// A profile no built-in variant or registered handler claims.
    Custom,
    /// Claimed by the registered handler of that name.
    Registered(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceVariant {
    Default,
    Tabular,
    Custom,
    Registered(String),
}

/// Resolution context: the profile registry plus the registered handlers.
///
/// Handlers are consulted in registration order before the built-in
/// variants. Packages and resources keep a copy of the factory they were
/// built with, so later registrations do not affect existing entities.
#[derive(Clone, Default)]
pub struct Factory {
    registry: Registry,
    package_handlers: Vec<Arc<dyn PackageHandler>>,
    resource_handlers: Vec<Arc<dyn ResourceHandler>>,
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let packages: Vec<&str> = self.package_handlers.iter().map(|h| h.name()).collect();
        let resources: Vec<&str> = self.resource_handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Factory")
            .field("registry", &self.registry)
            .field("package_handlers", &packages.join(", "))
            .field("resource_handlers", &resources.join(", "))
            .finish()
    }
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register_schema(&mut self, profile: &str, location: impl Into<String>) {
        self.registry.register_schema(profile, location);
    }

    pub fn clear_registered_schemas(&mut self) {
        self.registry.clear_registered_schemas();
    }

    pub fn add_package_handler(&mut self, handler: impl PackageHandler + 'static) {
        debug!("registering package handler '{}'", handler.name());
        self.package_handlers.push(Arc::new(handler));
    }

    pub fn add_resource_handler(&mut self, handler: impl ResourceHandler + 'static) {
        debug!(
            "registering resource handler '{}' ({:?})",
            handler.name(),
            handler.flavor()
        );
        self.resource_handlers.push(Arc::new(handler));
    }

    /// Register a package handler that only claims descriptors.
    pub fn register_package_handler<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Descriptor) -> bool + Send + Sync + 'static,
    {
        self.add_package_handler(PredicateHandler::new(name, predicate));
    }

    /// Register a resource handler that only claims descriptors and picks
    /// their flavor.
    pub fn register_resource_handler<F>(
        &mut self,
        name: impl Into<String>,
        flavor: Flavor,
        predicate: F,
    ) where
        F: Fn(&Descriptor) -> bool + Send + Sync + 'static,
    {
        self.add_resource_handler(PredicateHandler::new(name, predicate).with_flavor(flavor));
    }

    pub fn clear_registered_package_handlers(&mut self) {
        self.package_handlers.clear();
    }

    pub fn clear_registered_resource_handlers(&mut self) {
        self.resource_handlers.clear();
    }

    fn package_handler(&self, descriptor: &Descriptor) -> Option<&Arc<dyn PackageHandler>> {
        self.package_handlers.iter().find(|h| h.handles(descriptor))
    }

    fn resource_handler(&self, descriptor: &Descriptor) -> Option<&Arc<dyn ResourceHandler>> {
        self.resource_handlers.iter().find(|h| h.handles(descriptor))
    }

    /// Variant a package descriptor resolves to.
    pub fn package_variant(&self, descriptor: &Descriptor) -> PackageVariant {
        if let Some(handler) = self.package_handler(descriptor) {
            return PackageVariant::Registered(handler.name().to_owned());
        }
        match Registry::profile_of(descriptor, DescriptorKind::Package).as_str() {
            TABULAR_DATA_PACKAGE => PackageVariant::Tabular,
            DATA_PACKAGE => PackageVariant::Default,
            _ => PackageVariant::Custom,
        }
    }

    /// Variant and streaming flavor a resource descriptor resolves to.
    pub fn resource_variant(&self, descriptor: &Descriptor) -> (ResourceVariant, Flavor) {
        if let Some(handler) = self.resource_handler(descriptor) {
            return (
                ResourceVariant::Registered(handler.name().to_owned()),
                handler.flavor(),
            );
        }
        match Registry::profile_of(descriptor, DescriptorKind::Resource).as_str() {
            TABULAR_DATA_RESOURCE => (ResourceVariant::Tabular, Flavor::Tabular),
            DATA_RESOURCE => (ResourceVariant::Default, Flavor::Default),
            _ => (ResourceVariant::Custom, Flavor::Default),
        }
    }

    /// Load a descriptor from `source` and build a validated package.
    pub fn load_package(
        &self,
        source: impl Into<Source>,
        base_path: Option<&Path>,
    ) -> Result<Package, CoreError> {
        let (descriptor, base_path) = load_source(source.into(), base_path)?;
        info!(
            "loading package '{}'",
            descriptor.name().unwrap_or("<unnamed>")
        );
        self.package(descriptor, base_path.as_deref(), false)
    }

    /// Build a package, validating it unless `skip_validation` is set. A
    /// claiming handler prepares the descriptor first.
    pub fn package(
        &self,
        mut descriptor: Descriptor,
        base_path: Option<&Path>,
        skip_validation: bool,
    ) -> Result<Package, CoreError> {
        let variant = self.package_variant(&descriptor);
        if let Some(handler) = self.package_handler(&descriptor) {
            handler.prepare(&mut descriptor);
        }
        debug!("package resolves to {variant:?}");
        let package = Package::new(
            descriptor,
            base_path.map(Path::to_path_buf),
            variant,
            self.clone(),
            skip_validation,
        );
        if !skip_validation {
            package.revalidate()?;
        }
        Ok(package)
    }

    /// A package named `name` holding `resources`, built without validation.
    pub fn create_package(
        &self,
        name: &str,
        resources: impl IntoIterator<Item = Descriptor>,
        base_path: Option<&Path>,
    ) -> Package {
        let mut descriptor = Descriptor::new();
        descriptor.set_name(name);
        descriptor.insert("resources".to_owned(), Value::Array(Vec::new()));
        let variant = self.package_variant(&descriptor);
        let mut package = Package::new(
            descriptor,
            base_path.map(Path::to_path_buf),
            variant,
            self.clone(),
            true,
        );
        for resource in resources {
            package.upsert_resource(resource);
        }
        package
    }

    /// Build a standalone resource, validating it unless `skip_validation`
    /// is set.
    pub fn resource(
        &self,
        descriptor: Descriptor,
        base_path: Option<&Path>,
        skip_validation: bool,
    ) -> Result<Resource, CoreError> {
        let resource = self.create_resource(descriptor, base_path);
        if !skip_validation {
            resource.revalidate()?;
        }
        Ok(resource)
    }

    /// Build a standalone resource without validating it. A claiming handler
    /// prepares the descriptor and stays attached to the resource.
    pub fn create_resource(
        &self,
        mut descriptor: Descriptor,
        base_path: Option<&Path>,
    ) -> Resource {
        let (variant, flavor) = self.resource_variant(&descriptor);
        let handler = self.resource_handler(&descriptor).cloned();
        if let Some(handler) = &handler {
            handler.prepare(&mut descriptor);
        }
        Resource::new(
            descriptor,
            base_path.map(Path::to_path_buf),
            variant,
            flavor,
            self.clone(),
            handler,
        )
    }

    /// Profile validation of a package, its resources and their sources,
    /// followed by the checks of a claiming handler.
    pub fn validate_package_descriptor(
        &self,
        descriptor: &Descriptor,
        base_path: Option<&Path>,
    ) -> Vec<ValidationError> {
        let errors = validate_package_with(&self.registry, descriptor, base_path, |resource| {
            self.validate_resource_descriptor(resource, base_path)
        });
        match self.package_handler(descriptor) {
            Some(handler) if errors.is_empty() => handler.validate(descriptor, base_path),
            _ => errors,
        }
    }

    pub fn validate_resource_descriptor(
        &self,
        descriptor: &Descriptor,
        base_path: Option<&Path>,
    ) -> Vec<ValidationError> {
        let errors = validate_resource(&self.registry, descriptor, base_path);
        match self.resource_handler(descriptor) {
            Some(handler) if errors.is_empty() => handler.validate(descriptor, base_path),
            _ => errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> Descriptor {
        Descriptor::from_value(value).unwrap()
    }

    #[test]
    fn builtin_package_variants() {
        let f = Factory::default();
        assert_eq!(f.package_variant(&descriptor(json!({}))), PackageVariant::Default);
        assert_eq!(
            f.package_variant(&descriptor(json!({"profile": "default"}))),
            PackageVariant::Default
        );
        assert_eq!(
            f.package_variant(&descriptor(json!({"profile": "tabular-data-package"}))),
            PackageVariant::Tabular
        );
        assert_eq!(
            f.package_variant(&descriptor(json!({"profile": "https://example.com/p.json"}))),
            PackageVariant::Custom
        );
    }

    #[test]
    fn builtin_resource_variants() {
        let f = Factory::default();
        assert_eq!(
            f.resource_variant(&descriptor(json!({"name": "r"}))),
            (ResourceVariant::Default, Flavor::Default)
        );
        assert_eq!(
            f.resource_variant(&descriptor(json!({"profile": "tabular-data-resource"}))),
            (ResourceVariant::Tabular, Flavor::Tabular)
        );
        assert_eq!(
            f.resource_variant(&descriptor(json!({"profile": "my-resource"}))),
            (ResourceVariant::Custom, Flavor::Default)
        );
    }

    #[test]
    fn registered_handlers_take_precedence_until_cleared() {
        let mut f = Factory::default();
        f.register_package_handler("flagged", |d| d.contains_key("myCustomFlag"));
        f.register_resource_handler("tabular-flagged", Flavor::Tabular, |d| {
            d.contains_key("myCustomFlag")
        });

        let flagged = descriptor(json!({"myCustomFlag": true}));
        assert_eq!(
            f.package_variant(&flagged),
            PackageVariant::Registered("flagged".to_owned())
        );
        assert_eq!(
            f.resource_variant(&flagged),
            (ResourceVariant::Registered("tabular-flagged".to_owned()), Flavor::Tabular)
        );
        assert_eq!(f.package_variant(&descriptor(json!({}))), PackageVariant::Default);

        f.clear_registered_package_handlers();
        f.clear_registered_resource_handlers();
        assert_eq!(f.package_variant(&flagged), PackageVariant::Default);
        assert_eq!(f.resource_variant(&flagged).0, ResourceVariant::Default);
    }

    #[test]
    fn first_registered_handler_wins() {
        let mut f = Factory::default();
        f.register_package_handler("first", |_| true);
        f.register_package_handler("second", |_| true);
        assert_eq!(
            f.package_variant(&descriptor(json!({}))),
            PackageVariant::Registered("first".to_owned())
        );
    }

    #[test]
    fn invalid_resource_fails_construction() {
        let err = Factory::default()
            .resource(descriptor(json!({"name": "r"})), None, false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Resource validation failed: [path] There must be a minimum of 1 items in the array"
        );
    }

    #[test]
    fn created_resource_skips_validation() {
        let r = Factory::default().create_resource(descriptor(json!({"name": "r"})), None);
        assert_eq!(r.name(), Some("r"));
        assert!(r.revalidate().is_err());
    }

    #[test]
    fn created_package_is_unvalidated() {
        let p = Factory::default().create_package(
            "dp",
            vec![descriptor(json!({"name": "r", "path": ["missing.csv"]}))],
            None,
        );
        assert_eq!(p.name(), Some("dp"));
        assert_eq!(p.descriptor().resources().len(), 1);
        assert!(p.revalidate().is_err());
    }

    #[test]
    fn debug_lists_handler_names() {
        let mut f = Factory::default();
        f.register_package_handler("a", |_| false);
        assert!(format!("{f:?}").contains("package_handlers: \"a\""));
    }
}
