use crate::archive::save_archive;
use crate::factory::{Factory, PackageVariant};
use crate::{CoreError, Resource};
use datapackage_schema::{Descriptor, ValidationErrors};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

/// A package descriptor bound to a base path and the factory it was
/// resolved with.
///
/// The descriptor is owned and mutable. Mutations through
/// [`Package::add_resource`] and [`Package::remove_resource`] revalidate
/// unless the package was built with validation skipped; direct edits via
/// [`Package::descriptor_mut`] need an explicit [`Package::revalidate`].
/// A failed revalidation leaves the edited descriptor in place.
#[derive(Debug)]
pub struct Package {
    descriptor: Descriptor,
    base_path: Option<PathBuf>,
    variant: PackageVariant,
    factory: Factory,
    skip_validation: bool,
    cursor: usize,
    workdir: Option<Arc<TempDir>>,
}

impl Package {
    pub(crate) fn new(
        descriptor: Descriptor,
        base_path: Option<PathBuf>,
        variant: PackageVariant,
        factory: Factory,
        skip_validation: bool,
    ) -> Self {
        Self {
            descriptor,
            base_path,
            variant,
            factory,
            skip_validation,
            cursor: 0,
            workdir: None,
        }
    }

    /// An unvalidated package named `name` holding `resources`.
    pub fn create(
        name: &str,
        resources: impl IntoIterator<Item = Descriptor>,
        base_path: Option<&Path>,
    ) -> Self {
        Factory::default().create_package(name, resources, base_path)
    }

    pub(crate) fn with_workdir(mut self, workdir: Arc<TempDir>) -> Self {
        self.workdir = Some(workdir);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn variant(&self) -> &PackageVariant {
        &self.variant
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    // The package pass already covered every resource, so entities are
    // built without a second validation.
    fn build_resource(&self, value: &Value) -> Result<Resource, CoreError> {
        let descriptor = Descriptor::from_value(value.clone())?;
        Ok(self
            .factory
            .create_resource(descriptor, self.base_path())
            .with_workdir(self.workdir.clone()))
    }

    /// Every resource paired with its name, in declaration order. On
    /// duplicate names the later entry replaces the earlier one in place.
    pub fn resources(&self) -> Result<Vec<(String, Resource)>, CoreError> {
        let mut resources: Vec<(String, Resource)> = Vec::new();
        for resource in self.iter() {
            let resource = resource?;
            let name = resource.name().unwrap_or_default().to_owned();
            match resources.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = resource,
                None => resources.push((name, resource)),
            }
        }
        Ok(resources)
    }

    /// The first resource named `name`.
    pub fn resource(&self, name: &str) -> Result<Resource, CoreError> {
        let value = self
            .descriptor
            .resources()
            .iter()
            .find(|r| r.get("name").and_then(Value::as_str) == Some(name))
            .ok_or_else(|| CoreError::ResourceNotFound(name.to_owned()))?;
        self.build_resource(value)
    }

    /// Replace every resource sharing the new one's name, or append it.
    pub(crate) fn upsert_resource(&mut self, resource: Descriptor) {
        let name = resource.name().map(str::to_owned);
        let value = resource.into_value();
        let resources = self.descriptor.resources_mut();
        let mut matched = false;
        if let Some(name) = name.as_deref() {
            for slot in resources
                .iter_mut()
                .filter(|r| r.get("name").and_then(Value::as_str) == Some(name))
            {
                *slot = value.clone();
                matched = true;
            }
        }
        if !matched {
            resources.push(value);
        }
    }

    /// Add a resource, replacing any resource with the same name, and
    /// return the built entity.
    pub fn add_resource(&mut self, resource: impl Into<Descriptor>) -> Result<Resource, CoreError> {
        let resource = resource.into();
        let name = resource.name().unwrap_or_default().to_owned();
        debug!("adding resource '{name}'");
        self.upsert_resource(resource);
        if !self.skip_validation {
            self.revalidate()?;
        }
        self.resource(&name)
    }

    pub fn remove_resource(&mut self, name: &str) -> Result<(), CoreError> {
        debug!("removing resource '{name}'");
        self.descriptor
            .resources_mut()
            .retain(|r| r.get("name").and_then(Value::as_str) != Some(name));
        if !self.skip_validation {
            self.revalidate()?;
        }
        Ok(())
    }

    /// Run the validator over the current descriptor.
    pub fn revalidate(&self) -> Result<(), CoreError> {
        let errors = self
            .factory
            .validate_package_descriptor(&self.descriptor, self.base_path());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::PackageValidationFailed(ValidationErrors::new(
                errors,
            )))
        }
    }

    /// Build every resource in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Resource, CoreError>> + '_ {
        self.descriptor
            .resources()
            .iter()
            .map(|value| self.build_resource(value))
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn valid(&self) -> bool {
        self.cursor < self.descriptor.resources().len()
    }

    /// The resource at the cursor, built on demand.
    pub fn current(&self) -> Option<Result<Resource, CoreError>> {
        self.descriptor
            .resources()
            .get(self.cursor)
            .map(|value| self.build_resource(value))
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Write the descriptor as JSON to `path`.
    pub fn save_descriptor(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(&self.descriptor)?;
        std::fs::write(path, json)?;
        info!("saved descriptor to {}", path.display());
        Ok(())
    }

    /// Pack the descriptor and all file data into an archive at `target`.
    pub fn save(&self, target: &Path) -> Result<(), CoreError> {
        save_archive(self, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> Descriptor {
        Descriptor::from_value(value).unwrap()
    }

    fn fixture() -> (tempfile::TempDir, Package) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        let package = Factory::default()
            .package(
                descriptor(json!({
                    "name": "dp",
                    "resources": [
                        {"name": "first", "path": "a.txt"},
                        {"name": "second", "path": ["b.txt"]}
                    ]
                })),
                Some(dir.path()),
                false,
            )
            .unwrap();
        (dir, package)
    }

    #[test]
    fn resources_by_name() {
        let (_dir, package) = fixture();
        let resources = package.resources().unwrap();
        let names: Vec<&str> = resources.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        let mut second = package.resource("second").unwrap();
        assert_eq!(second.read(None).unwrap(), vec![json!("b\n")]);
    }

    #[test]
    fn missing_resource() {
        let (_dir, package) = fixture();
        let err = package.resource("third").unwrap_err();
        assert_eq!(err.to_string(), "couldn't find matching resource with name 'third'");
    }

    #[test]
    fn cursor_walks_in_order() {
        let (_dir, mut package) = fixture();
        let mut names = Vec::new();
        while package.valid() {
            let resource = package.current().unwrap().unwrap();
            names.push(resource.name().unwrap().to_owned());
            package.advance();
        }
        assert_eq!(names, vec!["first", "second"]);
        assert!(package.current().is_none());
        package.rewind();
        assert!(package.valid());
    }

    #[test]
    fn add_replaces_by_name() {
        let (_dir, mut package) = fixture();
        package
            .add_resource(descriptor(json!({"name": "first", "data": ["x"]})))
            .unwrap();
        assert_eq!(package.descriptor().resources().len(), 2);
        let mut first = package.resource("first").unwrap();
        assert_eq!(first.read(None).unwrap(), vec![json!("x")]);

        let third = package
            .add_resource(descriptor(json!({"name": "third", "data": [1]})))
            .unwrap();
        assert_eq!(third.name(), Some("third"));
        assert_eq!(package.descriptor().resources().len(), 3);
    }

    #[test]
    fn invalid_add_keeps_the_edit() {
        let (_dir, mut package) = fixture();
        let err = package
            .add_resource(descriptor(json!({"name": "bad", "path": ["missing.txt"]})))
            .unwrap_err();
        assert!(matches!(err, CoreError::PackageValidationFailed(_)));
        assert_eq!(package.descriptor().resources().len(), 3);
    }

    #[test]
    fn removing_the_last_resource_is_invalid() {
        let (_dir, mut package) = fixture();
        package.remove_resource("first").unwrap();
        let err = package.remove_resource("second").unwrap_err();
        assert!(
            err.to_string()
                .contains("There must be a minimum of 1 items in the array"),
            "{err}"
        );
    }

    #[test]
    fn created_package_skips_validation_on_mutation() {
        let mut package = Package::create("dp", Vec::new(), None);
        package
            .add_resource(descriptor(json!({"name": "r", "path": ["missing.txt"]})))
            .unwrap();
        package.remove_resource("r").unwrap();
        assert!(package.descriptor().resources().is_empty());
    }

    #[test]
    fn resource_entity_converts_back_to_descriptor() {
        let (_dir, mut package) = fixture();
        let mut first = package.resource("first").unwrap();
        first.descriptor_mut().set_name("renamed");
        package.add_resource(first).unwrap();
        assert!(package.resource("renamed").is_ok());
    }

    fn duplicates() -> (tempfile::TempDir, Package) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("c.txt"), "other").unwrap();
        let package = Factory::default()
            .package(
                descriptor(json!({
                    "name": "dp",
                    "resources": [
                        {"name": "r", "path": ["a.txt"]},
                        {"name": "other", "path": ["c.txt"]},
                        {"name": "r", "path": ["b.txt"]}
                    ]
                })),
                Some(dir.path()),
                false,
            )
            .unwrap();
        (dir, package)
    }

    #[test]
    fn duplicate_names_lookup_returns_first() {
        let (_dir, package) = duplicates();
        let mut r = package.resource("r").unwrap();
        assert_eq!(r.read(None).unwrap(), vec![json!("first")]);
    }

    #[test]
    fn duplicate_names_keep_first_position_and_last_entry() {
        let (_dir, package) = duplicates();
        let resources = package.resources().unwrap();
        let names: Vec<&str> = resources.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["r", "other"]);
        assert_eq!(resources[0].1.descriptor()["path"], json!(["b.txt"]));
    }

    #[test]
    fn add_replaces_every_duplicate() {
        let (_dir, mut package) = duplicates();
        package
            .add_resource(descriptor(json!({"name": "r", "path": ["a.txt"], "title": "new"})))
            .unwrap();
        let resources = package.descriptor().resources();
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0]["title"], json!("new"));
        assert_eq!(resources[1]["name"], json!("other"));
        assert_eq!(resources[2]["title"], json!("new"));
    }

    #[test]
    fn save_descriptor_writes_json() {
        let (dir, package) = fixture();
        let path = dir.path().join("out.json");
        package.save_descriptor(&path).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(&written, &package.descriptor().to_value());
    }
}
