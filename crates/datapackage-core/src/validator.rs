//! Descriptor validation: schema passes plus structural checks.
//!
//! Packages are validated against their profile's schema, then against the
//! base `data-package` schema when the profile is anything else. A resource is
//! validated by wrapping it as the only entry of a synthetic package and
//! validating that package, with the `resources[0].` prefix stripped from the
//! reported property paths.
//!
//! Structural checks run only after a clean schema pass: each resource of a
//! package is validated on its own (its errors wrapped with its 1-based
//! position), and each `path` entry of a resource must be reachable.

use datapackage_schema::{
    package_equivalent, validate_against, Descriptor, DescriptorKind, Registry, ValidationError,
    DATA_PACKAGE, TABULAR_DATA_PACKAGE,
};
use datapackage_stream::{normalize_data_source, validate_data_source};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

const DUMMY_PACKAGE_NAME: &str = "dummy-datapackage-name";
const WRAPPED_PREFIX: &str = "resources[0]";

/// Normalize a resource's `path` for schema validation: a single string
/// becomes a one-element array, optionally `file://`-prefixed, and a resource
/// with neither `path` nor `data` gets an empty `path` so the schema's
/// minimum-items rule reports it.
fn normalize_resource_paths(resource: &mut Map<String, Value>, file_scheme: bool) {
    let paths = match resource.remove("path") {
        Some(Value::String(path)) => Some(vec![Value::String(path)]),
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            resource.insert("path".to_owned(), other);
            return;
        }
        None if matches!(resource.get("data"), None | Some(Value::Null)) => Some(Vec::new()),
        None => None,
    };
    if let Some(mut items) = paths {
        if file_scheme {
            for item in &mut items {
                if let Value::String(path) = item {
                    *path = format!("file://{path}");
                }
            }
        }
        resource.insert("path".to_owned(), Value::Array(items));
    }
}

fn package_validation_copy(descriptor: &Descriptor) -> Value {
    let mut copy = descriptor.clone();
    if let Some(Value::Array(resources)) = copy.get_mut("resources") {
        for resource in resources.iter_mut() {
            if let Value::Object(map) = resource {
                normalize_resource_paths(map, true);
            }
        }
    }
    copy.into_value()
}

fn resource_validation_wrapper(descriptor: &Descriptor, package_profile: &str) -> Value {
    let mut resource = descriptor.as_map().clone();
    normalize_resource_paths(&mut resource, false);
    let mut wrapper = json!({
        "name": DUMMY_PACKAGE_NAME,
        "resources": [Value::Object(resource)],
    });
    if package_profile == TABULAR_DATA_PACKAGE {
        wrapper["profile"] = Value::String(TABULAR_DATA_PACKAGE.to_owned());
    }
    wrapper
}

fn strip_wrapped_prefix(property: &str) -> &str {
    if property == WRAPPED_PREFIX {
        ""
    } else {
        property
            .strip_prefix(WRAPPED_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(property)
    }
}

/// Validate `instance` against the schema of `profile`. A schema that cannot
/// be loaded or compiled is reported as a single `LoadFailed` error.
fn schema_pass(
    registry: &Registry,
    instance: &Value,
    profile: &str,
    base_path: Option<&Path>,
    unwrap_resource: bool,
) -> Vec<ValidationError> {
    let location = registry.resolve(profile, base_path);
    debug!("validating against profile '{profile}' ({location})");
    match validate_against(instance, &location) {
        Ok(violations) => violations
            .into_iter()
            .map(|v| {
                let property = if unwrap_resource {
                    strip_wrapped_prefix(&v.property)
                } else {
                    v.property.as_str()
                };
                ValidationError::SchemaViolation {
                    property: (!property.is_empty()).then(|| property.to_owned()),
                    message: v.message,
                }
            })
            .collect(),
        Err(e) => vec![ValidationError::load_failed(e.to_string())],
    }
}

/// Validate a package descriptor. An empty result means valid.
pub fn validate_package(
    registry: &Registry,
    descriptor: &Descriptor,
    base_path: Option<&Path>,
) -> Vec<ValidationError> {
    validate_package_with(registry, descriptor, base_path, |resource| {
        validate_resource(registry, resource, base_path)
    })
}

/// Validate a package descriptor, checking each resource with
/// `check_resource` once the package schema passes.
pub fn validate_package_with(
    registry: &Registry,
    descriptor: &Descriptor,
    base_path: Option<&Path>,
    check_resource: impl Fn(&Descriptor) -> Vec<ValidationError>,
) -> Vec<ValidationError> {
    let profile = Registry::profile_of(descriptor, DescriptorKind::Package);
    let instance = package_validation_copy(descriptor);

    let mut errors = schema_pass(registry, &instance, &profile, base_path, false);
    if profile != DATA_PACKAGE {
        errors.extend(schema_pass(registry, &instance, DATA_PACKAGE, base_path, false));
    }
    if !errors.is_empty() {
        return errors;
    }

    for (i, resource) in descriptor.resources().iter().enumerate() {
        let resource_errors = match Descriptor::from_value(resource.clone()) {
            Ok(resource) => check_resource(&resource),
            Err(e) => vec![ValidationError::violation(e.to_string())],
        };
        if !resource_errors.is_empty() {
            errors.push(ValidationError::ResourceFailedValidation {
                resource: i + 1,
                errors: resource_errors,
            });
        }
    }
    errors
}

/// Validate a standalone resource descriptor. An empty result means valid.
pub fn validate_resource(
    registry: &Registry,
    descriptor: &Descriptor,
    base_path: Option<&Path>,
) -> Vec<ValidationError> {
    let resource_profile = Registry::profile_of(descriptor, DescriptorKind::Resource);
    let profile = package_equivalent(&resource_profile);
    let wrapper = resource_validation_wrapper(descriptor, profile);

    let mut errors = schema_pass(registry, &wrapper, profile, base_path, true);
    if profile != DATA_PACKAGE {
        errors.extend(schema_pass(registry, &wrapper, DATA_PACKAGE, base_path, true));
    }
    if !errors.is_empty() {
        return errors;
    }

    for path in descriptor.paths() {
        if !validate_data_source(path, base_path) {
            errors.push(ValidationError::violation(format!(
                "data source file does not exist or is not readable: {}",
                normalize_data_source(path, base_path)
            )));
        }
    }
    errors
}
