//! Thin wrapper over the `jsonschema` crate.
//!
//! Schemas are loaded from a [`SchemaLocation`] and compiled with a retriever
//! that serves the bundled profile schemas for their canonical URLs, so the
//! built-in profiles never touch the network. Violations come back as
//! `(property, message)` pairs with the property in dotted form
//! (`resources[0].path`).

use crate::registry::{bundled_entries, bundled_schema, SchemaLocation};
use crate::{http, SchemaError};
use jsonschema::error::ValidationErrorKind as Native;
use jsonschema::{Retrieve, Uri};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted property path; empty for the document root.
    pub property: String,
    pub message: String,
}

/// Resolves `$ref` targets: bundled schemas by URL or file name, then
/// `http(s)` and `file://` references.
struct ProfileRetriever;

impl Retrieve for ProfileRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri = uri.as_str();

        if let Some(text) = bundled_for_uri(uri) {
            return Ok(serde_json::from_str(text)?);
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(http::fetch_json(uri)?);
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(read_json_file(Path::new(path))?);
        }
        Err(format!("cannot retrieve schema reference '{uri}'").into())
    }
}

fn bundled_for_uri(uri: &str) -> Option<&'static str> {
    let uri = uri.split('#').next().unwrap_or(uri);
    if let Some(entry) = bundled_entries().iter().find(|e| e.schema == uri) {
        return entry.schema_path.as_deref().and_then(bundled_schema);
    }
    let file_name = uri.rsplit('/').next().unwrap_or(uri);
    if file_name == "registry.json" {
        return None;
    }
    bundled_schema(file_name)
}

fn read_json_file(path: &Path) -> Result<Value, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SchemaError::SchemaNotFound(path.display().to_string()),
        _ => SchemaError::Io(e),
    })?;
    serde_json::from_str(&text).map_err(|e| SchemaError::Parse {
        location: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load the raw schema document at `location`.
pub fn load_schema(location: &SchemaLocation) -> Result<Value, SchemaError> {
    debug!("loading schema {location}");
    match location {
        SchemaLocation::Bundled(name) => {
            let text =
                bundled_schema(name).ok_or_else(|| SchemaError::SchemaNotFound(name.clone()))?;
            serde_json::from_str(text).map_err(|e| SchemaError::Parse {
                location: name.clone(),
                reason: e.to_string(),
            })
        }
        SchemaLocation::File(path) => read_json_file(path),
        SchemaLocation::Url(url) => http::fetch_json(url),
    }
}

/// Validate `instance` against the schema at `location`, returning every
/// violation in the order the validator reports them.
pub fn validate_against(
    instance: &Value,
    location: &SchemaLocation,
) -> Result<Vec<Violation>, SchemaError> {
    let schema = load_schema(location)?;

    let mut opts = jsonschema::options();
    opts.with_retriever(ProfileRetriever);
    opts.should_validate_formats(true);
    let validator = opts.build(&schema).map_err(|e| SchemaError::Compile {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| {
            let at = pointer_to_property(&e.instance_path.to_string());
            match &e.kind {
                Native::Required { property } => {
                    let name = property
                        .as_str()
                        .map(str::to_owned)
                        .unwrap_or_else(|| property.to_string());
                    Violation {
                        property: join_property(&at, &name),
                        message: format!("The property {name} is required"),
                    }
                }
                Native::MinItems { limit } => Violation {
                    property: at,
                    message: format!("There must be a minimum of {limit} items in the array"),
                },
                _ => Violation {
                    property: at,
                    message: e.to_string(),
                },
            }
        })
        .collect();

    debug!("{} violation(s) against {location}", violations.len());
    Ok(violations)
}

fn join_property(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_owned()
    } else {
        format!("{parent}.{child}")
    }
}

/// Convert a JSON pointer (`/resources/0/path`) into the dotted property form
/// (`resources[0].path`).
pub fn pointer_to_property(pointer: &str) -> String {
    let mut out = String::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            out.push('[');
            out.push_str(&token);
            out.push(']');
        } else {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(&token);
        }
    }
    out
}
