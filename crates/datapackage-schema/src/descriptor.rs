//! The mutable JSON document describing a package or a resource.
//!
//! A [`Descriptor`] is an ordered JSON object. It dereferences to the
//! underlying `serde_json::Map`, so callers can read and edit arbitrary
//! fields directly; the accessors here only interpret the handful of keys the
//! rest of the workspace depends on (`name`, `profile`, `resources`, `path`,
//! `data`, `schema`).

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Which kind of entity a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Package,
    Resource,
}

impl DescriptorKind {
    /// The profile used when a descriptor declares none (or `"default"`).
    pub fn baseline_profile(self) -> &'static str {
        match self {
            Self::Package => crate::DATA_PACKAGE,
            Self::Resource => crate::DATA_RESOURCE,
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => f.write_str("package"),
            Self::Resource => f.write_str("resource"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Map<String, Value>);

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SchemaError::NotAnObject(json_type_name(&other).to_owned())),
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(input).map_err(|e| SchemaError::Parse {
            location: "<string>".to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn set_name(&mut self, name: &str) {
        self.0.insert("name".to_owned(), Value::String(name.to_owned()));
    }

    /// The declared profile, verbatim. `"default"` is returned as-is; use
    /// [`Registry::profile_of`](crate::Registry::profile_of) for the
    /// normalized value.
    pub fn profile(&self) -> Option<&str> {
        self.0.get("profile").and_then(Value::as_str)
    }

    /// Resource descriptors of a package. Empty when absent or malformed.
    pub fn resources(&self) -> &[Value] {
        match self.0.get("resources") {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    /// Mutable access to the `resources` sequence, creating it when absent.
    pub fn resources_mut(&mut self) -> &mut Vec<Value> {
        let entry = self
            .0
            .entry("resources")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        match entry {
            Value::Array(items) => items,
            _ => unreachable!("resources was just normalized to an array"),
        }
    }

    /// `path` entries of a resource. A single string counts as one entry;
    /// non-string items are skipped.
    pub fn paths(&self) -> Vec<&str> {
        match self.0.get("path") {
            Some(Value::String(path)) => vec![path.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Inline `data` of a resource. `null` counts as absent.
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data").filter(|v| !v.is_null())
    }

    /// Table schema of a resource.
    pub fn schema(&self) -> Option<&Value> {
        self.0.get("schema")
    }

    /// Number of data sources a resource declares: one per `path` entry plus
    /// one for inline `data`.
    pub fn data_source_count(&self) -> usize {
        self.paths().len() + usize::from(self.data().is_some())
    }
}

impl Deref for Descriptor {
    type Target = Map<String, Value>;
    fn deref(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl DerefMut for Descriptor {
    fn deref_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Descriptor {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Descriptor {
    type Error = SchemaError;
    fn try_from(value: Value) -> Result<Self, SchemaError> {
        Self::from_value(value)
    }
}

impl From<Descriptor> for Value {
    fn from(descriptor: Descriptor) -> Self {
        descriptor.into_value()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// True when `source` looks like inline JSON text (first non-blank char is `{`).
pub fn is_json_string(source: &str) -> bool {
    source.trim_start().starts_with('{')
}

/// True for `http:` and `https:` sources.
pub fn is_http_source(source: &str) -> bool {
    source.starts_with("http:") || source.starts_with("https:")
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
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
    fn rejects_non_object() {
        let err = Descriptor::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject(ref t) if t == "array"));
    }

    #[test]
    fn parses_json_text() {
        let d = Descriptor::from_json_str(r#"{"name": "dp", "resources": []}"#).unwrap();
        assert_eq!(d.name(), Some("dp"));
        assert!(d.resources().is_empty());
    }

    #[test]
    fn preserves_key_order() {
        let d = Descriptor::from_json_str(r#"{"zeta": 1, "alpha": 2, "name": "x"}"#).unwrap();
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "name"]);
    }

    #[test]
    fn paths_accepts_string_and_array() {
        assert_eq!(descriptor(json!({"path": "a.csv"})).paths(), vec!["a.csv"]);
        assert_eq!(
            descriptor(json!({"path": ["a.csv", 3, "b.csv"]})).paths(),
            vec!["a.csv", "b.csv"]
        );
        assert!(descriptor(json!({})).paths().is_empty());
    }

    #[test]
    fn data_source_count_includes_inline_data() {
        let d = descriptor(json!({"path": ["a", "b"], "data": [1]}));
        assert_eq!(d.data_source_count(), 3);
        let d = descriptor(json!({"path": ["a"], "data": null}));
        assert_eq!(d.data_source_count(), 1);
    }

    #[test]
    fn resources_mut_creates_and_repairs() {
        let mut d = descriptor(json!({"resources": "oops"}));
        d.resources_mut().push(json!({"name": "r"}));
        assert_eq!(d.resources().len(), 1);

        let mut d = Descriptor::new();
        assert!(d.resources_mut().is_empty());
        assert!(d.contains_key("resources"));
    }

    #[test]
    fn baseline_profiles() {
        assert_eq!(DescriptorKind::Package.baseline_profile(), "data-package");
        assert_eq!(DescriptorKind::Resource.baseline_profile(), "data-resource");
    }

    #[test]
    fn source_detection() {
        assert!(is_json_string("  \n{\"name\": 1}"));
        assert!(!is_json_string("datapackage.json"));
        assert!(is_http_source("http://example.com/dp.json"));
        assert!(is_http_source("https://example.com/dp.json"));
        assert!(!is_http_source("ftp://example.com/dp.json"));
        assert!(!is_http_source("data/http.csv"));
    }

    #[test]
    fn display_is_compact_json() {
        let d = descriptor(json!({"name": "x"}));
        assert_eq!(d.to_string(), r#"{"name":"x"}"#);
    }
}
