//! Known profiles and where their JSON schemas live.
//!
//! Built-in profiles resolve to schema files compiled into the crate. The
//! bundled `registry.json` manifest lists the package profiles; the two
//! resource profiles are added when the manifest does not mention them.
//! Further profiles can be registered at run time with
//! [`Registry::register_schema`].

use crate::descriptor::{is_http_source, Descriptor, DescriptorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const DATA_PACKAGE: &str = "data-package";
pub const TABULAR_DATA_PACKAGE: &str = "tabular-data-package";
pub const DATA_RESOURCE: &str = "data-resource";
pub const TABULAR_DATA_RESOURCE: &str = "tabular-data-resource";
pub const DEFAULT_PROFILE: &str = "default";

const REGISTRY_JSON: &str = include_str!("../schemas/registry.json");
const REMOTE_SCHEMA_BASE: &str = "https://specs.frictionlessdata.io/schemas/";

/// A single entry of the profile registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Canonical remote location of the schema.
    pub schema: String,
    /// File name of the bundled copy, when one ships with the crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
}

/// Where the schema for a profile can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    /// A schema compiled into the crate, by file name.
    Bundled(String),
    File(PathBuf),
    Url(String),
}

impl SchemaLocation {
    fn from_reference(reference: &str) -> Self {
        if is_http_source(reference) {
            Self::Url(reference.to_owned())
        } else {
            Self::File(PathBuf::from(reference))
        }
    }
}

impl std::fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundled(name) => write!(f, "bundled:{name}"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Text of a bundled schema file.
pub fn bundled_schema(file_name: &str) -> Option<&'static str> {
    match file_name {
        "registry.json" => Some(REGISTRY_JSON),
        "data-package.json" => Some(include_str!("../schemas/data-package.json")),
        "tabular-data-package.json" => Some(include_str!("../schemas/tabular-data-package.json")),
        "data-resource.json" => Some(include_str!("../schemas/data-resource.json")),
        "tabular-data-resource.json" => {
            Some(include_str!("../schemas/tabular-data-resource.json"))
        }
        _ => None,
    }
}

/// Entries of the bundled manifest plus the resource profiles it omits.
/// Parsed once per process.
pub fn bundled_entries() -> &'static [RegistryEntry] {
    static ENTRIES: OnceLock<Vec<RegistryEntry>> = OnceLock::new();
    ENTRIES.get_or_init(|| {
        let mut entries: Vec<RegistryEntry> = serde_json::from_str(REGISTRY_JSON)
            .unwrap_or_else(|e| {
                warn!("bundled registry.json is invalid: {e}");
                Vec::new()
            });
        for id in [DATA_RESOURCE, TABULAR_DATA_RESOURCE] {
            if !entries.iter().any(|entry| entry.id == id) {
                entries.push(RegistryEntry {
                    id: id.to_owned(),
                    title: None,
                    schema: format!("{REMOTE_SCHEMA_BASE}{id}.json"),
                    schema_path: Some(format!("{id}.json")),
                    specification: None,
                });
            }
        }
        entries
    })
}

/// Map a resource profile onto the package profile whose schema can validate
/// it once the resource is wrapped in a synthetic package.
pub fn package_equivalent(profile: &str) -> &str {
    match profile {
        TABULAR_DATA_RESOURCE => TABULAR_DATA_PACKAGE,
        DATA_RESOURCE => DATA_PACKAGE,
        other => other,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// profile -> schema reference (path or URL), in registration order of key.
    registered: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective profile of a descriptor: its declared `profile` unless
    /// absent or `"default"`, else the kind's baseline.
    pub fn profile_of(descriptor: &Descriptor, kind: DescriptorKind) -> String {
        match descriptor.profile() {
            Some(profile) if profile != DEFAULT_PROFILE => profile.to_owned(),
            _ => kind.baseline_profile().to_owned(),
        }
    }

    /// Register (or replace) the schema location of a custom profile.
    pub fn register_schema(&mut self, profile: &str, location: impl Into<String>) {
        let location = location.into();
        debug!("registering schema for profile '{profile}': {location}");
        self.registered.insert(profile.to_owned(), location);
    }

    pub fn clear_registered_schemas(&mut self) {
        self.registered.clear();
    }

    /// Every known profile: bundled entries first, then run-time registrations.
    pub fn all_schemas(&self) -> Vec<RegistryEntry> {
        let mut all = bundled_entries().to_vec();
        for (profile, location) in &self.registered {
            all.push(RegistryEntry {
                id: profile.clone(),
                title: None,
                schema: location.clone(),
                schema_path: None,
                specification: None,
            });
        }
        all
    }

    /// Schema location for a profile known to the registry, bundled or
    /// registered. `None` means the profile string should be treated as a
    /// schema reference itself.
    pub fn schema_file(&self, profile: &str) -> Option<SchemaLocation> {
        if let Some(entry) = bundled_entries().iter().find(|e| e.id == profile) {
            return Some(match &entry.schema_path {
                Some(file) => SchemaLocation::Bundled(file.clone()),
                None => SchemaLocation::Url(entry.schema.clone()),
            });
        }
        self.registered
            .get(profile)
            .map(|location| SchemaLocation::from_reference(location))
    }

    /// Resolve the schema for a profile: registry first, then a URL, then a
    /// path relative to `base_path` when that file exists, else the profile
    /// as an absolute or working-directory-relative path.
    pub fn resolve(&self, profile: &str, base_path: Option<&Path>) -> SchemaLocation {
        if let Some(location) = self.schema_file(profile) {
            return location;
        }
        if is_http_source(profile) {
            return SchemaLocation::Url(profile.to_owned());
        }
        if let Some(base) = base_path {
            let joined = base.join(profile);
            if joined.exists() {
                return SchemaLocation::File(joined);
            }
        }
        SchemaLocation::File(PathBuf::from(profile))
    }
}
