//! Package sources and how they are turned into a descriptor.

use crate::CoreError;
use datapackage_schema::{http, is_http_source, is_json_string, Descriptor};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything a package can be loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// An in-memory descriptor.
    Descriptor(Descriptor),
    /// JSON text, an HTTP(S) URL or a file path, told apart by content.
    Text(String),
    /// A JSON value that is neither an object nor a string.
    Invalid(Value),
}

impl From<Descriptor> for Source {
    fn from(descriptor: Descriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Descriptor(Descriptor::from(map)),
            Value::String(text) => Self::Text(text),
            other => Self::Invalid(other),
        }
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Text(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

fn load_failed(source: &str, reason: impl std::fmt::Display) -> CoreError {
    let quoted = serde_json::to_string(source).unwrap_or_else(|_| source.to_owned());
    CoreError::LoadFailed(format!("Failed to load source: {quoted}: {reason}"))
}

fn into_descriptor(source: &str, value: Value) -> Result<Descriptor, CoreError> {
    Descriptor::from_value(value).map_err(|e| load_failed(source, e))
}

/// Resolve a source into a descriptor and the base path relative data paths
/// should be resolved against.
///
/// URL sources never have a base path. File sources without an explicit base
/// use the file's own directory; with a base, `base/source` is tried first
/// and `source` itself is the fallback.
pub fn load_source(
    source: Source,
    base_path: Option<&Path>,
) -> Result<(Descriptor, Option<PathBuf>), CoreError> {
    let base_path = base_path.map(Path::to_path_buf);
    match source {
        Source::Descriptor(descriptor) => Ok((descriptor, base_path)),
        Source::Invalid(value) => Err(CoreError::InvalidSource(value.to_string())),
        Source::Text(text) if is_json_string(&text) => {
            let value: Value = serde_json::from_str(&text).map_err(|e| load_failed(&text, e))?;
            Ok((into_descriptor(&text, value)?, base_path))
        }
        Source::Text(url) if is_http_source(&url) => {
            debug!("loading descriptor from {url}");
            let value = http::fetch_json(&url).map_err(|e| load_failed(&url, e))?;
            Ok((into_descriptor(&url, value)?, None))
        }
        Source::Text(path) => {
            let (file, base) = match base_path {
                None => {
                    let parent = Path::new(&path)
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(Path::to_path_buf);
                    (PathBuf::from(&path), parent)
                }
                Some(base) => {
                    let joined = base.join(&path);
                    let file = if joined.exists() {
                        joined
                    } else {
                        PathBuf::from(&path)
                    };
                    (file, Some(base))
                }
            };
            debug!("loading descriptor from {}", file.display());
            let text = std::fs::read_to_string(&file).map_err(|e| load_failed(&path, e))?;
            let value: Value = serde_json::from_str(&text).map_err(|e| load_failed(&path, e))?;
            Ok((into_descriptor(&path, value)?, base))
        }
    }
}
