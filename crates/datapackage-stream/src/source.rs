use crate::StreamError;
use datapackage_schema::{http, is_http_source};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a `path` entry against `base_path`. URLs are returned unchanged;
/// relative paths are joined to the base only when the joined file exists.
pub fn normalize_data_source(source: &str, base_path: Option<&Path>) -> String {
    if is_http_source(source) {
        return source.to_owned();
    }
    if let Some(base) = base_path {
        let joined = base.join(source);
        if joined.is_file() {
            return joined.to_string_lossy().into_owned();
        }
    }
    source.to_owned()
}

/// Whether a `path` entry can be opened: any HTTP(S) URL, or a readable file
/// after resolution against `base_path`.
pub fn validate_data_source(source: &str, base_path: Option<&Path>) -> bool {
    if is_http_source(source) {
        return true;
    }
    let resolved = normalize_data_source(source, base_path);
    let path = Path::new(&resolved);
    path.is_file() && File::open(path).is_ok()
}

/// One physical or inline source of rows.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Local(PathBuf),
    Remote(String),
    Inline(Value),
}

impl DataSource {
    /// Build a source from a `path` entry.
    pub fn from_path(source: &str, base_path: Option<&Path>) -> Self {
        if is_http_source(source) {
            Self::Remote(source.to_owned())
        } else {
            Self::Local(PathBuf::from(normalize_data_source(source, base_path)))
        }
    }

    /// Open a byte reader over a file or URL source.
    pub fn open(&self) -> Result<Box<dyn Read>, StreamError> {
        match self {
            Self::Local(path) => {
                debug!("opening {}", path.display());
                let file = File::open(path).map_err(|e| StreamError::Open {
                    data_source: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Box::new(file))
            }
            Self::Remote(url) => http::open_url(url).map_err(|e| StreamError::Open {
                data_source: url.clone(),
                reason: e.to_string(),
            }),
            Self::Inline(_) => Err(StreamError::Open {
                data_source: self.to_string(),
                reason: "inline data has no byte representation".to_owned(),
            }),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// File extension of the source, if it has one.
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Local(path) => path.file_name()?.to_str()?,
            Self::Remote(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/').next()?
            }
            Self::Inline(_) => return None,
        };
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_owned())
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
            Self::Inline(_) => f.write_str("<inline data>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_are_never_rebased() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            normalize_data_source("http://example.com/a.csv", Some(dir.path())),
            "http://example.com/a.csv"
        );
        assert!(validate_data_source("https://example.com/a.csv", None));
    }

    #[test]
    fn relative_path_joins_base_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.txt"), "foo").unwrap();

        let joined = normalize_data_source("foo.txt", Some(dir.path()));
        assert_eq!(PathBuf::from(joined), dir.path().join("foo.txt"));
        assert_eq!(normalize_data_source("bar.txt", Some(dir.path())), "bar.txt");
        assert_eq!(normalize_data_source("foo.txt", None), "foo.txt");
    }

    #[test]
    fn validation_requires_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.txt"), "foo").unwrap();
        assert!(validate_data_source("foo.txt", Some(dir.path())));
        assert!(!validate_data_source("missing.txt", Some(dir.path())));
        assert!(!validate_data_source(".", Some(dir.path())));
    }

    #[test]
    fn open_missing_file_fails() {
        let err = DataSource::Local("/nonexistent/file.csv".into())
            .open()
            .err()
            .unwrap();
        assert!(err
            .to_string()
            .starts_with("Failed to open data source \"/nonexistent/file.csv\""));
    }

    #[test]
    fn extensions() {
        assert_eq!(
            DataSource::Local("data/a.csv".into()).extension().as_deref(),
            Some("csv")
        );
        assert_eq!(
            DataSource::Remote("https://x.org/d/b.json?raw=1".into())
                .extension()
                .as_deref(),
            Some("json")
        );
        assert_eq!(DataSource::Local(".hidden".into()).extension(), None);
        assert_eq!(DataSource::Inline(json!([1])).extension(), None);
    }
}
