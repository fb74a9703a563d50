//! Data sources and data streams.
//!
//! A resource declares its data as `path` entries (local files or HTTP(S)
//! URLs) and/or inline `data`. Each becomes one [`DataSource`], and each
//! source is read through one forward-only [`DataStream`]: raw lines for
//! default resources, typed records for tabular ones.

pub mod source;
pub mod stream;

pub use source::{normalize_data_source, validate_data_source, DataSource};
pub use stream::{DataStream, StreamVariant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to open data source \"{data_source}\": {reason}")]
    Open { data_source: String, reason: String },
    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },
    #[error("DataStream does not support rewinding a stream")]
    RewindUnsupported,
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] datapackage_table::TableError),
}

impl StreamError {
    /// Message without the positional prefix, as reported by validation.
    pub fn reason(&self) -> String {
        match self {
            Self::Row { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}
