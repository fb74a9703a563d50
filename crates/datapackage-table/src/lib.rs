//! Tabular engine for data package resources.
//!
//! A [`TableSchema`] is parsed from a resource's `schema` object; it casts raw
//! cells (CSV strings or inline JSON values) into typed JSON values. A
//! [`Table`] pairs a row source ([`CsvSource`] or [`NativeSource`]) with a
//! schema and yields one typed record per data row.

pub mod field;
pub mod schema;
pub mod source;

pub use field::{Constraints, Field, FieldType};
pub use schema::{TableSchema, DEFAULT_MISSING_VALUES};
pub use source::{write_csv, CsvSource, NativeSource, RawRow, RowSource, Table};

use thiserror::Error;

/// A typed record: field name -> cast value, in schema order.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid table schema: {0}")]
    InvalidSchema(String),
    #[error("header row has {found} columns but the schema defines {expected} fields")]
    HeaderMismatch { expected: usize, found: usize },
    #[error("row has {found} values but the header has {expected} columns")]
    RowLength { expected: usize, found: usize },
    #[error("field '{field}' has an invalid {field_type} value '{value}': {reason}")]
    InvalidValue {
        field: String,
        field_type: FieldType,
        value: String,
        reason: String,
    },
    #[error("field '{field}' is required but the value is missing")]
    MissingRequired { field: String },
    #[error("row is not an object: {0}")]
    NotARecord(String),
}
