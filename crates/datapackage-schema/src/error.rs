//! Structured validation report items.
//!
//! Validation never stops at the first problem: every check appends a
//! [`ValidationError`] and the caller receives the ordered list. Positional
//! context (property path, 1-based resource index, line number) travels with
//! each item so reports can be rendered without the original descriptor.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    SchemaViolation,
    ResourceFailedValidation,
    DataStreamFailure,
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A schema or structural violation. `property` is the dotted property
    /// path (`resources[0].path`) when the violation is tied to one.
    SchemaViolation {
        property: Option<String>,
        message: String,
    },
    /// One resource of a package failed its own validation.
    ResourceFailedValidation {
        resource: usize,
        errors: Vec<ValidationError>,
    },
    /// A data source could not be opened (`line == 0`) or a sampled row
    /// failed its field schema.
    DataStreamFailure {
        resource: usize,
        data_stream: usize,
        line: usize,
        error: String,
    },
    /// The descriptor source could not be loaded at all.
    LoadFailed { message: String },
}

impl ValidationError {
    pub fn schema_violation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            property: Some(property.into()),
            message: message.into(),
        }
    }

    pub fn violation(message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            property: None,
            message: message.into(),
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::SchemaViolation { .. } => ValidationErrorKind::SchemaViolation,
            Self::ResourceFailedValidation { .. } => ValidationErrorKind::ResourceFailedValidation,
            Self::DataStreamFailure { .. } => ValidationErrorKind::DataStreamFailure,
            Self::LoadFailed { .. } => ValidationErrorKind::LoadFailed,
        }
    }

    /// Human-readable rendering of this error.
    pub fn message(&self) -> String {
        match self {
            Self::SchemaViolation {
                property: Some(property),
                message,
            } => format!("[{property}] {message}"),
            Self::SchemaViolation {
                property: None,
                message,
            }
            | Self::LoadFailed { message } => message.clone(),
            Self::ResourceFailedValidation { resource, errors } => {
                format!(
                    "resource {resource} failed validation: {}",
                    join_messages(errors)
                )
            }
            Self::DataStreamFailure {
                resource,
                line,
                error,
                ..
            } => {
                if *line > 0 {
                    format!("resource {resource}, line number {line}: {error}")
                } else {
                    format!("resource {resource}: {error}")
                }
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Render a list of errors as one comma separated line.
pub fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An ordered, non-empty-by-convention collection of validation errors, as
/// carried by construction-time failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_messages(&self.0))
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
