//! Whole-pipeline validation that reports instead of failing.

use crate::factory::Factory;
use crate::source::Source;
use crate::{CoreError, Resource};
use datapackage_schema::ValidationError;
use datapackage_stream::StreamError;
use std::path::Path;
use tracing::{debug, info};

/// Rows sampled from each data stream by default.
pub const VALIDATE_PEEK_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Rows read from each data stream before moving on.
    pub sample_rows: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            sample_rows: VALIDATE_PEEK_ROWS,
        }
    }
}

impl Factory {
    /// Load, validate and sample a package. Never fails: load problems,
    /// descriptor violations, unreadable sources and bad rows all end up in
    /// the returned list, which is empty for a valid package.
    pub fn validate(
        &self,
        source: impl Into<Source>,
        base_path: Option<&Path>,
        options: &ValidateOptions,
    ) -> Vec<ValidationError> {
        let package = match self.load_package(source, base_path) {
            Ok(package) => package,
            Err(CoreError::PackageValidationFailed(errors)) => {
                info!("package failed validation with {} errors", errors.len());
                return errors.into_inner();
            }
            Err(e) => return vec![ValidationError::load_failed(e.to_string())],
        };

        let mut errors = Vec::new();
        for (i, resource) in package.iter().enumerate() {
            match resource {
                Ok(resource) => errors.extend(sample_resource(&resource, i + 1, options)),
                Err(e) => errors.push(ValidationError::ResourceFailedValidation {
                    resource: i + 1,
                    errors: vec![ValidationError::violation(e.to_string())],
                }),
            }
        }
        info!(
            "validated package '{}': {} errors",
            package.name().unwrap_or_default(),
            errors.len()
        );
        errors
    }
}

/// Read up to `sample_rows` rows from each stream of `resource`. At most one
/// error is reported per stream.
fn sample_resource(
    resource: &Resource,
    resource_number: usize,
    options: &ValidateOptions,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (j, source) in resource.data_sources().into_iter().enumerate() {
        let failure = |line: usize, error: String| ValidationError::DataStreamFailure {
            resource: resource_number,
            data_stream: j + 1,
            line,
            error,
        };
        debug!("sampling resource {resource_number}, stream {}: {source}", j + 1);
        let stream = match resource.open_data_stream(source) {
            Ok(stream) => stream,
            Err(e) => {
                errors.push(failure(0, e.to_string()));
                continue;
            }
        };
        let first_error = stream
            .take(options.sample_rows)
            .find_map(Result::err);
        if let Some(e) = first_error {
            let line = match &e {
                StreamError::Row { line, .. } => *line,
                _ => 0,
            };
            errors.push(failure(line, e.reason()));
        }
    }
    errors
}
