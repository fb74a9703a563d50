pub mod pack;
pub mod profiles;
pub mod read;
pub mod unpack;
pub mod validate;

use console::Style;
use datapackage_core::CoreError;
use serde_json::Value;
use std::fmt;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION_ERRORS: u8 = 2;

/// A failed command and the exit code it maps to.
#[derive(Debug)]
pub struct CommandError {
    code: u8,
    message: String,
}

impl CommandError {
    pub fn code(&self) -> u8 {
        self.code
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<CoreError> for CommandError {
    fn from(e: CoreError) -> Self {
        let code = match e {
            CoreError::PackageValidationFailed(_) | CoreError::ResourceValidationFailed(_) => {
                EXIT_VALIDATION_ERRORS
            }
            _ => EXIT_FAILURE,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self {
            code: EXIT_FAILURE,
            message,
        }
    }
}

pub type CommandResult = Result<u8, CommandError>;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn ok_mark() -> String {
    Style::new().green().apply_to("✓").to_string()
}

pub fn fail_mark() -> String {
    Style::new().red().bold().apply_to("✗").to_string()
}

/// A row as printed in text mode: lines without their terminator, anything
/// else as compact JSON.
pub fn display_row(row: &Value) -> String {
    match row {
        Value::String(line) => line.trim_end_matches(['\r', '\n']).to_owned(),
        other => other.to_string(),
    }
}
