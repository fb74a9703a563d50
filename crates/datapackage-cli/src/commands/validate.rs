use super::{fail_mark, json_pretty, ok_mark, CommandResult, EXIT_SUCCESS, EXIT_VALIDATION_ERRORS};
use datapackage_core::{Factory, ValidateOptions};
use serde_json::json;
use std::path::Path;

pub fn run(
    source: &str,
    base_path: Option<&Path>,
    sample_rows: usize,
    json: bool,
) -> CommandResult {
    let errors = Factory::default().validate(source, base_path, &ValidateOptions { sample_rows });
    if json {
        println!(
            "{}",
            json_pretty(&json!({"valid": errors.is_empty(), "errors": errors}))?
        );
    } else if errors.is_empty() {
        println!("{} {source} is valid", ok_mark());
    } else {
        println!("{} {source} has {} validation errors", fail_mark(), errors.len());
        for error in &errors {
            println!("  {error}");
        }
    }
    Ok(if errors.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_VALIDATION_ERRORS
    })
}
