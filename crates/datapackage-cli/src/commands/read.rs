use super::{display_row, json_pretty, CommandResult, EXIT_SUCCESS};
use datapackage_core::load_package;
use std::path::Path;

pub fn run(
    source: &str,
    resource: &str,
    limit: Option<usize>,
    base_path: Option<&Path>,
    json: bool,
) -> CommandResult {
    let package = load_package(source, base_path)?;
    let mut resource = package.resource(resource)?;
    let rows = resource.read(limit)?;
    if json {
        println!("{}", json_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", display_row(row));
        }
    }
    Ok(EXIT_SUCCESS)
}
