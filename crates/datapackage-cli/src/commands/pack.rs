use super::{json_pretty, ok_mark, CommandResult, EXIT_SUCCESS};
use datapackage_core::load_package;
use serde_json::json;
use std::path::Path;

pub fn run(source: &str, archive: &Path, base_path: Option<&Path>, json: bool) -> CommandResult {
    let package = load_package(source, base_path)?;
    package.save(archive)?;
    let resources = package.descriptor().resources().len();
    if json {
        println!(
            "{}",
            json_pretty(&json!({
                "archive": archive.display().to_string(),
                "resources": resources,
            }))?
        );
    } else {
        println!(
            "{} packed {resources} resources into {}",
            ok_mark(),
            archive.display()
        );
    }
    Ok(EXIT_SUCCESS)
}
