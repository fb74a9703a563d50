use super::{json_pretty, ok_mark, CommandResult, EXIT_SUCCESS};
use datapackage_core::{unpack_archive, DESCRIPTOR_FILE};
use serde_json::json;
use std::path::Path;

pub fn run(archive: &Path, dir: &Path, json: bool) -> CommandResult {
    unpack_archive(archive, dir)?;
    let descriptor = dir.join(DESCRIPTOR_FILE);
    if json {
        println!(
            "{}",
            json_pretty(&json!({"descriptor": descriptor.display().to_string()}))?
        );
    } else {
        println!("{} unpacked to {}", ok_mark(), descriptor.display());
    }
    Ok(EXIT_SUCCESS)
}
