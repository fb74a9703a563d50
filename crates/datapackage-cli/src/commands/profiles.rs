use super::{json_pretty, CommandResult, EXIT_SUCCESS};
use datapackage_core::Registry;

pub fn run(json: bool) -> CommandResult {
    let entries = Registry::new().all_schemas();
    if json {
        println!("{}", json_pretty(&entries)?);
    } else {
        println!("{:<24} {:<10} SCHEMA", "PROFILE", "SOURCE");
        for entry in &entries {
            let origin = if entry.schema_path.is_some() {
                "bundled"
            } else {
                "remote"
            };
            println!("{:<24} {:<10} {}", entry.id, origin, entry.schema);
        }
    }
    Ok(EXIT_SUCCESS)
}
