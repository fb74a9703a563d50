use datapackage_schema::{
    package_equivalent, validate_against, Descriptor, DescriptorKind, Registry, SchemaLocation,
};
use serde_json::json;
use std::sync::Arc;
use tiny_http::{Response, Server};

fn serve_schema(body: &'static str) -> String {
    let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
    let port = server.server_addr().to_ip().unwrap().port();
    std::thread::spawn(move || {
        for req in server.incoming_requests() {
            let _ = req.respond(Response::from_string(body));
        }
    });
    format!("http://127.0.0.1:{port}/profile.json")
}

#[test]
fn resource_profile_resolves_through_package_equivalent() {
    let registry = Registry::new();
    let resource = Descriptor::from_value(json!({
        "name": "r",
        "profile": "tabular-data-resource",
        "schema": {"fields": [{"name": "id", "type": "integer"}]},
        "data": [["id"], [1]]
    }))
    .unwrap();

    let profile = Registry::profile_of(&resource, DescriptorKind::Resource);
    let location = registry.resolve(package_equivalent(&profile), None);
    assert_eq!(
        location,
        SchemaLocation::Bundled("tabular-data-package.json".to_owned())
    );

    let wrapped = json!({
        "name": "dummy-datapackage-name",
        "profile": "tabular-data-package",
        "resources": [resource.to_value()],
    });
    assert!(validate_against(&wrapped, &location).unwrap().is_empty());
}

#[test]
fn remote_profile_schema_is_fetched() {
    let url = serve_schema(
        r#"{"type": "object", "required": ["myCustomFlag"], "properties": {"myCustomFlag": {"type": "boolean"}}}"#,
    );
    let registry = Registry::new();
    let location = registry.resolve(&url, None);
    assert_eq!(location, SchemaLocation::Url(url.clone()));

    let violations = validate_against(&json!({"name": "x"}), &location).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].property, "myCustomFlag");
    assert_eq!(violations[0].message, "The property myCustomFlag is required");

    assert!(validate_against(&json!({"myCustomFlag": true}), &location)
        .unwrap()
        .is_empty());
}

#[test]
fn registered_file_profile_extends_base_package() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("my-profile.json");
    std::fs::write(
        &schema,
        r#"{
            "allOf": [{"$ref": "https://specs.frictionlessdata.io/schemas/data-package.json"}],
            "required": ["owner"]
        }"#,
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register_schema("my-profile", schema.display().to_string());
    let location = registry.resolve("my-profile", None);

    let violations = validate_against(&json!({"name": "dp"}), &location).unwrap();
    let properties: Vec<&str> = violations.iter().map(|v| v.property.as_str()).collect();
    assert!(properties.contains(&"resources"), "{properties:?}");
    assert!(properties.contains(&"owner"), "{properties:?}");
}

#[test]
fn all_schemas_lists_builtins_then_registrations() {
    let mut registry = Registry::new();
    registry.register_schema("zzz", "zzz.json");
    let ids: Vec<String> = registry.all_schemas().into_iter().map(|e| e.id).collect();
    assert_eq!(ids.last().map(String::as_str), Some("zzz"));
    assert_eq!(ids.len(), 5);
}
