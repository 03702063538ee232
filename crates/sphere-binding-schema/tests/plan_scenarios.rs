use serde_json::json;
use sphere_binding_schema::{
    extract_file, load_descriptor_set_json, LoadOptions, StructTags, TaggerConfig,
};
use sphere_binding_tags::AliasTable;

fn plan_for(descriptor: serde_json::Value, config: &TaggerConfig) -> StructTags {
    let files = load_descriptor_set_json(&descriptor.to_string(), &LoadOptions::default())
        .expect("descriptor should load");
    assert_eq!(files.len(), 1);
    extract_file(&files[0], config).expect("plan")
}

fn tag(plan: &StructTags, decl: &str, field: &str) -> String {
    plan[decl][field].to_string()
}

#[test]
fn uri_field_with_body_removal() {
    let plan = plan_for(
        json!({ "file": [{ "name": "u.proto", "messageType": [{
            "name": "GetUserRequest",
            "field": [{ "name": "user_id", "options": { "[sphere.binding.location]": "BINDING_LOCATION_URI" } }]
        }]}]}),
        &TaggerConfig::default(),
    );
    assert_eq!(tag(&plan, "GetUserRequest", "UserId"), r#"uri:"user_id" json:"-""#);
}

#[test]
fn message_default_auto_tags() {
    let plan = plan_for(
        json!({ "file": [{ "name": "u.proto", "messageType": [{
            "name": "User",
            "options": { "[sphere.binding.default_auto_tags]": ["db"] },
            "field": [{ "name": "name" }]
        }]}]}),
        &TaggerConfig::default(),
    );
    assert_eq!(tag(&plan, "User", "Name"), r#"db:"name""#);
}

#[test]
fn manual_tags_coexist_with_location() {
    let plan = plan_for(
        json!({ "file": [{ "name": "u.proto", "messageType": [{
            "name": "Search",
            "field": [{ "name": "field1", "options": {
                "[sphere.binding.location]": "BINDING_LOCATION_QUERY",
                "[sphere.binding.tags]": ["validate:\"required\" custom:\"value\""]
            }}]
        }]}]}),
        &TaggerConfig::default(),
    );
    let tags = &plan["Search"]["Field1"];
    assert_eq!(tags.get("query").unwrap().name, "field1");
    assert_eq!(tags.get("validate").unwrap().name, "required");
    assert_eq!(tags.get("custom").unwrap().name, "value");
}

#[test]
fn alias_fan_out_and_manual_supremacy() {
    let config = TaggerConfig {
        aliases: AliasTable::parse("query=form").unwrap(),
        ..Default::default()
    };
    let plan = plan_for(
        json!({ "file": [{ "name": "u.proto", "messageType": [{
            "name": "List",
            "options": { "[sphere.binding.default_location]": "QUERY" },
            "field": [
                { "name": "x" },
                { "name": "page", "options": { "[sphere.binding.tags]": ["query:\"y\""] } }
            ]
        }]}]}),
        &config,
    );
    assert_eq!(tag(&plan, "List", "X"), r#"query:"x" form:"x" json:"-""#);
    assert_eq!(tag(&plan, "List", "Page"), r#"query:"y" form:"page" json:"-""#);
}

#[test]
fn malformed_manual_tag_aborts_the_unit() {
    let files = load_descriptor_set_json(
        &json!({ "file": [{ "name": "u.proto", "messageType": [{
            "name": "M",
            "field": [{ "name": "f", "options": { "[sphere.binding.tags]": ["oops"] } }]
        }]}]})
        .to_string(),
        &LoadOptions::default(),
    )
    .unwrap();
    let err = extract_file(&files[0], &TaggerConfig::default()).expect_err("should fail");
    assert!(err.to_string().contains("M.f"), "{err}");
}
