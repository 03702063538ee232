//! Message tree traversal: one [`StructTags`] plan per schema unit.

use crate::build::{build_field_tags, TaggerConfig};
use crate::model::{Field, Message, ProtoFile};
use crate::resolve::{resolve, BindingDefaults};
use crate::Result;
use sphere_binding_tags::{FieldTags, StructTags};

/// Plan the tags for every message in `file`.
///
/// Declarations with nothing to tag are left out, so the merger never
/// touches them.
pub fn extract_file(file: &ProtoFile, config: &TaggerConfig) -> Result<StructTags> {
    let root = BindingDefaults::default();
    let mut plan = StructTags::new();
    for message in &file.messages {
        extract_message(message, &root, config, &mut plan)?;
    }
    plan.retain(|_, fields| !fields.is_empty());
    tracing::debug!(file = %file.name, structs = plan.len(), "planned struct tags");
    Ok(plan)
}

/// Plan `message` and its nested messages into `plan`.
///
/// Every visited message gets an entry, possibly empty.
pub fn extract_message(
    message: &Message,
    parent: &BindingDefaults,
    config: &TaggerConfig,
    plan: &mut StructTags,
) -> Result<()> {
    let defaults = resolve(message, parent);
    let mut fields = FieldTags::new();

    for field in &message.fields {
        plan_field(message, field, &defaults, config, &mut fields, plan)?;
    }

    for oneof in &message.oneofs {
        let group = resolve(oneof, &defaults);
        for field in &oneof.fields {
            plan_field(message, field, &group, config, &mut fields, plan)?;
        }
    }

    for nested in &message.messages {
        extract_message(nested, &defaults, config, plan)?;
    }

    plan.entry(message.go_name.clone()).or_default().extend(fields);
    Ok(())
}

fn plan_field(
    message: &Message,
    field: &Field,
    inherited: &BindingDefaults,
    config: &TaggerConfig,
    fields: &mut FieldTags,
    plan: &mut StructTags,
) -> Result<()> {
    let effective = resolve(field, inherited);
    let tags = build_field_tags(&message.name, field, &effective, config)?;
    if tags.is_empty() {
        return Ok(());
    }
    if let Some(wrapper) = &field.oneof_wrapper {
        plan.entry(wrapper.clone())
            .or_default()
            .insert(field.go_name.clone(), tags.clone());
    }
    fields.insert(field.go_name.clone(), tags);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::BindingLocation;
    use crate::model::{BindingOptions, Oneof};

    fn file(messages: Vec<Message>) -> ProtoFile {
        ProtoFile {
            name: "test.proto".to_string(),
            messages,
            ..Default::default()
        }
    }

    fn tag_text(plan: &StructTags, decl: &str, field: &str) -> Option<String> {
        plan.get(decl)?.get(field).map(|t| t.to_string())
    }

    #[test]
    fn message_auto_tags_apply_to_plain_fields() {
        let msg = Message::new("User", "User")
            .with_options(BindingOptions::auto_tags(&["db"]))
            .with_field(Field::new("name"));
        let plan = extract_file(&file(vec![msg]), &TaggerConfig::default()).unwrap();
        assert_eq!(tag_text(&plan, "User", "Name").as_deref(), Some(r#"db:"name""#));
    }

    #[test]
    fn innermost_explicit_location_wins() {
        let inner = Message::new("Inner", "Outer_Inner")
            .with_field(Field::new("a"))
            .with_field(Field::new("b").with_location(BindingLocation::Header))
            .with_oneof(
                Oneof::new("choice")
                    .with_options(BindingOptions::location(BindingLocation::Form))
                    .with_field(Field::new("c"))
                    .with_field(Field::new("d").with_location(BindingLocation::Uri)),
            );
        let outer = Message::new("Outer", "Outer")
            .with_options(BindingOptions::location(BindingLocation::Query))
            .with_field(Field::new("top"))
            .with_message(inner);

        let plan = extract_file(&file(vec![outer]), &TaggerConfig::default()).unwrap();
        assert_eq!(tag_text(&plan, "Outer", "Top").unwrap(), r#"query:"top" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "A").unwrap(), r#"query:"a" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "B").unwrap(), r#"header:"b" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "C").unwrap(), r#"form:"c" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "D").unwrap(), r#"uri:"d" json:"-""#);
    }

    #[test]
    fn nested_message_default_overrides_its_parent() {
        let deep = Message::new("Deep", "Outer_Inner_Deep").with_field(Field::new("z"));
        let inner = Message::new("Inner", "Outer_Inner")
            .with_options(BindingOptions::location(BindingLocation::Uri))
            .with_field(Field::new("a"))
            .with_field(Field::new("b").with_location(BindingLocation::Header))
            .with_message(deep);
        let outer = Message::new("Outer", "Outer")
            .with_options(BindingOptions::location(BindingLocation::Query))
            .with_field(Field::new("top"))
            .with_message(inner);

        let plan = extract_file(&file(vec![outer]), &TaggerConfig::default()).unwrap();
        assert_eq!(tag_text(&plan, "Outer", "Top").unwrap(), r#"query:"top" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "A").unwrap(), r#"uri:"a" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner", "B").unwrap(), r#"header:"b" json:"-""#);
        assert_eq!(tag_text(&plan, "Outer_Inner_Deep", "Z").unwrap(), r#"uri:"z" json:"-""#);
    }

    #[test]
    fn oneof_body_default_clears_message_location() {
        let msg = Message::new("Req", "Req")
            .with_options(BindingOptions::location(BindingLocation::Query))
            .with_oneof(
                Oneof::new("payload")
                    .with_options(BindingOptions::location(BindingLocation::Body))
                    .with_field(Field::new("raw")),
            );
        let plan = extract_file(&file(vec![msg]), &TaggerConfig::default()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn oneof_fields_are_also_planned_on_their_wrapper() {
        let mut field = Field::new("email").with_location(BindingLocation::Query);
        field.oneof_wrapper = Some("Lookup_Email".to_string());
        let msg = Message::new("Lookup", "Lookup").with_oneof(Oneof::new("key").with_field(field));
        let plan = extract_file(&file(vec![msg]), &TaggerConfig::default()).unwrap();
        assert_eq!(
            tag_text(&plan, "Lookup", "Email"),
            tag_text(&plan, "Lookup_Email", "Email")
        );
        assert!(tag_text(&plan, "Lookup_Email", "Email").is_some());
    }

    #[test]
    fn untagged_messages_are_dropped_from_the_plan() {
        let msg = Message::new("Plain", "Plain")
            .with_field(Field::new("x"))
            .with_message(
                Message::new("Deep", "Plain_Deep")
                    .with_field(Field::new("y").with_location(BindingLocation::Uri)),
            );
        let plan = extract_file(&file(vec![msg]), &TaggerConfig::default()).unwrap();
        assert_eq!(plan.keys().collect::<Vec<_>>(), ["Plain_Deep"]);
    }

    #[test]
    fn every_visited_message_has_an_entry_before_filtering() {
        let msg = Message::new("Plain", "Plain").with_message(Message::new("Deep", "Plain_Deep"));
        let mut plan = StructTags::new();
        extract_message(&msg, &BindingDefaults::default(), &TaggerConfig::default(), &mut plan)
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.values().all(|f| f.is_empty()));
    }
}
