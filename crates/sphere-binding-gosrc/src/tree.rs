//! The merge step, over an abstract tree of tagged struct declarations.

use sphere_binding_tags::{StructTags, TagParseError, Tags};
use thiserror::Error;

/// The three operations the merge needs from a parsed source file.
pub trait TagTree {
    fn has_struct(&self, name: &str) -> bool;

    /// Current tag text of `strukt.field` (without delimiters), `Some("")` when
    /// the field has no tag, `None` when the field does not exist.
    fn field_tag(&self, strukt: &str, field: &str) -> Option<String>;

    fn set_field_tag(&mut self, strukt: &str, field: &str, tag: &str);
}

#[derive(Debug, Error)]
#[error("existing tag on {strukt}.{field} does not parse: {source}")]
pub struct RetagError {
    pub strukt: String,
    pub field: String,
    #[source]
    pub source: TagParseError,
}

/// Merge `plan` into `tree`; returns whether any tag text changed.
///
/// Planned entries are set over the parsed existing tags (in place for known
/// keys, appended otherwise). Structs and fields missing from the tree are
/// skipped. Running the same plan again reports no change.
pub fn retag<T: TagTree + ?Sized>(tree: &mut T, plan: &StructTags) -> Result<bool, RetagError> {
    let mut changed = false;
    for (strukt, fields) in plan {
        if !tree.has_struct(strukt) {
            tracing::debug!(%strukt, "struct not found in generated source; skipping");
            continue;
        }
        for (field, planned) in fields {
            let Some(current) = tree.field_tag(strukt, field) else {
                tracing::debug!(%strukt, %field, "field not found in generated source; skipping");
                continue;
            };
            let mut merged = Tags::parse(&current).map_err(|source| RetagError {
                strukt: strukt.clone(),
                field: field.clone(),
                source,
            })?;
            let before = merged.to_string();
            for tag in planned {
                merged.set(tag.clone());
            }
            let after = merged.to_string();
            if before != after {
                tracing::trace!(%strukt, %field, %before, %after, "retagged field");
                tree.set_field_tag(strukt, field, &after);
                changed = true;
            }
        }
    }
    Ok(changed)
}


#[cfg(test)]
mod tests {
    use super::fake::FakeTree;
    use super::*;
    use sphere_binding_tags::{FieldTags, Tag};

    fn plan(entries: Vec<(&str, &str, Vec<(&str, &str)>)>) -> StructTags {
        let mut plan = StructTags::new();
        for (strukt, field, tags) in entries {
            let tags: Tags = tags.into_iter().map(|(k, v)| Tag::new(k, v)).collect();
            plan.entry(strukt.to_string())
                .or_insert_with(FieldTags::new)
                .insert(field.to_string(), tags);
        }
        plan
    }

    #[test]
    fn merges_without_reordering_existing_entries() {
        let mut tree = FakeTree::default().with(
            "GetUserRequest",
            "UserId",
            r#"protobuf:"varint,1,opt,name=user_id,proto3" json:"user_id,omitempty""#,
        );
        let plan = plan(vec![("GetUserRequest", "UserId", vec![("uri", "user_id"), ("json", "-")])]);

        assert!(retag(&mut tree, &plan).unwrap());
        assert_eq!(
            tree.tag("GetUserRequest", "UserId"),
            r#"protobuf:"varint,1,opt,name=user_id,proto3" json:"-" uri:"user_id""#
        );
    }

    #[test]
    fn second_run_reports_no_change() {
        let mut tree = FakeTree::default().with("M", "A", r#"json:"a""#);
        let plan = plan(vec![("M", "A", vec![("query", "a"), ("json", "-")])]);
        assert!(retag(&mut tree, &plan).unwrap());
        let once = tree.clone();
        assert!(!retag(&mut tree, &plan).unwrap());
        assert_eq!(tree, once);
    }

    #[test]
    fn missing_structs_and_fields_are_skipped() {
        let mut tree = FakeTree::default().with("M", "A", "");
        let plan = plan(vec![
            ("Missing", "A", vec![("query", "a")]),
            ("M", "Nope", vec![("query", "nope")]),
        ]);
        assert!(!retag(&mut tree, &plan).unwrap());
        assert_eq!(tree.tag("M", "A"), "");
    }

    #[test]
    fn untagged_field_gets_a_tag() {
        let mut tree = FakeTree::default().with("M", "A", "");
        let plan = plan(vec![("M", "A", vec![("header", "a")])]);
        assert!(retag(&mut tree, &plan).unwrap());
        assert_eq!(tree.tag("M", "A"), r#"header:"a""#);
    }

    #[test]
    fn unchanged_values_leave_unnormalized_text_alone() {
        let mut tree = FakeTree::default().with("M", "A", r#"json:"a"   query:"a""#);
        let plan = plan(vec![("M", "A", vec![("query", "a")])]);
        assert!(!retag(&mut tree, &plan).unwrap());
        assert_eq!(tree.tag("M", "A"), r#"json:"a"   query:"a""#);
    }

    #[test]
    fn byte_escaped_values_survive_a_merge() {
        let mut tree = FakeTree::default().with("M", "A", r#"x:"\xff" json:"a""#);
        let plan = plan(vec![("M", "A", vec![("query", "a"), ("json", "-")])]);
        assert!(retag(&mut tree, &plan).unwrap());
        assert_eq!(tree.tag("M", "A"), r#"x:"\xff" json:"-" query:"a""#);
    }

    #[test]
    fn broken_existing_tag_is_an_error() {
        let mut tree = FakeTree::default().with("M", "A", "json:a");
        let plan = plan(vec![("M", "A", vec![("query", "a")])]);
        let err = retag(&mut tree, &plan).expect_err("should fail");
        assert_eq!((err.strukt.as_str(), err.field.as_str()), ("M", "A"));
    }
}
