use proptest::prelude::*;
use sphere_binding_gosrc::{
    retag, rewrite_generated_file, GoFile, RewriteError, RewriteOptions, RewriteOutcome,
};
use sphere_binding_tags::{FieldTags, StructTags, Tag, Tags};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const USER_PB_GO: &str = r#"// Code generated by protoc-gen-go. DO NOT EDIT.
// source: user/v1/user.proto

package userv1

type GetUserRequest struct {
	state         protoimpl.MessageState
	sizeCache     protoimpl.SizeCache
	unknownFields protoimpl.UnknownFields

	UserId int64 `protobuf:"varint,1,opt,name=user_id,json=userId,proto3" json:"user_id,omitempty"`
}

type ListUsersRequest struct {
	state         protoimpl.MessageState
	sizeCache     protoimpl.SizeCache
	unknownFields protoimpl.UnknownFields

	Page     int32  `protobuf:"varint,1,opt,name=page,proto3" json:"page,omitempty"`
	PageSize int32  `protobuf:"varint,2,opt,name=page_size,json=pageSize,proto3" json:"page_size,omitempty"`
	Filter   string `protobuf:"bytes,3,opt,name=filter,proto3" json:"filter,omitempty"`
}
"#;

fn plan(entries: &[(&str, &str, Vec<(&str, &str)>)]) -> StructTags {
    let mut plan = StructTags::new();
    for (strukt, field, tags) in entries {
        let tags: Tags = tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect();
        plan.entry(strukt.to_string())
            .or_insert_with(FieldTags::new)
            .insert(field.to_string(), tags);
    }
    plan
}

fn setup(out: &Path) -> std::path::PathBuf {
    let path = out.join("github.com/acme/user/v1/user.pb.go");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, USER_PB_GO).unwrap();
    path
}

fn options(out: &Path) -> RewriteOptions {
    RewriteOptions {
        out_dir: out.to_path_buf(),
        gofmt: false,
    }
}

#[test]
fn rewrites_then_settles() {
    let dir = tempdir().unwrap();
    let path = setup(dir.path());
    let plan = plan(&[
        ("GetUserRequest", "UserId", vec![("uri", "user_id"), ("json", "-")]),
        ("ListUsersRequest", "Page", vec![("query", "page"), ("json", "-")]),
    ]);
    let opts = options(dir.path());
    let prefix = "github.com/acme/user/v1/user";

    let first = rewrite_generated_file(&opts, prefix, &plan).unwrap();
    assert_eq!(first, RewriteOutcome::Rewritten(path.clone()));
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains(
        r#"UserId int64 `protobuf:"varint,1,opt,name=user_id,json=userId,proto3" json:"-" uri:"user_id"`"#
    ));
    assert!(text.contains(
        r#"Page     int32  `protobuf:"varint,1,opt,name=page,proto3" json:"-" query:"page"`"#
    ));
    // Untouched fields keep their bytes.
    assert!(text.contains(
        r#"Filter   string `protobuf:"bytes,3,opt,name=filter,proto3" json:"filter,omitempty"`"#
    ));

    let modified = fs::metadata(&path).unwrap().modified().unwrap();
    let second = rewrite_generated_file(&opts, prefix, &plan).unwrap();
    assert_eq!(second, RewriteOutcome::Unchanged(path.clone()));
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
}

#[test]
fn empty_plan_never_touches_the_file_system() {
    let dir = tempdir().unwrap();
    let opts = options(&dir.path().join("does-not-exist"));
    let outcome = rewrite_generated_file(&opts, "whatever", &StructTags::new()).unwrap();
    assert_eq!(outcome, RewriteOutcome::EmptyPlan);
}

#[test]
fn missing_target_is_an_error() {
    let dir = tempdir().unwrap();
    let plan = plan(&[("M", "A", vec![("query", "a")])]);
    let err = rewrite_generated_file(&options(dir.path()), "nope/x", &plan).unwrap_err();
    assert!(matches!(err, RewriteError::TargetNotFound(_)), "{err}");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn traversal_is_rejected_before_io() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("api");
    fs::create_dir(&out).unwrap();
    fs::write(dir.path().join("evil.pb.go"), USER_PB_GO).unwrap();
    let plan = plan(&[("GetUserRequest", "UserId", vec![("query", "x")])]);

    let err = rewrite_generated_file(&options(&out), "../evil", &plan).unwrap_err();
    assert!(matches!(err, RewriteError::PathTraversal { .. }), "{err}");
    assert_eq!(fs::read_to_string(dir.path().join("evil.pb.go")).unwrap(), USER_PB_GO);
}

#[test]
fn syntax_errors_abort_without_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.pb.go");
    fs::write(&path, "package p\n\ntype M struct {\n").unwrap();
    let plan = plan(&[("M", "A", vec![("query", "a")])]);

    let err = rewrite_generated_file(&options(dir.path()), "broken", &plan).unwrap_err();
    assert!(matches!(err, RewriteError::Parse { .. }), "{err}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "package p\n\ntype M struct {\n");
}

fn key() -> impl Strategy<Value = String> {
    proptest::string::string_regex("(query|uri|form|header|db|json|yaml)").unwrap()
}

fn name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z_-]{1,10}").unwrap()
}

fn field() -> impl Strategy<Value = String> {
    proptest::string::string_regex("(Page|PageSize|Filter|Missing)").unwrap()
}

fn is_list_field(line: &str) -> bool {
    line.contains("opt,name=page") || line.contains("opt,name=filter")
}

proptest! {
    #[test]
    fn merge_is_idempotent_and_keeps_other_lines(
        entries in proptest::collection::vec((field(), key(), name()), 0..8)
    ) {
        let mut plan = StructTags::new();
        for (field, key, name) in &entries {
            plan.entry("ListUsersRequest".to_string())
                .or_default()
                .entry(field.clone())
                .or_default()
                .set(Tag::new(key.clone(), name.clone()));
        }

        let mut once = GoFile::parse(USER_PB_GO.to_string()).unwrap();
        retag(&mut once, &plan).unwrap();
        let once = once.render();

        let mut twice = GoFile::parse(once.clone()).unwrap();
        prop_assert!(!retag(&mut twice, &plan).unwrap());
        prop_assert_eq!(twice.render(), once.clone());

        // Lines outside ListUsersRequest's tagged fields are preserved.
        let before: Vec<&str> = USER_PB_GO.lines().filter(|l| !is_list_field(l)).collect();
        let after: Vec<&str> = once.lines().filter(|l| !is_list_field(l)).collect();
        prop_assert_eq!(before, after);
    }
}
