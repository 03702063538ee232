//! Go identifiers and file names, as `protoc-gen-go` derives them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Method names every generated message already has.
const RESERVED_MEMBER_NAMES: &[&str] = &[
    "Reset",
    "String",
    "ProtoMessage",
    "Marshal",
    "Unmarshal",
    "ExtensionRangeArray",
    "ExtensionMap",
    "Descriptor",
];

/// `protoc-gen-go`'s `GoCamelCase`.
///
/// `foo_bar` → `FooBar`, `Outer.Inner` → `Outer_Inner`, `_x` → `XX`.
pub fn go_camel_case(s: &str) -> String {
    let b = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < b.len() {
        let c = b[i];
        let next_lower = i + 1 < b.len() && b[i + 1].is_ascii_lowercase();
        if c == b'.' && next_lower {
            // skip '.' in ".{lower}"
        } else if c == b'.' {
            out.push('_');
        } else if c == b'_' && (i == 0 || b[i - 1] == b'.') {
            out.push('X');
        } else if c == b'_' && next_lower {
            // skip '_' in "_{lower}"
        } else if c.is_ascii_digit() {
            out.push(c as char);
        } else {
            out.push(c.to_ascii_uppercase() as char);
            while i + 1 < b.len() && b[i + 1].is_ascii_lowercase() {
                i += 1;
                out.push(b[i] as char);
            }
        }
        i += 1;
    }
    out
}

/// Go declaration name for a message, from its name path below the package.
pub fn message_go_name(path: &[String]) -> String {
    go_camel_case(&path.join("."))
}

/// Assigns collision-free Go member names within one message.
#[derive(Debug)]
pub struct MemberNamer {
    used: HashMap<String, bool>,
}

impl Default for MemberNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberNamer {
    pub fn new() -> Self {
        let used = RESERVED_MEMBER_NAMES
            .iter()
            .map(|n| (n.to_string(), true))
            .collect();
        Self { used }
    }

    /// Append `_` until `name` (and its `Get` getter, if any) is free.
    pub fn unique(&mut self, name: &str, has_getter: bool) -> String {
        let mut name = name.to_string();
        while self.is_used(&name) || (has_getter && self.is_used(&format!("Get{name}"))) {
            name.push('_');
        }
        self.used.insert(name.clone(), true);
        self.used.insert(format!("Get{name}"), has_getter);
        name
    }

    fn is_used(&self, name: &str) -> bool {
        self.used.get(name).copied().unwrap_or(false)
    }
}

/// `protoc-gen-go`'s `paths=` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathsMode {
    /// Output path follows the Go import path from `go_package`.
    #[default]
    Import,
    /// Output path mirrors the `.proto` path.
    SourceRelative,
}

impl FromStr for PathsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "import" => Ok(PathsMode::Import),
            "source_relative" => Ok(PathsMode::SourceRelative),
            other => Err(format!(
                "unknown paths mode `{other}` (expected import|source_relative)"
            )),
        }
    }
}

/// The generated file name without `.pb.go`, relative to the output directory.
///
/// Returns `None` in import mode when the file has no `go_package`; callers fall
/// back to the source-relative prefix.
pub fn generated_filename_prefix(
    proto_name: &str,
    go_package: Option<&str>,
    mode: PathsMode,
) -> Option<String> {
    let stem = proto_name.strip_suffix(".proto").unwrap_or(proto_name);
    match mode {
        PathsMode::SourceRelative => Some(stem.to_string()),
        PathsMode::Import => {
            let import_path = go_package?.split(';').next()?.trim();
            if import_path.is_empty() {
                return None;
            }
            let base = stem.rsplit('/').next().unwrap_or(stem);
            Some(format!("{import_path}/{base}"))
        }
    }
}
