//! Descriptor set JSON → schema model.
//!
//! Input is a `google.protobuf.FileDescriptorSet` rendered as JSON, e.g. by
//!
//! ```text
//! buf build --as-file-descriptor-set -o descriptor.json
//! ```
//!
//! Extension options are rendered as bracketed keys inside each options
//! object, which is what makes binding options readable without an
//! extension-aware protobuf runtime:
//!
//! ```json
//! { "name": "user_id", "options": { "[sphere.binding.location]": "BINDING_LOCATION_URI" } }
//! ```

use crate::goname::{go_camel_case, message_go_name, MemberNamer};
use crate::location::BindingLocation;
use crate::model::{BindingOptions, Field, Message, Oneof, ProtoFile};
use crate::{Result, SchemaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Extension names, per scope.
const MESSAGE_LOCATION: &str = "default_location";
const MESSAGE_AUTO_TAGS: &str = "default_auto_tags";
const ONEOF_LOCATION: &str = "default_oneof_location";
const ONEOF_AUTO_TAGS: &str = "default_oneof_auto_tags";
const FIELD_LOCATION: &str = "location";
const FIELD_AUTO_TAGS: &str = "auto_tags";
const FIELD_TAGS: &str = "tags";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Protobuf package declaring the binding extensions.
    pub extension_package: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extension_package: "sphere.binding".to_string(),
        }
    }
}

/// Parse a descriptor set and convert every file in it.
pub fn load_descriptor_set_json(text: &str, opts: &LoadOptions) -> Result<Vec<ProtoFile>> {
    let set: FileDescriptorSetJson = serde_json::from_str(text)?;
    let ext = Extensions {
        package: &opts.extension_package,
    };
    set.file.iter().map(|f| convert_file(f, &ext)).collect()
}

// =============================================================================
// Descriptor JSON structs (accept both protojson and original field names)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct FileDescriptorSetJson {
    #[serde(default)]
    file: Vec<FileDescriptorProtoJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileDescriptorProtoJson {
    name: Option<String>,
    package: Option<String>,
    #[serde(default, rename = "messageType", alias = "message_type")]
    message_type: Vec<DescriptorProtoJson>,
    #[serde(default)]
    options: Option<FileOptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileOptionsJson {
    #[serde(rename = "goPackage", alias = "go_package")]
    go_package: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    field: Vec<FieldDescriptorProtoJson>,
    #[serde(default, rename = "nestedType", alias = "nested_type")]
    nested_type: Vec<DescriptorProtoJson>,
    #[serde(default, rename = "enumType", alias = "enum_type")]
    enum_type: Vec<NamedJson>,
    #[serde(default, rename = "oneofDecl", alias = "oneof_decl")]
    oneof_decl: Vec<OneofDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedJson {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OneofDescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldDescriptorProtoJson {
    name: Option<String>,
    #[serde(rename = "oneofIndex", alias = "oneof_index")]
    oneof_index: Option<usize>,
    #[serde(default, rename = "proto3Optional", alias = "proto3_optional")]
    proto3_optional: bool,
    #[serde(default)]
    options: Option<OptionsJson>,
}

type OptionsJson = BTreeMap<String, Value>;

// =============================================================================
// Extension decoding
// =============================================================================

struct Extensions<'a> {
    package: &'a str,
}

impl Extensions<'_> {
    fn get<'o>(&self, options: Option<&'o OptionsJson>, name: &str) -> Option<&'o Value> {
        let key = format!("[{}.{}]", self.package, name);
        options?.get(&key)
    }

    fn location(
        &self,
        options: Option<&OptionsJson>,
        name: &str,
        node: &str,
    ) -> Result<Option<BindingLocation>> {
        let Some(value) = self.get(options, name) else {
            return Ok(None);
        };
        let decoded = match value {
            Value::String(s) => BindingLocation::from_name(s),
            Value::Number(n) => n.as_i64().and_then(BindingLocation::from_number),
            _ => None,
        };
        decoded
            .map(Some)
            .ok_or_else(|| invalid(node, name, format!("not a binding location: {value}")))
    }

    fn strings(
        &self,
        options: Option<&OptionsJson>,
        name: &str,
        node: &str,
    ) -> Result<Option<Vec<String>>> {
        let Some(value) = self.get(options, name) else {
            return Ok(None);
        };
        match value {
            Value::String(s) => Ok(Some(vec![s.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|it| {
                    it.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(node, name, format!("expected strings, got {it}")))
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            other => Err(invalid(node, name, format!("expected a string list, got {other}"))),
        }
    }

    fn scope(
        &self,
        options: Option<&OptionsJson>,
        location: &str,
        auto_tags: &str,
        node: &str,
    ) -> Result<BindingOptions> {
        Ok(BindingOptions {
            location: self.location(options, location, node)?,
            auto_tags: self.strings(options, auto_tags, node)?,
            tags: Vec::new(),
        })
    }
}

fn invalid(node: &str, option: &str, reason: String) -> SchemaError {
    SchemaError::InvalidOption {
        node: node.to_string(),
        option: option.to_string(),
        reason,
    }
}

// =============================================================================
// Conversion
// =============================================================================

fn convert_file(f: &FileDescriptorProtoJson, ext: &Extensions<'_>) -> Result<ProtoFile> {
    let package = f.package.clone().unwrap_or_default();
    let mut messages = Vec::new();
    for m in &f.message_type {
        if let Some(msg) = convert_message(&package, m, Vec::new(), ext)? {
            messages.push(msg);
        }
    }
    Ok(ProtoFile {
        name: f.name.clone().unwrap_or_default(),
        package,
        go_package: f.options.as_ref().and_then(|o| o.go_package.clone()),
        messages,
    })
}

fn is_map_entry(m: &DescriptorProtoJson) -> bool {
    m.options
        .as_ref()
        .and_then(|o| o.get("mapEntry").or_else(|| o.get("map_entry")))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn convert_message(
    package: &str,
    m: &DescriptorProtoJson,
    mut path: Vec<String>,
    ext: &Extensions<'_>,
) -> Result<Option<Message>> {
    let Some(name) = m.name.clone() else {
        return Ok(None);
    };
    if is_map_entry(m) {
        return Ok(None);
    }
    path.push(name.clone());
    let go_name = message_go_name(&path);
    let node = qualify(package, &path.join("."));
    let options = ext.scope(m.options.as_ref(), MESSAGE_LOCATION, MESSAGE_AUTO_TAGS, &node)?;

    // Go identifiers of nested types, for oneof wrapper collisions.
    let nested_idents: HashSet<String> = m
        .nested_type
        .iter()
        .filter_map(|n| n.name.as_deref())
        .chain(m.enum_type.iter().filter_map(|e| e.name.as_deref()))
        .map(|n| message_go_name(&[path.clone(), vec![n.to_string()]].concat()))
        .collect();

    // A oneof is synthetic (proto3 `optional`) when all its members say so.
    let real_oneof = |idx: usize| {
        m.field
            .iter()
            .filter(|f| f.oneof_index == Some(idx))
            .any(|f| !f.proto3_optional)
    };

    let mut oneofs = Vec::with_capacity(m.oneof_decl.len());
    for o in &m.oneof_decl {
        let oneof_name = o.name.clone().unwrap_or_default();
        let oneof_node = format!("{node}.{oneof_name}");
        oneofs.push(Oneof {
            options: ext.scope(o.options.as_ref(), ONEOF_LOCATION, ONEOF_AUTO_TAGS, &oneof_node)?,
            name: oneof_name,
            go_name: String::new(),
            fields: Vec::new(),
        });
    }

    let mut namer = MemberNamer::new();
    let mut fields = Vec::new();
    for f in &m.field {
        let Some(field_name) = f.name.clone() else {
            continue;
        };
        let field_node = format!("{node}.{field_name}");
        let opts = f.options.as_ref();
        let mut field = Field {
            go_name: namer.unique(&go_camel_case(&field_name), true),
            options: BindingOptions {
                location: ext.location(opts, FIELD_LOCATION, &field_node)?,
                auto_tags: ext.strings(opts, FIELD_AUTO_TAGS, &field_node)?,
                tags: ext.strings(opts, FIELD_TAGS, &field_node)?.unwrap_or_default(),
            },
            name: field_name,
            oneof_wrapper: None,
        };

        match f.oneof_index {
            Some(idx) if idx < oneofs.len() && real_oneof(idx) => {
                let oneof = &mut oneofs[idx];
                if oneof.fields.is_empty() {
                    oneof.go_name = namer.unique(&go_camel_case(&oneof.name), false);
                }
                let mut wrapper = format!("{go_name}_{}", field.go_name);
                while nested_idents.contains(&wrapper) {
                    wrapper.push('_');
                }
                field.oneof_wrapper = Some(wrapper);
                oneof.fields.push(field);
            }
            Some(idx) => {
                // Synthetic oneof names still take a slot in the namer.
                let first = m.field.iter().find(|other| other.oneof_index == Some(idx));
                if first.map_or(false, |first| std::ptr::eq(first, f)) {
                    if let Some(decl) = m.oneof_decl.get(idx) {
                        let synthetic = decl.name.as_deref().unwrap_or_default();
                        namer.unique(&go_camel_case(synthetic), false);
                    }
                }
                fields.push(field);
            }
            None => fields.push(field),
        }
    }
    oneofs.retain(|o| !o.fields.is_empty());

    let mut messages = Vec::new();
    for nested in &m.nested_type {
        if let Some(msg) = convert_message(package, nested, path.clone(), ext)? {
            messages.push(msg);
        }
    }

    Ok(Some(Message {
        name,
        go_name,
        options,
        fields,
        oneofs,
        messages,
    }))
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}
