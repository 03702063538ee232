//! Schema model: the subset of a protobuf file the tagger needs.
//!
//! Every node carries its decoded binding options. Message and oneof options
//! are *defaults* for the subtree; field options apply to the field itself.

use crate::goname::go_camel_case;
use crate::location::BindingLocation;

/// Binding options decoded from one node's options object.
///
/// `None` means the option is absent on this node (inherit), which is
/// distinct from an explicit `Unspecified` / empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOptions {
    pub location: Option<BindingLocation>,
    pub auto_tags: Option<Vec<String>>,
    /// Manual tag fragments; only meaningful on fields.
    pub tags: Vec<String>,
}

/// One schema unit (`.proto` file).
#[derive(Debug, Clone, Default)]
pub struct ProtoFile {
    /// Path of the proto file as seen by the compiler, e.g. `api/user/v1/user.proto`.
    pub name: String,
    pub package: String,
    /// `option go_package`, verbatim.
    pub go_package: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub name: String,
    /// Go declaration name, e.g. `Outer_Inner`.
    pub go_name: String,
    pub options: BindingOptions,
    /// Fields that are not members of a real oneof.
    pub fields: Vec<Field>,
    pub oneofs: Vec<Oneof>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default)]
pub struct Oneof {
    pub name: String,
    pub go_name: String,
    pub options: BindingOptions,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default)]
pub struct Field {
    /// Bare proto name; this is the value written into tags.
    pub name: String,
    /// Go struct member name.
    pub go_name: String,
    /// For oneof members: the generated wrapper struct holding the field.
    pub oneof_wrapper: Option<String>,
    pub options: BindingOptions,
}

impl Message {
    pub fn new(name: &str, go_name: &str) -> Self {
        Self {
            name: name.to_string(),
            go_name: go_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_oneof(mut self, oneof: Oneof) -> Self {
        self.oneofs.push(oneof);
        self
    }

    pub fn with_message(mut self, nested: Message) -> Self {
        self.messages.push(nested);
        self
    }
}

impl Oneof {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            go_name: go_camel_case(name),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

impl Field {
    /// A field whose Go name is the plain camel-cased proto name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            go_name: go_camel_case(name),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: BindingLocation) -> Self {
        self.options.location = Some(location);
        self
    }

    pub fn with_auto_tags(mut self, keys: &[&str]) -> Self {
        self.options.auto_tags = Some(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn with_tags(mut self, fragments: &[&str]) -> Self {
        self.options.tags = fragments.iter().map(|k| k.to_string()).collect();
        self
    }
}

impl BindingOptions {
    pub fn location(location: BindingLocation) -> Self {
        Self {
            location: Some(location),
            ..Default::default()
        }
    }

    pub fn auto_tags(keys: &[&str]) -> Self {
        Self {
            auto_tags: Some(keys.iter().map(|k| k.to_string()).collect()),
            ..Default::default()
        }
    }
}
