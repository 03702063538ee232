//! Binding option resolution (descriptor set → struct tag plan).
//!
//! Pipeline:
//!
//! 1. [`descriptor::load_descriptor_set_json`] turns a `FileDescriptorSet` JSON
//!    (as produced by `buf build -o descriptor.json`) into the small schema
//!    model in [`model`], with binding extensions already decoded and Go
//!    identifiers assigned the way `protoc-gen-go` assigns them.
//! 2. [`walk::extract_file`] walks each file's message tree, resolving the
//!    effective location / auto tags per field ([`resolve`]) and building the
//!    field's tag set ([`build`]).
//!
//! The output, [`StructTags`], is pure data: nothing here touches the
//! generated Go sources.

pub mod build;
pub mod descriptor;
pub mod goname;
pub mod location;
pub mod model;
pub mod resolve;
pub mod walk;

pub use build::TaggerConfig;
pub use descriptor::{load_descriptor_set_json, LoadOptions};
pub use goname::PathsMode;
pub use location::BindingLocation;
pub use model::{BindingOptions, Field, Message, Oneof, ProtoFile};
pub use resolve::{BindingDefaults, OptionScope};
pub use sphere_binding_tags::{FieldTags, StructTags, Tag, Tags};
pub use walk::extract_file;

use sphere_binding_tags::TagParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse descriptor set JSON: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("invalid value for option {option} on {node}: {reason}")]
    InvalidOption {
        node: String,
        option: String,
        reason: String,
    },

    #[error("invalid manual tag {fragment:?} on {message}.{field}: {source}")]
    ManualTag {
        message: String,
        field: String,
        fragment: String,
        #[source]
        source: TagParseError,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
