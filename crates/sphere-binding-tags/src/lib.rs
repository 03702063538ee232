//! Go struct tags, as read and written by `sphere-binding`.
//!
//! A struct tag is the backtick literal that trails a Go field declaration:
//!
//! ```text
//! Id   int64  `protobuf:"varint,1,opt,name=id,proto3" json:"id,omitempty"`
//! ```
//!
//! This crate provides:
//!
//! - [`Tags`]: an ordered, key-unique set of [`Tag`] entries with Go's
//!   `key:"value"` parse/format rules (`reflect.StructTag` syntax, values quoted
//!   per `strconv.Quote`);
//! - [`FieldTags`] / [`StructTags`]: the per-field and per-declaration plans
//!   produced by the schema walker and consumed by the Go source merger;
//! - [`AliasTable`]: the `key=value,key=value` alias configuration.

pub mod alias;
pub mod quote;
pub mod tag;

pub use alias::{validate_tag_key, AliasError, AliasTable};
pub use tag::{FieldTags, StructTags, Tag, TagParseError, Tags};
