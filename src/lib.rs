//! Workspace umbrella: the tag codec, the schema planner and the Go source
//! merger under one name, for the cross-crate tests in `tests/`.

pub use sphere_binding_gosrc as gosrc;
pub use sphere_binding_schema as schema;
pub use sphere_binding_tags as tags;
