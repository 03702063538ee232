//! Per-field tag construction.

use crate::model::Field;
use crate::resolve::BindingDefaults;
use crate::{Result, SchemaError};
use sphere_binding_tags::{AliasTable, Tags};

/// Tagger settings that apply to every field of every unit in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerConfig {
    /// Exclude a field from the body tag once it is bound elsewhere.
    pub auto_remove_body_tag: bool,
    /// The compiler's own body tag key.
    pub body_tag: String,
    pub aliases: AliasTable,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            auto_remove_body_tag: true,
            body_tag: "json".to_string(),
            aliases: AliasTable::new(),
        }
    }
}

/// Build the tag set for `field` given its resolved defaults.
///
/// Order: auto tags, location tag and its aliases, body removal, manual tags.
/// Later steps overwrite earlier keys, so manual tags always win.
pub fn build_field_tags(
    message: &str,
    field: &Field,
    effective: &BindingDefaults,
    config: &TaggerConfig,
) -> Result<Tags> {
    let mut tags = Tags::new();
    let name = field.name.as_str();

    for key in &effective.auto_tags {
        tags.set_name(key, name);
    }

    if let Some(key) = effective.location.tag_key() {
        tags.set_name(key, name);
        for alias in config.aliases.aliases_for(key) {
            tags.set_name(alias, name);
        }
        if config.auto_remove_body_tag {
            tags.set_name(&config.body_tag, "-");
        }
    }

    for fragment in field.options.tags.iter().filter(|f| !f.is_empty()) {
        let manual = Tags::parse(fragment).map_err(|source| SchemaError::ManualTag {
            message: message.to_string(),
            field: field.name.clone(),
            fragment: fragment.clone(),
            source,
        })?;
        for tag in &manual {
            tags.set(tag.clone());
        }
    }

    Ok(tags)
}
