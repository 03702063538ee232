//! Location / auto-tag inheritance.

use crate::location::BindingLocation;
use crate::model::{BindingOptions, Field, Message, Oneof};

/// The `(location, auto_tags)` pair threaded down the message tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDefaults {
    pub location: BindingLocation,
    pub auto_tags: Vec<String>,
}

/// A schema node that may carry binding options.
///
/// Messages and oneofs carry subtree defaults, fields carry their own
/// explicit settings; resolution treats all three the same way.
pub trait OptionScope {
    fn binding_options(&self) -> &BindingOptions;

    fn location_option(&self) -> Option<BindingLocation> {
        self.binding_options().location
    }

    fn auto_tags_option(&self) -> Option<&[String]> {
        self.binding_options().auto_tags.as_deref()
    }
}

impl OptionScope for Message {
    fn binding_options(&self) -> &BindingOptions {
        &self.options
    }
}

impl OptionScope for Oneof {
    fn binding_options(&self) -> &BindingOptions {
        &self.options
    }
}

impl OptionScope for Field {
    fn binding_options(&self) -> &BindingOptions {
        &self.options
    }
}

/// Apply `node`'s explicit options over `inherited`.
///
/// Location and auto tags are resolved independently; an absent option
/// passes the inherited value through.
pub fn resolve<N: OptionScope + ?Sized>(node: &N, inherited: &BindingDefaults) -> BindingDefaults {
    BindingDefaults {
        location: node.location_option().unwrap_or(inherited.location),
        auto_tags: node
            .auto_tags_option()
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| inherited.auto_tags.clone()),
    }
}
