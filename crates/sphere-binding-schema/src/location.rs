use serde::Serialize;
use std::fmt;

/// Where a runtime binder reads a field from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingLocation {
    #[default]
    Unspecified,
    Body,
    Query,
    Uri,
    Form,
    Header,
}

impl BindingLocation {
    pub const ALL: [BindingLocation; 6] = [
        BindingLocation::Unspecified,
        BindingLocation::Body,
        BindingLocation::Query,
        BindingLocation::Uri,
        BindingLocation::Form,
        BindingLocation::Header,
    ];

    /// The struct tag key this location is bound through.
    ///
    /// `Body` and `Unspecified` use the compiler's own body tag and need no key.
    pub const fn tag_key(self) -> Option<&'static str> {
        match self {
            BindingLocation::Unspecified | BindingLocation::Body => None,
            BindingLocation::Query => Some("query"),
            BindingLocation::Uri => Some("uri"),
            BindingLocation::Form => Some("form"),
            BindingLocation::Header => Some("header"),
        }
    }

    pub const fn number(self) -> i64 {
        match self {
            BindingLocation::Unspecified => 0,
            BindingLocation::Body => 1,
            BindingLocation::Query => 2,
            BindingLocation::Uri => 3,
            BindingLocation::Form => 4,
            BindingLocation::Header => 5,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.number() == n)
    }

    /// Accepts `BINDING_LOCATION_QUERY` as well as the short `QUERY` / `query`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("BINDING_LOCATION_").unwrap_or(&upper);
        match short {
            "UNSPECIFIED" => Some(BindingLocation::Unspecified),
            "BODY" => Some(BindingLocation::Body),
            "QUERY" => Some(BindingLocation::Query),
            "URI" => Some(BindingLocation::Uri),
            "FORM" => Some(BindingLocation::Form),
            "HEADER" => Some(BindingLocation::Header),
            _ => None,
        }
    }

    pub const fn proto_name(self) -> &'static str {
        match self {
            BindingLocation::Unspecified => "BINDING_LOCATION_UNSPECIFIED",
            BindingLocation::Body => "BINDING_LOCATION_BODY",
            BindingLocation::Query => "BINDING_LOCATION_QUERY",
            BindingLocation::Uri => "BINDING_LOCATION_URI",
            BindingLocation::Form => "BINDING_LOCATION_FORM",
            BindingLocation::Header => "BINDING_LOCATION_HEADER",
        }
    }
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proto_name())
    }
}
