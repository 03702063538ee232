//! `Tag` / `Tags`: the struct tag model.

use crate::quote::{go_quote, go_unquote_bytes};
use nom::{
    branch::alt,
    bytes::complete::{take_while1, take_while_m_n},
    character::complete::{anychar, char as pchar},
    combinator::recognize,
    multi::many0_count,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Planned tags for the fields of one struct, keyed by Go field identifier.
pub type FieldTags = BTreeMap<String, Tags>;

/// Planned tags for a whole generated file, keyed by Go declaration name.
pub type StructTags = BTreeMap<String, FieldTags>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    #[error("bad syntax for struct tag key at byte {offset}")]
    KeySyntax { offset: usize },
    #[error("bad syntax for struct tag pair at byte {offset}")]
    PairSyntax { offset: usize },
    #[error("bad syntax for struct tag value at byte {offset}")]
    ValueSyntax { offset: usize },
}

/// One `key:"name,opt1,opt2"` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// The quoted value as written, when its escapes do not spell UTF-8.
    /// `name`/`options` then hold a lossy decoding.
    #[serde(skip)]
    verbatim: Option<Verbatim>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Verbatim {
    value: String,
    literal: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            options: Vec::new(),
            verbatim: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// The unquoted value: name followed by any options, comma separated.
    pub fn value(&self) -> String {
        if self.options.is_empty() {
            return self.name.clone();
        }
        let mut value = self.name.clone();
        for opt in &self.options {
            value.push(',');
            value.push_str(opt);
        }
        value
    }

    fn from_value(key: &str, value: &str) -> Self {
        let mut parts = value.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        Self {
            key: key.to_string(),
            name,
            options: parts.map(str::to_string).collect(),
            verbatim: None,
        }
    }

    /// Decode a quoted value; returns `None` on a syntax error.
    fn from_literal(key: &str, literal: &str) -> Option<Self> {
        match String::from_utf8(go_unquote_bytes(literal)?) {
            Ok(value) => Some(Self::from_value(key, &value)),
            Err(invalid) => {
                let value = String::from_utf8_lossy(invalid.as_bytes()).into_owned();
                let mut tag = Self::from_value(key, &value);
                tag.verbatim = Some(Verbatim {
                    value,
                    literal: literal.to_string(),
                });
                Some(tag)
            }
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value();
        match &self.verbatim {
            Some(verbatim) if verbatim.value == value => {
                write!(f, "{}:{}", self.key, verbatim.literal)
            }
            _ => write!(f, "{}:{}", self.key, go_quote(&value)),
        }
    }
}

/// An ordered set of tags.
///
/// [`Tags::set`] replaces an existing key in place and appends new keys, so
/// the serialized order is first-insertion order. Keys are unique unless the
/// parsed text already repeated one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags {
    tags: Vec<Tag>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tag text (without the surrounding backticks).
    pub fn parse(text: &str) -> Result<Self, TagParseError> {
        let mut tags = Tags::new();
        let mut rest = text;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            let offset = text.len() - rest.len();

            let (after_key, key) =
                tag_key(rest).map_err(|_| TagParseError::KeySyntax { offset })?;
            let after_colon = after_key
                .strip_prefix(':')
                .filter(|r| !r.is_empty())
                .ok_or(TagParseError::PairSyntax { offset })?;
            let (after_value, literal) =
                quoted(after_colon).map_err(|_| TagParseError::ValueSyntax { offset })?;
            let tag =
                Tag::from_literal(key, literal).ok_or(TagParseError::ValueSyntax { offset })?;

            // Repeated keys in existing text are kept as written.
            tags.tags.push(tag);
            rest = after_value;
        }
        Ok(tags)
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.key == key)
    }

    /// Insert `tag`, replacing every existing entry with the same key in place.
    pub fn set(&mut self, tag: Tag) {
        let mut replaced = false;
        for existing in self.tags.iter_mut().filter(|t| t.key == tag.key) {
            *existing = tag.clone();
            replaced = true;
        }
        if !replaced {
            self.tags.push(tag);
        }
    }

    /// Set `key:"name"`; empty keys are ignored.
    pub fn set_name(&mut self, key: &str, name: &str) {
        if key.is_empty() {
            return;
        }
        self.set(Tag::new(key, name));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.key.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}

impl FromStr for Tags {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tags::parse(s)
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.set(tag);
        }
        tags
    }
}

// ============================================================================
// Parser pieces
// ============================================================================

/// A key is a run of non-space, non-control bytes excluding `:` and `"`.
fn tag_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c > ' ' && c != ':' && c != '"' && c != '\u{7f}')(input)
}

/// A double-quoted literal; a backslash always consumes the following char.
fn quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        pchar('"'),
        many0_count(alt((
            recognize(preceded(pchar('\\'), anychar)),
            take_while_m_n(1, 1, |c: char| c != '"' && c != '\\'),
        ))),
        pchar('"'),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_protoc_gen_go_tag() {
        let tags = Tags::parse(r#"protobuf:"bytes,1,opt,name=user_id,json=userId,proto3" json:"user_id,omitempty""#)
            .expect("parse");
        assert_eq!(tags.len(), 2);
        let pb = tags.get("protobuf").unwrap();
        assert_eq!(pb.name, "bytes");
        assert_eq!(pb.options, vec!["1", "opt", "name=user_id", "json=userId", "proto3"]);
        assert_eq!(tags.get("json").unwrap().value(), "user_id,omitempty");
    }

    #[test]
    fn empty_and_blank_text_parse_to_empty_set() {
        assert!(Tags::parse("").unwrap().is_empty());
        assert!(Tags::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn reports_each_syntax_class() {
        assert_eq!(
            Tags::parse(r#":"x""#),
            Err(TagParseError::KeySyntax { offset: 0 })
        );
        assert_eq!(
            Tags::parse(r#"json "x""#),
            Err(TagParseError::PairSyntax { offset: 0 })
        );
        assert_eq!(
            Tags::parse("json:"),
            Err(TagParseError::PairSyntax { offset: 0 })
        );
        assert_eq!(
            Tags::parse(r#"a:"1" json:x"#),
            Err(TagParseError::ValueSyntax { offset: 6 })
        );
        assert_eq!(
            Tags::parse(r#"json:"unterminated"#),
            Err(TagParseError::ValueSyntax { offset: 0 })
        );
    }

    #[test]
    fn set_replaces_in_place_and_appends_new_keys() {
        let mut tags = Tags::parse(r#"a:"1" b:"2" c:"3""#).unwrap();
        tags.set(Tag::new("b", "two"));
        tags.set(Tag::new("d", "4"));
        assert_eq!(tags.to_string(), r#"a:"1" b:"two" c:"3" d:"4""#);
    }

    #[test]
    fn set_name_ignores_empty_key() {
        let mut tags = Tags::new();
        tags.set_name("", "x");
        assert!(tags.is_empty());
    }

    #[test]
    fn values_outside_utf8_are_kept_as_written() {
        let text = r#"x:"\xff,opt" json:"a""#;
        let tags = Tags::parse(text).unwrap();
        assert_eq!(tags.get("x").map(|t| t.name.as_str()), Some("\u{fffd}"));
        assert_eq!(tags.to_string(), text);

        let mut edited = tags.clone();
        edited.set(Tag::new("x", "y"));
        assert_eq!(edited.to_string(), r#"x:"y" json:"a""#);
    }

    #[test]
    fn formatting_normalizes_spacing() {
        let tags = Tags::parse(r#"  a:"1"   b:"x\"y"  "#).unwrap();
        assert_eq!(tags.to_string(), r#"a:"1" b:"x\"y""#);
    }
}
