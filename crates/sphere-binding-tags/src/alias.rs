//! Binding tag aliases (`query=form,uri=path`).
//!
//! Whenever a base key (e.g. `query`) is emitted for a field, every alias
//! registered for it receives the same value.

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

const ILLEGAL_KEY_CHARS: &[char] = &[' ', '\t', '\n', '\r', '`', ':', '"'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("invalid binding alias format '{entry}': expected 'key=value'")]
    Format { entry: String },
    #[error("invalid binding alias '{entry}': {reason}")]
    Invalid { entry: String, reason: String },
}

/// Check that `key` can be written as a struct tag key.
pub fn validate_tag_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("tag key cannot be empty".to_string());
    }
    if key.contains(ILLEGAL_KEY_CHARS) {
        return Err(format!("tag key '{key}' contains illegal characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AliasTable {
    aliases: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key1=value1,key1=value2,key2=value3` string.
    ///
    /// Blank entries are skipped; anything else that is not exactly one
    /// `key=value` pair of valid tag keys is rejected.
    pub fn parse(text: &str) -> Result<Self, AliasError> {
        let mut table = AliasTable::new();
        for entry in text.split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            let mut parts = entry.split('=');
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(AliasError::Format {
                    entry: entry.to_string(),
                });
            };
            let (key, value) = (key.trim(), value.trim());
            for part in [key, value] {
                validate_tag_key(part).map_err(|reason| AliasError::Invalid {
                    entry: entry.to_string(),
                    reason,
                })?;
            }
            table.insert(key, value);
        }
        Ok(table)
    }

    pub fn insert(&mut self, key: &str, alias: &str) {
        self.aliases
            .entry(key.to_string())
            .or_default()
            .push(alias.to_string());
    }

    /// Aliases for `key`, in configuration order.
    pub fn aliases_for(&self, key: &str) -> &[String] {
        self.aliases.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl FromStr for AliasTable {
    type Err = AliasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AliasTable::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_keys_in_order() {
        let table = AliasTable::parse("query=form, query=param ,uri=path").unwrap();
        assert_eq!(table.aliases_for("query"), ["form", "param"]);
        assert_eq!(table.aliases_for("uri"), ["path"]);
        assert!(table.aliases_for("header").is_empty());
    }

    #[test]
    fn empty_string_and_blank_entries_are_fine() {
        assert!(AliasTable::parse("").unwrap().is_empty());
        assert!(AliasTable::parse(" , ,").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            AliasTable::parse("query"),
            Err(AliasError::Format { .. })
        ));
        assert!(matches!(
            AliasTable::parse("query=form=x"),
            Err(AliasError::Format { .. })
        ));
    }

    #[test]
    fn rejects_empty_or_illegal_parts() {
        for bad in ["=form", "query=", "qu`ery=form", "query=fo:rm", "query=\"form\"", "query=fo rm"] {
            let err = AliasTable::parse(bad).expect_err(bad);
            assert!(matches!(err, AliasError::Invalid { .. }), "{bad}: {err}");
        }
    }
}
