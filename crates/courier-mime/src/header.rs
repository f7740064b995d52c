//! Ordered header collection for outgoing messages.

use crate::error::{Error, Result};
use std::fmt;

/// Ordered list of header fields.
///
/// Values are stored exactly as they will be written, so callers encode
/// unstructured text with [`crate::encoding::encode_rfc2047`] first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing fields with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name or the value
    /// contains a bare line break.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate_name(&name)?;
        validate_value(&name, &value)?;
        self.fields.push((name, value));
        Ok(())
    }

    /// Gets the first value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header (case-insensitive).
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if a header with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over all fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("bad field name {name:?}")));
    }
    Ok(())
}

fn validate_value(name: &str, value: &str) -> Result<()> {
    // Folded values ("\r\n" followed by whitespace) are allowed, anything
    // else would inject new header lines.
    let mut rest = value;
    while let Some(pos) = rest.find(['\r', '\n']) {
        let tail = &rest[pos..];
        let Some(after) = tail.strip_prefix("\r\n") else {
            return Err(Error::InvalidHeader(format!("line break in {name}")));
        };
        if !after.starts_with([' ', '\t']) {
            return Err(Error::InvalidHeader(format!("line break in {name}")));
        }
        rest = after;
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut headers = Headers::new();
        headers.add("X-Tag", "one").unwrap();
        headers.add("Subject", "Hi").unwrap();
        headers.add("x-tag", "two").unwrap();

        assert_eq!(headers.get_all("X-TAG"), vec!["one", "two"]);
        assert_eq!(headers.to_string(), "X-Tag: one\r\nSubject: Hi\r\nx-tag: two\r\n");
    }

    #[test]
    fn test_rejects_injection() {
        let mut headers = Headers::new();
        assert!(headers.add("X-Evil", "a\r\nBcc: victim@example.com").is_err());
        assert!(headers.add("X-Evil", "a\nb").is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_allows_folding() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?YQ==?=\r\n =?utf-8?B?Yg==?=").unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_rejects_bad_name() {
        let mut headers = Headers::new();
        assert!(headers.add("Bad Name", "x").is_err());
        assert!(headers.add("", "x").is_err());
    }
}
