//! Addresses and mailboxes.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Characters that require a display name to be quoted (RFC 5322 specials).
const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

/// A validated `local@domain` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, lacks exactly one `@`, or
    /// contains whitespace or angle brackets.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into().trim().to_string();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    fn validate(addr: &str) -> Result<()> {
        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!("{addr:?} must contain @")));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(Error::InvalidAddress(format!("{addr:?} is malformed")));
        }
        if addr.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
            return Err(Error::InvalidAddress(format!("{addr:?} contains illegal characters")));
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox: an address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name; empty names are not written.
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a mailbox without a display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a mailbox with a display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Ok(Self {
            name: (!name.trim().is_empty()).then_some(name),
            address: Address::new(address)?,
        })
    }

    /// Formats the mailbox for an address header (`Name <addr>`).
    #[must_use]
    pub fn to_header_value(&self) -> String {
        match &self.name {
            None => self.address.to_string(),
            Some(name) if !name.is_ascii() => {
                format!("{} <{}>", encode_rfc2047(name), self.address)
            }
            Some(name) if name.contains(SPECIALS) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\" <{}>", self.address)
            }
            Some(name) => format!("{name} <{}>", self.address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Joins mailboxes into a folded address-list header value.
#[must_use]
pub fn address_list(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(Mailbox::to_header_value)
        .collect::<Vec<_>>()
        .join(",\r\n ")
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
    fn test_valid_address() {
        let addr = Address::new(" user@example.com ").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Address::new("").is_err());
        assert!(Address::new("userexample.com").is_err());
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("a@b@c").is_err());
        assert!(Address::new("a b@example.com").is_err());
    }

    #[test]
    fn test_header_value_plain_name() {
        let mailbox = Mailbox::with_name("Test Email", "qa@example.com").unwrap();
        assert_eq!(mailbox.to_header_value(), "Test Email <qa@example.com>");
    }

    #[test]
    fn test_header_value_quoted_name() {
        let mailbox = Mailbox::with_name("Doe, Jane", "jane@example.com").unwrap();
        assert_eq!(mailbox.to_header_value(), "\"Doe, Jane\" <jane@example.com>");
    }

    #[test]
    fn test_header_value_encoded_name() {
        let mailbox = Mailbox::with_name("Zoë", "zoe@example.com").unwrap();
        assert!(mailbox.to_header_value().starts_with("=?utf-8?B?"));
    }

    #[test]
    fn test_blank_name_is_dropped() {
        let mailbox = Mailbox::with_name("  ", "x@example.com").unwrap();
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.to_string(), "x@example.com");
    }

    #[test]
    fn test_address_list() {
        let list = address_list(&[
            Mailbox::new("a@example.com").unwrap(),
            Mailbox::with_name("B", "b@example.com").unwrap(),
        ]);
        assert_eq!(list, "a@example.com,\r\n B <b@example.com>");
    }
}
