//! Canonical ledger address representation
//!
//! Every address entering the service (from the ledger, from the database, or
//! from a bearer token) is normalized here before it is stored or compared.
//! Role checks in the loan lifecycle depend on both sides of every equality
//! using the same canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid ledger address: {0}")]
    Invalid(String),
}

/// A ledger account identifier in canonical form: `0x` prefix followed by
/// 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address. Accepts any hex casing and an
    /// optional `0x` prefix.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::Invalid(trimmed.to_string()));
        }

        Ok(Address(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_prefix() {
        let mixed = Address::parse("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
        let lower = Address::parse("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(mixed.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let addr = Address::parse("  0xabcdef0123456789abcdef0123456789abcdef01 ").unwrap();
        assert_eq!(addr.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("").is_err());
        assert!(Address::parse("0xzzzdef0123456789abcdef0123456789abcdef01").is_err());
        // 41 hex chars
        assert!(Address::parse("0xabcdef0123456789abcdef0123456789abcdef012").is_err());
    }

    #[test]
    fn test_comparison_is_case_insensitive_via_normalization() {
        let a = Address::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let b = Address::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(a, b);
    }
}
