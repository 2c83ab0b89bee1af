//! Account addresses
//!
//! The REST API reports addresses as 48-char hex, while operators configure
//! them in the familiar base32 form (optionally hyphenated, any case). Both
//! are decoded to the raw 24 bytes and re-encoded as unpadded uppercase
//! base32, so equality is always byte equality.

use crate::error::{Error, Result};
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Raw address length in bytes
pub const ADDRESS_LEN: usize = 24;

/// Canonical account address (unpadded uppercase base32)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Build from raw bytes
    pub fn from_bytes(bytes: &[u8; ADDRESS_LEN]) -> Self {
        Self(BASE32_NOPAD.encode(bytes))
    }

    /// Parse a hex encoded address as returned by the REST API
    pub fn from_hex(hex_address: &str) -> Result<Self> {
        let bytes = hex::decode(hex_address.trim()).map_err(|e| Error::InvalidAddress {
            address: hex_address.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_slice(hex_address, &bytes)
    }

    /// Parse a base32 address, ignoring hyphens, padding and case
    pub fn from_base32(address: &str) -> Result<Self> {
        let cleaned: String = address
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let bytes = BASE32_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|e| Error::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_slice(address, &bytes)
    }

    /// Parse either encoding; 48 hex digits are taken as hex
    pub fn parse(address: &str) -> Result<Self> {
        let trimmed = address.trim();
        if trimmed.len() == ADDRESS_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::from_hex(trimmed)
        } else {
            Self::from_base32(trimmed)
        }
    }

    fn from_slice(original: &str, bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| Error::InvalidAddress {
            address: original.to_string(),
            reason: format!("expected {} bytes, got {}", ADDRESS_LEN, bytes.len()),
        })?;
        Ok(Self::from_bytes(&raw))
    }

    /// Canonical base32 form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}
