//! Address Normalizer
//!
//! Every chain address entering scoring, storage or signing goes through
//! [`Address::parse`]. Validation is structural only (`0x` + 40 hex digits,
//! any letter case); canonicalization then lowercases the string. Keeping the
//! two phases apart lets the request validators report grammar failures
//! without touching normalization rules.

use ethers::types::H160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PvcError, Result};

const ADDRESS_HEX_LEN: usize = 40;

/// Canonical (lowercase) 20-byte account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    canonical: String,
    bytes: H160,
}

impl Address {
    /// Validate and canonicalize an address string.
    pub fn parse(input: &str) -> Result<Self> {
        validate(input)?;
        let canonical = canonicalize(input);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&canonical[2..], &mut bytes)
            .map_err(|_| PvcError::InvalidAddress(input.to_string()))?;
        Ok(Self {
            canonical,
            bytes: H160::from(bytes),
        })
    }

    /// Canonical lowercase form, `0x`-prefixed.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Raw 20-byte form for contract calls and typed-data encoding.
    pub fn to_h160(&self) -> H160 {
        self.bytes
    }

    /// EIP-55 mixed-case rendering, for display only.
    pub fn to_checksum(&self) -> String {
        ethers::utils::to_checksum(&self.to_h160(), None)
    }

    /// The all-zero address.
    pub fn zero() -> Self {
        Self::from(H160::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.is_zero()
    }
}

impl From<H160> for Address {
    fn from(bytes: H160) -> Self {
        Self {
            canonical: format!("0x{}", hex::encode(bytes.as_bytes())),
            bytes,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for Address {
    type Err = PvcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Structural check: `0x` followed by exactly 40 hex digits.
pub fn validate(input: &str) -> Result<()> {
    if input.is_empty() {
        return Err(PvcError::InvalidAddress("address is required".to_string()));
    }

    let hex_part = input
        .strip_prefix("0x")
        .ok_or_else(|| PvcError::InvalidAddress(input.to_string()))?;

    if hex_part.len() != ADDRESS_HEX_LEN || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PvcError::InvalidAddress(input.to_string()));
    }

    Ok(())
}

/// Pure transform to the canonical lowercase form. Assumes `validate` passed.
pub fn canonicalize(input: &str) -> String {
    input.to_ascii_lowercase()
}

/// Convenience wrapper returning the canonical string.
pub fn normalize(input: &str) -> Result<String> {
    Address::parse(input).map(|a| a.canonical)
}

/// Structural equality after independent normalization. Malformed input on
/// either side compares unequal.
pub fn equals(a: &str, b: &str) -> bool {
    match (Address::parse(a), Address::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
