use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChainError;

/// A 20-byte account or contract address, kept as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self, ChainError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ChainError::InvalidAddress(input.to_string()))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChainError::InvalidAddress(input.to_string()));
        }

        Ok(Address(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd`, as shown in the connected-account header.
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let addr = Address::parse("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap();
        assert_eq!(addr.as_str(), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Address::parse("5fbdb2315678afecb367f032d93f642f64180aa3").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzdb2315678afecb367f032d93f642f64180aa3").is_err());
    }

    #[test]
    fn test_short() {
        let addr = Address::parse("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(addr.short(), "0xf39f...2266");
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let json = "\"0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266\"";
        let addr: Address = serde_json::from_str(json).unwrap();
        assert_eq!(addr.short(), "0xf39f...2266");
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }
}
