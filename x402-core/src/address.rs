//! Chain-typed address newtypes.
//!
//! `PaymentRequirements`/`PaymentPayload` carry addresses as plain strings on
//! the wire, but internal code should never hold on to a bare `String` for
//! an address it is about to compare or sign over — that's how a case-folding
//! bug or a base58/hex mismatch slips in. Parse once, at the boundary.

use ethers::types::Address as EvmInner;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_sdk::pubkey::Pubkey as SvmInner;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, X402Error};

/// An EVM address. Equality is case-insensitive, as mandated for EVM asset
/// comparisons (hex digests are canonicalized by `ethers::Address`'s own
/// `FromStr`, which lowercases and checksum-validates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub EvmInner);

impl EvmAddress {
    pub fn inner(&self) -> EvmInner {
        self.0
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for EvmAddress {
    type Err = X402Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EvmInner::from_str(s)
            .map(EvmAddress)
            .map_err(|e| X402Error::InvalidAddress(format!("{s}: {e}")))
    }
}

impl Serialize for EvmAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", self.0))
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<EvmInner> for EvmAddress {
    fn from(inner: EvmInner) -> Self {
        EvmAddress(inner)
    }
}

/// A Solana address (a base58-encoded ed25519 public key, or a PDA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SvmAddress(pub SvmInner);

impl SvmAddress {
    pub fn inner(&self) -> SvmInner {
        self.0
    }
}

impl fmt::Display for SvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SvmAddress {
    type Err = X402Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SvmInner::from_str(s)
            .map(SvmAddress)
            .map_err(|e| X402Error::InvalidAddress(format!("{s}: {e}")))
    }
}

impl Serialize for SvmAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SvmAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<SvmInner> for SvmAddress {
    fn from(inner: SvmInner) -> Self {
        SvmAddress(inner)
    }
}

/// An address belonging to either chain family, for code paths (like the
/// payer-tracking on [`crate::types::PaymentResponseHeader`]) that handle
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainAddress {
    Evm(EvmAddress),
    Svm(SvmAddress),
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainAddress::Evm(a) => write!(f, "{a}"),
            ChainAddress::Svm(a) => write!(f, "{a}"),
        }
    }
}

/// Parses an address string against the shape expected for `network`'s
/// chain family, rather than guessing.
pub fn parse_evm_address(addr: &str) -> Result<EvmAddress> {
    EvmAddress::from_str(addr)
}

/// Parses a Solana address string.
pub fn parse_svm_address(addr: &str) -> Result<SvmAddress> {
    SvmAddress::from_str(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_address_case_insensitive_equality() {
        let lower = EvmAddress::from_str("0x742d35cc6634c0532925a3b844bc454e4438f44e").unwrap();
        let upper = EvmAddress::from_str("0x742D35CC6634C0532925A3B844BC454E4438F44E").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_evm_address_rejects_garbage() {
        assert!(EvmAddress::from_str("not-an-address").is_err());
    }

    #[test]
    fn test_svm_address_round_trip() {
        let addr = SvmAddress::from_str("11111111111111111111111111111111").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let back: SvmAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_chain_address_display() {
        let addr = ChainAddress::Svm(SvmAddress::from_str("11111111111111111111111111111111").unwrap());
        assert_eq!(addr.to_string(), "11111111111111111111111111111111");
    }
}
