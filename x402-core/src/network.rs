//! Network identifiers and chain-family classification.
//!
//! x402 networks are opaque strings on the wire (`"base"`, `"base-sepolia"`,
//! `"solana"`, `"solana-devnet"`, or a bare EVM chain id like `"8453"`).
//! [`ChainFamily::of`] is the single place that turns one of those strings
//! into "this needs the EVM path" vs. "this needs the SVM path" — grounded
//! on the same kind of network table `x402-rs-x402-rs`'s `networks.rs` and
//! `ledgerflow-facilitator`'s `Network` enum keep, but deliberately kept as
//! an open string set rather than a closed enum: resource servers are free
//! to name a new EVM-compatible network without a crate release.

use std::fmt;

/// Which chain family a network string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    Evm,
    Svm,
}

impl ChainFamily {
    /// Classifies a network identifier.
    ///
    /// Solana networks are always spelled starting with `"solana"`; anything
    /// else (a chain name like `"base"` or a numeric chain id like `"8453"`)
    /// is treated as an EVM network, since EIP-155 chain ids are the only
    /// other family this crate speaks.
    pub fn of(network: &str) -> ChainFamily {
        if network.starts_with("solana") {
            ChainFamily::Svm
        } else {
            ChainFamily::Evm
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => write!(f, "evm"),
            ChainFamily::Svm => write!(f, "svm"),
        }
    }
}

/// Well-known EVM chain ids this crate ships defaults for (canonical USDC
/// address + EIP-712 domain fields). Resource operators can still configure
/// any other EIP-3009-compatible asset via `extra`.
pub mod well_known {
    /// Base mainnet.
    pub const BASE: &str = "base";
    /// Base Sepolia testnet.
    pub const BASE_SEPOLIA: &str = "base-sepolia";
    /// Solana mainnet-beta.
    pub const SOLANA: &str = "solana";
    /// Solana devnet.
    pub const SOLANA_DEVNET: &str = "solana-devnet";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_solana_networks() {
        assert_eq!(ChainFamily::of("solana"), ChainFamily::Svm);
        assert_eq!(ChainFamily::of("solana-devnet"), ChainFamily::Svm);
    }

    #[test]
    fn test_classifies_evm_networks() {
        assert_eq!(ChainFamily::of("base"), ChainFamily::Evm);
        assert_eq!(ChainFamily::of("8453"), ChainFamily::Evm);
        assert_eq!(ChainFamily::of("base-sepolia"), ChainFamily::Evm);
    }
}
