//! EIP-712 domain separator and struct hashing for EIP-3009
//! `TransferWithAuthorization`, plus ERC-6492 signature unwrapping for
//! counterfactual smart-contract wallets.
//!
//! Grounded on the teacher's `schemes/exact_evm.rs`
//! `create_domain_separator`/`create_authorization_hash`, generalized to
//! take the typed [`EvmAddress`]/[`MoneyAmount`]/[`Nonce32`] instead of raw
//! `ethers` primitives.

use ethers::abi::Token;
use ethers::core::utils::keccak256;
use ethers::types::{H256, U256};

use crate::address::EvmAddress;
use crate::errors::{Result, X402Error};
use crate::payload::EvmAuthorization;

/// ERC-6492 magic suffix appended after a counterfactual wallet's inner
/// signature, identifying a wrapped `(create2Factory, factoryCalldata,
/// signature)` tuple that must be unwrapped before the raw 65-byte
/// signature can be recovered against.
const ERC6492_MAGIC_SUFFIX: [u8; 32] = [
    0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92,
    0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92,
];

/// Strips an ERC-6492 wrapper if present, returning the inner signature
/// bytes unchanged otherwise. The wrapper is ABI-encoded
/// `(address, bytes, bytes)` followed by the 32-byte magic suffix; this
/// crate never needs the factory address/calldata (on-chain verification
/// deploys the wallet itself), only the inner signature.
pub fn unwrap_erc6492(signature: &[u8]) -> Vec<u8> {
    if signature.len() < 32 || signature[signature.len() - 32..] != ERC6492_MAGIC_SUFFIX {
        return signature.to_vec();
    }
    match ethers::abi::decode(
        &[
            ethers::abi::ParamType::Address,
            ethers::abi::ParamType::Bytes,
            ethers::abi::ParamType::Bytes,
        ],
        &signature[..signature.len() - 32],
    ) {
        Ok(tokens) => match tokens.into_iter().nth(2) {
            Some(ethers::abi::Token::Bytes(inner)) => inner,
            _ => signature.to_vec(),
        },
        Err(_) => signature.to_vec(),
    }
}

/// The EIP-712 domain separator for a given token contract, chain id, and
/// `(name, version)` pair.
pub fn domain_separator(token_address: EvmAddress, chain_id: U256, name: &str, version: &str) -> H256 {
    let type_hash =
        keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)");

    H256::from(keccak256(ethers::abi::encode(&[
        Token::FixedBytes(type_hash.to_vec()),
        Token::FixedBytes(keccak256(name.as_bytes()).to_vec()),
        Token::FixedBytes(keccak256(version.as_bytes()).to_vec()),
        Token::Uint(chain_id),
        Token::Address(token_address.inner()),
    ])))
}

/// The final EIP-712 digest a payer signs over: `"\x19\x01" ++
/// domainSeparator ++ hashStruct(TransferWithAuthorization)`.
pub fn authorization_digest(auth: &EvmAuthorization, domain_separator: H256) -> Result<H256> {
    let type_hash = keccak256(
        b"TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)",
    );

    let value = U256::from_dec_str(auth.value.as_str())
        .map_err(|e| X402Error::InvalidAmount(format!("{}: {e}", auth.value)))?;

    let struct_hash = keccak256(ethers::abi::encode(&[
        Token::FixedBytes(type_hash.to_vec()),
        Token::Address(auth.from.inner()),
        Token::Address(auth.to.inner()),
        Token::Uint(value),
        Token::Uint(U256::from(auth.valid_after)),
        Token::Uint(U256::from(auth.valid_before)),
        Token::FixedBytes(auth.nonce.0.to_vec()),
    ]));

    let mut message = Vec::with_capacity(66);
    message.extend_from_slice(b"\x19\x01");
    message.extend_from_slice(domain_separator.as_bytes());
    message.extend_from_slice(&struct_hash);

    Ok(H256::from(keccak256(&message)))
}

/// Convenience: builds the digest directly from authorization fields,
/// without requiring the caller to go through [`domain_separator`] first.
pub fn authorization_digest_for(
    auth: &EvmAuthorization,
    token_address: EvmAddress,
    chain_id: U256,
    name: &str,
    version: &str,
) -> Result<H256> {
    let domain = domain_separator(token_address, chain_id, name, version);
    authorization_digest(auth, domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Nonce32;
    use crate::types::MoneyAmount;
    use std::str::FromStr;

    #[test]
    fn test_domain_separator_nonzero() {
        let token = EvmAddress::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        let domain = domain_separator(token, U256::from(8453u64), "USD Coin", "2");
        assert_ne!(domain, H256::zero());
    }

    #[test]
    fn test_domain_separator_changes_with_chain_id() {
        let token = EvmAddress::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        let base = domain_separator(token, U256::from(8453u64), "USD Coin", "2");
        let sepolia = domain_separator(token, U256::from(84532u64), "USD Coin", "2");
        assert_ne!(base, sepolia);
    }

    #[test]
    fn test_authorization_digest_deterministic() {
        let auth = EvmAuthorization {
            from: EvmAddress::from_str("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").unwrap(),
            to: EvmAddress::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap(),
            value: MoneyAmount::parse("10000").unwrap(),
            valid_after: 0,
            valid_before: 2_000_000_000,
            nonce: Nonce32([9u8; 32]),
        };
        let domain = H256::zero();
        let first = authorization_digest(&auth, domain).unwrap();
        let second = authorization_digest(&auth, domain).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unwrap_erc6492_passthrough_for_plain_signature() {
        let sig = vec![1u8; 65];
        assert_eq!(unwrap_erc6492(&sig), sig);
    }
}
