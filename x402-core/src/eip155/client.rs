//! The EVM authorization signer: the client-side half of the "exact" scheme,
//! building and signing an EIP-3009 `transferWithAuthorization` payload.
//!
//! Grounded on the teacher's `schemes/exact_evm.rs` `Scheme::generate_payload`
//! for EVM, generalized to typed addresses/amounts and split out of the
//! combined sign+verify+settle `Scheme` trait impl.

use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};

use crate::address::EvmAddress;
use crate::eip155::domain::authorization_digest_for;
use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, EvmAuthorization, EvmPayload, EvmSignature, Nonce32, PaymentPayload};
use crate::types::{MoneyAmount, PaymentRequirements, X402_VERSION};
use crate::utils::current_timestamp;

/// Default EIP-712 domain fields, used when `PaymentRequirements.extra`
/// doesn't override them (e.g. canonical USDC).
pub const DEFAULT_DOMAIN_NAME: &str = "USD Coin";
pub const DEFAULT_DOMAIN_VERSION: &str = "2";

/// Signs an EIP-3009 authorization against `requirements` using `wallet`,
/// producing the full [`PaymentPayload`] a client attaches to its retried
/// request.
pub async fn generate_payload(
    requirements: &PaymentRequirements,
    wallet: &LocalWallet,
    rpc_url: &str,
) -> Result<PaymentPayload> {
    let to = requirements.pay_to.parse::<EvmAddress>()?;
    let asset = requirements.asset.parse::<EvmAddress>()?;
    let value = requirements.max_amount_required.clone();
    let from = EvmAddress::from(wallet.address());

    let provider = Provider::<Http>::try_from(rpc_url)?;
    let chain_id = provider.get_chainid().await?;

    let now = current_timestamp();
    let authorization = EvmAuthorization {
        from,
        to,
        value,
        valid_after: now.saturating_sub(600),
        valid_before: now + requirements.max_timeout_seconds,
        nonce: Nonce32::random(),
    };

    let (name, version) = requirements.eip712_domain_fields(DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION);
    let digest = authorization_digest_for(&authorization, asset, chain_id, name, version)?;

    let signature = wallet
        .sign_hash(digest)
        .map_err(|e| X402Error::SignatureError(e.to_string()))?;

    let mut sig_bytes = Vec::with_capacity(65);
    let mut r_bytes = [0u8; 32];
    signature.r.to_big_endian(&mut r_bytes);
    let mut s_bytes = [0u8; 32];
    signature.s.to_big_endian(&mut s_bytes);
    sig_bytes.extend_from_slice(&r_bytes);
    sig_bytes.extend_from_slice(&s_bytes);
    sig_bytes.push(signature.v as u8);

    Ok(PaymentPayload {
        x402_version: X402_VERSION,
        scheme: "exact".to_string(),
        network: requirements.network.clone(),
        payload: ChainPayload::Evm(EvmPayload {
            signature: EvmSignature(sig_bytes),
            authorization,
        }),
    })
}

/// Looks up `decimals()` on the asset contract, used when a resource server
/// wants to quote a dollar amount rather than a hardcoded atomic amount.
pub async fn asset_decimals(asset: EvmAddress, rpc_url: &str) -> Result<u8> {
    use crate::eip155::erc20::EIP3009Token;
    use std::sync::Arc;

    let provider = Provider::<Http>::try_from(rpc_url)?;
    let contract = EIP3009Token::new(asset.inner(), Arc::new(provider));
    contract
        .decimals()
        .call()
        .await
        .map_err(|e| X402Error::BlockchainError(format!("decimals() call failed: {e}")))
}

/// Quotes a `MoneyAmount` for `dollar_amount` using the asset's on-chain
/// decimals, assuming a 1:1 USD peg (stablecoins only).
pub async fn quote_stablecoin_amount(
    asset: EvmAddress,
    rpc_url: &str,
    dollar_amount: f64,
) -> Result<MoneyAmount> {
    let decimals = asset_decimals(asset, rpc_url).await?;
    MoneyAmount::from_usd(dollar_amount, decimals, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_domain_constants() {
        assert_eq!(DEFAULT_DOMAIN_NAME, "USD Coin");
        assert_eq!(DEFAULT_DOMAIN_VERSION, "2");
    }
}
