//! EVM verifier: checks a signed EIP-3009 authorization against its
//! requirements and the chain, without moving funds.
//!
//! Grounded on the teacher's `schemes/exact_evm.rs` `Scheme::verify`,
//! generalized to the typed payload/[`VerifyResponse`] shape and split out
//! of the combined scheme trait.

use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{H256, U256};
use std::sync::Arc;

use crate::eip155::client::{DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION};
use crate::eip155::domain::{authorization_digest_for, unwrap_erc6492};
use crate::eip155::erc20::EIP3009Token;
use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, PaymentPayload};
use crate::scheme::ChainVerifier;
use crate::types::{PaymentRequirements, VerifyResponse};
use crate::utils::current_timestamp;
use async_trait::async_trait;

/// An EVM verifier bound to one RPC endpoint.
pub struct EvmVerifier {
    provider: Provider<Http>,
}

impl EvmVerifier {
    pub fn new(rpc_url: &str) -> Result<Self> {
        Ok(EvmVerifier {
            provider: Provider::<Http>::try_from(rpc_url)?,
        })
    }
}

#[async_trait]
impl ChainVerifier for EvmVerifier {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse> {
        let evm = match &payload.payload {
            ChainPayload::Evm(evm) => evm,
            ChainPayload::Svm(_) => {
                return Err(X402Error::InvalidNetwork(
                    "SVM payload presented against EVM requirements".into(),
                ))
            }
        };
        let auth = &evm.authorization;
        let payer = auth.from.to_string();

        if payload.scheme != requirements.scheme {
            return Ok(VerifyResponse::invalid("invalid_scheme", Some(payer)));
        }
        if payload.network != requirements.network {
            return Ok(VerifyResponse::invalid("invalid_network", Some(payer)));
        }

        let expected_to = requirements.pay_to.parse::<crate::address::EvmAddress>()?;
        if auth.to != expected_to {
            return Ok(VerifyResponse::invalid("invalid_asset", Some(payer)));
        }
        let expected_value = U256::from_dec_str(requirements.max_amount_required.as_str())
            .map_err(|e| X402Error::InvalidAmount(e.to_string()))?;
        let value = U256::from_dec_str(auth.value.as_str())
            .map_err(|e| X402Error::InvalidAmount(e.to_string()))?;
        if value != expected_value {
            return Ok(VerifyResponse::invalid("invalid_amount", Some(payer)));
        }

        let now = current_timestamp();
        if now < auth.valid_after || now > auth.valid_before {
            return Ok(VerifyResponse::invalid("invalid_timing", Some(payer)));
        }
        if auth.valid_before.saturating_sub(now) < 6 {
            return Ok(VerifyResponse::invalid("invalid_timing", Some(payer)));
        }

        let asset = requirements.asset.parse::<crate::address::EvmAddress>()?;
        let chain_id = self.provider.get_chainid().await?;

        let token_contract = EIP3009Token::new(asset.inner(), Arc::new(self.provider.clone()));
        let nonce_h256 = H256::from(auth.nonce.0);
        let is_used = token_contract
            .authorization_state(auth.from.inner(), nonce_h256.into())
            .call()
            .await
            .unwrap_or(true);
        if is_used {
            return Ok(VerifyResponse::invalid("nonce_used", Some(payer)));
        }

        let balance = token_contract
            .balance_of(auth.from.inner())
            .call()
            .await
            .map_err(|e| X402Error::UnexpectedVerifyError(format!("balanceOf failed: {e}")))?;
        if balance < value {
            return Ok(VerifyResponse::invalid("insufficient_funds", Some(payer)));
        }

        let (name, version) = requirements.eip712_domain_fields(DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION);
        let digest = authorization_digest_for(auth, asset, chain_id, name, version)?;

        let unwrapped = unwrap_erc6492(&evm.signature.0);
        if unwrapped.len() != 65 {
            return Ok(VerifyResponse::invalid("invalid_payload", Some(payer)));
        }
        let signature = ethers::types::Signature::try_from(unwrapped.as_slice())
            .map_err(|e| X402Error::SignatureError(e.to_string()))?;
        let recovered = signature.recover(digest)?;

        if recovered != auth.from.inner() {
            return Ok(VerifyResponse::invalid("invalid_signature", Some(payer)));
        }

        Ok(VerifyResponse::valid(payer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_verifier_construction_from_url() {
        assert!(EvmVerifier::new("http://localhost:8545").is_ok());
    }
}
