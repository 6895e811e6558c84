//! Capability-set traits the verifier/settler dispatch on.
//!
//! The teacher's `schemes::Scheme` trait bundles sign+verify+settle behind
//! one EVM-only implementation. Supporting both EVM and SVM means the
//! signing half (client-only) and the verify/settle half (facilitator-only)
//! no longer share a natural single trait — a client never settles, a
//! facilitator never signs. `ChainVerifier`/`ChainSettler` replace `Scheme`
//! with the two capabilities the facilitator actually needs, each
//! implemented once per chain family and dispatched through the `Verifier`/
//! `Settler` enums below rather than a `Box<dyn Scheme>`.

use async_trait::async_trait;

use crate::errors::Result;
use crate::network::ChainFamily;
use crate::payload::PaymentPayload;
use crate::types::{PaymentRequirements, SettleResponse, VerifyResponse};

/// Verifies a payment payload against its requirements without moving funds.
#[async_trait]
pub trait ChainVerifier: Send + Sync {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse>;
}

/// Executes a previously verified payload on-chain.
#[async_trait]
pub trait ChainSettler: Send + Sync {
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse>;
}

/// Dispatches to the right [`ChainVerifier`] by `requirements.network`'s
/// chain family.
pub enum Verifier {
    Evm(crate::eip155::verifier::EvmVerifier),
    Svm(crate::solana::verifier::SvmVerifier),
}

#[async_trait]
impl ChainVerifier for Verifier {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse> {
        match self {
            Verifier::Evm(v) => v.verify(payload, requirements).await,
            Verifier::Svm(v) => v.verify(payload, requirements).await,
        }
    }
}

impl Verifier {
    pub fn chain_family(&self) -> ChainFamily {
        match self {
            Verifier::Evm(_) => ChainFamily::Evm,
            Verifier::Svm(_) => ChainFamily::Svm,
        }
    }
}

/// Dispatches to the right [`ChainSettler`] by `requirements.network`'s
/// chain family.
pub enum Settler {
    Evm(crate::eip155::settler::EvmSettler),
    Svm(crate::solana::settler::SvmSettler),
}

#[async_trait]
impl ChainSettler for Settler {
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse> {
        match self {
            Settler::Evm(s) => s.settle(payload, requirements).await,
            Settler::Svm(s) => s.settle(payload, requirements).await,
        }
    }
}
