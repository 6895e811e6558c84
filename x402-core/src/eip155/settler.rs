//! EVM settler: submits a verified EIP-3009 authorization on-chain via
//! `transferWithAuthorization`, paid for by the facilitator's wallet.
//!
//! Grounded on the teacher's `schemes/exact_evm.rs` `Scheme::settle`.

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{H256, U256};
use std::sync::Arc;

use crate::eip155::domain::unwrap_erc6492;
use crate::eip155::erc20::EIP3009Token;
use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, PaymentPayload};
use crate::scheme::ChainSettler;
use crate::types::{PaymentRequirements, SettleResponse};
use async_trait::async_trait;

/// An EVM settler bound to one RPC endpoint and one facilitator wallet.
pub struct EvmSettler {
    provider: Provider<Http>,
    wallet: LocalWallet,
}

impl EvmSettler {
    pub fn new(rpc_url: &str, wallet: LocalWallet) -> Result<Self> {
        Ok(EvmSettler {
            provider: Provider::<Http>::try_from(rpc_url)?,
            wallet,
        })
    }

    /// The facilitator's on-chain fee-payer address, used by the batch
    /// settlement engine to allocate a contiguous nonce range.
    pub fn wallet_address(&self) -> ethers::types::Address {
        self.wallet.address()
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    /// Settles using a caller-supplied explicit nonce, for use by the batch
    /// settlement engine which allocates a contiguous nonce range up front
    /// rather than letting each submission fetch its own.
    pub async fn settle_with_nonce(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        nonce: U256,
    ) -> Result<SettleResponse> {
        self.settle_inner(payload, requirements, Some(nonce)).await
    }

    async fn settle_inner(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        explicit_nonce: Option<U256>,
    ) -> Result<SettleResponse> {
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
        let network = requirements.network.clone();

        let unwrapped = unwrap_erc6492(&evm.signature.0);
        if unwrapped.len() != 65 {
            return Ok(SettleResponse {
                success: false,
                transaction: None,
                network,
                error_reason: Some("invalid_payload".into()),
                payer: Some(payer),
            });
        }
        let r = H256::from_slice(&unwrapped[0..32]);
        let s = H256::from_slice(&unwrapped[32..64]);
        let v = unwrapped[64];

        let value = U256::from_dec_str(auth.value.as_str())
            .map_err(|e| X402Error::InvalidAmount(e.to_string()))?;
        let asset = requirements.asset.parse::<crate::address::EvmAddress>()?;

        let chain_id = self.provider.get_chainid().await?;
        let signer = self.wallet.clone().with_chain_id(chain_id.as_u64());
        let client = Arc::new(SignerMiddleware::new(self.provider.clone(), signer));

        let token_contract = EIP3009Token::new(asset.inner(), client);
        let mut call = token_contract.transfer_with_authorization(
            auth.from.inner(),
            auth.to.inner(),
            value,
            U256::from(auth.valid_after),
            U256::from(auth.valid_before),
            auth.nonce.0,
            v,
            r.into(),
            s.into(),
        );
        if let Some(nonce) = explicit_nonce {
            call = call.nonce(nonce);
        }

        let pending_tx = match call.send().await {
            Ok(tx) => tx,
            Err(e) => {
                return Ok(SettleResponse {
                    success: false,
                    transaction: None,
                    network,
                    error_reason: Some(classify_send_error(&e)),
                    payer: Some(payer),
                })
            }
        };

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        match pending_tx.await {
            Ok(Some(receipt)) if receipt.status == Some(1u64.into()) => Ok(SettleResponse {
                success: true,
                transaction: Some(format!("{:?}", receipt.transaction_hash)),
                network,
                error_reason: None,
                payer: Some(payer),
            }),
            Ok(Some(_)) => Ok(SettleResponse {
                success: false,
                transaction: Some(tx_hash),
                network,
                error_reason: Some("on_chain_revert".into()),
                payer: Some(payer),
            }),
            Ok(None) => Ok(SettleResponse {
                success: false,
                transaction: Some(tx_hash),
                network,
                error_reason: Some("unexpected_settle_error".into()),
                payer: Some(payer),
            }),
            Err(e) => Ok(SettleResponse {
                success: false,
                transaction: Some(tx_hash),
                network,
                error_reason: Some(classify_send_error(&e)),
                payer: Some(payer),
            }),
        }
    }
}

fn classify_send_error<E: std::fmt::Display>(e: &E) -> String {
    let msg = e.to_string().to_lowercase();
    if msg.contains("revert") {
        "on_chain_revert".to_string()
    } else {
        "unexpected_settle_error".to_string()
    }
}

#[async_trait]
impl ChainSettler for EvmSettler {
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse> {
        self.settle_inner(payload, requirements, None).await
    }
}
