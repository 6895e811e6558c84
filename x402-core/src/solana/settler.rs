//! SVM settler: attaches the facilitator's fee-payer signature to an
//! already-verified, partially-signed transaction and submits it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;

use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, PaymentPayload};
use crate::scheme::ChainSettler;
use crate::types::{PaymentRequirements, SettleResponse};
use async_trait::async_trait;

/// An SVM settler bound to one RPC endpoint and the facilitator's
/// fee-payer keypair.
pub struct SvmSettler {
    rpc_client: RpcClient,
    fee_payer: Keypair,
}

impl SvmSettler {
    pub fn new(rpc_url: &str, fee_payer: Keypair) -> Self {
        SvmSettler {
            rpc_client: RpcClient::new(rpc_url.to_string()),
            fee_payer,
        }
    }
}

#[async_trait]
impl ChainSettler for SvmSettler {
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse> {
        let svm = match &payload.payload {
            ChainPayload::Svm(svm) => svm,
            ChainPayload::Evm(_) => {
                return Err(X402Error::InvalidNetwork(
                    "EVM payload presented against SVM requirements".into(),
                ))
            }
        };
        let network = requirements.network.clone();

        let bytes = BASE64
            .decode(&svm.transaction)
            .map_err(X402Error::Base64Error)?;
        let mut tx: Transaction = bincode::deserialize(&bytes)
            .map_err(|e| X402Error::InvalidPayload(format!("not a valid transaction: {e}")))?;

        let blockhash = tx.message.recent_blockhash;
        tx.partial_sign(&[&self.fee_payer], blockhash);

        if tx.verify().is_err() {
            return Ok(SettleResponse {
                success: false,
                transaction: None,
                network,
                error_reason: Some("invalid_signature".into()),
                payer: None,
            });
        }

        match self.rpc_client.send_and_confirm_transaction(&tx).await {
            Ok(signature) => Ok(SettleResponse {
                success: true,
                transaction: Some(signature.to_string()),
                network,
                error_reason: None,
                payer: None,
            }),
            Err(e) => {
                let reason = if e.to_string().to_lowercase().contains("revert") {
                    "on_chain_revert"
                } else {
                    "unexpected_settle_error"
                };
                Ok(SettleResponse {
                    success: false,
                    transaction: None,
                    network,
                    error_reason: Some(reason.into()),
                    payer: None,
                })
            }
        }
    }
}
