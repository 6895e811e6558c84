//! Batch Settlement Engine: submits a set of already-verified payments in
//! parallel with an explicitly allocated, contiguous EVM nonce range.
//!
//! Serial submission bottlenecks on RPC round-trip time; parallel submission
//! without explicit nonces produces RPC-level nonce collisions. This trusts
//! that every item has already passed the [`crate::scheme::ChainVerifier`]
//! step — item-level retry is deliberately not offered here, since replacing
//! a failed nonce would break the sequence for every later item in the
//! batch. A failed item leaves a gap in the nonce sequence; the caller backs
//! it with a cancellation transaction or re-runs with a fresh base nonce.

use std::sync::Arc;

use ethers::types::U256;
use tokio::task::JoinSet;

use crate::eip155::settler::EvmSettler;
use crate::errors::{Result, X402Error};
use crate::nonce_manager::allocate_batch_nonces;
use crate::payload::PaymentPayload;
use crate::types::{PaymentRequirements, SettleResponse};

/// One item's outcome within a batch, carrying the nonce it was submitted
/// with so the caller can reconstruct the sequence and spot gaps.
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub nonce: u64,
    pub result: SettleResponse,
}

/// Aggregate outcome of a batch submission.
#[derive(Debug, Clone)]
pub struct BatchSettleResult {
    pub results: Vec<BatchItemResult>,
    pub total_submitted: usize,
    pub total_success: usize,
    pub total_failed: usize,
    /// Nonces that were allocated but whose submission failed, leaving a gap
    /// in the facilitator's on-chain nonce sequence. Not auto-healed.
    pub nonce_gaps: Vec<u64>,
}

/// Submits `items` in parallel against `settler`, each with its own
/// explicitly allocated nonce (`base + i` in declaration order).
pub async fn settle_batch(
    settler: Arc<EvmSettler>,
    items: Vec<(PaymentPayload, PaymentRequirements)>,
) -> Result<BatchSettleResult> {
    if items.is_empty() {
        return Ok(BatchSettleResult {
            results: Vec::new(),
            total_submitted: 0,
            total_success: 0,
            total_failed: 0,
            nonce_gaps: Vec::new(),
        });
    }

    let address = settler.wallet_address();
    let nonces = allocate_batch_nonces(settler.provider(), address, items.len()).await?;

    let mut join_set: JoinSet<(usize, U256, Result<SettleResponse>)> = JoinSet::new();
    for (index, ((payload, requirements), nonce)) in items.into_iter().zip(nonces.into_iter()).enumerate() {
        let settler = Arc::clone(&settler);
        join_set.spawn(async move {
            let outcome = settler.settle_with_nonce(&payload, &requirements, nonce).await;
            (index, nonce, outcome)
        });
    }

    let mut slots: Vec<Option<BatchItemResult>> = vec![None; join_set.len()];
    let mut nonce_gaps = Vec::new();
    let mut total_success = 0usize;
    let mut total_failed = 0usize;

    while let Some(joined) = join_set.join_next().await {
        let (index, nonce, outcome) = joined.map_err(|e| X402Error::UnexpectedSettleError(e.to_string()))?;
        let nonce_u64 = nonce.as_u64();
        let item = match outcome {
            Ok(response) => {
                if response.success {
                    total_success += 1;
                } else {
                    total_failed += 1;
                    nonce_gaps.push(nonce_u64);
                }
                BatchItemResult { nonce: nonce_u64, result: response }
            }
            Err(e) => {
                total_failed += 1;
                nonce_gaps.push(nonce_u64);
                BatchItemResult {
                    nonce: nonce_u64,
                    result: SettleResponse {
                        success: false,
                        transaction: None,
                        network: String::new(),
                        error_reason: Some(e.reason_code().to_string()),
                        payer: None,
                    },
                }
            }
        };
        slots[index] = Some(item);
    }

    nonce_gaps.sort_unstable();
    let results: Vec<BatchItemResult> = slots.into_iter().map(|s| s.expect("every index submitted exactly once")).collect();
    let total_submitted = results.len();

    Ok(BatchSettleResult {
        results,
        total_submitted,
        total_success,
        total_failed,
        nonce_gaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::LocalWallet;

    #[tokio::test]
    async fn test_empty_batch_short_circuits_without_an_rpc_call() {
        let wallet: LocalWallet =
            "0x0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .unwrap();
        let settler = Arc::new(EvmSettler::new("http://localhost:1", wallet).unwrap());
        let result = settle_batch(settler, Vec::new()).await.unwrap();
        assert_eq!(result.total_submitted, 0);
        assert!(result.nonce_gaps.is_empty());
    }
}
