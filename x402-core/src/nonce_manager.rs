//! Batch-scoped EVM nonce allocation.
//!
//! Distinct from a per-call cached nonce manager (c.f.
//! `pending_nonce_manager.rs` in the pack, which increments a cached value
//! on every submission): a batch needs one contiguous reservation, not a
//! lazily incrementing cache, so this fetches `pending` transaction count
//! exactly once per batch and assigns `base + i` in declaration order.

use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, BlockNumber, U256};

use crate::errors::Result;

/// Reserves `count` contiguous nonces for `address`, starting from its
/// current pending transaction count.
pub async fn allocate_batch_nonces(
    provider: &Provider<Http>,
    address: Address,
    count: usize,
) -> Result<Vec<U256>> {
    let base = provider
        .get_transaction_count(address, Some(BlockNumber::Pending.into()))
        .await?;
    Ok((0..count as u64).map(|i| base + U256::from(i)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_sequence_is_contiguous() {
        let base = U256::from(42u64);
        let nonces: Vec<U256> = (0..3u64).map(|i| base + U256::from(i)).collect();
        assert_eq!(nonces, vec![U256::from(42u64), U256::from(43u64), U256::from(44u64)]);
    }
}
