//! Global signer registry: one EVM wallet per chain id, shared across
//! requests, with a drain-fence rotation path for key rollover.
//!
//! Grounded on `provider_cache.rs`'s per-network `DashMap` cache, adapted
//! from a connect-once-at-startup map to a registry that can also rotate a
//! key at runtime. Rotation uses the same drain-fence idiom as a
//! graceful-shutdown barrier: acquiring every permit on an
//! `Arc<tokio::sync::Semaphore>` blocks until in-flight readers release
//! theirs, then swaps the entry.

use std::sync::Arc;

use dashmap::DashMap;
use ethers::signers::LocalWallet;
use tokio::sync::Semaphore;

use crate::errors::{Result, X402Error};

/// Large enough that it never throttles concurrent reads in practice; only
/// `rotate` ever asks for all of them at once, which is what turns it into a
/// drain fence rather than a rate limiter.
const REGISTRY_PERMITS: u32 = 65_536;

/// A registry of EVM signers keyed by chain id, safe to share behind an
/// `Arc` across the facilitator's request handlers and the batch settler.
pub struct SignerRegistry {
    signers: DashMap<u64, Arc<LocalWallet>>,
    drain_fence: Semaphore,
}

impl SignerRegistry {
    pub fn new() -> Self {
        SignerRegistry {
            signers: DashMap::new(),
            drain_fence: Semaphore::new(REGISTRY_PERMITS as usize),
        }
    }

    /// Registers (or overwrites) the signer for a chain id. Use [`Self::rotate`]
    /// instead when readers may be mid-use and you need the drain fence.
    pub fn insert(&self, chain_id: u64, wallet: LocalWallet) {
        self.signers.insert(chain_id, Arc::new(wallet));
    }

    /// Looks up the signer for a chain id, holding one reader permit for the
    /// duration of the call so a concurrent `rotate` cannot observe a
    /// half-read entry.
    pub async fn get(&self, chain_id: u64) -> Result<Arc<LocalWallet>> {
        let _permit = self
            .drain_fence
            .acquire()
            .await
            .map_err(|e| X402Error::ConfigError(format!("signer registry closed: {e}")))?;
        self.signers
            .get(&chain_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| X402Error::ConfigError(format!("no signer configured for chain id {chain_id}")))
    }

    /// Replaces the signer for a chain id, first waiting for every
    /// in-flight [`Self::get`] to finish by acquiring all registry permits.
    /// No new reader can proceed until the swap completes and the permits
    /// are released.
    pub async fn rotate(&self, chain_id: u64, new_wallet: LocalWallet) -> Result<()> {
        let _all_permits = self
            .drain_fence
            .acquire_many(REGISTRY_PERMITS)
            .await
            .map_err(|e| X402Error::ConfigError(format!("signer registry closed: {e}")))?;
        self.signers.insert(chain_id, Arc::new(new_wallet));
        Ok(())
    }
}

impl Default for SignerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::Signer;

    fn test_wallet(byte: u8) -> LocalWallet {
        let mut key = [0u8; 32];
        key[31] = byte;
        format!("0x{}", hex::encode(key)).parse().unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_get_round_trips() {
        let registry = SignerRegistry::new();
        registry.insert(8453, test_wallet(1));
        let wallet = registry.get(8453).await.unwrap();
        assert_eq!(wallet.address(), test_wallet(1).address());
    }

    #[tokio::test]
    async fn test_get_missing_chain_id_errors() {
        let registry = SignerRegistry::new();
        assert!(registry.get(999).await.is_err());
    }

    #[tokio::test]
    async fn test_rotate_replaces_the_signer() {
        let registry = SignerRegistry::new();
        registry.insert(8453, test_wallet(1));
        registry.rotate(8453, test_wallet(2)).await.unwrap();
        let wallet = registry.get(8453).await.unwrap();
        assert_eq!(wallet.address(), test_wallet(2).address());
    }
}
