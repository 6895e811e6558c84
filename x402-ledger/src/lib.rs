//! Durable nonce/transaction ledger for the x402 facilitator.
//!
//! Enforces at-most-once settlement per logical request (`insert_transaction`
//! is idempotent on `request_hash`) and reclaims EVM account-nonces that
//! were reserved but never used, via a background sweeper.

pub mod ledger;
pub mod models;
pub mod sweeper;

pub use ledger::{Ledger, RETRY_COOLDOWN};
pub use models::{NewTransaction, NonceRecord, NonceStatus, TransactionRecord, TransactionStatus};
pub use sweeper::{run_sweeper, MIN_SWEEP_INTERVAL};
