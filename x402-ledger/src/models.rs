//! Row types for the `nonces` and `transactions` tables.
//!
//! Grounded on `ledgerflow-balancer/src/models.rs`'s `Order`/`OrderStatus`
//! pair (a plain struct plus a `sqlx::Type` enum stored as text) and
//! `ledgerflow-indexer/src/types.rs`'s amount-as-`String` convention (atomic
//! token amounts never round-trip through a float).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a reserved EVM account-nonce: `reserved` on creation,
/// `used` once a settlement consumes it, `expired` once the sweeper reaps it
/// unused past `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum NonceStatus {
    Reserved,
    Used,
    Expired,
}

/// Lifecycle of a settlement attempt: `pending` → `processing` →
/// `confirmed` | `failed`. `failed` rows with `attempts < max_attempts` and
/// a stale `updated_at` are eligible for replay by the settler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Confirmed,
    Failed,
}

/// A reserved EVM account-nonce, unique per `(network, address, nonce)`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NonceRecord {
    pub nonce: i64,
    pub network: String,
    pub address: String,
    pub status: NonceStatus,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub transaction_hash: Option<String>,
}

/// A settlement attempt, keyed idempotently on `request_hash` — the
/// deterministic fingerprint of `(PaymentPayload, PaymentRequirements)`
/// computed by [`x402_core::codec::request_hash`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: uuid::Uuid,
    pub request_hash: String,
    pub network: String,
    pub from_address: String,
    pub to_address: String,
    pub token: String,
    pub amount: String,
    pub nonce: Option<i64>,
    pub status: TransactionStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub transaction_hash: Option<String>,
    pub block_number: Option<i64>,
    pub gas_used: Option<String>,
    pub gas_price: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Fields needed to insert a new [`TransactionRecord`] in `pending` status;
/// the rest (`id`, `attempts`, timestamps) are assigned by the database.
pub struct NewTransaction {
    pub request_hash: String,
    pub network: String,
    pub from_address: String,
    pub to_address: String,
    pub token: String,
    pub amount: String,
    pub nonce: Option<i64>,
    pub max_attempts: i32,
    pub payload: serde_json::Value,
}
