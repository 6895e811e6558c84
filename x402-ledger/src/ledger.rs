//! `Ledger`: the facilitator's durable nonce/transaction store.
//!
//! Grounded on `ledgerflow-indexer/src/database.rs` for the
//! `struct Database(PgPool)` + inherent-method shape, and
//! `ledgerflow-facilitator/src/config.rs` for pool tuning
//! (`max_connections(20)`, `idle_timeout(30s)`, `acquire_timeout(2s)`,
//! matching the concurrency model's pool numbers exactly).

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{NewTransaction, NonceRecord, NonceStatus, TransactionRecord, TransactionStatus};

const MAX_CONNECTIONS: u32 = 20;
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// The retry cooldown `getFailedTransactionsForRetry` enforces: a failed
/// row is not eligible for replay until it has sat untouched for this long.
pub const RETRY_COOLDOWN: Duration = Duration::from_secs(5 * 60);

pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    /// Connects with the pool tuning fixed by the concurrency model and
    /// runs pending migrations from `x402-ledger/migrations/`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .idle_timeout(IDLE_TIMEOUT)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Ledger { pool })
    }

    /// Wraps an already-constructed pool, skipping migration — used by
    /// tests that manage migrations themselves.
    pub fn from_pool(pool: PgPool) -> Self {
        Ledger { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Reserves a nonce. Unique on `(network, address, nonce)`; a duplicate
    /// reservation is a caller bug (two batches racing on the same base
    /// nonce), so it is rejected rather than silently ignored.
    pub async fn insert_nonce(
        &self,
        nonce: i64,
        network: &str,
        address: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO nonces (nonce, network, address, status, expires_at)
             VALUES ($1, $2, $3, 'reserved', $4)",
        )
        .bind(nonce)
        .bind(network)
        .bind(address)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Transitions a reserved nonce, stamping `used_at` when the new status
    /// is `used`.
    pub async fn update_nonce_status(
        &self,
        network: &str,
        address: &str,
        nonce: i64,
        status: NonceStatus,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE nonces
             SET status = $1,
                 transaction_hash = COALESCE($2, transaction_hash),
                 used_at = CASE WHEN $1 = 'used' THEN now() ELSE used_at END
             WHERE network = $3 AND address = $4 AND nonce = $5",
        )
        .bind(status)
        .bind(transaction_hash)
        .bind(network)
        .bind(address)
        .bind(nonce)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sweeper entry point: deletes reserved nonces whose expiry has
    /// passed without being used. Returns the number of rows removed.
    pub async fn clean_expired_nonces(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM nonces WHERE expires_at < now() AND status = 'reserved'",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_nonce(
        &self,
        network: &str,
        address: &str,
        nonce: i64,
    ) -> Result<Option<NonceRecord>, sqlx::Error> {
        sqlx::query_as::<_, NonceRecord>(
            "SELECT nonce, network, address, status, expires_at, used_at, transaction_hash
             FROM nonces WHERE network = $1 AND address = $2 AND nonce = $3",
        )
        .bind(network)
        .bind(address)
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await
    }

    /// Idempotent insert: on a `request_hash` collision, the pre-existing
    /// row is returned instead of erroring, which is how repeated `/settle`
    /// calls for the same payment become at-most-once.
    pub async fn insert_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, sqlx::Error> {
        sqlx::query(
            "INSERT INTO transactions
                (request_hash, network, from_address, to_address, token, amount, nonce, status, max_attempts, payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
             ON CONFLICT (request_hash) DO NOTHING",
        )
        .bind(&new.request_hash)
        .bind(&new.network)
        .bind(&new.from_address)
        .bind(&new.to_address)
        .bind(&new.token)
        .bind(&new.amount)
        .bind(new.nonce)
        .bind(new.max_attempts)
        .bind(&new.payload)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, TransactionRecord>(
            "SELECT id, request_hash, network, from_address, to_address, token, amount, nonce,
                    status, attempts, max_attempts, payload, error_message, transaction_hash,
                    block_number, gas_used, gas_price, created_at, updated_at, confirmed_at
             FROM transactions WHERE request_hash = $1",
        )
        .bind(&new.request_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Transitions a transaction's status, incrementing `attempts` and
    /// stamping `confirmed_at` when the new status is `confirmed`.
    /// `updated_at` is touched by the `transactions_touch_updated_at`
    /// trigger, not by this query.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_transaction_status(
        &self,
        id: uuid::Uuid,
        status: TransactionStatus,
        transaction_hash: Option<&str>,
        block_number: Option<i64>,
        gas_used: Option<&str>,
        gas_price: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE transactions
             SET status = $1,
                 attempts = attempts + 1,
                 transaction_hash = COALESCE($2, transaction_hash),
                 block_number = COALESCE($3, block_number),
                 gas_used = COALESCE($4, gas_used),
                 gas_price = COALESCE($5, gas_price),
                 error_message = $6,
                 confirmed_at = CASE WHEN $1 = 'confirmed' THEN now() ELSE confirmed_at END
             WHERE id = $7",
        )
        .bind(status)
        .bind(transaction_hash)
        .bind(block_number)
        .bind(gas_used)
        .bind(gas_price)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rows still in flight, oldest first — the settler's work queue.
    pub async fn get_pending_transactions(
        &self,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        sqlx::query_as::<_, TransactionRecord>(
            "SELECT id, request_hash, network, from_address, to_address, token, amount, nonce,
                    status, attempts, max_attempts, payload, error_message, transaction_hash,
                    block_number, gas_used, gas_price, created_at, updated_at, confirmed_at
             FROM transactions
             WHERE status IN ('pending', 'processing') AND attempts < max_attempts
             ORDER BY created_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Failed rows past the retry cooldown with attempts remaining — the
    /// background reaper's replay queue.
    pub async fn get_failed_transactions_for_retry(
        &self,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        sqlx::query_as::<_, TransactionRecord>(
            "SELECT id, request_hash, network, from_address, to_address, token, amount, nonce,
                    status, attempts, max_attempts, payload, error_message, transaction_hash,
                    block_number, gas_used, gas_price, created_at, updated_at, confirmed_at
             FROM transactions
             WHERE status = 'failed'
               AND attempts < max_attempts
               AND updated_at < now() - interval '5 minutes'
             ORDER BY updated_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_cooldown_matches_spec_window() {
        assert_eq!(RETRY_COOLDOWN, Duration::from_secs(300));
    }

    #[test]
    fn test_pool_tuning_constants() {
        assert_eq!(MAX_CONNECTIONS, 20);
        assert_eq!(IDLE_TIMEOUT, Duration::from_secs(30));
        assert_eq!(ACQUIRE_TIMEOUT, Duration::from_secs(2));
    }
}
