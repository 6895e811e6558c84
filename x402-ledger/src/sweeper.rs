//! Background reaper that periodically clears expired nonce reservations.
//!
//! Grounded on `ledgerflow-indexer/src/indexer.rs`'s poll loop (fetch, log
//! and continue on error, sleep, repeat), swapped from a fixed `sleep` to a
//! `tokio::time::interval` so the cadence is exact rather than cadence-plus-
//! work-duration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::ledger::Ledger;

/// Minimum sweep cadence the concurrency model allows; passing anything
/// smaller is a caller bug, not a runtime condition, so it panics at
/// startup rather than silently clamping.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs [`Ledger::clean_expired_nonces`] every `interval`, forever. Intended
/// to be spawned once at facilitator startup via `tokio::spawn`.
pub async fn run_sweeper(ledger: Arc<Ledger>, interval: Duration) {
    assert!(
        interval >= MIN_SWEEP_INTERVAL,
        "sweeper interval must be at least {MIN_SWEEP_INTERVAL:?}"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match ledger.clean_expired_nonces().await {
            Ok(0) => {}
            Ok(n) => info!(reaped = n, "swept expired nonce reservations"),
            Err(e) => error!(error = %e, "nonce sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "sweeper interval must be at least")]
    fn test_sub_minimum_interval_panics() {
        let pool: sqlx::PgPool = sqlx::PgPool::connect_lazy("postgres://localhost/does-not-matter")
            .expect("lazy pool construction performs no I/O");
        let ledger = Arc::new(Ledger::from_pool(pool));
        let fut = run_sweeper(ledger, Duration::from_secs(1));
        // Polling once is enough to hit the assert before any network I/O.
        tokio_test::block_on(async {
            tokio::select! {
                _ = fut => {}
                _ = tokio::time::sleep(Duration::from_millis(10)) => panic!("sweeper should have panicked on invalid interval"),
            }
        });
    }
}
