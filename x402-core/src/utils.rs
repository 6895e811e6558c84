//! Small time-related helpers shared by the EVM and SVM code paths.
//!
//! Encoding/decoding lives in [`crate::codec`]; amount and address parsing
//! live in [`crate::types::MoneyAmount`] and [`crate::address`].

/// Gets the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Checks whether `now` falls within `[valid_after, valid_before]`.
pub fn is_timestamp_valid(valid_after: u64, valid_before: u64) -> bool {
    let now = current_timestamp();
    now >= valid_after && now <= valid_before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_validation() {
        let now = current_timestamp();
        assert!(is_timestamp_valid(now - 60, now + 300));
        assert!(!is_timestamp_valid(now + 60, now + 300));
        assert!(!is_timestamp_valid(now - 300, now - 60));
    }

    #[test]
    fn test_current_timestamp_is_plausible() {
        let ts = current_timestamp();
        assert!(ts > 1_600_000_000);
        assert!(ts < 2_000_000_000);
    }
}
