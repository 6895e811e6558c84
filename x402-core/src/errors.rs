//! Error types for the x402 protocol.
//!
//! Every error that can surface on the wire maps to a fixed reason code
//! (see [`X402Error::reason_code`]) so that callers can match on it instead
//! of parsing free text, per the error taxonomy in the protocol design.

use thiserror::Error;

/// Main error type for x402 operations.
#[derive(Error, Debug)]
pub enum X402Error {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during Base64 encoding/decoding
    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// Error during blockchain operations
    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    /// Schema validation failed on a decoded payload
    #[error("Invalid payment payload: {0}")]
    InvalidPayload(String),

    /// `paymentRequirements` failed schema validation
    #[error("Invalid payment requirements: {0}")]
    InvalidPaymentRequirements(String),

    /// `network` on the payload is unknown or does not match requirements
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// `scheme` is not a scheme this facilitator supports
    #[error("Invalid scheme: {0}")]
    InvalidScheme(String),

    /// `x402Version` does not match the protocol version this build speaks
    #[error("Unsupported x402 protocol version: {0}")]
    UnsupportedVersion(u32),

    /// Payment verification failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Payment settlement failed
    #[error("Settlement failed: {0}")]
    SettlementError(String),

    /// Unsupported payment scheme
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Unsupported network
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// `value`/`maxAmountRequired` field did not match the required asset
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Authorization window has expired, is not yet open, or is about to close
    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    /// Payer balance is below the required amount
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// SVM transaction instruction list failed structural validation
    #[error("Invalid instructions: {0}")]
    InvalidInstructions(String),

    /// On-chain simulation of a payload rejected it
    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    /// A submitted transaction reverted on-chain
    #[error("Transaction reverted on-chain: {0}")]
    OnChainRevert(String),

    /// Timeout exceeded
    #[error("Timeout exceeded")]
    TimeoutExceeded,

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Nonce already used (replay attack prevention)
    #[error("Nonce already used: {0}")]
    NonceUsed(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No suitable payment requirement found
    #[error("No suitable payment requirement found")]
    NoSuitableRequirement,

    /// The response was not a 402 Payment Required
    #[error("Expected 402 Payment Required, got status: {0}")]
    Not402Response(u16),

    /// Client received a second 402 after retrying with a payment header
    #[error("Payment was rejected on retry: {0}")]
    PaymentFailed(String),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Unexpected internal error while verifying (maps to 500, may retry)
    #[error("Unexpected error during verification: {0}")]
    UnexpectedVerifyError(String),

    /// Unexpected internal error while settling (maps to 500, may retry)
    #[error("Unexpected error during settlement: {0}")]
    UnexpectedSettleError(String),

    /// Durable ledger failure (connection, query, migration)
    #[error("Internal error: {0}")]
    Internal(#[from] sqlx::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for x402 operations.
pub type Result<T> = std::result::Result<T, X402Error>;

impl X402Error {
    /// The stable machine-readable reason code for this error, as placed in
    /// `invalidReason` / `errorReason` response fields. Callers should match
    /// on this rather than on `Display` output, which is free text.
    pub fn reason_code(&self) -> &'static str {
        match self {
            X402Error::InvalidPayload(_) => "invalid_payload",
            X402Error::InvalidPaymentRequirements(_) => "invalid_payment_requirements",
            X402Error::InvalidNetwork(_) | X402Error::UnsupportedNetwork(_) => "invalid_network",
            X402Error::InvalidScheme(_) | X402Error::UnsupportedScheme(_) => "invalid_scheme",
            X402Error::UnsupportedVersion(_) => "unsupported_version",
            X402Error::SignatureError(_) => "invalid_signature",
            X402Error::InvalidAsset(_) => "invalid_asset",
            X402Error::InvalidAmount(_) => "invalid_amount",
            X402Error::InvalidTiming(_) => "invalid_timing",
            X402Error::InsufficientFunds(_) => "insufficient_funds",
            X402Error::InvalidInstructions(_) => "invalid_instructions",
            X402Error::SimulationFailed(_) => "simulation_failed",
            X402Error::OnChainRevert(_) => "on_chain_revert",
            X402Error::NonceUsed(_) => "nonce_used",
            X402Error::UnexpectedVerifyError(_) => "unexpected_verify_error",
            X402Error::UnexpectedSettleError(_) => "unexpected_settle_error",
            X402Error::PaymentFailed(_) => "payment_failed",
            X402Error::Not402Response(_) => "not_402_response",
            X402Error::NoSuitableRequirement => "no_suitable_requirement",
            _ => "internal_error",
        }
    }

    /// Whether this reason is one the verifier/settler can recover from by
    /// retrying (background reaper eligible), per the error handling policy
    /// table: only internal/unexpected errors and on-chain reverts retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            X402Error::OnChainRevert(_)
                | X402Error::UnexpectedSettleError(_)
                | X402Error::UnexpectedVerifyError(_)
                | X402Error::HttpError(_)
                | X402Error::BlockchainError(_)
                | X402Error::Internal(_)
        )
    }
}

impl From<ethers::core::types::SignatureError> for X402Error {
    fn from(err: ethers::core::types::SignatureError) -> Self {
        X402Error::SignatureError(err.to_string())
    }
}

impl From<ethers::providers::ProviderError> for X402Error {
    fn from(err: ethers::providers::ProviderError) -> Self {
        X402Error::BlockchainError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = X402Error::InvalidPayload("test error".to_string());
        assert_eq!(err.to_string(), "Invalid payment payload: test error");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let x402_err: X402Error = json_err.into();
        assert!(matches!(x402_err, X402Error::JsonError(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_reason_codes_match_taxonomy() {
        assert_eq!(
            X402Error::InsufficientFunds("x".into()).reason_code(),
            "insufficient_funds"
        );
        assert_eq!(
            X402Error::InvalidTiming("x".into()).reason_code(),
            "invalid_timing"
        );
        assert_eq!(
            X402Error::UnsupportedVersion(2).reason_code(),
            "unsupported_version"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(X402Error::OnChainRevert("reverted".into()).is_retryable());
        assert!(!X402Error::InvalidAmount("mismatch".into()).is_retryable());
        assert!(!X402Error::NonceUsed("0xabc".into()).is_retryable());
    }
}
