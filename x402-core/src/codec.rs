//! Wire framing for the `X-Payment` / `X-Payment-Response` headers and the
//! canonical request-hash used to correlate a verify call with its later
//! settle call in the ledger.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::errors::{Result, X402Error};
use crate::payload::PaymentPayload;
use crate::types::{PaymentRequirements, PaymentResponseHeader};

/// Encodes a [`PaymentPayload`] as the base64 string carried in the
/// `X-Payment` request header.
pub fn encode_payment_header(payload: &PaymentPayload) -> Result<String> {
    let json = serde_json::to_vec(payload)?;
    Ok(BASE64.encode(json))
}

/// Decodes an `X-Payment` header value back into a [`PaymentPayload`].
pub fn decode_payment_header(header_value: &str) -> Result<PaymentPayload> {
    let json = BASE64
        .decode(header_value.trim())
        .map_err(X402Error::Base64Error)?;
    serde_json::from_slice(&json).map_err(X402Error::from)
}

/// Encodes a [`PaymentResponseHeader`] as the base64 string carried in the
/// `X-Payment-Response` response header.
pub fn encode_payment_response_header(header: &PaymentResponseHeader) -> Result<String> {
    let json = serde_json::to_vec(header)?;
    Ok(BASE64.encode(json))
}

/// Decodes an `X-Payment-Response` header value.
pub fn decode_payment_response_header(header_value: &str) -> Result<PaymentResponseHeader> {
    let json = BASE64
        .decode(header_value.trim())
        .map_err(X402Error::Base64Error)?;
    serde_json::from_slice(&json).map_err(X402Error::from)
}

/// A stable hash correlating a `/verify` call to the `/settle` call that
/// follows it, so the ledger can recognize "this settle is for the payment
/// I already verified" without re-parsing both payloads. Computed over the
/// canonical JSON (serde's own deterministic field order, since both types
/// derive `Serialize` with a fixed field list — no external canonicalizer
/// needed) of `(payload, requirements)`.
pub fn request_hash(payload: &PaymentPayload, requirements: &PaymentRequirements) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(payload)?);
    hasher.update(b"|");
    hasher.update(serde_json::to_vec(requirements)?);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::EvmAddress;
    use crate::payload::{ChainPayload, EvmAuthorization, EvmPayload, EvmSignature, Nonce32};
    use crate::types::MoneyAmount;
    use std::str::FromStr;

    fn sample_payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: 1,
            scheme: "exact".into(),
            network: "base".into(),
            payload: ChainPayload::Evm(EvmPayload {
                signature: EvmSignature(vec![1u8; 65]),
                authorization: EvmAuthorization {
                    from: EvmAddress::from_str("0x742d35Cc6634C0532925a3b844Bc454e4438f44e")
                        .unwrap(),
                    to: EvmAddress::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")
                        .unwrap(),
                    value: MoneyAmount::parse("10000").unwrap(),
                    valid_after: 0,
                    valid_before: 2_000_000_000,
                    nonce: Nonce32([3u8; 32]),
                },
            }),
        }
    }

    fn sample_requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "base".into(),
            max_amount_required: MoneyAmount::parse("10000").unwrap(),
            resource: "https://api.example.com/weather".into(),
            description: None,
            mime_type: None,
            output_schema: None,
            pay_to: "0x000000000000000000000000000000000000aa".into(),
            max_timeout_seconds: 60,
            asset: "0xusdc".into(),
            extra: None,
        }
    }

    #[test]
    fn test_payment_header_round_trip() {
        let payload = sample_payload();
        let encoded = encode_payment_header(&payload).unwrap();
        let decoded = decode_payment_header(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode_payment_header("not base64!!!").is_err());
    }

    #[test]
    fn test_request_hash_is_stable() {
        let payload = sample_payload();
        let requirements = sample_requirements();
        let hash1 = request_hash(&payload, &requirements).unwrap();
        let hash2 = request_hash(&payload, &requirements).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_request_hash_changes_with_requirements() {
        let payload = sample_payload();
        let requirements = sample_requirements();
        let mut other = requirements.clone();
        other.max_amount_required = MoneyAmount::parse("20000").unwrap();
        assert_ne!(
            request_hash(&payload, &requirements).unwrap(),
            request_hash(&payload, &other).unwrap()
        );
    }
}
