//! Core wire types for the x402 protocol: payment requirements, the 402
//! challenge body, facilitator request/response envelopes, and discovery.
//!
//! Payload types (`PaymentPayload` and its per-chain variants) live in
//! [`crate::payload`]; address newtypes live in [`crate::address`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, X402Error};

/// Version of the x402 protocol this crate speaks.
pub const X402_VERSION: u32 = 1;

/// A decimal big-integer amount, always carried as a string on the wire to
/// avoid precision loss (mirrors `maxAmountRequired` / EVM `value`).
///
/// Arithmetic is intentionally not implemented here: values only ever need
/// to be parsed, compared for exact equality, and re-serialized, never added
/// or multiplied once they reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoneyAmount(String);

impl MoneyAmount {
    /// Parses a decimal string, rejecting anything that is not an
    /// unsigned base-10 integer (no sign, no decimal point, no leading `0x`).
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(X402Error::InvalidAmount(format!(
                "'{s}' is not a decimal atomic amount"
            )));
        }
        Ok(MoneyAmount(s.to_string()))
    }

    /// Creates a `MoneyAmount` from dollars and a decimals count, using the
    /// token's USD price to convert (price defaults to 1.0 for stablecoins).
    pub fn from_usd(dollar_amount: f64, decimals: u8, token_usd_price: f64) -> Result<Self> {
        if token_usd_price <= 0.0 {
            return Err(X402Error::InvalidAmount(
                "token price must be positive".to_string(),
            ));
        }
        let token_amount = dollar_amount / token_usd_price;
        let multiplier = 10f64.powi(decimals as i32);
        let smallest_unit = (token_amount * multiplier).round() as u128;
        Ok(MoneyAmount(smallest_unit.to_string()))
    }

    /// The underlying decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MoneyAmount {
    type Err = X402Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl Serialize for MoneyAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MoneyAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MoneyAmount::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Describes the payment requirements for a specific resource.
///
/// The tuple `(scheme, network, asset, pay_to, max_amount_required)` is the
/// identity of an offer; equality is by-field, derived via `PartialEq`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentRequirements {
    /// Payment scheme. Only `"exact"` is implemented.
    pub scheme: String,

    /// Network identifier, e.g. `"base"`, `"base-sepolia"`, `"solana"`.
    pub network: String,

    /// Maximum amount required, in the asset's smallest unit.
    #[serde(rename = "maxAmountRequired")]
    pub max_amount_required: MoneyAmount,

    /// The resource URL the payment unlocks.
    pub resource: String,

    /// Human-readable description of what the payment is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type of the resource.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// JSON schema describing the output format.
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Recipient address.
    #[serde(rename = "payTo")]
    pub pay_to: String,

    /// Maximum time in seconds the payment authorization is valid for.
    #[serde(rename = "maxTimeoutSeconds")]
    pub max_timeout_seconds: u64,

    /// Token contract address (EVM) or mint address (SVM).
    pub asset: String,

    /// Scheme-specific extra data, e.g. `{"name": "USDC", "version": "2"}`
    /// for EIP-3009, or `{"feePayer": "..."}` for SVM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirements {
    /// Reads `extra.name`/`extra.version`, falling back to the given
    /// defaults when `extra` is absent or the keys are missing.
    pub fn eip712_domain_fields<'a>(&'a self, default_name: &'a str, default_version: &'a str) -> (&'a str, &'a str) {
        match &self.extra {
            Some(extra) => {
                let name = extra.get("name").and_then(Value::as_str).unwrap_or(default_name);
                let version = extra.get("version").and_then(Value::as_str).unwrap_or(default_version);
                (name, version)
            }
            None => (default_name, default_version),
        }
    }
}

/// Response returned by a server when payment is required (HTTP 402).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentRequiredResponse {
    /// Protocol version.
    #[serde(rename = "x402Version")]
    pub x402_version: u32,

    /// List of accepted payment requirements.
    pub accepts: Vec<PaymentRequirements>,

    /// Optional error message (e.g. why a prior attempt was rejected).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Represents a supported payment kind (scheme + network combination),
/// returned by the facilitator's `/supported` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SupportedKind {
    /// Protocol version this kind is offered under.
    #[serde(rename = "x402Version")]
    pub x402_version: u32,
    /// Payment scheme.
    pub scheme: String,
    /// Network identifier.
    pub network: String,
    /// Scheme-specific extra metadata (fee payer, token name/version, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Response from the facilitator's `/supported` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SupportedResponse {
    /// List of supported payment kinds.
    pub kinds: Vec<SupportedKind>,
}

/// A single entry in a discovery listing: a paid resource and the
/// requirements it accepts.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DiscoveryItem {
    /// The kind of resource (e.g. `"http"`).
    #[serde(rename = "type")]
    pub item_type: String,
    /// The resource URL.
    pub resource: String,
    /// Payment requirements this resource accepts.
    pub accepts: Vec<PaymentRequirements>,
    /// Unix timestamp of the last time this listing was refreshed.
    #[serde(rename = "lastUpdated")]
    pub last_updated: u64,
    /// Optional free-form metadata about the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Pagination envelope for a [`DiscoveryListing`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Pagination {
    /// Page size requested.
    pub limit: u32,
    /// Offset into the full result set.
    pub offset: u32,
    /// Total number of items available.
    pub total: u32,
}

/// A page of discoverable paid resources, consumed by crawlers/agents.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DiscoveryListing {
    /// Protocol version.
    #[serde(rename = "x402Version")]
    pub x402_version: u32,
    /// Listings on this page.
    pub items: Vec<DiscoveryItem>,
    /// Pagination details.
    pub pagination: Pagination,
}

/// Response from the facilitator's `/verify` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyResponse {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(rename = "invalidReason", skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    pub fn valid(payer: impl Into<String>) -> Self {
        VerifyResponse {
            is_valid: true,
            invalid_reason: None,
            payer: Some(payer.into()),
        }
    }

    pub fn invalid(reason_code: &str, payer: Option<String>) -> Self {
        VerifyResponse {
            is_valid: false,
            invalid_reason: Some(reason_code.to_string()),
            payer,
        }
    }
}

/// Response from the facilitator's `/settle` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SettleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    pub network: String,
    #[serde(rename = "errorReason", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// Information carried in the `X-Payment-Response` header after a
/// successful (or attempted) settlement.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentResponseHeader {
    /// Whether the settlement succeeded.
    pub success: bool,
    /// Transaction hash/signature of the settlement, if it reached the chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Network the settlement happened on.
    pub network: String,
    /// Reason code if settlement failed.
    #[serde(rename = "errorReason", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// The address that paid, when derivable (useful for abuse tracking
    /// even when settlement failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_amount_rejects_non_decimal() {
        assert!(MoneyAmount::parse("0x10").is_err());
        assert!(MoneyAmount::parse("-1").is_err());
        assert!(MoneyAmount::parse("1.5").is_err());
        assert!(MoneyAmount::parse("").is_err());
    }

    #[test]
    fn test_money_amount_round_trip() {
        let amount = MoneyAmount::parse("10000").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"10000\"");
        let back: MoneyAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_money_amount_from_usd() {
        let amount = MoneyAmount::from_usd(0.01, 6, 1.0).unwrap();
        assert_eq!(amount.as_str(), "10000");
    }

    #[test]
    fn test_payment_requirements_identity_equality() {
        let base = PaymentRequirements {
            scheme: "exact".into(),
            network: "base".into(),
            max_amount_required: MoneyAmount::parse("10000").unwrap(),
            resource: "https://api.example.com/weather".into(),
            description: None,
            mime_type: None,
            output_schema: None,
            pay_to: "0xabc".into(),
            max_timeout_seconds: 60,
            asset: "0xusdc".into(),
            extra: None,
        };
        let mut other = base.clone();
        other.description = Some("different description".into());
        assert_eq!(base, other.clone());

        other.max_amount_required = MoneyAmount::parse("20000").unwrap();
        assert_ne!(base, other);
    }

    #[test]
    fn test_eip712_domain_fields_defaults() {
        let req = PaymentRequirements {
            scheme: "exact".into(),
            network: "base".into(),
            max_amount_required: MoneyAmount::parse("1").unwrap(),
            resource: "r".into(),
            description: None,
            mime_type: None,
            output_schema: None,
            pay_to: "0xabc".into(),
            max_timeout_seconds: 60,
            asset: "0xusdc".into(),
            extra: None,
        };
        assert_eq!(req.eip712_domain_fields("USD Coin", "2"), ("USD Coin", "2"));
    }

    #[test]
    fn test_verify_response_invalid_has_no_transaction_leak() {
        let response = VerifyResponse::invalid("insufficient_funds", Some("0xdef".into()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["invalidReason"], "insufficient_funds");
    }

    #[test]
    fn test_payment_required_response_round_trip() {
        let response = PaymentRequiredResponse {
            x402_version: X402_VERSION,
            accepts: vec![],
            error: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: PaymentRequiredResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.x402_version, X402_VERSION);
    }
}
