//! The `X-Payment` payload: what a client attaches to a retried request once
//! it has signed (EVM) or built (SVM) an authorization.
//!
//! The wire envelope is flat — `x402Version`, `scheme`, `network` sit beside
//! a `payload` object whose shape depends on `network`'s chain family, not
//! on an explicit tag inside `payload` itself. Serde's tagged-enum support
//! can't express "the tag lives in a sibling field", so [`PaymentPayload`]
//! implements `Serialize`/`Deserialize` by hand: decode the envelope with
//! `payload` left as a `serde_json::Value`, then dispatch on
//! [`ChainFamily::of`] before committing to `EvmPayload` or `SvmPayload`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::address::EvmAddress;
use crate::errors::{Result, X402Error};
use crate::network::ChainFamily;
use crate::types::MoneyAmount;

/// A 32-byte nonce, hex-encoded on the wire (`0x` + 64 hex chars), as used
/// by EIP-3009's `transferWithAuthorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce32(pub [u8; 32]);

impl Nonce32 {
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Nonce32(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| X402Error::InvalidPayload(format!("bad nonce hex '{s}': {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| X402Error::InvalidPayload(format!("nonce '{s}' is not 32 bytes")))?;
        Ok(Nonce32(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl Serialize for Nonce32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Nonce32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Nonce32::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The signed EIP-3009 authorization itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EvmAuthorization {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: MoneyAmount,
    #[serde(rename = "validAfter")]
    pub valid_after: u64,
    #[serde(rename = "validBefore")]
    pub valid_before: u64,
    pub nonce: Nonce32,
}

/// A 65-byte `r || s || v` ECDSA signature, hex-encoded, possibly wrapped
/// per ERC-6492 for a counterfactual smart-contract wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmSignature(pub Vec<u8>);

impl Serialize for EvmSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for EvmSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        Ok(EvmSignature(bytes))
    }
}

/// EVM branch of the `payload` object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EvmPayload {
    pub signature: EvmSignature,
    pub authorization: EvmAuthorization,
}

/// SVM branch of the `payload` object: a base64-encoded, partially-signed
/// (client-signed, fee-payer-unsigned) transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SvmPayload {
    pub transaction: String,
}

/// The decoded, chain-family-dispatched form of `payload`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainPayload {
    Evm(EvmPayload),
    Svm(SvmPayload),
}

/// The full `X-Payment` header payload, once base64-decoded and parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: ChainPayload,
}

/// Mirrors the wire shape with `payload` left generic, used only as the
/// intermediate step of manual (de)serialization below.
#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "x402Version")]
    x402_version: u32,
    scheme: String,
    network: String,
    payload: Value,
}

impl Serialize for PaymentPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let payload_value = match &self.payload {
            ChainPayload::Evm(p) => serde_json::to_value(p),
            ChainPayload::Svm(p) => serde_json::to_value(p),
        }
        .map_err(serde::ser::Error::custom)?;
        let raw = RawEnvelope {
            x402_version: self.x402_version,
            scheme: self.scheme.clone(),
            network: self.network.clone(),
            payload: payload_value,
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PaymentPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        let payload = match ChainFamily::of(&raw.network) {
            ChainFamily::Evm => {
                let evm: EvmPayload =
                    serde_json::from_value(raw.payload).map_err(serde::de::Error::custom)?;
                ChainPayload::Evm(evm)
            }
            ChainFamily::Svm => {
                let svm: SvmPayload =
                    serde_json::from_value(raw.payload).map_err(serde::de::Error::custom)?;
                ChainPayload::Svm(svm)
            }
        };
        Ok(PaymentPayload {
            x402_version: raw.x402_version,
            scheme: raw.scheme,
            network: raw.network,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_evm_payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: 1,
            scheme: "exact".into(),
            network: "base".into(),
            payload: ChainPayload::Evm(EvmPayload {
                signature: EvmSignature(vec![0u8; 65]),
                authorization: EvmAuthorization {
                    from: EvmAddress::from_str("0x742d35Cc6634C0532925a3b844Bc454e4438f44e")
                        .unwrap(),
                    to: EvmAddress::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")
                        .unwrap(),
                    value: MoneyAmount::parse("10000").unwrap(),
                    valid_after: 0,
                    valid_before: 2_000_000_000,
                    nonce: Nonce32([7u8; 32]),
                },
            }),
        }
    }

    #[test]
    fn test_evm_payload_round_trip() {
        let payload = sample_evm_payload();
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"network\":\"base\""));
        assert!(json.contains("\"authorization\""));
        let back: PaymentPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_svm_payload_round_trip() {
        let payload = PaymentPayload {
            x402_version: 1,
            scheme: "exact".into(),
            network: "solana-devnet".into(),
            payload: ChainPayload::Svm(SvmPayload {
                transaction: "QkFTRTY0".into(),
            }),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: PaymentPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_nonce_hex_round_trip() {
        let nonce = Nonce32::random();
        let hex = nonce.to_hex();
        assert_eq!(hex.len(), 66);
        let back = Nonce32::from_hex(&hex).unwrap();
        assert_eq!(nonce, back);
    }

    #[test]
    fn test_nonce_rejects_wrong_length() {
        assert!(Nonce32::from_hex("0xabcd").is_err());
    }

    #[test]
    fn test_network_dispatch_picks_matching_chain_family() {
        let evm_json = serde_json::to_string(&sample_evm_payload()).unwrap();
        let mut tampered: Value = serde_json::from_str(&evm_json).unwrap();
        tampered["network"] = Value::String("solana".into());
        let err = serde_json::from_value::<PaymentPayload>(tampered).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("transaction") || err.is_data());
    }
}
