//! Client-side functionality for the x402 protocol: an HTTP interceptor that
//! detects a `402`, picks a matching requirement, signs a payload for
//! whichever chain family that requirement names, and retries exactly once.
//!
//! Generalized from the teacher's EVM-only `request_with_payment`
//! (`Arc<dyn Scheme>` dispatch) to dispatch across [`crate::eip155::client`]
//! and [`crate::solana::client`] by the selected requirement's
//! [`ChainFamily`].

use std::sync::Arc;

use ethers::signers::LocalWallet;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_sdk::signature::Keypair;

use crate::codec::{decode_payment_response_header, encode_payment_header};
use crate::errors::{Result, X402Error};
use crate::network::ChainFamily;
use crate::payload::PaymentPayload;
use crate::types::{PaymentRequiredResponse, PaymentRequirements};

/// Signing material + RPC endpoint for the EVM chain family.
#[derive(Clone)]
pub struct EvmSignerConfig {
    pub wallet: LocalWallet,
    pub rpc_url: String,
}

/// Signing material + RPC endpoint for the SVM chain family. `Keypair`
/// deliberately does not implement `Clone` (it holds raw secret key
/// material); callers share one config via `Arc`.
pub struct SvmSignerConfig {
    pub keypair: Keypair,
    pub rpc_url: String,
}

/// Configuration for x402 client requests. A client only needs to populate
/// the chain family(ies) it actually signs for.
#[derive(Clone)]
pub struct X402ClientConfig {
    pub http_client: Client,
    pub preferred_scheme: Option<String>,
    pub preferred_network: Option<String>,
    pub evm: Option<EvmSignerConfig>,
    pub svm: Option<Arc<SvmSignerConfig>>,
}

impl X402ClientConfig {
    pub fn new() -> Self {
        X402ClientConfig {
            http_client: Client::new(),
            preferred_scheme: Some("exact".to_string()),
            preferred_network: None,
            evm: None,
            svm: None,
        }
    }

    pub fn with_evm_signer(mut self, wallet: LocalWallet, rpc_url: impl Into<String>) -> Self {
        self.evm = Some(EvmSignerConfig {
            wallet,
            rpc_url: rpc_url.into(),
        });
        self
    }

    pub fn with_svm_signer(mut self, keypair: Keypair, rpc_url: impl Into<String>) -> Self {
        self.svm = Some(Arc::new(SvmSignerConfig {
            keypair,
            rpc_url: rpc_url.into(),
        }));
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.preferred_network = Some(network.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

impl Default for X402ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Makes an HTTP request with automatic x402 payment handling: if the
/// server responds `402`, signs a payload for the first matching
/// requirement and retries exactly once with `X-Payment`.
pub async fn request_with_payment(
    config: &X402ClientConfig,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Response> {
    let mut request = config.http_client.request(method.clone(), url);
    if let Some(body) = &body {
        request = request.json(body);
    }
    let response = request.send().await?;

    if response.status() != StatusCode::PAYMENT_REQUIRED {
        return Ok(response);
    }

    let payment_info: PaymentRequiredResponse = response.json().await?;
    let requirement = select_requirement(&payment_info, config)?;
    let payload = generate_payment_payload(requirement, config).await?;
    let payment_header = encode_payment_header(&payload)?;

    let mut retry_request = config.http_client.request(method, url).header("X-Payment", payment_header);
    if let Some(body) = body {
        retry_request = retry_request.json(&body);
    }
    let retry_response = retry_request.send().await?;

    if retry_response.status() == StatusCode::PAYMENT_REQUIRED {
        return Err(X402Error::PaymentFailed(
            "server rejected the signed payment on retry".to_string(),
        ));
    }

    if let Some(header_value) = retry_response.headers().get("X-Payment-Response") {
        if let Ok(encoded) = header_value.to_str() {
            if let Ok(decoded) = decode_payment_response_header(encoded) {
                tracing::debug!(success = decoded.success, network = %decoded.network, "payment response");
            }
        }
    }

    Ok(retry_response)
}

fn select_requirement<'a>(
    response: &'a PaymentRequiredResponse,
    config: &X402ClientConfig,
) -> Result<&'a PaymentRequirements> {
    let mut candidates: Vec<&PaymentRequirements> = response.accepts.iter().collect();

    if let Some(scheme) = &config.preferred_scheme {
        candidates.retain(|r| &r.scheme == scheme);
    }
    if let Some(network) = &config.preferred_network {
        candidates.retain(|r| &r.network == network);
    }
    candidates.retain(|r| match ChainFamily::of(&r.network) {
        ChainFamily::Evm => config.evm.is_some(),
        ChainFamily::Svm => config.svm.is_some(),
    });

    candidates.first().copied().ok_or(X402Error::NoSuitableRequirement)
}

async fn generate_payment_payload(
    requirement: &PaymentRequirements,
    config: &X402ClientConfig,
) -> Result<PaymentPayload> {
    if requirement.scheme != "exact" {
        return Err(X402Error::UnsupportedScheme(requirement.scheme.clone()));
    }

    match ChainFamily::of(&requirement.network) {
        ChainFamily::Evm => {
            let evm = config
                .evm
                .as_ref()
                .ok_or_else(|| X402Error::UnsupportedNetwork(requirement.network.clone()))?;
            crate::eip155::client::generate_payload(requirement, &evm.wallet, &evm.rpc_url).await
        }
        ChainFamily::Svm => {
            let svm = config
                .svm
                .as_ref()
                .ok_or_else(|| X402Error::UnsupportedNetwork(requirement.network.clone()))?;
            let rpc_client = SolanaRpcClient::new(svm.rpc_url.clone());
            crate::solana::client::generate_payload(requirement, &svm.keypair, &rpc_client).await
        }
    }
}

/// Convenience wrapper for GET requests.
pub async fn get(config: &X402ClientConfig, url: &str) -> Result<Response> {
    request_with_payment(config, Method::GET, url, None).await
}

/// Convenience wrapper for POST requests.
pub async fn post(config: &X402ClientConfig, url: &str, body: Value) -> Result<Response> {
    request_with_payment(config, Method::POST, url, Some(body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoneyAmount;

    fn sample_requirement(scheme: &str, network: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: scheme.to_string(),
            network: network.to_string(),
            max_amount_required: MoneyAmount::parse("10000").unwrap(),
            resource: "/api/test".to_string(),
            description: None,
            mime_type: None,
            output_schema: None,
            pay_to: "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb".to_string(),
            max_timeout_seconds: 300,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
            extra: None,
        }
    }

    #[test]
    fn test_config_defaults_prefer_exact_scheme() {
        let config = X402ClientConfig::new();
        assert_eq!(config.preferred_scheme, Some("exact".to_string()));
        assert!(config.evm.is_none());
        assert!(config.svm.is_none());
    }

    #[test]
    fn test_select_requirement_skips_networks_without_a_configured_signer() {
        let response = PaymentRequiredResponse {
            x402_version: 1,
            accepts: vec![sample_requirement("exact", "base")],
            error: None,
        };
        let config = X402ClientConfig::new();
        assert!(matches!(
            select_requirement(&response, &config),
            Err(X402Error::NoSuitableRequirement)
        ));
    }

    #[test]
    fn test_select_requirement_picks_first_supported_match() {
        let response = PaymentRequiredResponse {
            x402_version: 1,
            accepts: vec![sample_requirement("exact", "base")],
            error: None,
        };
        let config = X402ClientConfig::new().with_evm_signer(
            "0x0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .unwrap(),
            "https://mainnet.base.org",
        );
        let requirement = select_requirement(&response, &config).unwrap();
        assert_eq!(requirement.network, "base");
    }
}
