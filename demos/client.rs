//! Example x402 client.
//!
//! Demonstrates making a request against an x402-protected endpoint: the
//! client sends a plain request, gets a 402 back, signs a payment for
//! whichever accepted requirement matches its configured signer, and
//! retries once with the `X-Payment` header attached.
//!
//! Run with:
//! ```bash
//! cargo run --bin client
//! ```
//!
//! Environment variables:
//! - PRIVATE_KEY: EVM signer private key
//! - RPC_URL: Blockchain RPC endpoint for nonce/balance lookups
//! - API_URL: The protected API endpoint to access

use base64::Engine;
use ethers::signers::LocalWallet;
use x402_core::client::{get, X402ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let private_key = std::env::var("PRIVATE_KEY").unwrap_or_else(|_| {
        println!("no PRIVATE_KEY set, using example key (do not use in production)");
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
    });
    let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| "https://sepolia.base.org".to_string());
    let api_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000/weather".to_string());

    println!("x402 example client");
    println!("  RPC: {rpc_url}");
    println!("  API: {api_url}");

    let wallet: LocalWallet = private_key.parse()?;
    let config = X402ClientConfig::new()
        .with_evm_signer(wallet, &rpc_url)
        .with_network("base-sepolia");

    let response = get(&config, &api_url).await?;
    let status = response.status();
    println!("response status: {status}");

    if let Some(payment_response) = response.headers().get("X-Payment-Response") {
        if let Ok(encoded) = payment_response.to_str() {
            if let Ok(decoded_bytes) = base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()) {
                if let Ok(json_str) = String::from_utf8(decoded_bytes) {
                    println!("payment settled: {json_str}");
                }
            }
        }
    }

    let body = response.text().await?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }

    Ok(())
}
