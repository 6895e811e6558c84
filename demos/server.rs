//! Example x402 resource server using Axum.
//!
//! A protected `/weather` route is gated behind [`x402_core::middleware::X402Middleware`];
//! `/health` is left open. The middleware owns the full 402 challenge,
//! verify, settle cycle, so the handler below never sees a payment header.
//!
//! Run with:
//! ```bash
//! cargo run --bin server
//! ```
//!
//! Environment variables:
//! - PAY_TO: Address to receive payments
//! - PRIVATE_KEY: Facilitator signer key (this example settles in-process
//!   rather than delegating to a separate facilitator instance)
//! - RPC_URL: Blockchain RPC endpoint
//! - PORT: Server port (default: 3000)

use axum::routing::get;
use axum::{Json, Router};
use ethers::signers::LocalWallet;
use serde_json::json;

use x402_core::eip155::settler::EvmSettler;
use x402_core::eip155::verifier::EvmVerifier;
use x402_core::middleware::X402Middleware;
use x402_core::scheme::{Settler, Verifier};
use x402_core::types::{MoneyAmount, PaymentRequirements};

async fn weather_handler() -> Json<serde_json::Value> {
    Json(json!({
        "location": "San Francisco",
        "temperature": 68,
        "conditions": "Sunny",
        "humidity": 65,
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "protocol": "x402", "version": 1 }))
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "x402 example server",
        "endpoints": {
            "/weather": "Weather data (requires $0.01 payment)",
            "/health": "Health check (free)",
        },
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let pay_to = std::env::var("PAY_TO").unwrap_or_else(|_| "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb".to_string());
    let private_key = std::env::var("PRIVATE_KEY").unwrap_or_else(|_| {
        println!("no PRIVATE_KEY set, using example key (do not use in production)");
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
    });
    let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| "https://sepolia.base.org".to_string());
    let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse()?;

    println!("starting x402 example server");
    println!("  pay to: {pay_to}");
    println!("  port: {port}");

    let wallet: LocalWallet = private_key.parse()?;
    let verifier = Verifier::Evm(EvmVerifier::new(&rpc_url)?);
    let settler = Settler::Evm(EvmSettler::new(&rpc_url, wallet)?);

    let requirement = PaymentRequirements {
        scheme: "exact".to_string(),
        network: "base-sepolia".to_string(),
        max_amount_required: MoneyAmount::parse("10000")?,
        resource: "/weather".to_string(),
        description: Some("Weather API access".to_string()),
        mime_type: Some("application/json".to_string()),
        output_schema: None,
        pay_to,
        max_timeout_seconds: 300,
        asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
        extra: Some(json!({ "name": "USD Coin", "version": "2" })),
    };

    let middleware = X402Middleware::new(verifier, settler, vec![requirement]);

    let app = Router::new()
        .route("/weather", get(weather_handler))
        .route_layer(middleware)
        .route("/", get(root_handler))
        .route("/health", get(health_handler));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
