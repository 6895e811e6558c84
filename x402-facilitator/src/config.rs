//! Facilitator configuration.
//!
//! Grounded on `ledgerflow-facilitator/src/config.rs` and
//! `x402-rs-x402-rs/facilitator/src/config.rs`, both of which read config
//! via `clap`'s `env` feature so the same struct accepts either CLI flags or
//! environment variables. One facilitator instance serves one network
//! (matching the teacher's single-`RPC_URL` `demos/facilitator.rs`); running
//! several networks means running several instances, one `PRIVATE_KEY`/
//! `SOLANA_PRIVATE_KEY` each.

use clap::Parser;

/// CLI/env surface from the external interface contract: `FACILITATOR_URL`,
/// `RESOURCE_WALLET_ADDRESS`, `NETWORK`, `PRIVATE_KEY` / `SOLANA_PRIVATE_KEY`,
/// `DATABASE_URL`.
#[derive(Parser, Debug, Clone)]
#[command(name = "x402-facilitator")]
#[command(about = "x402 facilitator HTTP server")]
pub struct FacilitatorConfig {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Base URL this facilitator is reachable at, advertised in discovery
    /// listings and the `extra.feePayer` field of supported-kind entries.
    #[arg(long, env = "FACILITATOR_URL", default_value = "http://localhost:3001")]
    pub facilitator_url: String,

    /// Network identifier this instance verifies/settles for, e.g.
    /// `"base-sepolia"` or `"solana-devnet"`.
    #[arg(long, env = "NETWORK")]
    pub network: String,

    /// RPC endpoint for `network`.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// EVM signer private key (hex, `0x`-prefixed), required when `network`
    /// is an EVM network.
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: Option<String>,

    /// Solana fee-payer keypair, base58-encoded, required when `network` is
    /// a Solana network.
    #[arg(long, env = "SOLANA_PRIVATE_KEY")]
    pub solana_private_key: Option<String>,

    /// Wallet address the resource server is paid to; used as the default
    /// `payTo` for the discovery listing demo resource.
    #[arg(long, env = "RESOURCE_WALLET_ADDRESS")]
    pub resource_wallet_address: Option<String>,

    /// Postgres connection string for the durable ledger.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Nonce-sweep cadence in seconds; must be at least 60 (see
    /// `x402_ledger::sweeper::MIN_SWEEP_INTERVAL`).
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,
}

impl FacilitatorConfig {
    pub fn load() -> Self {
        FacilitatorConfig::parse()
    }
}
