//! x402 facilitator HTTP server: verifies and settles payment payloads on
//! behalf of resource servers, for a single configured network.
//!
//! Grounded on the teacher's `demos/facilitator.rs` (axum router shape,
//! route list) with `tracing_subscriber`'s `EnvFilter` in place of
//! `fmt::init()` and a background nonce sweeper spawned alongside the
//! server, per the concurrency model.

mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::FacilitatorConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FacilitatorConfig::load();
    let addr = format!("{}:{}", config.host, config.port);
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);

    let state = Arc::new(AppState::build(config).await?);

    tokio::spawn(x402_ledger::run_sweeper(state.ledger.clone(), sweep_interval));

    let app = Router::new()
        .route("/supported", get(handlers::supported_handler))
        .route("/verify", post(handlers::verify_handler))
        .route("/settle", post(handlers::settle_handler))
        .route("/discovery/resources", get(handlers::discovery_handler))
        .route("/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "x402 facilitator listening");
    axum::serve(listener, app).await?;

    Ok(())
}
