//! Facilitator HTTP handlers: `/supported`, `/verify`, `/settle`,
//! `/discovery/resources`.
//!
//! Grounded on the teacher's `demos/facilitator.rs` example handler shape
//! (`State<Arc<AppState>>` extractor, `Json` in/out, error converted to a
//! JSON body) and `x402-rs-x402-rs/facilitator/src/run.rs`'s route naming.
//! `/settle` additionally wires the durable ledger: the idempotency
//! contract from the settler design (insert-or-find by `request_hash`,
//! short-circuit on an already-processing/confirmed row) lives here rather
//! than in `x402-core`, since the ledger is a separate crate the protocol
//! layer does not depend on.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use x402_core::codec::request_hash;
use x402_core::network::ChainFamily;
use x402_core::scheme::{ChainSettler, ChainVerifier};
use x402_core::payload::PaymentPayload;
use x402_core::types::{
    DiscoveryItem, DiscoveryListing, Pagination, PaymentRequirements, SettleResponse,
    SupportedKind, SupportedResponse, X402_VERSION,
};
use x402_ledger::models::{NewTransaction, TransactionStatus};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "paymentPayload")]
    pub payment_payload: PaymentPayload,
    #[serde(rename = "paymentRequirements")]
    pub payment_requirements: PaymentRequirements,
}

pub type SettleRequest = VerifyRequest;

pub async fn supported_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fee_payer = match state.verifier.chain_family() {
        ChainFamily::Evm => serde_json::json!({ "feePayer": null }),
        ChainFamily::Svm => serde_json::json!({ "feePayer": null }),
    };
    Json(SupportedResponse {
        kinds: vec![SupportedKind {
            x402_version: X402_VERSION,
            scheme: "exact".to_string(),
            network: state.config.network.clone(),
            extra: Some(fee_payer),
        }],
    })
}

pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let span = info_span!("verify", network = %request.payment_requirements.network);
    let response = state
        .verifier
        .verify(&request.payment_payload, &request.payment_requirements)
        .instrument(span)
        .await?;
    Ok(Json(response))
}

pub async fn settle_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SettleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let hash = request_hash(&request.payment_payload, &request.payment_requirements)?;

    let record = state
        .ledger
        .insert_transaction(NewTransaction {
            request_hash: hash.clone(),
            network: request.payment_requirements.network.clone(),
            from_address: String::new(),
            to_address: request.payment_requirements.pay_to.clone(),
            token: request.payment_requirements.asset.clone(),
            amount: request.payment_requirements.max_amount_required.as_str().to_string(),
            nonce: None,
            max_attempts: 3,
            payload: serde_json::to_value(&request.payment_payload)
                .map_err(x402_core::X402Error::JsonError)?,
        })
        .await
        .map_err(x402_core::X402Error::Internal)?;

    if matches!(
        record.status,
        TransactionStatus::Processing | TransactionStatus::Confirmed
    ) {
        return Ok(Json(SettleResponse {
            success: record.status == TransactionStatus::Confirmed,
            transaction: record.transaction_hash,
            network: record.network,
            error_reason: None,
            payer: None,
        }));
    }

    // Claim the row before submitting on-chain so a second concurrent
    // `/settle` call for the same request_hash sees `processing` and
    // short-circuits above instead of racing this one to the settler.
    state
        .ledger
        .update_transaction_status(record.id, TransactionStatus::Processing, None, None, None, None, None)
        .await
        .map_err(x402_core::X402Error::Internal)?;

    let span = info_span!("settle", request_hash = %hash, network = %request.payment_requirements.network);
    let result = state
        .settler
        .settle(&request.payment_payload, &request.payment_requirements)
        .instrument(span)
        .await?;

    let status = if result.success {
        TransactionStatus::Confirmed
    } else {
        TransactionStatus::Failed
    };
    state
        .ledger
        .update_transaction_status(
            record.id,
            status,
            result.transaction.as_deref(),
            None,
            None,
            None,
            result.error_reason.as_deref(),
        )
        .await
        .map_err(x402_core::X402Error::Internal)?;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct DiscoveryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

/// Lists the single demo resource this facilitator advertises, gated on
/// whatever `payTo`/`asset` the operator configured. A production
/// deployment with multiple protected routes would back this with its own
/// registry; out of scope here (see DESIGN.md).
pub async fn discovery_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DiscoveryQuery>,
) -> impl IntoResponse {
    let items: Vec<DiscoveryItem> = match &state.config.resource_wallet_address {
        Some(pay_to) => vec![DiscoveryItem {
            item_type: "http".to_string(),
            resource: state.config.facilitator_url.clone(),
            accepts: vec![],
            last_updated: x402_core::utils::current_timestamp(),
            metadata: Some(serde_json::json!({ "payTo": pay_to })),
        }],
        None => vec![],
    };
    let total = items.len() as u32;
    Json(DiscoveryListing {
        x402_version: X402_VERSION,
        items,
        pagination: Pagination {
            limit: query.limit,
            offset: query.offset,
            total,
        },
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}
