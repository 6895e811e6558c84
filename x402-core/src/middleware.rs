//! Server middleware: a real `tower::Layer`/`Service`, unlike the teacher's
//! `server.rs`, which is a set of helper functions a handler calls manually.
//!
//! Grounded on `x402-axum/src/layer.rs`'s `X402Middleware`/
//! `X402MiddlewareService` shape, narrowed to this crate's `Verifier`/
//! `Settler` dispatch enums instead of a generic `Facilitator` trait object.
//! State machine (challenge → verify → run inner handler → settle →
//! `X-Payment-Response`) is unchanged from the teacher's `handle_request`,
//! including settling only after the inner handler succeeds so a crashed
//! handler never charges the payer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Request, StatusCode};
use tower::Service;

use crate::codec::{decode_payment_header, encode_payment_response_header};
use crate::scheme::{ChainSettler, ChainVerifier, Settler, Verifier};
use crate::types::{PaymentRequiredResponse, PaymentRequirements, PaymentResponseHeader};

/// Per-route configuration: which requirements are offered, and which
/// verifier/settler pair enforces them. One middleware instance covers one
/// `(scheme, network)` accept-list for one protected route.
#[derive(Clone)]
pub struct X402Middleware {
    verifier: Arc<Verifier>,
    settler: Arc<Settler>,
    requirements: Arc<Vec<PaymentRequirements>>,
}

impl X402Middleware {
    pub fn new(verifier: Verifier, settler: Settler, requirements: Vec<PaymentRequirements>) -> Self {
        X402Middleware {
            verifier: Arc::new(verifier),
            settler: Arc::new(settler),
            requirements: Arc::new(requirements),
        }
    }
}

impl<S> tower::Layer<S> for X402Middleware
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Service = X402MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        X402MiddlewareService {
            verifier: self.verifier.clone(),
            settler: self.settler.clone(),
            requirements: self.requirements.clone(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct X402MiddlewareService<S> {
    verifier: Arc<Verifier>,
    settler: Arc<Settler>,
    requirements: Arc<Vec<PaymentRequirements>>,
    inner: S,
}

fn payment_required_response(requirements: &[PaymentRequirements], error: Option<String>) -> Response {
    let body = PaymentRequiredResponse {
        x402_version: crate::types::X402_VERSION,
        accepts: requirements.to_vec(),
        error,
    };
    let json = serde_json::to_vec(&body).unwrap_or_default();
    axum::response::Response::builder()
        .status(StatusCode::PAYMENT_REQUIRED)
        .header("Content-Type", "application/json")
        .body(Body::from(json))
        .expect("constructing a 402 response from a fixed header set cannot fail")
}

impl<S> Service<Request<Body>> for X402MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: IntoResponse,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let verifier = self.verifier.clone();
        let settler = self.settler.clone();
        let requirements = self.requirements.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let header_value = req.headers().get("X-Payment").cloned();
            let Some(header_value) = header_value else {
                return Ok(payment_required_response(&requirements, Some("X-Payment header is required".into())));
            };
            let Ok(header_str) = header_value.to_str() else {
                return Ok(payment_required_response(&requirements, Some("invalid X-Payment header encoding".into())));
            };
            let payload = match decode_payment_header(header_str) {
                Ok(payload) => payload,
                Err(e) => {
                    return Ok(payment_required_response(&requirements, Some(format!("invalid payment header: {e}"))));
                }
            };

            let selected = requirements
                .iter()
                .find(|r| r.scheme == payload.scheme && r.network == payload.network)
                .cloned();
            let Some(selected) = selected else {
                return Ok(payment_required_response(&requirements, Some("no matching payment requirements".into())));
            };

            match verifier.verify(&payload, &selected).await {
                Ok(verified) if verified.is_valid => {}
                Ok(verified) => {
                    let reason = verified.invalid_reason.unwrap_or_else(|| "invalid_payload".into());
                    return Ok(payment_required_response(&requirements, Some(format!("verification failed: {reason}"))));
                }
                Err(e) => {
                    return Ok(payment_required_response(&requirements, Some(format!("verification failed: {e}"))));
                }
            }

            let response = inner.call(req).await?.into_response();
            if response.status().is_client_error() || response.status().is_server_error() {
                return Ok(response);
            }

            let settlement = match settler.settle(&payload, &selected).await {
                Ok(settlement) => settlement,
                Err(e) => {
                    return Ok(payment_required_response(&requirements, Some(format!("settlement failed: {e}"))));
                }
            };
            if !settlement.success {
                let reason = settlement.error_reason.unwrap_or_else(|| "unknown".into());
                return Ok(payment_required_response(&requirements, Some(format!("settlement failed: {reason}"))));
            }

            let response_header = PaymentResponseHeader {
                success: settlement.success,
                transaction: settlement.transaction,
                network: settlement.network,
                error_reason: settlement.error_reason,
                payer: settlement.payer,
            };
            let mut response = response;
            if let Ok(encoded) = encode_payment_response_header(&response_header) {
                if let Ok(value) = HeaderValue::from_str(&encoded) {
                    response.headers_mut().insert("X-Payment-Response", value);
                }
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::eip155::settler::EvmSettler;
    use crate::eip155::verifier::EvmVerifier;
    use crate::types::MoneyAmount;
    use ethers::signers::LocalWallet;

    fn test_requirement() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "base-sepolia".to_string(),
            max_amount_required: MoneyAmount::parse("10000").unwrap(),
            resource: "/protected".to_string(),
            description: None,
            mime_type: None,
            output_schema: None,
            pay_to: "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb".to_string(),
            max_timeout_seconds: 60,
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
            extra: None,
        }
    }

    fn test_app() -> Router {
        let wallet: LocalWallet =
            "0x0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .unwrap();
        let verifier = Verifier::Evm(EvmVerifier::new("http://localhost:8545").unwrap());
        let settler = Settler::Evm(EvmSettler::new("http://localhost:8545", wallet).unwrap());
        let middleware = X402Middleware::new(verifier, settler, vec![test_requirement()]);

        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .route_layer(middleware)
    }

    #[tokio::test]
    async fn missing_payment_header_yields_402() {
        let app = test_app();
        let request = Request::builder()
            .uri("/protected")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn malformed_payment_header_yields_402() {
        let app = test_app();
        let request = Request::builder()
            .uri("/protected")
            .header("X-Payment", "not valid base64!!")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn no_matching_requirement_yields_402() {
        // The configured requirement is for "base-sepolia"; a payload for a
        // different network never reaches the verifier.
        let app = test_app();

        let payload = crate::payload::PaymentPayload {
            x402_version: crate::types::X402_VERSION,
            scheme: "exact".to_string(),
            network: "base".to_string(),
            payload: crate::payload::ChainPayload::Evm(crate::payload::EvmPayload {
                signature: crate::payload::EvmSignature(vec![1u8; 65]),
                authorization: crate::payload::EvmAuthorization {
                    from: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap(),
                    to: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".parse().unwrap(),
                    value: MoneyAmount::parse("10000").unwrap(),
                    valid_after: 0,
                    valid_before: 2_000_000_000,
                    nonce: crate::payload::Nonce32([0u8; 32]),
                },
            }),
        };
        let header = crate::codec::encode_payment_header(&payload).unwrap();

        let request = Request::builder()
            .uri("/protected")
            .header("X-Payment", header)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
