//! Maps `X402Error` onto HTTP responses so a typed reason always reaches
//! the wire instead of an opaque 500. Soft failures (an invalid payload that
//! still deserializes, a reverted settlement) are not errors in this sense —
//! they're returned as ordinary `VerifyResponse`/`SettleResponse` bodies
//! with `isValid`/`success` set to `false`. This wrapper is only for
//! requests that never produced a response envelope at all (malformed JSON,
//! a ledger connection failure).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use x402_core::X402Error;

pub struct AppError(pub X402Error);

impl From<X402Error> for AppError {
    fn from(err: X402Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reason = self.0.reason_code();
        let status = match self.0 {
            X402Error::UnexpectedVerifyError(_)
            | X402Error::UnexpectedSettleError(_)
            | X402Error::Internal(_)
            | X402Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = Json(json!({ "error": reason, "message": self.0.to_string() }));
        (status, body).into_response()
    }
}
