//! Error taxonomy of the payment endpoints and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::ErrorResponse;
use thiserror::Error;

use crate::services::provider::ProviderError;

pub const ORDERS_REQUIRED_FIELDS: &str = "Amount and currency are required";
pub const VERIFY_REQUIRED_FIELDS: &str = "Missing payment verification data";
pub const REFUND_REQUIRED_FIELDS: &str = "Payment ID is required";
pub const INVALID_SIGNATURE: &str = "Invalid payment signature";
pub const AMOUNT_TOO_LARGE: &str = "Amount is too large";

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Missing or malformed caller input. Never reaches the provider.
    #[error("{0}")]
    InvalidRequest(&'static str),

    /// The provider failed or rejected the call. `context` names the
    /// operation as reported to the caller.
    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: ProviderError,
    },

    /// The reported signature does not match the recomputed one. The payment
    /// claim must not be trusted.
    #[error("Invalid payment signature")]
    VerificationFailed,

    #[error("{context}: {details}")]
    Internal {
        context: &'static str,
        details: String,
    },
}

impl PaymentError {
    pub fn status(&self) -> StatusCode {
        match self {
            PaymentError::InvalidRequest(_) | PaymentError::VerificationFailed => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Provider { .. } | PaymentError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            PaymentError::InvalidRequest(message) => {
                (status, Json(ErrorResponse::new(message))).into_response()
            }
            PaymentError::Provider { context, source } => (
                status,
                Json(ErrorResponse::with_details(context, source.details())),
            )
                .into_response(),
            PaymentError::VerificationFailed => (
                status,
                Json(json!({ "success": false, "error": INVALID_SIGNATURE })),
            )
                .into_response(),
            PaymentError::Internal { context, details } => {
                (status, Json(ErrorResponse::with_details(context, details))).into_response()
            }
        }
    }
}
