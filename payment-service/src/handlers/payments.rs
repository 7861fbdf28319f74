//! `/api/payments` handlers: order creation, signature verification,
//! payment lookup and refunds.
//!
//! Bodies are extracted as `Option<Json<_>>`: an absent or unparsable body is
//! handled as an empty request so the services report which fields are
//! missing.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    dtos::{
        CreateOrderRequest, CreateOrderResponse, PaymentDetailsResponse, RefundRequest,
        RefundResponse, VerifyPaymentRequest, VerifyPaymentResponse,
    },
    error::PaymentError,
    services::{CreateOrder, RefundPayment},
    startup::AppState,
};

fn body_or_default<T: Default>(payload: Option<Json<T>>) -> T {
    payload.map(|Json(body)| body).unwrap_or_default()
}

/// Create a provider order for a checkout attempt.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Option<Json<CreateOrderRequest>>,
) -> Result<Json<CreateOrderResponse>, PaymentError> {
    let payload = body_or_default(payload);

    let order = state
        .orders
        .create_order(CreateOrder {
            amount: payload.amount,
            currency: payload.currency,
            receipt: payload.receipt,
            notes: payload.notes,
        })
        .await?;

    Ok(Json(CreateOrderResponse {
        success: true,
        order: order.into(),
    }))
}

/// Verify the signature reported by the hosted checkout.
///
/// Persisting the resulting `paid` status is the caller's job.
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Option<Json<VerifyPaymentRequest>>,
) -> Result<Json<VerifyPaymentResponse>, PaymentError> {
    let payload = body_or_default(payload);
    let order_id = payload.razorpay_order_id.unwrap_or_default();
    let payment_id = payload.razorpay_payment_id.unwrap_or_default();
    let signature = payload.razorpay_signature.unwrap_or_default();

    if !state
        .verification
        .verify_payment(&order_id, &payment_id, &signature)?
    {
        return Err(PaymentError::VerificationFailed);
    }

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: "Payment verified successfully".to_string(),
        payment_id,
    }))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentDetailsResponse>, PaymentError> {
    let payment = state.payments.fetch_payment(&payment_id).await?;

    Ok(Json(PaymentDetailsResponse {
        success: true,
        payment,
    }))
}

pub async fn refund(
    State(state): State<AppState>,
    payload: Option<Json<RefundRequest>>,
) -> Result<Json<RefundResponse>, PaymentError> {
    let payload = body_or_default(payload);

    let refund = state
        .payments
        .refund(RefundPayment {
            payment_id: payload.payment_id,
            amount: payload.amount,
            notes: payload.notes,
        })
        .await?;

    Ok(Json(RefundResponse {
        success: true,
        refund,
    }))
}
