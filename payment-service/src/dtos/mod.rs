//! JSON bodies of the `/api/payments` endpoints.
//!
//! Request fields are all optional so that a missing field is reported as an
//! invalid request by the service instead of a deserialization rejection.

use serde::{Deserialize, Serialize};

use crate::models::{Notes, Order, PaymentDetails, Refund};

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Whole currency units.
    pub amount: Option<u64>,
    pub currency: Option<String>,
    pub receipt: Option<String>,
    pub notes: Option<Notes>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderSummary,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
        }
    }
}

/// Checkout result forwarded by the client, named as the hosted checkout
/// reports it.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "paymentId")]
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentDetailsResponse {
    pub success: bool,
    pub payment: PaymentDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    /// Whole currency units; absent means a full refund.
    pub amount: Option<u64>,
    pub notes: Option<Notes>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub success: bool,
    pub refund: Refund,
}
