//! Payment provider seam.
//!
//! The order, lookup and refund services talk to the provider only through
//! [`PaymentProvider`], which is constructed once at startup and injected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Notes;

/// `payment_capture` value for automatic capture on authorization. Fixed
/// policy; callers cannot choose manual capture.
pub const AUTO_CAPTURE: u8 = 1;

/// Order creation request in provider wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    /// Minor units.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub payment_capture: u8,
    pub notes: Notes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPayment {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub order_id: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

/// Refund request body. No `amount` means a full refund.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRefund {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub notes: Notes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRefund {
    pub id: String,
    pub amount: u64,
    pub status: String,
    pub payment_id: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Razorpay credentials not configured")]
    NotConfigured,

    /// Structured rejection returned by the provider API.
    #[error("Razorpay error ({status}): {code} - {description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

impl ProviderError {
    /// Text reported to callers: the provider's own description when it sent
    /// one, otherwise the error message.
    pub fn details(&self) -> String {
        match self {
            ProviderError::Api { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<ProviderOrder, ProviderError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, ProviderError>;

    async fn create_refund(
        &self,
        payment_id: &str,
        refund: NewRefund,
    ) -> Result<ProviderRefund, ProviderError>;
}
