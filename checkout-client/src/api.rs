//! HTTP client for the payment service's `/api/payments` endpoints.

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::collections::BTreeMap;

use crate::checkout::CheckoutSuccess;
use crate::error::ApiError;

pub type Notes = BTreeMap<String, String>;

/// Order request as sent by the client. `amount` is in whole currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub amount: u64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: Notes,
}

/// Order returned by the service. `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: Option<String>,
}

#[derive(Deserialize)]
struct CreateOrderEnvelope {
    order: CreatedOrder,
}

#[derive(Deserialize)]
struct VerifyEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(rename = "paymentId")]
    payment_id: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    details: Option<String>,
}

#[derive(Clone)]
pub struct PaymentsApi {
    client: Client,
    base_url: String,
}

impl PaymentsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/payments{}", self.base_url, path)
    }

    async fn rejected(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();

        let (error, details) = match envelope {
            Some(ErrorEnvelope {
                error: Some(error),
                details,
            }) => (error, details),
            _ => (format!("Unexpected response: {}", body), None),
        };

        ApiError::Rejected {
            status,
            error,
            details,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(response.json().await?)
    }

    /// Ask the service to create a provider order.
    pub async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder, ApiError> {
        let response = self
            .client
            .traced_post(&self.url("/create-order"))
            .json(request)
            .send()
            .await?;

        let envelope: CreateOrderEnvelope = Self::decode(response).await?;
        tracing::debug!(order_id = %envelope.order.id, "Order created by payment service");

        Ok(envelope.order)
    }

    /// Forward the hosted checkout's result. Returns the verified payment id.
    pub async fn verify_payment(&self, result: &CheckoutSuccess) -> Result<String, ApiError> {
        let response = self
            .client
            .traced_post(&self.url("/verify-payment"))
            .json(result)
            .send()
            .await?;

        let status = response.status().as_u16();
        let envelope: VerifyEnvelope = Self::decode(response).await?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                status,
                error: envelope
                    .error
                    .unwrap_or_else(|| "Payment verification failed".to_string()),
                details: None,
            });
        }

        Ok(envelope
            .payment_id
            .unwrap_or_else(|| result.razorpay_payment_id.clone()))
    }
}
