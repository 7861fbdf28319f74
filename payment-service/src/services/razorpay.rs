//! Razorpay payment provider client.
//!
//! Implements the Orders, Payments and Refunds calls used by the checkout
//! flow over Razorpay's REST API with HTTP basic auth.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize};

use crate::config::RazorpayConfig;
use crate::services::provider::{
    NewOrder, NewRefund, PaymentProvider, ProviderError, ProviderOrder, ProviderPayment,
    ProviderRefund,
};

/// Razorpay client for interacting with the Razorpay API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

/// Razorpay API error response.
#[derive(Debug, Deserialize)]
struct RazorpayError {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Razorpay is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured);
        }

        Ok(request.basic_auth(
            &self.config.key_id,
            Some(self.config.key_secret.expose_secret()),
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Decode a provider response, turning non-2xx bodies into
    /// [`ProviderError::Api`].
    async fn decode<T: DeserializeOwned>(
        response: Response,
        operation: &str,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, operation, "Razorpay response received");

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let error = match serde_json::from_str::<RazorpayError>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => RazorpayErrorDetail {
                code: "UNKNOWN".to_string(),
                description: body,
            },
        };

        tracing::error!(
            status = %status,
            operation,
            code = %error.code,
            description = %error.description,
            "Razorpay request rejected"
        );

        Err(ProviderError::Api {
            status: status.as_u16(),
            code: error.code,
            description: error.description,
        })
    }
}

#[async_trait]
impl PaymentProvider for RazorpayClient {
    async fn create_order(&self, order: NewOrder) -> Result<ProviderOrder, ProviderError> {
        let request = self.authorized(self.client.post(self.url("/orders")))?;
        let response = request.json(&order).send().await?;

        let created: ProviderOrder = Self::decode(response, "create_order").await?;
        tracing::info!(
            order_id = %created.id,
            amount = created.amount,
            currency = %created.currency,
            "Razorpay order created"
        );

        Ok(created)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, ProviderError> {
        let path = format!("/payments/{}", urlencoding::encode(payment_id));
        let request = self.authorized(self.client.get(self.url(&path)))?;
        let response = request.send().await?;

        Self::decode(response, "fetch_payment").await
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        refund: NewRefund,
    ) -> Result<ProviderRefund, ProviderError> {
        let path = format!("/payments/{}/refund", urlencoding::encode(payment_id));
        let request = self.authorized(self.client.post(self.url(&path)))?;
        let response = request.json(&refund).send().await?;

        let created: ProviderRefund = Self::decode(response, "create_refund").await?;
        tracing::info!(
            refund_id = %created.id,
            payment_id = %payment_id,
            amount = created.amount,
            "Razorpay refund created"
        );

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Notes;
    use crate::services::provider::AUTO_CAPTURE;
    use secrecy::Secret;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base_url: &str) -> RazorpayConfig {
        RazorpayConfig {
            key_id: "rzp_test_123".to_string(),
            key_secret: Secret::new("test_secret".to_string()),
            api_base_url: api_base_url.to_string(),
        }
    }

    #[test]
    fn test_is_configured() {
        let client = RazorpayClient::new(test_config("https://api.razorpay.com/v1"));
        assert!(client.is_configured());

        let empty_config = RazorpayConfig {
            key_id: "".to_string(),
            key_secret: Secret::new("".to_string()),
            api_base_url: "".to_string(),
        };
        let client = RazorpayClient::new(empty_config);
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn create_order_posts_auto_capture_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_json(json!({
                "amount": 50000,
                "currency": "INR",
                "receipt": "receipt_1",
                "payment_capture": 1,
                "notes": {}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_ABC",
                "entity": "order",
                "amount": 50000,
                "currency": "INR",
                "receipt": "receipt_1",
                "status": "created",
                "notes": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RazorpayClient::new(test_config(&server.uri()));
        let order = client
            .create_order(NewOrder {
                amount: 50_000,
                currency: "INR".to_string(),
                receipt: "receipt_1".to_string(),
                payment_capture: AUTO_CAPTURE,
                notes: Notes::new(),
            })
            .await
            .unwrap();

        assert_eq!(order.id, "order_ABC");
        assert_eq!(order.amount, 50_000);
        assert_eq!(order.receipt.as_deref(), Some("receipt_1"));
    }

    #[tokio::test]
    async fn provider_rejection_carries_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payments/pay_missing"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "The id provided does not exist"
                }
            })))
            .mount(&server)
            .await;

        let client = RazorpayClient::new(test_config(&server.uri()));
        let err = client.fetch_payment("pay_missing").await.unwrap_err();

        assert!(matches!(err, ProviderError::Api { status: 400, .. }));
        assert_eq!(err.details(), "The id provided does not exist");
    }

    #[tokio::test]
    async fn unstructured_rejection_falls_back_to_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/pay_1/refund"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = RazorpayClient::new(test_config(&server.uri()));
        let err = client
            .create_refund(
                "pay_1",
                NewRefund {
                    amount: None,
                    notes: Notes::new(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.details(), "upstream unavailable");
    }

    #[tokio::test]
    async fn unconfigured_client_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.key_secret = Secret::new(String::new());
        let client = RazorpayClient::new(config);

        let err = client.fetch_payment("pay_1").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
        assert_eq!(err.details(), "Razorpay credentials not configured");
    }
}
