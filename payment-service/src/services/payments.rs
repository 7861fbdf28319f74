//! Payment lookup and refunds.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{PaymentError, AMOUNT_TOO_LARGE, REFUND_REQUIRED_FIELDS};
use crate::models::{to_major_units, to_minor_units, Notes, PaymentDetails, Refund};
use crate::services::metrics;
use crate::services::provider::{NewRefund, PaymentProvider, ProviderError};

const FETCH_CONTEXT: &str = "Failed to fetch payment details";
const REFUND_CONTEXT: &str = "Failed to process refund";

#[derive(Debug, Default, Clone)]
pub struct RefundPayment {
    pub payment_id: Option<String>,
    /// Whole currency units. Absent (or zero) refunds the full payment.
    pub amount: Option<u64>,
    pub notes: Option<Notes>,
}

#[derive(Clone)]
pub struct PaymentsService {
    provider: Arc<dyn PaymentProvider>,
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("invalid timestamp {}", seconds)))
}

impl PaymentsService {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, PaymentError> {
        let provider_error = |source: ProviderError| {
            tracing::error!(payment_id = %payment_id, error = %source, "Failed to fetch payment");
            metrics::record_provider_error("fetch_payment");
            PaymentError::Provider {
                context: FETCH_CONTEXT,
                source,
            }
        };

        let payment = self
            .provider
            .fetch_payment(payment_id)
            .await
            .map_err(provider_error)?;
        let created_at = timestamp(payment.created_at).map_err(provider_error)?;

        Ok(PaymentDetails {
            id: payment.id,
            amount: to_major_units(payment.amount),
            currency: payment.currency,
            status: payment.status,
            method: payment.method,
            created_at,
        })
    }

    pub async fn refund(&self, request: RefundPayment) -> Result<Refund, PaymentError> {
        let Some(payment_id) = request.payment_id.filter(|id| !id.is_empty()) else {
            return Err(PaymentError::InvalidRequest(REFUND_REQUIRED_FIELDS));
        };

        let amount = match request.amount.filter(|amount| *amount > 0) {
            Some(amount) => Some(
                to_minor_units(amount).ok_or(PaymentError::InvalidRequest(AMOUNT_TOO_LARGE))?,
            ),
            None => None,
        };

        tracing::info!(
            payment_id = %payment_id,
            amount = ?amount,
            full = amount.is_none(),
            "Requesting refund"
        );

        let provider_error = |source: ProviderError| {
            tracing::error!(payment_id = %payment_id, error = %source, "Failed to create refund");
            metrics::record_provider_error("create_refund");
            PaymentError::Provider {
                context: REFUND_CONTEXT,
                source,
            }
        };

        let refund = self
            .provider
            .create_refund(
                &payment_id,
                NewRefund {
                    amount,
                    notes: request.notes.unwrap_or_default(),
                },
            )
            .await
            .map_err(provider_error)?;
        let created_at = timestamp(refund.created_at).map_err(provider_error)?;

        metrics::record_refund();

        Ok(Refund {
            id: refund.id,
            amount: to_major_units(refund.amount),
            status: refund.status,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::testing::StubProvider;

    #[tokio::test]
    async fn payment_amount_is_reported_in_major_units() {
        let service = PaymentsService::new(Arc::new(StubProvider::default()));
        let payment = service.fetch_payment("pay_123").await.unwrap();

        assert_eq!(payment.id, "pay_123");
        assert_eq!(payment.amount, 500.0);
        assert_eq!(payment.method.as_deref(), Some("upi"));
        assert_eq!(payment.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn refund_without_amount_is_full() {
        let provider = Arc::new(StubProvider::default());
        let service = PaymentsService::new(provider.clone());

        let refund = service
            .refund(RefundPayment {
                payment_id: Some("pay_123".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(refund.amount, 500.0);
        let sent = provider.last_refund.lock().unwrap().clone().unwrap();
        assert_eq!(sent.amount, None);
    }

    #[tokio::test]
    async fn partial_refund_is_sent_in_minor_units() {
        let provider = Arc::new(StubProvider::default());
        let service = PaymentsService::new(provider.clone());

        let refund = service
            .refund(RefundPayment {
                payment_id: Some("pay_123".to_string()),
                amount: Some(120),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(refund.amount, 120.0);
        let sent = provider.last_refund.lock().unwrap().clone().unwrap();
        assert_eq!(sent.amount, Some(12_000));
    }

    #[tokio::test]
    async fn refund_requires_payment_id() {
        let provider = Arc::new(StubProvider::default());
        let service = PaymentsService::new(provider.clone());

        let err = service.refund(RefundPayment::default()).await.unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InvalidRequest(REFUND_REQUIRED_FIELDS)
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn overflowing_refund_amount_is_too_large() {
        let provider = Arc::new(StubProvider::default());
        let service = PaymentsService::new(provider.clone());

        let err = service
            .refund(RefundPayment {
                payment_id: Some("pay_123".to_string()),
                amount: Some(u64::MAX),
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidRequest(AMOUNT_TOO_LARGE)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn lookup_failure_names_the_operation() {
        let service = PaymentsService::new(Arc::new(StubProvider::failing(
            "BAD_REQUEST_ERROR",
            "The id provided does not exist",
        )));

        let err = service.fetch_payment("pay_x").await.unwrap_err();
        match err {
            PaymentError::Provider { context, source } => {
                assert_eq!(context, FETCH_CONTEXT);
                assert_eq!(source.details(), "The id provided does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
