//! Order creation.
//!
//! A pass-through to the provider: validates the request, converts the amount
//! to minor units and asks the provider for an auto-capture order.

use chrono::Utc;
use std::sync::Arc;

use crate::error::{PaymentError, AMOUNT_TOO_LARGE, ORDERS_REQUIRED_FIELDS};
use crate::models::{to_minor_units, Notes, Order};
use crate::services::metrics;
use crate::services::provider::{NewOrder, PaymentProvider, AUTO_CAPTURE};

/// Input to [`OrderService::create_order`].
#[derive(Debug, Default, Clone)]
pub struct CreateOrder {
    /// Whole currency units. Zero counts as absent.
    pub amount: Option<u64>,
    pub currency: Option<String>,
    pub receipt: Option<String>,
    pub notes: Option<Notes>,
}

#[derive(Clone)]
pub struct OrderService {
    provider: Arc<dyn PaymentProvider>,
}

/// `receipt_<unix millis>`, used when the caller sends no receipt.
pub fn default_receipt() -> String {
    format!("receipt_{}", Utc::now().timestamp_millis())
}

impl OrderService {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    pub async fn create_order(&self, request: CreateOrder) -> Result<Order, PaymentError> {
        let amount = request.amount.filter(|amount| *amount > 0);
        let currency = request
            .currency
            .map(|currency| currency.trim().to_string())
            .filter(|currency| !currency.is_empty());

        let (Some(amount), Some(currency)) = (amount, currency) else {
            tracing::warn!("Rejected order request without amount or currency");
            return Err(PaymentError::InvalidRequest(ORDERS_REQUIRED_FIELDS));
        };

        let minor_amount = to_minor_units(amount).ok_or_else(|| {
            tracing::warn!(amount, "Rejected order amount that overflows minor units");
            PaymentError::InvalidRequest(AMOUNT_TOO_LARGE)
        })?;

        let receipt = request
            .receipt
            .filter(|receipt| !receipt.is_empty())
            .unwrap_or_else(default_receipt);
        let notes = request.notes.unwrap_or_default();

        tracing::info!(
            amount = minor_amount,
            currency = %currency,
            receipt = %receipt,
            "Creating provider order"
        );

        let created = self
            .provider
            .create_order(NewOrder {
                amount: minor_amount,
                currency,
                receipt: receipt.clone(),
                payment_capture: AUTO_CAPTURE,
                notes: notes.clone(),
            })
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "Failed to create provider order");
                metrics::record_provider_error("create_order");
                PaymentError::Provider {
                    context: "Failed to create order",
                    source,
                }
            })?;

        metrics::record_order_created(&created.currency);

        Ok(Order {
            id: created.id,
            amount: created.amount,
            currency: created.currency,
            receipt: created.receipt.unwrap_or(receipt),
            notes,
        })
    }
}
