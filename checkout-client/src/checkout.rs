//! Checkout initiator.
//!
//! ```text
//! idle -> order_requested -> provider_ui_open
//!     -> provider_success -> verifying -> verified | verification_failed
//!     -> provider_failure -> idle
//! ```
//!
//! The hosted checkout reports its result through a callback; here that is a
//! one-shot channel resolved at most once. A dropped sender means the user
//! walked away. The initiator never times the hosted UI out itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch};

use crate::api::{CreatedOrder, Notes, OrderRequest, PaymentsApi};
use crate::error::CheckoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutState {
    Idle,
    OrderRequested,
    ProviderUiOpen,
    ProviderSuccess,
    ProviderFailure,
    Verifying,
    Verified,
    VerificationFailed,
}

impl CheckoutState {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::OrderRequested => "order_requested",
            CheckoutState::ProviderUiOpen => "provider_ui_open",
            CheckoutState::ProviderSuccess => "provider_success",
            CheckoutState::ProviderFailure => "provider_failure",
            CheckoutState::Verifying => "verifying",
            CheckoutState::Verified => "verified",
            CheckoutState::VerificationFailed => "verification_failed",
        }
    }

    /// A new attempt may start from rest or from a finished attempt.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            CheckoutState::Idle | CheckoutState::Verified | CheckoutState::VerificationFailed
        )
    }

    pub fn can_transition_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;

        match (self, next) {
            (from, OrderRequested) => from.can_start(),
            (OrderRequested, ProviderUiOpen | Idle) => true,
            (ProviderUiOpen, ProviderSuccess | ProviderFailure) => true,
            (ProviderFailure, Idle) => true,
            (ProviderSuccess, Verifying | VerificationFailed) => true,
            (Verifying, Verified | VerificationFailed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// What the payer sees in the hosted checkout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayInfo {
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
    pub notes: Notes,
}

/// Options handed to the hosted checkout. Carries the public key id only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutOptions {
    pub key: String,
    /// Minor units, as returned with the order.
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
    pub notes: Notes,
}

/// Success callback payload of the hosted checkout. Untrusted until verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSuccess {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// `payment.failed` callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutFailure {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Success(CheckoutSuccess),
    Failed(CheckoutFailure),
}

/// The provider's hosted checkout UI.
#[async_trait]
pub trait HostedCheckout: Send + Sync {
    /// Open the UI for an order. The receiver resolves once with the
    /// provider's callback; if the sender is dropped unresolved the user
    /// abandoned the checkout. An `Err` means the UI could not be opened
    /// (for example the checkout script failed to load).
    async fn open(
        &self,
        options: CheckoutOptions,
    ) -> Result<oneshot::Receiver<CheckoutOutcome>, CheckoutFailure>;
}

/// Proof that the payment service verified a payment for a specific order.
///
/// Only the initiator constructs it, after a success response from the
/// verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    order_id: String,
    payment_id: String,
}

impl VerifiedPayment {
    pub(crate) fn new(order_id: String, payment_id: String) -> Self {
        Self {
            order_id,
            payment_id,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }
}

pub type PaymentResult = Result<VerifiedPayment, CheckoutError>;

pub struct CheckoutInitiator {
    api: PaymentsApi,
    hosted: Arc<dyn HostedCheckout>,
    key_id: String,
    state: watch::Sender<CheckoutState>,
    history: Mutex<Vec<CheckoutState>>,
}

impl CheckoutInitiator {
    pub fn new(
        api: PaymentsApi,
        hosted: Arc<dyn HostedCheckout>,
        key_id: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);

        Self {
            api,
            hosted,
            key_id: key_id.into(),
            state,
            history: Mutex::new(vec![CheckoutState::Idle]),
        }
    }

    pub fn state(&self) -> CheckoutState {
        *self.state.borrow()
    }

    /// Watch state changes, e.g. to drive a progress indicator.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn transitions(&self) -> Vec<CheckoutState> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, next: CheckoutState) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(next);
    }

    fn advance(&self, next: CheckoutState) {
        let current = self.state();
        debug_assert!(
            current.can_transition_to(next),
            "invalid checkout transition {current} -> {next}"
        );
        if !current.can_transition_to(next) {
            tracing::error!(from = %current, to = %next, "Invalid checkout transition");
        }

        tracing::debug!(from = %current, to = %next, "Checkout state changed");
        self.state.send_replace(next);
        self.record(next);
    }

    /// Start an attempt and request an order from the payment service.
    ///
    /// Fails with `CheckoutAborted` if another attempt is in flight.
    pub async fn request_order(
        &self,
        request: &OrderRequest,
    ) -> Result<CreatedOrder, CheckoutError> {
        let started = self.state.send_if_modified(|state| {
            if state.can_start() {
                *state = CheckoutState::OrderRequested;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(CheckoutError::CheckoutAborted(format!(
                "another checkout is in progress ({})",
                self.state()
            )));
        }
        self.record(CheckoutState::OrderRequested);

        match self.api.create_order(request).await {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    amount = order.amount,
                    "Checkout order created"
                );
                Ok(order)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Order creation failed");
                self.advance(CheckoutState::Idle);
                Err(CheckoutError::OrderCreationFailed(e.message()))
            }
        }
    }

    /// Open the hosted checkout for `order` and verify its result.
    ///
    /// Must follow a successful [`request_order`](Self::request_order).
    pub async fn complete_checkout(
        &self,
        order: &CreatedOrder,
        display: &DisplayInfo,
    ) -> PaymentResult {
        let options = CheckoutOptions {
            key: self.key_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            name: display.name.clone(),
            description: display.description.clone(),
            order_id: order.id.clone(),
            prefill: display.prefill.clone(),
            notes: display.notes.clone(),
        };

        let receiver = match self.hosted.open(options).await {
            Ok(receiver) => receiver,
            Err(failure) => {
                tracing::warn!(code = %failure.code, "Hosted checkout could not be opened");
                self.advance(CheckoutState::Idle);
                return Err(CheckoutError::CheckoutAborted(failure.description));
            }
        };
        self.advance(CheckoutState::ProviderUiOpen);

        let success = match receiver.await {
            Ok(CheckoutOutcome::Success(success)) => success,
            Ok(CheckoutOutcome::Failed(failure)) => {
                tracing::info!(
                    order_id = %order.id,
                    code = %failure.code,
                    "Payment failed in hosted checkout"
                );
                self.advance(CheckoutState::ProviderFailure);
                self.advance(CheckoutState::Idle);
                return Err(CheckoutError::CheckoutAborted(failure.description));
            }
            Err(_) => {
                tracing::info!(order_id = %order.id, "Hosted checkout closed without a result");
                self.advance(CheckoutState::ProviderFailure);
                self.advance(CheckoutState::Idle);
                return Err(CheckoutError::CheckoutAborted(
                    "checkout closed before payment completed".to_string(),
                ));
            }
        };
        self.advance(CheckoutState::ProviderSuccess);

        if success.razorpay_order_id != order.id {
            tracing::warn!(
                expected = %order.id,
                reported = %success.razorpay_order_id,
                "Hosted checkout reported a different order"
            );
            self.advance(CheckoutState::VerificationFailed);
            return Err(CheckoutError::VerificationFailed(
                "payment reported for a different order".to_string(),
            ));
        }

        self.advance(CheckoutState::Verifying);
        match self.api.verify_payment(&success).await {
            Ok(payment_id) => {
                tracing::info!(order_id = %order.id, payment_id = %payment_id, "Payment verified");
                self.advance(CheckoutState::Verified);
                Ok(VerifiedPayment::new(order.id.clone(), payment_id))
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Payment verification failed");
                self.advance(CheckoutState::VerificationFailed);
                Err(CheckoutError::VerificationFailed(e.message()))
            }
        }
    }

    /// Run a whole attempt: order, hosted checkout, verification.
    pub async fn initiate_checkout(
        &self,
        request: &OrderRequest,
        display: &DisplayInfo,
    ) -> PaymentResult {
        let order = self.request_order(request).await?;
        self.complete_checkout(&order, display).await
    }

    /// Give up on an in-flight attempt, e.g. after an upper-layer UI timeout
    /// dropped the pending [`complete_checkout`](Self::complete_checkout).
    /// An attempt already past the provider UI counts as unverified.
    pub fn abandon(&self) {
        match self.state() {
            CheckoutState::OrderRequested => self.advance(CheckoutState::Idle),
            CheckoutState::ProviderUiOpen => {
                self.advance(CheckoutState::ProviderFailure);
                self.advance(CheckoutState::Idle);
            }
            CheckoutState::ProviderSuccess | CheckoutState::Verifying => {
                self.advance(CheckoutState::VerificationFailed)
            }
            _ => {}
        }
    }
}
