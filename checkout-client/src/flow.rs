use std::sync::Arc;
use std::time::Duration;

use crate::api::{Notes, OrderRequest, PaymentsApi};
use crate::checkout::{CheckoutInitiator, DisplayInfo, HostedCheckout, Prefill};
use crate::config::ClientSettings;
use crate::error::{CheckoutError, RegistrationError};
use crate::registration::{Attendee, PaymentStatus, Registration, RegistrationStore};

const GUEST_USER: &str = "guest";

/// The parts of an event the payment flow needs. `fee` is in whole units.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInfo {
    pub id: String,
    pub title: String,
    pub fee: Option<u64>,
    pub currency: String,
}

impl EventInfo {
    fn payable_fee(&self) -> Option<u64> {
        self.fee.filter(|fee| *fee > 0)
    }
}

/// Releases the initiator if `pay` stops between ordering and a finished
/// checkout, whether by error or by the future being dropped.
struct AttemptGuard<'a>(&'a CheckoutInitiator);

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

/// Registration plus payment for one attendee.
pub struct RegistrationCheckout {
    store: Arc<dyn RegistrationStore>,
    initiator: CheckoutInitiator,
    merchant_name: String,
    ui_timeout: Option<Duration>,
}

impl RegistrationCheckout {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        initiator: CheckoutInitiator,
        merchant_name: impl Into<String>,
        ui_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            initiator,
            merchant_name: merchant_name.into(),
            ui_timeout,
        }
    }

    pub fn from_settings(
        settings: &ClientSettings,
        store: Arc<dyn RegistrationStore>,
        hosted: Arc<dyn HostedCheckout>,
    ) -> Self {
        let api = PaymentsApi::new(settings.backend_url.clone());
        let initiator = CheckoutInitiator::new(api, hosted, settings.key_id.clone());

        Self::new(
            store,
            initiator,
            settings.merchant_name.clone(),
            settings.ui_timeout(),
        )
    }

    pub fn initiator(&self) -> &CheckoutInitiator {
        &self.initiator
    }

    /// Create the registration. Paid events start `pending`. An attendee
    /// without an event id is registered for `event`.
    pub async fn register(
        &self,
        event: &EventInfo,
        attendee: Attendee,
    ) -> Result<Registration, RegistrationError> {
        let mut attendee = attendee;
        if attendee.event_id.is_empty() {
            attendee.event_id = event.id.clone();
        } else if attendee.event_id != event.id {
            return Err(RegistrationError::EventMismatch {
                registered: attendee.event_id,
                requested: event.id.clone(),
            });
        }

        let registration = self
            .store
            .create(Registration::new(attendee, event.payable_fee()))
            .await?;

        tracing::info!(
            registration_id = %registration.id,
            event_id = %event.id,
            payment_status = registration.payment_status.as_str(),
            "Registration created"
        );
        Ok(registration)
    }

    /// Pay for a pending registration. On any failure the registration
    /// stays `pending` and the caller may try again.
    pub async fn pay(
        &self,
        event: &EventInfo,
        registration_id: &str,
    ) -> Result<Registration, RegistrationError> {
        let registration = self.store.get(registration_id).await?;
        if registration.event_id != event.id {
            return Err(RegistrationError::EventMismatch {
                registered: registration.event_id,
                requested: event.id.clone(),
            });
        }

        let fee = match (registration.payment_status, event.payable_fee()) {
            (PaymentStatus::Pending, Some(fee)) => fee,
            (status, _) => {
                return Err(RegistrationError::NotPayable {
                    id: registration.id,
                    status,
                })
            }
        };

        let mut notes = Notes::new();
        notes.insert("eventId".to_string(), event.id.clone());
        notes.insert("eventName".to_string(), event.title.clone());
        notes.insert(
            "userId".to_string(),
            registration
                .user_id
                .clone()
                .unwrap_or_else(|| GUEST_USER.to_string()),
        );

        let request = OrderRequest {
            amount: fee,
            currency: event.currency.clone(),
            receipt: Some(format!(
                "event_{}_{}",
                event.id,
                chrono::Utc::now().timestamp_millis()
            )),
            notes: notes.clone(),
        };
        let display = DisplayInfo {
            name: self.merchant_name.clone(),
            description: format!("Registration for {}", event.title),
            prefill: Prefill {
                name: registration.name.clone(),
                email: registration.email.clone(),
                contact: registration.phone.clone(),
            },
            notes,
        };

        let order = self.initiator.request_order(&request).await?;
        let _attempt = AttemptGuard(&self.initiator);
        self.store.attach_order(&registration.id, &order.id).await?;

        let checkout = self.initiator.complete_checkout(&order, &display);
        let outcome = match self.ui_timeout {
            Some(limit) => match tokio::time::timeout(limit, checkout).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        registration_id = %registration.id,
                        order_id = %order.id,
                        "Hosted checkout timed out"
                    );
                    self.initiator.abandon();
                    Err(CheckoutError::CheckoutAborted("checkout timed out".to_string()))
                }
            },
            None => checkout.await,
        };

        let payment = outcome.inspect_err(|e| {
            tracing::info!(
                registration_id = %registration.id,
                error = %e,
                "Registration payment not completed"
            );
        })?;

        let paid = self.store.mark_paid(&registration.id, &payment).await?;
        Ok(paid)
    }
}
