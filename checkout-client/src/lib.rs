//! Client side of the event payment flow.
//!
//! [`checkout::CheckoutInitiator`] drives one checkout attempt: it asks the
//! payment service for an order, opens the provider's hosted checkout and
//! forwards the result for verification. [`flow::RegistrationCheckout`] ties
//! an attempt to a [`registration::Registration`] and is the only place that
//! marks one `paid`, and only with a [`checkout::VerifiedPayment`].

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod flow;
pub mod registration;

pub use api::PaymentsApi;
pub use checkout::{
    CheckoutInitiator, CheckoutOutcome, CheckoutState, HostedCheckout, VerifiedPayment,
};
pub use config::ClientSettings;
pub use error::{ApiError, CheckoutError, RegistrationError, StoreError};
pub use flow::{EventInfo, RegistrationCheckout};
pub use registration::{
    Attendee, InMemoryRegistrationStore, MongoRegistrationStore, PaymentStatus, Registration,
    RegistrationStore,
};
