use thiserror::Error;

use crate::registration::PaymentStatus;

/// Failure talking to the payment service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Payment service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error body.
    #[error("{error} (HTTP {status})")]
    Rejected {
        status: u16,
        error: String,
        details: Option<String>,
    },
}

impl ApiError {
    /// Human-readable message: the service's error plus its details if any.
    pub fn message(&self) -> String {
        match self {
            ApiError::Rejected {
                error,
                details: Some(details),
                ..
            } => format!("{}: {}", error, details),
            ApiError::Rejected { error, .. } => error.clone(),
            other => other.to_string(),
        }
    }
}

/// Typed outcome of a failed checkout attempt. None of these may lead to a
/// registration being marked paid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Order creation failed: {0}")]
    OrderCreationFailed(String),

    #[error("Checkout aborted: {0}")]
    CheckoutAborted(String),

    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Registration {0} not found")]
    NotFound(String),

    #[error("Registration {0} already exists")]
    Duplicate(String),

    #[error("Registration {id} cannot change from {from:?}")]
    InvalidTransition { id: String, from: PaymentStatus },

    #[error("Registration {id} is bound to order {expected:?}, not {actual}")]
    OrderMismatch {
        id: String,
        expected: Option<String>,
        actual: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Registration {id} does not need payment (status {status:?})")]
    NotPayable { id: String, status: PaymentStatus },

    #[error("Registration is for event {registered}, not {requested}")]
    EventMismatch {
        registered: String,
        requested: String,
    },
}
