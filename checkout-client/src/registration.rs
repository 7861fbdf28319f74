use async_trait::async_trait;
use mongodb::bson::{doc, Bson, DateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::checkout::VerifiedPayment;
use crate::error::StoreError;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NotRequired,
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::NotRequired => "not_required",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Who is registering, and for which event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attendee {
    pub event_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub payment_status: PaymentStatus,
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Registration {
    /// A registration for a paid event starts `pending`; free events need no payment.
    pub fn new(attendee: Attendee, fee: Option<u64>) -> Self {
        let payment_status = match fee {
            Some(fee) if fee > 0 => PaymentStatus::Pending,
            _ => PaymentStatus::NotRequired,
        };
        let now = DateTime::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: attendee.event_id,
            user_id: attendee.user_id,
            name: attendee.name,
            email: attendee.email,
            phone: attendee.phone,
            payment_status,
            order_id: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bind the registration to a new checkout order. A retry replaces the
    /// previous order.
    pub fn attach_order(&mut self, order_id: &str) -> Result<(), StoreError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(StoreError::InvalidTransition {
                id: self.id.clone(),
                from: self.payment_status,
            });
        }

        self.order_id = Some(order_id.to_string());
        self.payment_id = None;
        self.updated_at = DateTime::now();
        Ok(())
    }

    fn check_payment(&self, payment: &VerifiedPayment) -> Result<(), StoreError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(StoreError::InvalidTransition {
                id: self.id.clone(),
                from: self.payment_status,
            });
        }
        if self.order_id.as_deref() != Some(payment.order_id()) {
            return Err(StoreError::OrderMismatch {
                id: self.id.clone(),
                expected: self.order_id.clone(),
                actual: payment.order_id().to_string(),
            });
        }
        Ok(())
    }

    /// `pending -> paid`, only for the order this registration is bound to.
    pub fn mark_paid(&mut self, payment: &VerifiedPayment) -> Result<(), StoreError> {
        self.check_payment(payment)?;

        self.payment_status = PaymentStatus::Paid;
        self.payment_id = Some(payment.payment_id().to_string());
        self.updated_at = DateTime::now();
        Ok(())
    }
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn create(&self, registration: Registration) -> Result<Registration, StoreError>;

    async fn get(&self, id: &str) -> Result<Registration, StoreError>;

    async fn attach_order(&self, id: &str, order_id: &str) -> Result<Registration, StoreError>;

    /// Record a verified payment. Refuses unless the registration is
    /// `pending` and bound to the payment's order.
    async fn mark_paid(
        &self,
        id: &str,
        payment: &VerifiedPayment,
    ) -> Result<Registration, StoreError>;
}

#[derive(Default)]
pub struct InMemoryRegistrationStore {
    registrations: RwLock<HashMap<String, Registration>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: &str, apply: F) -> Result<Registration, StoreError>
    where
        F: FnOnce(&mut Registration) -> Result<(), StoreError> + Send,
    {
        let mut registrations = self.registrations.write().await;
        let registration = registrations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Work on a copy so a refused change leaves the record untouched.
        let mut updated = registration.clone();
        apply(&mut updated)?;
        *registration = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn create(&self, registration: Registration) -> Result<Registration, StoreError> {
        let mut registrations = self.registrations.write().await;
        if registrations.contains_key(&registration.id) {
            return Err(StoreError::Duplicate(registration.id));
        }
        registrations.insert(registration.id.clone(), registration.clone());
        Ok(registration)
    }

    async fn get(&self, id: &str) -> Result<Registration, StoreError> {
        self.registrations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn attach_order(&self, id: &str, order_id: &str) -> Result<Registration, StoreError> {
        self.update(id, |registration| registration.attach_order(order_id)).await
    }

    async fn mark_paid(
        &self,
        id: &str,
        payment: &VerifiedPayment,
    ) -> Result<Registration, StoreError> {
        self.update(id, |registration| registration.mark_paid(payment)).await
    }
}

#[derive(Clone)]
pub struct MongoRegistrationStore {
    collection: Collection<Registration>,
}

impl MongoRegistrationStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("registrations"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        let event_index = IndexModel::builder()
            .keys(doc! { "eventId": 1 })
            .options(
                IndexOptions::builder()
                    .name("registration_event_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_indexes([event_index], None).await?;

        tracing::info!("Registration indexes initialized");
        Ok(())
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    /// Explain why a conditional update matched nothing.
    async fn refusal(&self, id: &str, payment: Option<&VerifiedPayment>) -> StoreError {
        let current = match self.collection.find_one(doc! { "_id": id }, None).await {
            Ok(Some(current)) => current,
            Ok(None) => return StoreError::NotFound(id.to_string()),
            Err(e) => return StoreError::Database(e),
        };

        match payment {
            Some(payment) => match current.check_payment(payment) {
                Err(e) => e,
                // Changed between the update and this read.
                Ok(()) => StoreError::InvalidTransition {
                    id: id.to_string(),
                    from: current.payment_status,
                },
            },
            None => StoreError::InvalidTransition {
                id: id.to_string(),
                from: current.payment_status,
            },
        }
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl RegistrationStore for MongoRegistrationStore {
    async fn create(&self, registration: Registration) -> Result<Registration, StoreError> {
        match self.collection.insert_one(&registration, None).await {
            Ok(_) => Ok(registration),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(registration.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<Registration, StoreError> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn attach_order(&self, id: &str, order_id: &str) -> Result<Registration, StoreError> {
        let filter = doc! {
            "_id": id,
            "paymentStatus": PaymentStatus::Pending.as_str(),
        };
        let update = doc! {
            "$set": {
                "orderId": order_id,
                "paymentId": Bson::Null,
                "updatedAt": DateTime::now(),
            }
        };

        match self
            .collection
            .find_one_and_update(filter, update, Self::after_update())
            .await?
        {
            Some(registration) => Ok(registration),
            None => Err(self.refusal(id, None).await),
        }
    }

    async fn mark_paid(
        &self,
        id: &str,
        payment: &VerifiedPayment,
    ) -> Result<Registration, StoreError> {
        let filter = doc! {
            "_id": id,
            "paymentStatus": PaymentStatus::Pending.as_str(),
            "orderId": payment.order_id(),
        };
        let update = doc! {
            "$set": {
                "paymentStatus": PaymentStatus::Paid.as_str(),
                "paymentId": payment.payment_id(),
                "updatedAt": DateTime::now(),
            }
        };

        match self
            .collection
            .find_one_and_update(filter, update, Self::after_update())
            .await?
        {
            Some(registration) => {
                tracing::info!(
                    registration_id = %id,
                    payment_id = %payment.payment_id(),
                    "Registration marked paid"
                );
                Ok(registration)
            }
            None => Err(self.refusal(id, Some(payment)).await),
        }
    }
}
