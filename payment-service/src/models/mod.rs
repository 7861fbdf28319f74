use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form key/value notes attached to provider orders and refunds.
pub type Notes = BTreeMap<String, String>;

/// Minor units (paise, cents) in one unit of currency.
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Convert whole currency units to the provider's minor units.
///
/// Returns `None` on overflow.
pub fn to_minor_units(amount: u64) -> Option<u64> {
    amount.checked_mul(MINOR_UNITS_PER_MAJOR)
}

/// Convert provider minor units back to (possibly fractional) major units.
pub fn to_major_units(amount: u64) -> f64 {
    amount as f64 / MINOR_UNITS_PER_MAJOR as f64
}

/// A provider order, created once per checkout attempt.
///
/// The service holds no copy; the provider owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Amount in minor units.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    #[serde(default)]
    pub notes: Notes,
}

/// Payment as reported to callers of the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub id: String,
    /// Amount in major units.
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: String,
    /// Amount in major units.
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
