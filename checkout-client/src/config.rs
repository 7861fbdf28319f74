use serde::Deserialize;
use service_core::error::AppError;
use std::time::Duration;

/// Client settings. Only the provider's *public* key id lives here; the key
/// secret belongs to the payment service alone.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the payment service, e.g. `http://localhost:5000`.
    pub backend_url: String,
    /// Public provider key id passed to the hosted checkout.
    pub key_id: String,
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,
    /// Upper-layer limit on how long the hosted checkout may stay open.
    #[serde(default)]
    pub ui_timeout_secs: Option<u64>,
}

fn default_merchant_name() -> String {
    "Event Registration System".to_string()
}

impl ClientSettings {
    /// Load from an optional `configuration` file and `CHECKOUT__*` variables.
    pub fn load() -> Result<Self, AppError> {
        service_core::config::load("CHECKOUT")
    }

    pub fn ui_timeout(&self) -> Option<Duration> {
        self.ui_timeout_secs.map(Duration::from_secs)
    }
}
