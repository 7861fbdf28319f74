use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

pub const DEFAULT_RAZORPAY_API_BASE_URL: &str = "https://api.razorpay.com/v1";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub razorpay: RazorpayConfig,
    pub observability: ObservabilityConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Provider credentials. `key_secret` is server-side only: it signs nothing
/// that leaves this process and is never serialized into a response.
#[derive(Deserialize, Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("PAYMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PAYMENT_SERVICE_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("PAYMENT_SERVICE_PORT must be a valid port number")?;

        let key_id = env::var("RAZORPAY_KEY_ID").unwrap_or_default();
        let key_secret = env::var("RAZORPAY_KEY_SECRET").unwrap_or_default();
        let api_base_url = env::var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_RAZORPAY_API_BASE_URL.to_string());

        let log_level =
            env::var("LOG_LEVEL").unwrap_or_else(|_| "info,payment_service=debug".to_string());
        let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.is_empty());

        Ok(Self {
            server: ServerConfig { host, port },
            razorpay: RazorpayConfig {
                key_id,
                key_secret: Secret::new(key_secret),
                api_base_url: api_base_url.trim_end_matches('/').to_string(),
            },
            observability: ObservabilityConfig {
                log_level,
                otlp_endpoint,
            },
            service_name: "payment-service".to_string(),
        })
    }
}
