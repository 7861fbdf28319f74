//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{
    OrderService, PaymentProvider, PaymentsService, RazorpayClient, VerificationService,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state. Every service is stateless per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orders: OrderService,
    pub verification: VerificationService,
    pub payments: PaymentsService,
}

impl AppState {
    /// Wire the services around an explicitly constructed provider.
    pub fn new(config: Config, provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            orders: OrderService::new(provider.clone()),
            verification: VerificationService::new(config.razorpay.key_secret.clone()),
            payments: PaymentsService::new(provider),
            config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let payments = Router::new()
        .route("/create-order", post(handlers::payments::create_order))
        .route("/verify-payment", post(handlers::payments::verify_payment))
        .route("/payment/:payment_id", get(handlers::payments::get_payment))
        .route("/refund", post(handlers::payments::refund));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/payments", payments)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with a Razorpay client from the configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let razorpay = RazorpayClient::new(config.razorpay.clone());
        if razorpay.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!(
                "Razorpay credentials not configured - payment features will be limited"
            );
        }

        Self::build_with_provider(config, Arc::new(razorpay)).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: Config,
        provider: Arc<dyn PaymentProvider>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), provider);

        // Port 0 binds a random port for testing
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Invalid listen address {}:{}: {}",
                    config.server.host,
                    config.server.port,
                    e
                ))
            })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, service = %config.service_name, "Payment service bound");

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await
    }
}
