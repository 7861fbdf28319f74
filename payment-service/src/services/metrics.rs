use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once per process.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))?;

    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_order_created(currency: &str) {
    counter!("payment_orders_created_total", "currency" => currency.to_string()).increment(1);
}

pub fn record_verification(verified: bool) {
    let result = if verified { "verified" } else { "rejected" };
    counter!("payment_verifications_total", "result" => result).increment(1);
}

pub fn record_refund() {
    counter!("payment_refunds_total").increment(1);
}

pub fn record_provider_error(operation: &'static str) {
    counter!("payment_provider_errors_total", "operation" => operation).increment(1);
}
