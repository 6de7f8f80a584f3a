use crate::settings::MetricsSettings;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use rust_decimal::{prelude::ToPrimitive, Decimal};

const FETCH_COUNTER: &str = "hotspot_setup_fetch";
const CONFIRMATION_COUNTER: &str = "hotspot_setup_confirmation";
const BLOCK_HEIGHT_GAUGE: &str = "hotspot_setup_block_height";
const ORACLE_PRICE_GAUGE: &str = "hotspot_setup_oracle_price";

pub struct Metrics;

impl Metrics {
    pub fn fetch(field: &'static str, success: bool) {
        let result = if success { "ok" } else { "error" };
        metrics::counter!(FETCH_COUNTER, "field" => field, "result" => result).increment(1);
    }

    pub fn block_height(height: u64) {
        metrics::gauge!(BLOCK_HEIGHT_GAUGE).set(height as f64);
    }

    pub fn oracle_price(price: &Decimal) {
        if let Some(value) = price.to_f64() {
            metrics::gauge!(ORACLE_PRICE_GAUGE).set(value);
        }
    }

    pub fn confirmation(outcome: &'static str) {
        metrics::counter!(CONFIRMATION_COUNTER, "outcome" => outcome).increment(1);
    }
}

/// Install the Prometheus scrape endpoint
pub fn install(settings: &MetricsSettings) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(settings.endpoint)
        .install()?;
    tracing::info!(endpoint = %settings.endpoint, "metrics scrape endpoint listening");
    Ok(())
}
