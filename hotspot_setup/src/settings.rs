use crate::types::HotspotType;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{net::SocketAddr, path::Path, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// RUST_LOG compatible settings string. Default to
    /// "hotspot_setup=debug"
    #[serde(default = "default_log")]
    pub log: String,
    /// Base url of the blockchain api. Default "https://api.helium.io"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base url of the onboarding server.
    /// Default "https://onboarding.dewi.org"
    #[serde(default = "default_onboarding_url")]
    pub onboarding_url: String,
    /// Connect timeout for http requests. Default 5 seconds
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Total timeout for http requests. Default 10 seconds
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Networks a hotspot is onboarded to. The first entry is used for the
    /// on-chain existence check. Default ["IOT"]
    #[serde(default = "default_hotspot_types")]
    pub hotspot_types: Vec<HotspotType>,
    /// Wallet address of the hotspot owner, paying any assert fees
    pub owner: Option<String>,
    /// Block height refresh interval. Default 1 minute
    #[serde(with = "humantime_serde", default = "default_block_height_interval")]
    pub block_height_interval: Duration,
    /// Current and predicted oracle price refresh interval. Default 10 minutes
    #[serde(with = "humantime_serde", default = "default_oracle_price_interval")]
    pub oracle_price_interval: Duration,
    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsSettings {
    /// Scrape endpoint for metrics
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            endpoint: default_metrics_endpoint(),
        }
    }
}

fn default_metrics_endpoint() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 19000))
}

pub fn default_log() -> String {
    "hotspot_setup=debug".to_string()
}

pub fn default_api_url() -> String {
    "https://api.helium.io".to_string()
}

pub fn default_onboarding_url() -> String {
    "https://onboarding.dewi.org".to_string()
}

pub fn default_hotspot_types() -> Vec<HotspotType> {
    vec![HotspotType::Iot]
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_block_height_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_oracle_price_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Settings {
    /// Load Settings from a given path. Settings are loaded from a given
    /// optional path and can be overriden with environment variables.
    ///
    /// Environment overrides have the same name as the entries in the settings
    /// file in uppercase and prefixed with "HOTSPOT_SETUP_". For example
    /// "HOTSPOT_SETUP_LOG" will override the log setting. Nested keys are
    /// separated by a double underscore, "HOTSPOT_SETUP_METRICS__ENDPOINT".
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = path {
            // Add optional settings file
            builder = builder
                .add_source(File::with_name(&file.as_ref().to_string_lossy()).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("HOTSPOT_SETUP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Self>())
            .and_then(Self::validate)
    }

    fn validate(self) -> Result<Self, config::ConfigError> {
        for (name, interval) in [
            ("block_height_interval", self.block_height_interval),
            ("oracle_price_interval", self.oracle_price_interval),
        ] {
            if interval.is_zero() {
                return Err(config::ConfigError::Message(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(self)
    }

    /// Network type used for the on-chain existence probe.
    pub fn primary_hotspot_type(&self) -> HotspotType {
        self.hotspot_types
            .first()
            .copied()
            .unwrap_or(HotspotType::Iot)
    }
}
