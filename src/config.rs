use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::services::cost::PriceSteps;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Rounding step applied to a recomputed base price on the per-row path.
const DEFAULT_ROW_PRICE_STEP: u32 = 100;
/// Rounding step applied on the whole-list recomputation path.
///
/// The two paths genuinely round differently in production; unifying them
/// would change observable prices. Both stay configurable until the product
/// owner rules which one is intended.
const DEFAULT_LIST_PRICE_STEP: u32 = 1000;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines.
    #[serde(default)]
    pub log_json: bool,

    /// Base price rounding step for the per-row recomputation path.
    #[validate(range(min = 1))]
    #[serde(default = "default_row_price_step")]
    pub row_price_step: u32,

    /// Base price rounding step for the whole-list recomputation path.
    #[validate(range(min = 1))]
    #[serde(default = "default_list_price_step")]
    pub list_price_step: u32,

    /// Base URL of the upstream inventory API.
    #[validate(length(min = 1))]
    pub inventory_api_url: String,

    /// Bearer token for the upstream inventory API, if it requires one.
    #[serde(default)]
    pub inventory_api_token: Option<String>,

    /// Base URL of the document store holding prior grouped snapshots.
    /// Optional: without it, sessions start from live values only.
    #[serde(default)]
    pub document_store_url: Option<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_row_price_step() -> u32 {
    DEFAULT_ROW_PRICE_STEP
}

fn default_list_price_step() -> u32 {
    DEFAULT_LIST_PRICE_STEP
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn price_steps(&self) -> PriceSteps {
        PriceSteps {
            row: Decimal::from(self.row_price_step),
            list: Decimal::from(self.list_price_step),
        }
    }
}

/// Loads configuration from `config/default.toml`, an optional
/// environment-specific file, and `APP__`-prefixed environment variables
/// (e.g. `APP__ROW_PRICE_STEP=500`), then validates it.
pub fn load_config() -> Result<AppConfig, ConfigurationError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()?;
    Ok(cfg)
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured
/// level when set and non-empty.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("packsync_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}
