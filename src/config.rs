use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration.
///
/// Layered from built-in defaults, `config/{default,<env>}.toml` files, and
/// `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub database_url: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Tax rate applied to order subtotals (decimal fraction, e.g. 0.18).
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub default_tax_rate: f64,

    /// ISO currency code used for new payments.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Abandoned carts expire this many hours after their last mutation.
    #[serde(default = "default_cart_ttl_hours")]
    #[validate(range(min = 1, max = 720))]
    pub cart_ttl_hours: i64,

    /// Pending payments expire this many minutes after initiation.
    #[serde(default = "default_payment_expiry_minutes")]
    #[validate(range(min = 1, max = 1440))]
    pub payment_expiry_minutes: i64,

    #[serde(default = "default_payment_max_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub payment_max_attempts: i32,

    /// Estimated minutes until a machine dispenses a freshly placed order.
    #[serde(default = "default_dispense_eta_minutes")]
    pub dispense_eta_minutes: i64,

    /// Interval for the payment/cart expiry sweeper.
    #[serde(default = "default_sweeper_interval_secs")]
    pub sweeper_interval_secs: u64,

    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Constructs a config with the given database URL and environment,
    /// using defaults for everything else. Primarily for tests.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            default_tax_rate: default_tax_rate(),
            default_currency: default_currency(),
            cart_ttl_hours: default_cart_ttl_hours(),
            payment_expiry_minutes: default_payment_expiry_minutes(),
            payment_max_attempts: default_payment_max_attempts(),
            dispense_eta_minutes: default_dispense_eta_minutes(),
            sweeper_interval_secs: default_sweeper_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_tax_rate() -> f64 {
    0.18
}
fn default_currency() -> String {
    "INR".to_string()
}
fn default_cart_ttl_hours() -> i64 {
    24
}
fn default_payment_expiry_minutes() -> i64 {
    15
}
fn default_payment_max_attempts() -> i32 {
    3
}
fn default_dispense_eta_minutes() -> i64 {
    5
}
fn default_sweeper_interval_secs() -> u64 {
    60
}
fn default_event_channel_capacity() -> usize {
    1024
}

fn validate_tax_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 || rate > 1.0 {
        let mut err = ValidationError::new("default_tax_rate");
        err.message = Some("default_tax_rate must be a finite value between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads configuration, layering sources in this order:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{env}.toml` (selected via `RUN_ENV` / `APP_ENV`)
/// 4. Environment variables (`APP__*`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://vendora.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes tracing using the provided log level as the default filter.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vendora_api={}", level)));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::new("sqlite::memory:", "test");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_tax_rate, 0.18);
        assert_eq!(cfg.cart_ttl_hours, 24);
        assert_eq!(cfg.payment_expiry_minutes, 15);
    }

    #[test]
    fn tax_rate_out_of_range_rejected() {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.default_tax_rate = 1.5;
        assert!(cfg.validate().is_err());
        cfg.default_tax_rate = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_event_capacity_rejected() {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.event_channel_capacity = 0;
        assert!(cfg.validate().is_err());
    }
}
