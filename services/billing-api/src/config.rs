//! Configuration for the Billing API service.

use hamper_billing_core::{BillingConfig, FailurePolicy};
use std::time::Duration;

/// Billing API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Whether the periodic sweep ticker runs
    pub sweep_enabled: bool,
    /// Interval between sweep ticks
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        // Server port
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Request timeout
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Sweep ticker; defaults to one tick per day
        let sweep_enabled = std::env::var("SWEEP_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("SWEEP_INTERVAL_SECS"))?;

        // Subscription discount
        let discount_bps: u32 = std::env::var("SUBSCRIPTION_DISCOUNT_BPS")
            .unwrap_or_else(|_| "1500".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("SUBSCRIPTION_DISCOUNT_BPS"))?;

        if discount_bps > 10_000 {
            return Err(ConfigError::Invalid("SUBSCRIPTION_DISCOUNT_BPS"));
        }

        // Failure escalation: unset means retry forever
        let failure_policy = match std::env::var("BILLING_PAUSE_AFTER_FAILURES") {
            Ok(value) => {
                let attempts = value
                    .parse()
                    .map_err(|_| ConfigError::Invalid("BILLING_PAUSE_AFTER_FAILURES"))?;
                FailurePolicy::PauseAfter { attempts }
            }
            Err(_) => FailurePolicy::RetryForever,
        };

        let billing = BillingConfig::new()
            .with_discount_bps(discount_bps)
            .with_failure_policy(failure_policy);

        Ok(Self {
            http_port,
            database_url,
            billing,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
            sweep_enabled,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
