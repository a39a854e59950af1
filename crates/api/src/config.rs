//! Application configuration loaded from environment variables.

use std::time::Duration;

use payments::{PayPalSettings, StripeSettings};
use thiserror::Error;

const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST` / `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `SESSION_SECRET`: bearer token secret (required)
/// - `STRIPE_KEY`, `STRIPE_ENDPOINT_SECRET` (required), `STRIPE_API_BASE`
/// - `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET` (required), `PAYPAL_API_BASE`
/// - `PROVIDER_TIMEOUT_MS`: bound on every provider call (default 15000)
/// - `WEBHOOK_TOLERANCE_SECS`: accepted signature age (default 300)
/// - `DATABASE_URL`: PostgreSQL URL; orders are kept in memory when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub session_secret: String,
    pub stripe: StripeSettings,
    pub stripe_endpoint_secret: String,
    pub paypal: PayPalSettings,
    pub webhook_tolerance: Duration,
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let port = parse_or(&optional, "PORT", 3000)?;
        let timeout = Duration::from_millis(parse_or(
            &optional,
            "PROVIDER_TIMEOUT_MS",
            DEFAULT_PROVIDER_TIMEOUT_MS,
        )?);
        let webhook_tolerance = Duration::from_secs(parse_or(
            &optional,
            "WEBHOOK_TOLERANCE_SECS",
            DEFAULT_WEBHOOK_TOLERANCE_SECS,
        )?);

        let mut stripe = StripeSettings::new(required("STRIPE_KEY")?);
        stripe.timeout = timeout;
        if let Some(base) = optional("STRIPE_API_BASE") {
            stripe.api_base = base;
        }

        let mut paypal =
            PayPalSettings::sandbox(required("PAYPAL_CLIENT_ID")?, required("PAYPAL_CLIENT_SECRET")?);
        paypal.timeout = timeout;
        if let Some(base) = optional("PAYPAL_API_BASE") {
            paypal.api_base = base;
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            session_secret: required("SESSION_SECRET")?,
            stripe,
            stripe_endpoint_secret: required("STRIPE_ENDPOINT_SECRET")?,
            paypal,
            webhook_tolerance,
            database_url: optional("DATABASE_URL"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    optional: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
