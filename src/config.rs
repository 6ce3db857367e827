//! Configuration types, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default pause between consecutive sends.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(1000);

/// Default per-URI fetch bound.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of sample addresses in a validation report.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Identifying header sent with every document fetch.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; contact-blast/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// SMTP connection settings for the outbound mailer.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from environment variables.
    ///
    /// `SMTP_HOST` is required. `SMTP_FROM_ADDRESS` falls back to the username.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| ConfigError::MissingEnvVar("SMTP_HOST".into()))?;
        let port = parse_env("SMTP_PORT", 587u16)?;
        let username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default());
        let from_address =
            std::env::var("SMTP_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        Ok(Self {
            host,
            port,
            username,
            password,
            from_address,
        })
    }
}

/// Dispatch settings.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Fixed pause between consecutive sends (self-throttle).
    pub send_delay: Duration,
    /// Maximum number of sample addresses in a validation report.
    pub sample_size: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            send_delay: DEFAULT_SEND_DELAY,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl CampaignConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let delay_ms = parse_env(
            "CAMPAIGN_SEND_DELAY_MS",
            defaults.send_delay.as_millis() as u64,
        )?;
        Ok(Self {
            send_delay: Duration::from_millis(delay_ms),
            sample_size: parse_env("CAMPAIGN_SAMPLE_SIZE", defaults.sample_size)?,
        })
    }
}

/// Ingestion settings for both source paths.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Per-URI fetch bound.
    pub fetch_timeout: Duration,
    /// Maximum in-flight fetches.
    pub fetch_concurrency: usize,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Guess `careers@<domain>` when a document exposes no address.
    pub synthesize_fallback: bool,
    /// One record per distinct address instead of one per row.
    pub fan_out: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_concurrency: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            synthesize_fallback: true,
            fan_out: false,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs = parse_env(
            "INGEST_FETCH_TIMEOUT_SECS",
            defaults.fetch_timeout.as_secs(),
        )?;
        let fetch_concurrency: usize =
            parse_env("INGEST_FETCH_CONCURRENCY", defaults.fetch_concurrency)?;
        if fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INGEST_FETCH_CONCURRENCY".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            fetch_timeout: Duration::from_secs(timeout_secs),
            fetch_concurrency,
            user_agent: std::env::var("INGEST_USER_AGENT").unwrap_or(defaults.user_agent),
            synthesize_fallback: parse_env(
                "INGEST_SYNTHESIZE_FALLBACK",
                defaults.synthesize_fallback,
            )?,
            fan_out: parse_env("INGEST_FAN_OUT", defaults.fan_out)?,
        })
    }
}

/// Read and parse an optional environment variable.
///
/// Unset → `default`. Set but unparseable → `InvalidValue`.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
