//! Error types for contact-blast.

use std::time::Duration;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Mailer error: {0}")]
    Mailer(#[from] MailerError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Malformed or empty contact sources. Fatal to the ingestion call.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Source contains no rows")]
    EmptySource,

    #[error("No email addresses found in any row")]
    NoAddressesFound,

    #[error("Could not extract contact information from any of the provided URLs")]
    NoContactInfoFound,

    #[error("Failed to decode spreadsheet: {0}")]
    Decode(String),

    #[error("Source is too large: {size} bytes > {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-URI document fetch failures. Never abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("{uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    #[error("{uri} timed out after {timeout:?}")]
    Timeout { uri: String, timeout: Duration },

    #[error("Network error fetching {uri}: {reason}")]
    Network { uri: String, reason: String },
}

/// Errors raised by a mailer capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailerError {
    #[error("Connection to mail server failed: {0}")]
    Connection(String),

    #[error("Mail server authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Campaign-level failures. Raised before any send, or on cancellation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignError {
    #[error("Mail server authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No valid email addresses in column {column}")]
    NoValidRecipients { column: String },

    #[error("Campaign cancelled after {processed} of {total} recipients")]
    Cancelled { processed: usize, total: usize },

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Failures while exporting a campaign report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
