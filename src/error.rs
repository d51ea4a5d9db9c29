//! Custom error types for leadsync

use crate::validation::FieldErrors;
use thiserror::Error;

/// Main error type for leadsync operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Google Ads API not configured")]
    NotConfigured,

    #[error("Google Ads error: {0}")]
    GoogleAds(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many submissions from this address")]
    RateLimited,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Corrupt lead record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

/// Result type alias for leadsync
pub type Result<T> = std::result::Result<T, Error>;
