// src/error.rs

//! Unified error handling for the sticker crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Seen-item ledger failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Upstream inventory request failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Alert delivery failed
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A work queue lost all of its consumers
    #[error("Queue '{queue}' is closed")]
    QueueClosed { queue: &'static str },

    /// A worker task panicked or was aborted
    #[error("Worker in stage {stage} failed: {message}")]
    Worker { stage: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a worker failure error.
    pub fn worker(stage: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Worker {
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }

    /// The fetch error behind this error, if any.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure of a single GET against the inventory service.
///
/// Never retried. The caller drops the unit of work that issued the request.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GET {url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("GET {url} timed out")]
    Timeout { url: String },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned invalid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// URL of the failed request.
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Transport { url, .. }
            | Self::Decode { url, .. } => url,
        }
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Failure to hand an alert to the messaging endpoint.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("delivery rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delivery request failed: {0}")]
    Transport(#[source] reqwest::Error),
}
