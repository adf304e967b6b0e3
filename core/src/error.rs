//! Error types for the Onfleet client.
//!
//! # Design
//! Failed responses are classified by the remote error code (see
//! `classify`) into `RateLimit`, `Permission`, `Service` or `Http`, each
//! carrying the structured fields of the payload. Anything that goes wrong
//! while obtaining or reading a response collapses into `Generic`; the
//! underlying cause is logged at the dispatcher boundary but not carried in
//! the error value.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Structured fields of a classified failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    /// HTTP status of the failed response.
    pub status: u16,
    /// Remote error code (`message.error`).
    pub code: i64,
    pub message: String,
    pub cause: Option<Value>,
    /// Id of the originating request, as reported by the server.
    pub request: Option<String>,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {}, HTTP {})", self.message, self.code, self.status)
    }
}

/// Errors surfaced by `OnfleetClient` and the dispatcher.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Code 2300. No retry is attempted; the caller has to back off.
    #[error("rate limit exceeded: {0}")]
    RateLimit(ErrorDetails),

    /// Codes 1100 through 1108.
    #[error("permission denied: {0}")]
    Permission(ErrorDetails),

    /// Code 2218 or any code of 2500 and above.
    #[error("service error: {0}")]
    Service(ErrorDetails),

    /// Any other classified failure.
    #[error("request failed: {0}")]
    Http(ErrorDetails),

    /// The request could not be completed or its response could not be read.
    #[error("request could not be completed")]
    Generic { retryable: bool },

    /// Invalid client configuration or call descriptor usage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The environment-backed configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl ApiError {
    /// Structured fields, for classified failures.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            ApiError::RateLimit(d) | ApiError::Permission(d) | ApiError::Service(d) | ApiError::Http(d) => Some(d),
            _ => None,
        }
    }

    /// Remote error code, for classified failures.
    pub fn code(&self) -> Option<i64> {
        self.details().map(|d| d.code)
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimit(_) => true,
            ApiError::Generic { retryable } => *retryable,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
