//! Error handling for the CRM admin client

use std::fmt;
use thiserror::Error;

/// Unified error type for the CRM admin client
#[derive(Error, Debug)]
pub enum Error {
    /// The request was cancelled after its timeout elapsed
    #[error("Server not responding: request to {path} timed out. The backend may be overloaded or still starting up.")]
    Timeout { path: String },

    /// The backend could not be reached at all
    #[error("Backend not running at {url}. Start the backend server and check that CRM_API_URL points at it.")]
    BackendUnavailable { url: String },

    /// Any other non-2xx response
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered but refused the operation
    #[error("{0}")]
    Rejected(String),

    /// The phone number is held by another identity
    #[error("Number {phone} is already claimed by {claimed_by}")]
    AlreadyClaimed { phone: String, claimed_by: String },

    /// Client-side form validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network errors that are neither timeouts nor connection failures
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
}

impl Error {
    /// Create a new rejection error
    pub fn rejected<T: fmt::Display>(msg: T) -> Self {
        Error::Rejected(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the backend was unreachable or temporarily unable to serve.
    ///
    /// Writes with a local implementation only fall back on these.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::BackendUnavailable { .. } => true,
            Error::Status { status, .. } => *status == 503,
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::Timeout { path: "/users".into() }.is_transient());
        assert!(Error::BackendUnavailable { url: "http://localhost:3001".into() }.is_transient());
        assert!(Error::Status { status: 503, body: String::new() }.is_transient());
        assert!(!Error::Status { status: 409, body: String::new() }.is_transient());
        assert!(!Error::rejected("Username already exists").is_transient());
    }

    #[test]
    fn messages_are_operator_readable() {
        let timeout = Error::Timeout { path: "/health".into() };
        assert!(timeout.to_string().starts_with("Server not responding"));

        let down = Error::BackendUnavailable { url: "http://localhost:3001".into() };
        assert!(down.to_string().contains("Backend not running"));
        assert!(down.to_string().contains("CRM_API_URL"));
    }
}
