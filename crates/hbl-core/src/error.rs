//! Error types for the HBL system
//!
//! Every failure a caller can see is attributable: validation errors name the
//! rule that failed, backend errors carry the backend's name.

use std::net::IpAddr;
use thiserror::Error;

use crate::model::Action;

/// Result type alias for HBL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the HBL system
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed address, empty required field, unknown action
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record already exists for the address
    #[error("Address {ip} already exists and is marked as {action}")]
    AlreadyExists {
        /// Conflicting address
        ip: IpAddr,
        /// Action of the existing record
        action: Action,
    },

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// An endpoint failed while applying an action
    #[error("{action} failed on endpoint '{endpoint}': {source}")]
    Endpoint {
        /// Endpoint name
        endpoint: String,
        /// Action that was being applied
        action: String,
        /// Error returned by the endpoint
        #[source]
        source: Box<Error>,
    },

    /// A checker failed to produce a report
    #[error("Check failed on checker '{checker}': {message}")]
    Checker {
        /// Checker name
        checker: String,
        /// Underlying error message
        message: String,
    },

    /// A backend call exceeded the configured timeout
    #[error("Backend '{backend}' timed out")]
    Timeout {
        /// Backend name
        backend: String,
    },

    /// No backend with this name is registered
    #[error("No {kind} named '{name}' is registered")]
    NotRegistered {
        /// Backend kind (endpoint, checker, alerter)
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// Provider-specific error raised inside a backend plugin
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// HTTP client errors (from backend APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Record or report store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an endpoint error tagged with the endpoint name and action
    pub fn endpoint(endpoint: impl Into<String>, action: impl Into<String>, source: Error) -> Self {
        Self::Endpoint {
            endpoint: endpoint.into(),
            action: action.into(),
            source: Box::new(source),
        }
    }

    /// Create a checker error tagged with the checker name
    pub fn checker(checker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Checker {
            checker: checker.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(backend: impl Into<String>) -> Self {
        Self::Timeout {
            backend: backend.into(),
        }
    }

    /// Create a "not registered" error
    pub fn not_registered(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotRegistered {
            kind,
            name: name.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is a "record does not exist" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a "record already exists" condition
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the error was raised before any side effect took place
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
