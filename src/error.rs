//! Error types for the knowledge-service integration

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

/// Main error type for the knowledge-service integration.
///
/// Variants carry owned strings and are `Clone` so a single credential
/// refresh outcome can be fanned out to every caller awaiting the shared
/// in-flight future.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    /// Configuration error (fatal at construction)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error (rejected before any network call)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Non-2xx HTTP status from the service
    #[error("HTTP error: status {status}")]
    Api {
        /// HTTP status code of the failed exchange
        status: u16,
    },

    /// Business envelope carried a non-"0" result code
    #[error("Service error {code}: {message}")]
    Envelope {
        /// `resultCode` reported by the service
        code: String,
        /// `resultMsg` reported by the service
        message: String,
    },

    /// Wall-clock timeout fired before the exchange completed
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The configured timeout that expired
        timeout_ms: u64,
    },

    /// Network-level failure (connect, DNS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Credential acquisition failed after retry exhaustion
    #[error("credential acquisition failed: {0}")]
    Credential(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Streaming protocol failure
    #[error("Stream error: {0}")]
    Stream(String),

    /// SQL path failure (invalid field, destructive keyword, probe error)
    #[error("SQL error: {0}")]
    Sql(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for KnowledgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The executor races its own timer; this covers reqwest's
            // connect-level timeout surfacing first.
            KnowledgeError::Network(format!("connection timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            KnowledgeError::Network(err.to_string())
        } else {
            KnowledgeError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KnowledgeError {
    fn from(err: serde_json::Error) -> Self {
        KnowledgeError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for KnowledgeError {
    fn from(err: url::ParseError) -> Self {
        KnowledgeError::Configuration(format!("Invalid URL: {}", err))
    }
}

/// Validation error types
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// A required field was missing or empty
    #[error("Field '{field}' is required")]
    Required {
        /// Name of the missing field
        field: String,
    },

    /// A field value was present but unusable
    #[error("Field '{field}' is invalid: {reason}")]
    Invalid {
        /// Name of the offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A numeric parameter fell outside its allowed range
    #[error("Value out of range for '{field}': {reason}")]
    OutOfRange {
        /// Name of the offending field
        field: String,
        /// The allowed range
        reason: String,
    },

    /// One or more messages in the array were malformed.
    ///
    /// All violations are collected per-index and reported together
    /// rather than failing on the first offense.
    #[error("Invalid messages: {}", .0.join("; "))]
    InvalidMessages(Vec<String>),

    /// Query fields not present in the view's whitelist
    #[error("Invalid fields for view '{view}': {}", .fields.join(", "))]
    InvalidFields {
        /// The view whose whitelist was consulted
        view: String,
        /// The rejected field names
        fields: Vec<String>,
    },
}
