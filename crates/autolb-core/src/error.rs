//! Error types for the autolb system
//!
//! Every provider and engine operation returns [`Error`]. The variants are
//! grouped by how the poll loop reacts to them:
//!
//! - [`Error::Config`] / [`Error::InvalidInput`]: fatal. Rejected at startup;
//!   if a cycle hits one, the poll loop stops and returns it
//! - [`Error::NotFound`]: the looked-up resource does not exist (cycle aborts)
//! - [`Error::Transient`] / [`Error::Timeout`] / [`Error::Provider`]: I/O
//!   failures that are retried on the next cycle

use std::time::Duration;
use thiserror::Error;

/// Result type alias for autolb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the autolb system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A zone, record or load balancer that was looked up does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transient I/O failure talking to a provider API
    #[error("Transient I/O error: {0}")]
    Transient(String),

    /// A provider call did not complete within the configured timeout
    #[error("Operation '{operation}' timed out after {after:?}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transient I/O error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means the looked-up resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the next poll cycle may succeed where this one failed
    ///
    /// Configuration and input errors never heal on their own.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::not_found("zone example.com.").is_not_found());
        assert!(!Error::transient("connection reset").is_not_found());

        assert!(Error::transient("connection reset").is_retryable());
        assert!(Error::timeout("list_records", Duration::from_secs(30)).is_retryable());
        assert!(Error::not_found("zone").is_retryable());
        assert!(!Error::config("missing zone").is_retryable());
        assert!(!Error::invalid_input("empty tag").is_retryable());
    }

    #[test]
    fn test_timeout_display_names_operation() {
        let err = Error::timeout("find_zone_id", Duration::from_secs(5));
        let msg = err.to_string();
        assert!(msg.contains("find_zone_id"));
        assert!(msg.contains("5s"));
    }
}
