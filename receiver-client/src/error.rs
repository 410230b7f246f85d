//! Error types for the receiver client

use thiserror::Error;

/// Errors that can occur while talking to the receiver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, or name resolution failed
    #[error("Network error: {0}")]
    Network(String),

    /// The receiver answered with a non-success HTTP status
    #[error("Receiver returned HTTP {0}")]
    Status(u16),

    /// The response body was not what the command expects
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The configured request timeout elapsed
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = error.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}
