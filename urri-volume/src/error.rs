//! Error types for urri-volume

use receiver_client::TransportError;
use thiserror::Error;

/// Result type for accessory operations
pub type Result<T> = std::result::Result<T, AccessoryError>;

/// Errors surfaced to the smart-home framework
///
/// Get-handlers never return these; they are pushed onto the relevant
/// characteristic instead. Set-handlers both push and return them so the
/// framework can reject the write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessoryError {
    /// The receiver could not be reached or answered unexpectedly
    #[error("Receiver communication failed: {0}")]
    Transport(#[from] TransportError),

    /// The background poll task ended abnormally
    #[error("Poll task failed: {0}")]
    PollTask(String),
}

impl AccessoryError {
    /// Whether the failure happened on the network rather than in the body
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AccessoryError::Transport(TransportError::Network(_))
                | AccessoryError::Transport(TransportError::Timeout)
        )
    }
}
