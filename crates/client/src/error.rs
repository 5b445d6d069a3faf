//! Client error types.

use thiserror::Error;

/// Errors surfaced by auction client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No wallet provider available")]
    ProviderUnavailable,

    #[error("No account connected")]
    NotConnected,

    #[error("Account access denied: {0}")]
    AccessDenied(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Invalid bid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("Provider error: {0}")]
    Provider(String),
}

impl ClientError {
    /// Whether the contract rejected the call.
    pub fn is_revert(&self) -> bool {
        matches!(self, ClientError::Reverted(_))
    }
}
