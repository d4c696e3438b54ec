//! Error types for standup-nudge.

use crate::channels::SendError;
use crate::store::StoreError;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum NudgeError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistent store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Message delivery error.
    #[error("delivery error: {0}")]
    Delivery(#[from] SendError),

    /// Template lookup or rendering error.
    #[error("localization error: {0}")]
    Localization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NudgeError>;
