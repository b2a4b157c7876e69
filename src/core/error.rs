//! Error types for a conversational turn.

use super::storage::StoreError;

/// Everything that can stop a turn.
///
/// None of these is fatal: the session translates each into the fallback
/// reply at the turn boundary.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The local store is not open.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(StoreError),

    /// A store operation failed on an open store.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Nothing to send.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The service answered with a non-success status.
    #[error("remote error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// No response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Another exchange is still running on this session.
    #[error("an exchange is already in progress")]
    ExchangeInProgress,
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => Self::PersistenceUnavailable(err),
            _ => Self::Store(err),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type alias for turn operations.
pub type Result<T> = std::result::Result<T, ChatError>;
