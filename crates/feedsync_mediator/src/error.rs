//! Error types for the mediator.

use thiserror::Error;

/// Result type for mediator operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can end a load.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote answered with a non-success status or without a body.
    #[error("remote error {status}: {message}")]
    Api {
        /// HTTP-style status code.
        status: u16,
        /// Status message from the remote.
        message: String,
    },

    /// The remote could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// A local store or the journal failed.
    #[error("database error: {0}")]
    Database(#[from] feedsync_core::CoreError),

    /// A response body could not be decoded into items.
    #[error("decode error: {0}")]
    Decode(String),

    /// The load was cancelled before its merge.
    #[error("load cancelled")]
    Cancelled,

    /// A collaborator panicked during the load.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Creates an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns true if the error came from the remote side rather than the
    /// local stores.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_) | Self::Decode(_))
    }
}
