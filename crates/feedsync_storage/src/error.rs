//! Storage error types.

use std::io;
use thiserror::Error;

/// Result alias for backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a [`crate::StorageBackend`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The operating system reported an I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read asked for bytes the backend does not hold.
    #[error("read out of bounds: offset {offset}, len {len}, size {size}")]
    OutOfBounds {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Current size of the backend.
        size: u64,
    },

    /// A truncate asked to grow the backend.
    #[error("cannot truncate to {requested} bytes, backend holds only {size}")]
    InvalidTruncate {
        /// Requested new size.
        requested: u64,
        /// Current size of the backend.
        size: u64,
    },

    /// The backend refused the write (used by fault-injecting wrappers).
    #[error("write rejected: {0}")]
    WriteRejected(String),
}
