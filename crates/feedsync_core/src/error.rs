//! Error types for the cache.

use crate::types::ItemId;
use std::io;
use thiserror::Error;

/// Result type for cache operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the cache, its journal and its transactions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] feedsync_storage::StorageError),

    /// I/O error outside the backend (directory handling, locking).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal holds bytes that do not decode.
    #[error("journal corruption at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the offending record.
        offset: u64,
        /// What was wrong with it.
        message: String,
    },

    /// A journal record failed its CRC check.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the offending record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// A failed commit could not be cut back out of the journal. Further
    /// commits are refused until the cache is reopened and recovery drops
    /// the leftover bytes.
    #[error("journal poisoned: a failed commit could not be rolled back, reopen the cache")]
    JournalPoisoned,

    /// The transaction was rolled back.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Why it was rolled back.
        reason: String,
    },

    /// An item payload is larger than the configured limit.
    #[error("item {id} is {size} bytes, limit is {max}")]
    ItemTooLarge {
        /// Offending item.
        id: ItemId,
        /// Payload size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Another process holds the cache directory lock.
    #[error("cache locked: another process has exclusive access")]
    CacheLocked,

    /// The cache has been closed.
    #[error("cache is closed")]
    CacheClosed,

    /// The cache directory is unusable.
    #[error("invalid cache directory: {message}")]
    InvalidDirectory {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Why it is not permitted.
        message: String,
    },
}

impl CoreError {
    /// Creates a journal corruption error.
    pub fn journal_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid directory error.
    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors that mean the journal cannot be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::JournalCorruption { .. } | Self::ChecksumMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_classification() {
        assert!(CoreError::journal_corruption(0, "bad magic").is_corruption());
        assert!(CoreError::ChecksumMismatch {
            offset: 11,
            expected: 1,
            actual: 2
        }
        .is_corruption());
        assert!(!CoreError::CacheClosed.is_corruption());
        assert!(!CoreError::JournalPoisoned.is_corruption());
    }

    #[test]
    fn item_too_large_display() {
        let err = CoreError::ItemTooLarge {
            id: ItemId::new(9),
            size: 2048,
            max: 1024,
        };
        assert_eq!(err.to_string(), "item 9 is 2048 bytes, limit is 1024");
    }
}
