//! The backend trait.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The journal is the only writer. It appends whole encoded records and
/// reads them back during recovery, so a backend only has to honour these
/// rules:
///
/// - `append` returns the offset of the first written byte
/// - `read_at` returns exactly what was appended at that offset
/// - after `flush` (and more strongly `sync`) appended bytes survive a crash
/// - `truncate` can only shrink
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::OutOfBounds`] if the range is not fully
    /// inside the backend, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes could not be written.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata onto durable media.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Current length in bytes, which is also the next append offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Cuts the backend back to `new_size` bytes.
    ///
    /// The journal uses this to drop the records of a commit that failed
    /// half way.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidTruncate`] if `new_size` is larger
    /// than the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }
}
