//! In-memory backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A backend that keeps its bytes in memory.
///
/// Cloning the backend yields a second handle onto the *same* buffer. Tests
/// keep one handle and give the other to a cache, which lets them look at
/// the journal bytes the cache wrote, or reopen a cache over a copy of them
/// with [`InMemoryBackend::with_data`].
///
/// ```rust
/// use feedsync_storage::{InMemoryBackend, StorageBackend};
///
/// let observer = InMemoryBackend::new();
/// let mut writer = observer.clone();
/// writer.append(b"abc").unwrap();
/// assert_eq!(observer.data(), b"abc");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    bytes: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend preloaded with `data`, e.g. a journal captured from
    /// another cache.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let bytes = self.bytes.read();
        let size = bytes.len() as u64;
        let end = offset.checked_add(len as u64);

        match end {
            Some(end) if end <= size => Ok(bytes[offset as usize..end as usize].to_vec()),
            _ => Err(StorageError::OutOfBounds { offset, len, size }),
        }
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut bytes = self.bytes.write();
        let offset = bytes.len() as u64;
        bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.bytes.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut bytes = self.bytes.write();
        let size = bytes.len() as u64;
        if new_size > size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size,
            });
        }
        bytes.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn offsets_follow_appends() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"head").unwrap(), 0);
        assert_eq!(backend.append(b"tail").unwrap(), 4);
        assert_eq!(backend.size().unwrap(), 8);
        assert_eq!(backend.read_at(4, 4).unwrap(), b"tail");
    }

    #[test]
    fn out_of_bounds_read_is_rejected() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"12345").unwrap();

        assert!(matches!(
            backend.read_at(3, 5),
            Err(StorageError::OutOfBounds { size: 5, .. })
        ));
        assert!(matches!(
            backend.read_at(u64::MAX, 1),
            Err(StorageError::OutOfBounds { .. })
        ));
        assert!(backend.read_at(5, 0).unwrap().is_empty());
    }

    #[test]
    fn clones_share_the_buffer() {
        let observer = InMemoryBackend::new();
        let mut writer = observer.clone();
        writer.append(b"shared").unwrap();
        assert_eq!(observer.size().unwrap(), 6);

        writer.truncate(2).unwrap();
        assert_eq!(observer.data(), b"sh");
    }

    #[test]
    fn with_data_is_independent_of_the_source() {
        let mut source = InMemoryBackend::new();
        source.append(b"snapshot").unwrap();

        let copy = InMemoryBackend::with_data(source.data());
        source.truncate(0).unwrap();
        assert_eq!(copy.data(), b"snapshot");
    }

    #[test]
    fn truncate_cannot_grow() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"abc").unwrap();
        assert!(matches!(
            backend.truncate(10),
            Err(StorageError::InvalidTruncate {
                requested: 10,
                size: 3
            })
        ));
    }

    proptest! {
        #[test]
        fn every_chunk_reads_back(chunks in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..32), 0..16)) {
            let mut backend = InMemoryBackend::new();
            let offsets: Vec<u64> = chunks
                .iter()
                .map(|chunk| backend.append(chunk).unwrap())
                .collect();

            for (chunk, offset) in chunks.iter().zip(offsets) {
                prop_assert_eq!(&backend.read_at(offset, chunk.len()).unwrap(), chunk);
            }
        }
    }
}
