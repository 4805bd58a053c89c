//! Fault injection.
//!
//! Two layers can be made to fail:
//!
//! 1. **Journal writes**: [`FaultyBackend`] wraps a storage backend and
//!    fails appends past a byte budget (optionally leaving a partial
//!    write behind), flushes, syncs or truncates.
//! 2. **Item inserts**: [`FaultyStore`] wraps a store and rejects
//!    `insert_all` after the key upsert of the same transaction has
//!    already been recorded.
//!
//! Both are steered through a cloneable handle that stays with the test
//! after the wrapped value has been moved into a cache or mediator.

use feedsync_core::{
    CoreError, CoreResult, Item, ItemId, ItemStore, RemoteKey, RemoteKeyStore, Transaction,
    TransactionCoordinator,
};
use feedsync_storage::{StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct FaultState {
    fail_after_bytes: AtomicU64,
    bytes_written: AtomicU64,
    partial_writes: AtomicBool,
    fail_flush: AtomicBool,
    fail_truncate: AtomicBool,
    crashed: AtomicBool,
}

impl Default for FaultState {
    fn default() -> Self {
        Self {
            fail_after_bytes: AtomicU64::new(u64::MAX),
            bytes_written: AtomicU64::new(0),
            partial_writes: AtomicBool::new(false),
            fail_flush: AtomicBool::new(false),
            fail_truncate: AtomicBool::new(false),
            crashed: AtomicBool::new(false),
        }
    }
}

/// Handle steering a [`FaultyBackend`].
#[derive(Debug, Clone, Default)]
pub struct BackendFaults(Arc<FaultState>);

impl BackendFaults {
    /// Fails every append once `bytes` more bytes have been written.
    pub fn fail_after(&self, bytes: u64) {
        self.0.bytes_written.store(0, Ordering::SeqCst);
        self.0.fail_after_bytes.store(bytes, Ordering::SeqCst);
    }

    /// Whether the append that crosses the budget writes its head first.
    pub fn set_partial_writes(&self, partial: bool) {
        self.0.partial_writes.store(partial, Ordering::SeqCst);
    }

    /// Sets whether flush and sync fail.
    pub fn set_fail_flush(&self, fail: bool) {
        self.0.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Sets whether truncate fails, so a failed commit cannot be rolled back.
    pub fn set_fail_truncate(&self, fail: bool) {
        self.0.fail_truncate.store(fail, Ordering::SeqCst);
    }

    /// Whether any injected fault has fired.
    pub fn has_crashed(&self) -> bool {
        self.0.crashed.load(Ordering::SeqCst)
    }

    /// Clears every fault.
    pub fn reset(&self) {
        self.0.fail_after_bytes.store(u64::MAX, Ordering::SeqCst);
        self.0.bytes_written.store(0, Ordering::SeqCst);
        self.0.partial_writes.store(false, Ordering::SeqCst);
        self.0.fail_flush.store(false, Ordering::SeqCst);
        self.0.fail_truncate.store(false, Ordering::SeqCst);
        self.0.crashed.store(false, Ordering::SeqCst);
    }

    fn crash(&self, what: &str) -> StorageError {
        self.0.crashed.store(true, Ordering::SeqCst);
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("simulated crash during {what}"),
        ))
    }
}

/// A storage backend wrapper that can simulate crashes.
pub struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    faults: BackendFaults,
}

impl FaultyBackend {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: Box<dyn StorageBackend>) -> Self {
        Self {
            inner,
            faults: BackendFaults::default(),
        }
    }

    /// Handle for arming faults after the backend has been moved.
    pub fn faults(&self) -> BackendFaults {
        self.faults.clone()
    }
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = &self.faults.0;
        let len = data.len() as u64;
        let written = state.bytes_written.fetch_add(len, Ordering::SeqCst);
        let budget = state.fail_after_bytes.load(Ordering::SeqCst);

        if written >= budget {
            return Err(self.faults.crash("write"));
        }
        if written + len > budget {
            if state.partial_writes.load(Ordering::SeqCst) {
                let head = usize::try_from(budget - written).unwrap_or(data.len());
                self.inner.append(&data[..head])?;
            }
            return Err(self.faults.crash("partial write"));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.faults.0.fail_flush.load(Ordering::SeqCst) {
            return Err(self.faults.crash("flush"));
        }
        self.inner.flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.faults.0.fail_flush.load(Ordering::SeqCst) {
            return Err(self.faults.crash("sync"));
        }
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if self.faults.0.fail_truncate.load(Ordering::SeqCst) {
            return Err(self.faults.crash("truncate"));
        }
        self.inner.truncate(new_size)
    }
}

/// Handle steering a [`FaultyStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreFaults {
    fail_inserts: Arc<AtomicBool>,
}

impl StoreFaults {
    /// Sets whether `insert_all` fails.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

/// A store wrapper whose item inserts can be made to fail.
///
/// Key upserts and transactions pass straight through, so a failing insert
/// happens after the same transaction's key upsert was recorded.
pub struct FaultyStore<S> {
    inner: S,
    faults: StoreFaults,
}

impl<S> FaultyStore<S> {
    /// Wraps `inner` with inserts succeeding.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: StoreFaults::default(),
        }
    }

    /// Handle for arming the fault after the store has been moved.
    pub fn faults(&self) -> StoreFaults {
        self.faults.clone()
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ItemStore> ItemStore for FaultyStore<S> {
    fn insert_all(&self, txn: &mut Transaction, items: &[Item]) -> CoreResult<()> {
        if self.faults.fail_inserts.load(Ordering::SeqCst) {
            return Err(CoreError::transaction_aborted("injected item insert failure"));
        }
        self.inner.insert_all(txn, items)
    }
}

impl<S: RemoteKeyStore> RemoteKeyStore for FaultyStore<S> {
    fn upsert(&self, txn: &mut Transaction, key: RemoteKey) -> CoreResult<()> {
        self.inner.upsert(txn, key)
    }

    fn max_after_id(&self) -> CoreResult<Option<ItemId>> {
        self.inner.max_after_id()
    }

    fn min_before_id(&self) -> CoreResult<Option<ItemId>> {
        self.inner.min_before_id()
    }
}

impl<S: TransactionCoordinator> TransactionCoordinator for FaultyStore<S> {
    fn run_atomic<T, F>(&self, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>,
    {
        self.inner.run_atomic(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_storage::InMemoryBackend;

    #[test]
    fn budget_fails_crossing_append() {
        let memory = InMemoryBackend::new();
        let mut backend = FaultyBackend::new(Box::new(memory.clone()));
        let faults = backend.faults();
        faults.fail_after(6);
        faults.set_partial_writes(true);

        backend.append(b"abcd").unwrap();
        assert!(backend.append(b"efgh").is_err());
        assert!(faults.has_crashed());
        assert_eq!(memory.data(), b"abcdef".to_vec());

        faults.reset();
        backend.append(b"!").unwrap();
        assert_eq!(memory.data(), b"abcdef!".to_vec());
    }

    #[test]
    fn flush_and_truncate_faults() {
        let mut backend = FaultyBackend::new(Box::new(InMemoryBackend::new()));
        let faults = backend.faults();
        backend.append(b"xyz").unwrap();

        faults.set_fail_flush(true);
        assert!(backend.flush().is_err());
        assert!(backend.sync().is_err());

        faults.set_fail_truncate(true);
        assert!(backend.truncate(0).is_err());
        assert_eq!(backend.size().unwrap(), 3);
    }
}
