//! Journal writer.

use crate::error::{CoreError, CoreResult};
use crate::journal::reader::JournalReader;
use crate::journal::record::JournalRecord;
use feedsync_storage::StorageBackend;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

/// Owns the journal backend.
///
/// Commits go through [`JournalManager::append_commit`], which writes a
/// whole transaction and either leaves all of it in the journal or none of
/// it. When a failed commit cannot be cut back out, the manager is
/// poisoned and refuses every later commit; reopening the cache runs
/// recovery over the leftover bytes and starts a fresh manager.
pub struct JournalManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
    poisoned: AtomicBool,
}

impl JournalManager {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Appends one record without flushing. Returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn append(&self, record: &JournalRecord) -> CoreResult<u64> {
        let bytes = record.encode()?;
        Ok(self.backend.lock().append(&bytes)?)
    }

    /// Appends one transaction. Returns the offset of its first record.
    ///
    /// `records` must end with the `Commit` record. Everything before it
    /// is written and flushed (and synced if configured) first; only then
    /// is `Commit` written and flushed on its own. A failure while the
    /// data records are pending therefore never leaves a `Commit` behind.
    ///
    /// If any step fails, the journal is cut back to the length it had
    /// before the call. Should that truncate fail too, the manager is
    /// poisoned: the leftover bytes stay, and every later call returns
    /// [`CoreError::JournalPoisoned`].
    ///
    /// # Errors
    ///
    /// Returns the first write, flush or sync error, or
    /// [`CoreError::JournalPoisoned`] once poisoned.
    pub fn append_commit(&self, records: &[JournalRecord]) -> CoreResult<u64> {
        let (commit, body) = match records.split_last() {
            Some((commit @ JournalRecord::Commit { .. }, body)) => (commit.encode()?, body),
            _ => {
                return Err(CoreError::invalid_operation(
                    "commit batch must end with a Commit record",
                ))
            }
        };
        let body = body
            .iter()
            .map(JournalRecord::encode)
            .collect::<CoreResult<Vec<_>>>()?;

        let mut backend = self.backend.lock();
        if self.is_poisoned() {
            return Err(CoreError::JournalPoisoned);
        }
        let start = backend.size()?;

        let written = (|| -> CoreResult<()> {
            for bytes in &body {
                backend.append(bytes)?;
            }
            self.persist(&mut **backend)?;
            backend.append(&commit)?;
            self.persist(&mut **backend)
        })();

        if let Err(e) = written {
            if let Err(undo) = backend.truncate(start) {
                self.poisoned.store(true, Ordering::SeqCst);
                error!(
                    start,
                    error = %undo,
                    "could not roll back failed journal commit, refusing further commits"
                );
            }
            return Err(e);
        }
        Ok(start)
    }

    /// Whether a failed commit could not be rolled back.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    fn persist(&self, backend: &mut dyn StorageBackend) -> CoreResult<()> {
        backend.flush()?;
        if self.sync_on_commit {
            backend.sync()?;
        }
        Ok(())
    }

    /// Flushes pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Current journal length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Cuts the journal back to `len` bytes. Used by recovery to drop a
    /// torn tail before new commits are appended after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the truncate.
    pub fn truncate(&self, len: u64) -> CoreResult<()> {
        self.backend.lock().truncate(len)?;
        Ok(())
    }

    /// Streams records front to back.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn reader(&self) -> CoreResult<JournalReader<'_>> {
        JournalReader::new(self.backend.lock())
    }

    /// Reads every intact record.
    ///
    /// # Errors
    ///
    /// Returns the first corruption or I/O error.
    pub fn read_all(&self) -> CoreResult<Vec<(u64, JournalRecord)>> {
        self.reader()?.collect()
    }
}
