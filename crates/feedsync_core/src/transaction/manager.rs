//! Transaction manager.

use crate::error::{CoreError, CoreResult};
use crate::journal::{JournalManager, JournalRecord};
use crate::store::CacheTables;
use crate::transaction::state::Transaction;
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Commits transactions to the journal and then to the in-memory tables.
///
/// Only one write transaction exists at a time: [`begin_write`] takes the
/// writer lock and the returned [`WriteTransaction`] holds it until it is
/// dropped. Readers never take the writer lock; they see the tables as of
/// the last completed commit.
///
/// [`begin_write`]: TransactionManager::begin_write
pub struct TransactionManager {
    journal: Arc<JournalManager>,
    tables: Arc<CacheTables>,
    next_txid: AtomicU64,
    next_seq: AtomicU64,
    committed_seq: AtomicU64,
    write_lock: Mutex<()>,
}

/// A [`Transaction`] that holds the writer lock.
pub struct WriteTransaction<'a> {
    txn: Transaction,
    _guard: MutexGuard<'a, ()>,
}

impl Deref for WriteTransaction<'_> {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.txn
    }
}

impl DerefMut for WriteTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Transaction {
        &mut self.txn
    }
}

impl TransactionManager {
    /// Creates a manager continuing from recovered counters.
    pub(crate) fn with_state(
        journal: Arc<JournalManager>,
        tables: Arc<CacheTables>,
        next_txid: u64,
        next_seq: u64,
        committed_seq: u64,
    ) -> Self {
        Self {
            journal,
            tables,
            next_txid: AtomicU64::new(next_txid),
            next_seq: AtomicU64::new(next_seq),
            committed_seq: AtomicU64::new(committed_seq),
            write_lock: Mutex::new(()),
        }
    }

    /// Begins a write transaction, blocking while another one is open.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        let guard = self.write_lock.lock();
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        WriteTransaction {
            txn: Transaction::new(txid),
            _guard: guard,
        }
    }

    /// Commits a write transaction.
    ///
    /// The batch is journaled and flushed first; the tables are updated
    /// only once that succeeded. A transaction with no writes commits
    /// without touching the journal.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is not active or the journal write fails.
    /// In the latter case the transaction is aborted and the tables are
    /// unchanged. A journal poisoned by an earlier failed rollback fails
    /// every commit with [`CoreError::JournalPoisoned`].
    pub fn commit_write(&self, wtxn: &mut WriteTransaction<'_>) -> CoreResult<SequenceNumber> {
        let txn = &mut wtxn.txn;
        if !txn.is_active() {
            return Err(CoreError::invalid_operation("transaction not active"));
        }
        if txn.write_count() == 0 {
            txn.mark_committed();
            return Ok(self.committed_seq());
        }

        let txid = txn.id();
        let sequence = SequenceNumber::new(self.next_seq.fetch_add(1, Ordering::SeqCst));

        let mut records = Vec::with_capacity(txn.write_count() + 2);
        records.push(JournalRecord::Begin { txid });
        records.extend(txn.pending_keys().map(|key| JournalRecord::PutKey { txid, key }));
        records.extend(txn.pending_items().map(|item| JournalRecord::PutItem {
            txid,
            item: item.clone(),
        }));
        records.push(JournalRecord::Commit { txid, sequence });

        if let Err(e) = self.journal.append_commit(&records) {
            txn.mark_aborted();
            return Err(e);
        }

        self.tables.apply(txn);
        self.committed_seq
            .store(sequence.as_u64(), Ordering::SeqCst);
        txn.mark_committed();

        debug!(%txid, %sequence, writes = records.len() - 2, "transaction committed");
        Ok(sequence)
    }

    /// Discards a write transaction.
    pub fn abort_write(&self, wtxn: &mut WriteTransaction<'_>) {
        if wtxn.txn.is_active() {
            debug!(txid = %wtxn.txn.id(), "transaction aborted");
            wtxn.txn.mark_aborted();
        }
    }

    /// Sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }
}
