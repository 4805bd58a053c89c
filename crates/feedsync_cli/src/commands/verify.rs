//! Verify command implementation.

use super::open_journal;
use feedsync_core::journal::{JournalManager, JournalRecord};
use feedsync_core::{CoreResult, TransactionId};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Records decoded successfully.
    pub records_checked: usize,
    /// Transactions with a `Commit` record.
    pub committed_transactions: usize,
    /// Transactions started but never committed; recovery skips them.
    pub incomplete_transactions: usize,
    /// Bytes after the last intact record that do not form a record.
    pub torn_tail_bytes: u64,
    /// Corruption found, if any.
    pub error: Option<String>,
}

impl VerifyResult {
    /// Whether the journal can be opened.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying cache at {}", path.display());
    println!();

    let journal = open_journal(path)?;
    let result = verify_journal(&journal)?;

    println!(
        "  Journal records checked: {}, committed transactions: {}, incomplete: {}",
        result.records_checked, result.committed_transactions, result.incomplete_transactions
    );
    if result.torn_tail_bytes > 0 {
        println!(
            "  Torn tail: {} bytes (dropped on next open)",
            result.torn_tail_bytes
        );
    }
    if let Some(error) = &result.error {
        println!("    ERROR: {error}");
    }
    if !result.is_ok() {
        println!();
        return Err("Verification FAILED".into());
    }

    println!();
    println!("Verification PASSED");
    Ok(())
}

/// Scans every record of `journal`.
///
/// Corruption is reported in the result rather than as an error, so the
/// counts up to it are kept.
pub fn verify_journal(journal: &JournalManager) -> CoreResult<VerifyResult> {
    let size = journal.size()?;
    let mut result = VerifyResult::default();
    let mut open: BTreeSet<TransactionId> = BTreeSet::new();

    let mut reader = journal.reader()?;
    for entry in reader.by_ref() {
        let (offset, record) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                result.error = Some(e.to_string());
                break;
            }
        };
        debug!(offset, record_type = record.record_type().name(), "record ok");
        result.records_checked += 1;

        match record {
            JournalRecord::Begin { txid } => {
                open.insert(txid);
            }
            JournalRecord::Commit { txid, .. } => {
                if open.remove(&txid) {
                    result.committed_transactions += 1;
                }
            }
            JournalRecord::PutKey { .. } | JournalRecord::PutItem { .. } => {}
        }
    }

    result.incomplete_transactions = open.len();
    if result.error.is_none() {
        result.torn_tail_bytes = size - reader.position();
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{ItemId, SequenceNumber};
    use feedsync_storage::{InMemoryBackend, StorageBackend};

    fn journal_with(records: &[JournalRecord]) -> (JournalManager, InMemoryBackend) {
        let memory = InMemoryBackend::new();
        let journal = JournalManager::new(Box::new(memory.clone()), false);
        for record in records {
            journal.append(record).unwrap();
        }
        (journal, memory)
    }

    fn txn(id: u64) -> Vec<JournalRecord> {
        let txid = TransactionId::new(id);
        vec![
            JournalRecord::Begin { txid },
            JournalRecord::PutKey {
                txid,
                key: feedsync_core::RemoteKey::after(ItemId::new(id as i64)),
            },
            JournalRecord::Commit {
                txid,
                sequence: SequenceNumber::new(id),
            },
        ]
    }

    #[test]
    fn counts_committed_and_incomplete() {
        let mut records = txn(1);
        records.extend(txn(2));
        records.push(JournalRecord::Begin {
            txid: TransactionId::new(3),
        });
        let (journal, _) = journal_with(&records);

        let result = verify_journal(&journal).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.records_checked, 7);
        assert_eq!(result.committed_transactions, 2);
        assert_eq!(result.incomplete_transactions, 1);
        assert_eq!(result.torn_tail_bytes, 0);
    }

    #[test]
    fn reports_torn_tail_and_corruption() {
        let (journal, memory) = journal_with(&txn(1));
        let mut backend = memory.clone();
        backend.append(&[0x46, 0x53]).unwrap();

        let result = verify_journal(&journal).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.torn_tail_bytes, 2);

        let mut bytes = memory.data();
        bytes[12] ^= 0x01;
        let journal = JournalManager::new(Box::new(InMemoryBackend::with_data(bytes)), false);
        let result = verify_journal(&journal).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.records_checked, 0);
    }
}
