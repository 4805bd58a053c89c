//! CLI command implementations.

pub mod dump_journal;
pub mod inspect;
pub mod verify;

use feedsync_core::journal::JournalManager;
use feedsync_core::JOURNAL_FILE;
use feedsync_storage::FileBackend;
use std::path::Path;

/// Opens the journal of a cache directory without taking its lock.
/// Callers only read from it.
pub(crate) fn open_journal(path: &Path) -> Result<JournalManager, Box<dyn std::error::Error>> {
    let journal_path = path.join(JOURNAL_FILE);
    if !journal_path.exists() {
        return Err(format!("No cache journal found at {}", journal_path.display()).into());
    }
    let backend = FileBackend::open(&journal_path)?;
    Ok(JournalManager::new(Box::new(backend), false))
}
