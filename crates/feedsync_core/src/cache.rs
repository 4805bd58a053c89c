//! Cache facade and recovery.

use crate::config::Config;
use crate::dir::CacheDir;
use crate::error::{CoreError, CoreResult};
use crate::item::{Item, RemoteKey};
use crate::journal::{JournalManager, JournalRecord};
use crate::store::{CacheTables, ItemStore, RemoteKeyStore, TransactionCoordinator};
use crate::transaction::{Transaction, TransactionManager};
use crate::types::{ItemId, KeyKind, SequenceNumber, TransactionId};
use feedsync_storage::StorageBackend;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The local item cache.
///
/// `Cache` holds the items synchronized so far and the two remote keys, in
/// memory, backed by a write-ahead journal. It implements the three storage
/// traits the sync mediator needs: [`ItemStore`], [`RemoteKeyStore`] and
/// [`TransactionCoordinator`].
///
/// # Opening
///
/// ```rust,ignore
/// use feedsync_core::Cache;
/// use std::path::Path;
///
/// let cache = Cache::open(Path::new("feed_cache"))?;
/// println!("{} items cached", cache.item_count()?);
/// cache.close()?;
/// ```
///
/// For tests, [`Cache::open_in_memory`] gives a cache with no files.
pub struct Cache {
    config: Config,
    dir: Option<CacheDir>,
    journal: Arc<JournalManager>,
    tables: Arc<CacheTables>,
    txn_manager: TransactionManager,
    is_open: RwLock<bool>,
}

impl Cache {
    /// Opens (or creates) a cache directory with default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the directory is locked by another handle
    /// ([`CoreError::CacheLocked`]), the journal is corrupt, or on I/O errors.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a cache directory with custom configuration.
    ///
    /// # Errors
    ///
    /// See [`Cache::open`].
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        use feedsync_storage::FileBackend;

        let dir = CacheDir::open(path, config.create_if_missing)?;
        let backend = FileBackend::open(&dir.journal_path())?;
        info!(path = %dir.path().display(), "opening cache");
        Self::build(config, Some(dir), Box::new(backend))
    }

    /// Opens a cache over an arbitrary journal backend.
    ///
    /// The journal is replayed before this returns.
    ///
    /// # Errors
    ///
    /// Fails if the journal is corrupt or cannot be read.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        Self::build(config, None, backend)
    }

    /// Opens an empty, non-persistent cache.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible to match the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        use feedsync_storage::InMemoryBackend;
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    fn build(
        config: Config,
        dir: Option<CacheDir>,
        backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let journal = Arc::new(JournalManager::new(backend, config.sync_on_commit));
        let tables = Arc::new(CacheTables::default());
        let recovered = Self::recover(&journal, &tables)?;

        let txn_manager = TransactionManager::with_state(
            Arc::clone(&journal),
            Arc::clone(&tables),
            recovered.max_txid + 1,
            recovered.committed_seq + 1,
            recovered.committed_seq,
        );

        Ok(Self {
            config,
            dir,
            journal,
            tables,
            txn_manager,
            is_open: RwLock::new(true),
        })
    }

    /// Replays committed transactions from the journal into `tables`.
    fn recover(journal: &JournalManager, tables: &CacheTables) -> CoreResult<Recovered> {
        let mut open: HashMap<TransactionId, PendingReplay> = HashMap::new();
        let mut committed: Vec<(SequenceNumber, PendingReplay)> = Vec::new();
        let mut max_txid = 0u64;

        let mut reader = journal.reader()?;
        for entry in reader.by_ref() {
            let (_, record) = entry?;
            let txid = record.txid();
            max_txid = max_txid.max(txid.as_u64());

            match record {
                JournalRecord::Begin { .. } => {
                    open.insert(txid, PendingReplay::default());
                }
                JournalRecord::PutKey { key, .. } => {
                    if let Some(pending) = open.get_mut(&txid) {
                        pending.keys.push(key);
                    }
                }
                JournalRecord::PutItem { item, .. } => {
                    if let Some(pending) = open.get_mut(&txid) {
                        pending.items.push(item);
                    }
                }
                JournalRecord::Commit { sequence, .. } => {
                    if let Some(pending) = open.remove(&txid) {
                        committed.push((sequence, pending));
                    }
                }
            }
        }

        let intact = reader.position();
        drop(reader);
        let size = journal.size()?;
        if intact < size {
            warn!(intact, size, "dropping torn journal tail");
            journal.truncate(intact)?;
        }

        committed.sort_by_key(|(sequence, _)| *sequence);
        let committed_seq = committed.last().map_or(0, |(seq, _)| seq.as_u64());
        let replayed = committed.len();
        for (_, pending) in committed {
            tables.replay(pending.keys, pending.items);
        }

        if replayed > 0 || !open.is_empty() {
            info!(
                replayed,
                discarded = open.len(),
                items = tables.item_count(),
                "journal recovered"
            );
        }

        Ok(Recovered {
            max_txid,
            committed_seq,
        })
    }

    /// Gets an item by id.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn get_item(&self, id: ItemId) -> CoreResult<Option<Item>> {
        self.ensure_open()?;
        Ok(self.tables.item(id))
    }

    /// Cached items, newest first, optionally capped at `limit`.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn items_newest_first(&self, limit: Option<usize>) -> CoreResult<Vec<Item>> {
        self.ensure_open()?;
        Ok(self.tables.items_newest_first(limit))
    }

    /// Number of cached items.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn item_count(&self) -> CoreResult<usize> {
        self.ensure_open()?;
        Ok(self.tables.item_count())
    }

    /// Largest cached id.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn newest_item_id(&self) -> CoreResult<Option<ItemId>> {
        self.ensure_open()?;
        Ok(self.tables.newest_id())
    }

    /// Smallest cached id.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn oldest_item_id(&self) -> CoreResult<Option<ItemId>> {
        self.ensure_open()?;
        Ok(self.tables.oldest_id())
    }

    /// Committed value of one remote key.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn remote_key(&self, kind: KeyKind) -> CoreResult<Option<ItemId>> {
        self.ensure_open()?;
        Ok(self.tables.key(kind))
    }

    /// All committed remote keys, `After` first.
    ///
    /// # Errors
    ///
    /// Fails if the cache is closed.
    pub fn remote_keys(&self) -> CoreResult<Vec<RemoteKey>> {
        self.ensure_open()?;
        Ok(self.tables.keys())
    }

    /// Sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txn_manager.committed_seq()
    }

    /// Journal length in bytes.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot report its size.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.journal.size()
    }

    /// The configuration this cache was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory backing the cache, if it is file-based.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(CacheDir::path)
    }

    /// Flushes the journal and refuses further operations.
    ///
    /// # Errors
    ///
    /// Fails if the final flush fails.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        self.journal.flush()?;
        *is_open = false;
        debug!("cache closed");
        Ok(())
    }

    /// Whether the cache still accepts operations.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::CacheClosed)
        }
    }
}

impl ItemStore for Cache {
    fn insert_all(&self, txn: &mut Transaction, items: &[Item]) -> CoreResult<()> {
        self.ensure_open()?;
        let max = self.config.max_item_size;
        for item in items {
            if item.payload.len() > max {
                return Err(CoreError::ItemTooLarge {
                    id: item.id,
                    size: item.payload.len(),
                    max,
                });
            }
            txn.put_item(item.clone())?;
        }
        Ok(())
    }
}

impl RemoteKeyStore for Cache {
    fn upsert(&self, txn: &mut Transaction, key: RemoteKey) -> CoreResult<()> {
        self.ensure_open()?;
        txn.put_key(key)
    }

    fn max_after_id(&self) -> CoreResult<Option<ItemId>> {
        self.remote_key(KeyKind::After)
    }

    fn min_before_id(&self) -> CoreResult<Option<ItemId>> {
        self.remote_key(KeyKind::Before)
    }
}

impl TransactionCoordinator for Cache {
    fn run_atomic<T, F>(&self, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>,
    {
        self.ensure_open()?;
        let mut wtxn = self.txn_manager.begin_write();
        match body(&mut wtxn) {
            Ok(value) => {
                self.txn_manager.commit_write(&mut wtxn)?;
                Ok(value)
            }
            Err(e) => {
                self.txn_manager.abort_write(&mut wtxn);
                Err(e)
            }
        }
    }
}

#[derive(Default)]
struct PendingReplay {
    keys: Vec<RemoteKey>,
    items: Vec<Item>,
}

struct Recovered {
    max_txid: u64,
    committed_seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_storage::InMemoryBackend;

    fn merge(cache: &Cache, key: RemoteKey, ids: &[i64]) -> CoreResult<()> {
        let items: Vec<_> = ids
            .iter()
            .map(|&id| Item::new(id, format!("post {id}").into_bytes()))
            .collect();
        cache.run_atomic(|txn| {
            cache.upsert(txn, key)?;
            cache.insert_all(txn, &items)
        })
    }

    #[test]
    fn run_atomic_commits_both_stores() {
        let cache = Cache::open_in_memory().unwrap();
        merge(&cache, RemoteKey::after(ItemId::new(50)), &[50, 49, 48]).unwrap();

        assert_eq!(cache.max_after_id().unwrap(), Some(ItemId::new(50)));
        assert_eq!(cache.min_before_id().unwrap(), None);
        assert_eq!(cache.item_count().unwrap(), 3);
        assert_eq!(cache.oldest_item_id().unwrap(), Some(ItemId::new(48)));
        assert_eq!(cache.committed_seq(), SequenceNumber::new(1));
    }

    #[test]
    fn failing_body_discards_key_and_items() {
        let cache = Cache::open_in_memory().unwrap();
        let result: CoreResult<()> = cache.run_atomic(|txn| {
            cache.upsert(txn, RemoteKey::before(ItemId::new(10)))?;
            cache.insert_all(txn, &[Item::new(10, vec![])])?;
            Err(CoreError::transaction_aborted("injected"))
        });

        assert!(result.is_err());
        assert_eq!(cache.min_before_id().unwrap(), None);
        assert_eq!(cache.item_count().unwrap(), 0);
        assert_eq!(cache.journal_size().unwrap(), 0);
    }

    #[test]
    fn oversized_item_aborts_after_key_upsert() {
        let cache = Cache::open_with_backend(
            Config::new().max_item_size(4),
            Box::new(InMemoryBackend::new()),
        )
        .unwrap();

        let result = cache.run_atomic(|txn| {
            cache.upsert(txn, RemoteKey::after(ItemId::new(2)))?;
            cache.insert_all(txn, &[Item::new(2, b"tiny".to_vec()), Item::new(1, b"too big".to_vec())])
        });

        assert!(matches!(result, Err(CoreError::ItemTooLarge { max: 4, .. })));
        assert_eq!(cache.max_after_id().unwrap(), None);
        assert_eq!(cache.item_count().unwrap(), 0);
    }

    #[test]
    fn reinserting_an_id_overwrites() {
        let cache = Cache::open_in_memory().unwrap();
        merge(&cache, RemoteKey::after(ItemId::new(5)), &[5, 4]).unwrap();
        merge(&cache, RemoteKey::after(ItemId::new(6)), &[6, 5]).unwrap();

        assert_eq!(cache.item_count().unwrap(), 3);
        let ids: Vec<_> = cache
            .items_newest_first(None)
            .unwrap()
            .iter()
            .map(|item| item.id.as_i64())
            .collect();
        assert_eq!(ids, vec![6, 5, 4]);
        assert_eq!(cache.items_newest_first(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn replay_rebuilds_state() {
        let backend = InMemoryBackend::new();
        {
            let cache =
                Cache::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
            merge(&cache, RemoteKey::after(ItemId::new(50)), &[50, 49]).unwrap();
            merge(&cache, RemoteKey::before(ItemId::new(47)), &[48, 47]).unwrap();
        }

        let reopened =
            Cache::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
        assert_eq!(reopened.max_after_id().unwrap(), Some(ItemId::new(50)));
        assert_eq!(reopened.min_before_id().unwrap(), Some(ItemId::new(47)));
        assert_eq!(reopened.item_count().unwrap(), 4);
        assert_eq!(reopened.committed_seq(), SequenceNumber::new(2));

        merge(&reopened, RemoteKey::after(ItemId::new(51)), &[51]).unwrap();
        assert_eq!(reopened.committed_seq(), SequenceNumber::new(3));
    }

    #[test]
    fn uncommitted_tail_is_discarded() {
        let backend = InMemoryBackend::new();
        {
            let cache =
                Cache::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
            merge(&cache, RemoteKey::after(ItemId::new(50)), &[50]).unwrap();

            // A crash after Begin and the key upsert, before Commit.
            let txid = TransactionId::new(99);
            cache.journal.append(&JournalRecord::Begin { txid }).unwrap();
            cache
                .journal
                .append(&JournalRecord::PutKey {
                    txid,
                    key: RemoteKey::after(ItemId::new(70)),
                })
                .unwrap();
        }

        let reopened =
            Cache::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
        assert_eq!(reopened.max_after_id().unwrap(), Some(ItemId::new(50)));
        assert_eq!(reopened.item_count().unwrap(), 1);
    }

    #[test]
    fn closed_cache_rejects_operations() {
        let cache = Cache::open_in_memory().unwrap();
        cache.close().unwrap();
        assert!(!cache.is_open());
        assert!(matches!(cache.item_count(), Err(CoreError::CacheClosed)));
        assert!(matches!(
            merge(&cache, RemoteKey::after(ItemId::new(1)), &[1]),
            Err(CoreError::CacheClosed)
        ));
        cache.close().unwrap();
    }
}
