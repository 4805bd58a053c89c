//! Storage traits and the in-memory tables behind [`crate::Cache`].
//!
//! The mediator is written against three traits so tests can wrap or
//! replace any of them:
//!
//! - [`ItemStore`] records item inserts into a transaction
//! - [`RemoteKeyStore`] records key upserts and answers boundary reads
//! - [`TransactionCoordinator`] runs a body and commits its writes
//!   all-or-nothing

mod items;
mod keys;

pub(crate) use items::ItemTable;
pub(crate) use keys::RemoteKeyTable;

use crate::error::CoreResult;
use crate::item::{Item, RemoteKey};
use crate::transaction::Transaction;
use crate::types::{ItemId, KeyKind};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cached items, kept ordered by id.
pub trait ItemStore {
    /// Records inserts for every item in `items`.
    ///
    /// An id that is already cached is overwritten, never duplicated.
    ///
    /// # Errors
    ///
    /// Fails if an item is rejected; the caller's transaction must then be
    /// abandoned.
    fn insert_all(&self, txn: &mut Transaction, items: &[Item]) -> CoreResult<()>;
}

/// The `After` and `Before` cursor rows.
pub trait RemoteKeyStore {
    /// Records a replacement of the row of `key.kind`.
    ///
    /// # Errors
    ///
    /// Fails if the transaction no longer accepts writes.
    fn upsert(&self, txn: &mut Transaction, key: RemoteKey) -> CoreResult<()>;

    /// Committed `After` id, if any.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn max_after_id(&self) -> CoreResult<Option<ItemId>>;

    /// Committed `Before` id, if any.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn min_before_id(&self) -> CoreResult<Option<ItemId>>;
}

/// Scoped all-or-nothing execution of writes against both stores.
pub trait TransactionCoordinator {
    /// Runs `body` in a fresh transaction. Commits if it returns `Ok`,
    /// discards every recorded write if it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the commit error.
    fn run_atomic<T, F>(&self, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>;
}

impl<S: ItemStore + ?Sized> ItemStore for Arc<S> {
    fn insert_all(&self, txn: &mut Transaction, items: &[Item]) -> CoreResult<()> {
        (**self).insert_all(txn, items)
    }
}

impl<S: RemoteKeyStore + ?Sized> RemoteKeyStore for Arc<S> {
    fn upsert(&self, txn: &mut Transaction, key: RemoteKey) -> CoreResult<()> {
        (**self).upsert(txn, key)
    }

    fn max_after_id(&self) -> CoreResult<Option<ItemId>> {
        (**self).max_after_id()
    }

    fn min_before_id(&self) -> CoreResult<Option<ItemId>> {
        (**self).min_before_id()
    }
}

impl<S: TransactionCoordinator + ?Sized> TransactionCoordinator for Arc<S> {
    fn run_atomic<T, F>(&self, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>,
    {
        (**self).run_atomic(body)
    }
}

/// Committed state: both tables, swapped together on commit.
#[derive(Debug, Default)]
pub(crate) struct CacheTables {
    items: RwLock<ItemTable>,
    keys: RwLock<RemoteKeyTable>,
}

impl CacheTables {
    /// Applies a committed batch. Both write locks are held for the whole
    /// update so no reader sees a key without its items.
    pub(crate) fn apply(&self, txn: &Transaction) {
        let mut items = self.items.write();
        let mut keys = self.keys.write();
        for key in txn.pending_keys() {
            keys.set(key);
        }
        for item in txn.pending_items() {
            items.insert(item.clone());
        }
    }

    /// Applies replayed journal rows.
    pub(crate) fn replay(&self, keys: Vec<RemoteKey>, items: Vec<Item>) {
        let mut item_table = self.items.write();
        let mut key_table = self.keys.write();
        for key in keys {
            key_table.set(key);
        }
        for item in items {
            item_table.insert(item);
        }
    }

    pub(crate) fn key(&self, kind: KeyKind) -> Option<ItemId> {
        self.keys.read().get(kind)
    }

    pub(crate) fn keys(&self) -> Vec<RemoteKey> {
        self.keys.read().all()
    }

    pub(crate) fn item(&self, id: ItemId) -> Option<Item> {
        self.items.read().get(id).cloned()
    }

    pub(crate) fn item_count(&self) -> usize {
        self.items.read().len()
    }

    pub(crate) fn newest_id(&self) -> Option<ItemId> {
        self.items.read().newest_id()
    }

    pub(crate) fn oldest_id(&self) -> Option<ItemId> {
        self.items.read().oldest_id()
    }

    pub(crate) fn items_newest_first(&self, limit: Option<usize>) -> Vec<Item> {
        let items = self.items.read();
        let iter = items.iter_newest_first().cloned();
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }
}
