//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::item::{Item, RemoteKey};
use crate::types::{ItemId, KeyKind, TransactionId};
use std::collections::BTreeMap;

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting writes.
    Active,
    /// Written to the journal and applied.
    Committed,
    /// Discarded.
    Aborted,
}

/// The write scope item and key stores record their mutations against.
///
/// Writes to the same item id or key kind replace each other, so a batch
/// holds at most one row per id and one key per kind.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    keys: BTreeMap<KeyKind, ItemId>,
    items: BTreeMap<ItemId, Item>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            keys: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction still accepts writes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Records a remote key upsert.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn put_key(&mut self, key: RemoteKey) -> CoreResult<()> {
        self.ensure_active()?;
        self.keys.insert(key.kind, key.id);
        Ok(())
    }

    /// Records an item insert.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn put_item(&mut self, item: Item) -> CoreResult<()> {
        self.ensure_active()?;
        self.items.insert(item.id, item);
        Ok(())
    }

    /// The pending value of a key, if this transaction set one.
    #[must_use]
    pub fn pending_key(&self, kind: KeyKind) -> Option<ItemId> {
        self.keys.get(&kind).copied()
    }

    /// The pending item with this id, if any.
    #[must_use]
    pub fn pending_item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Pending key upserts, `After` first.
    pub fn pending_keys(&self) -> impl Iterator<Item = RemoteKey> + '_ {
        self.keys.iter().map(|(&kind, &id)| RemoteKey::new(kind, id))
    }

    /// Pending items in ascending id order.
    pub fn pending_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of pending writes (keys plus items).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.keys.len() + self.items.len()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
        self.keys.clear();
        self.items.clear();
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(CoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn() -> Transaction {
        Transaction::new(TransactionId::new(1))
    }

    #[test]
    fn new_transaction_is_active_and_empty() {
        let txn = txn();
        assert!(txn.is_active());
        assert_eq!(txn.write_count(), 0);
    }

    #[test]
    fn key_upsert_replaces_same_kind() {
        let mut txn = txn();
        txn.put_key(RemoteKey::after(ItemId::new(10))).unwrap();
        txn.put_key(RemoteKey::after(ItemId::new(12))).unwrap();
        txn.put_key(RemoteKey::before(ItemId::new(3))).unwrap();

        assert_eq!(txn.pending_key(KeyKind::After), Some(ItemId::new(12)));
        assert_eq!(txn.pending_key(KeyKind::Before), Some(ItemId::new(3)));
        let keys: Vec<_> = txn.pending_keys().collect();
        assert_eq!(
            keys,
            vec![RemoteKey::after(ItemId::new(12)), RemoteKey::before(ItemId::new(3))]
        );
    }

    #[test]
    fn duplicate_item_ids_collapse() {
        let mut txn = txn();
        txn.put_item(Item::new(5, b"old".to_vec())).unwrap();
        txn.put_item(Item::new(5, b"new".to_vec())).unwrap();
        txn.put_item(Item::new(4, b"four".to_vec())).unwrap();

        assert_eq!(txn.write_count(), 2);
        assert_eq!(txn.pending_item(ItemId::new(5)).unwrap().payload, b"new");
        let ids: Vec<_> = txn.pending_items().map(|item| item.id.as_i64()).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn no_writes_after_commit_or_abort() {
        let mut committed = txn();
        committed.mark_committed();
        assert!(committed.put_item(Item::new(1, vec![])).is_err());

        let mut aborted = txn();
        aborted.put_item(Item::new(1, vec![])).unwrap();
        aborted.mark_aborted();
        assert_eq!(aborted.write_count(), 0);
        assert!(aborted.put_key(RemoteKey::after(ItemId::new(1))).is_err());
    }
}
