//! Item table.

use crate::item::Item;
use crate::types::ItemId;
use std::collections::BTreeMap;

/// Items keyed and ordered by id.
#[derive(Debug, Default)]
pub(crate) struct ItemTable {
    rows: BTreeMap<ItemId, Item>,
}

impl ItemTable {
    /// Inserts or overwrites the row for `item.id`.
    pub(crate) fn insert(&mut self, item: Item) {
        self.rows.insert(item.id, item);
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&Item> {
        self.rows.get(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn newest_id(&self) -> Option<ItemId> {
        self.rows.keys().next_back().copied()
    }

    pub(crate) fn oldest_id(&self) -> Option<ItemId> {
        self.rows.keys().next().copied()
    }

    pub(crate) fn iter_newest_first(&self) -> impl Iterator<Item = &Item> {
        self.rows.values().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bounds_track_ids() {
        let mut table = ItemTable::default();
        assert_eq!(table.newest_id(), None);

        for id in [49, 50, 48] {
            table.insert(Item::new(id, vec![]));
        }
        assert_eq!(table.newest_id(), Some(ItemId::new(50)));
        assert_eq!(table.oldest_id(), Some(ItemId::new(48)));

        let order: Vec<_> = table.iter_newest_first().map(|i| i.id.as_i64()).collect();
        assert_eq!(order, vec![50, 49, 48]);
    }

    proptest! {
        #[test]
        fn reinserting_never_duplicates(ids in proptest::collection::vec(-20i64..20, 0..64)) {
            let mut table = ItemTable::default();
            for &id in &ids {
                table.insert(Item::new(id, id.to_le_bytes().to_vec()));
            }
            for &id in &ids {
                table.insert(Item::new(id, id.to_le_bytes().to_vec()));
            }

            let distinct: std::collections::BTreeSet<_> = ids.iter().collect();
            prop_assert_eq!(table.len(), distinct.len());
        }
    }
}
