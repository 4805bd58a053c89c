//! Remote key table: one slot per kind.

use crate::item::RemoteKey;
use crate::types::{ItemId, KeyKind};

#[derive(Debug, Default)]
pub(crate) struct RemoteKeyTable {
    after: Option<ItemId>,
    before: Option<ItemId>,
}

impl RemoteKeyTable {
    /// Replaces the slot of `key.kind`.
    pub(crate) fn set(&mut self, key: RemoteKey) {
        *self.slot(key.kind) = Some(key.id);
    }

    pub(crate) fn get(&self, kind: KeyKind) -> Option<ItemId> {
        match kind {
            KeyKind::After => self.after,
            KeyKind::Before => self.before,
        }
    }

    pub(crate) fn all(&self) -> Vec<RemoteKey> {
        [KeyKind::After, KeyKind::Before]
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|id| RemoteKey::new(kind, id)))
            .collect()
    }

    fn slot(&mut self, kind: KeyKind) -> &mut Option<ItemId> {
        match kind {
            KeyKind::After => &mut self.after,
            KeyKind::Before => &mut self.before,
        }
    }
}
