//! Row types held by the cache.

use crate::types::{ItemId, KeyKind};

/// An immutable snapshot of one remote record.
///
/// The payload is whatever the remote source serialized for the record; the
/// cache never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    /// Remote identifier.
    pub id: ItemId,
    /// Serialized record fields.
    pub payload: Vec<u8>,
}

impl Item {
    /// Creates an item.
    pub fn new(id: impl Into<ItemId>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

/// A cursor row. The cache holds at most one per [`KeyKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteKey {
    /// Which boundary this is.
    pub kind: KeyKind,
    /// Remote id at the boundary.
    pub id: ItemId,
}

impl RemoteKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(kind: KeyKind, id: ItemId) -> Self {
        Self { kind, id }
    }

    /// An `After` key at `id`.
    #[must_use]
    pub const fn after(id: ItemId) -> Self {
        Self::new(KeyKind::After, id)
    }

    /// A `Before` key at `id`.
    #[must_use]
    pub const fn before(id: ItemId) -> Self {
        Self::new(KeyKind::Before, id)
    }
}
