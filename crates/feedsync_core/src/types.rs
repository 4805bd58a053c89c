//! Identifier types.

use std::fmt;

/// Identifier the remote source assigned to an item.
///
/// Ids are totally ordered and grow with recency: a newer item always has a
/// larger id. All cursor math in the mediator relies on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Wraps a raw remote id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Which boundary a remote key records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum KeyKind {
    /// Everything newer than this id has been fetched.
    After = 1,
    /// The next older page starts below this id.
    Before = 2,
}

impl KeyKind {
    /// Decodes the journal byte for a key kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::After),
            2 => Some(Self::Before),
            _ => None,
        }
    }

    /// Journal byte for this kind.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Lower-case name, as printed by the CLI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::After => "after",
            Self::Before => "before",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of a journal transaction. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a transaction id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Commit sequence number. Higher means committed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_order_by_recency() {
        assert!(ItemId::new(50) > ItemId::new(49));
        assert_eq!(ItemId::from(-3).as_i64(), -3);
        assert_eq!(ItemId::new(42).to_string(), "42");
    }

    #[test]
    fn key_kind_bytes_round_trip() {
        for kind in [KeyKind::After, KeyKind::Before] {
            assert_eq!(KeyKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(KeyKind::from_byte(0), None);
        assert_eq!(KeyKind::Before.to_string(), "before");
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(TransactionId::new(3).to_string(), "txn:3");
        assert_eq!(SequenceNumber::new(8).to_string(), "seq:8");
    }
}
