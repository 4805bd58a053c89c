//! Proptest strategies.

use feedsync_core::Item;
use proptest::collection::btree_set;
use proptest::prelude::*;

/// Distinct remote ids in ascending order: at least one and at most
/// `max_len`, drawn from `1..=10_000`.
pub fn arb_feed_ids(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    btree_set(1i64..=10_000, 1..=max_len.max(1)).prop_map(|ids| ids.into_iter().collect())
}

/// A remote feed of small JSON items.
pub fn arb_feed(max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    arb_feed_ids(max_len).prop_map(crate::fixtures::items)
}

/// A page size between 1 and `max`.
pub fn arb_page_size(max: u32) -> impl Strategy<Value = u32> {
    1..=max.max(1)
}
