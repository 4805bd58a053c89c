//! Cache and item fixtures.

use feedsync_core::{Cache, Config, Item, ItemId};
use feedsync_storage::{InMemoryBackend, StorageBackend};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test cache with automatic cleanup.
///
/// The cache sits behind an `Arc` so a mediator can share it through
/// [`TestCache::shared`] while the test keeps reading from it.
pub struct TestCache {
    /// The cache instance.
    pub cache: Arc<Cache>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestCache {
    /// Creates an in-memory cache.
    pub fn memory() -> Self {
        Self {
            cache: Arc::new(Cache::open_in_memory().expect("Failed to open in-memory cache")),
            temp_dir: None,
        }
    }

    /// Creates a cache in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = Cache::open(temp_dir.path()).expect("Failed to open file cache");
        Self {
            cache: Arc::new(cache),
            temp_dir: Some(temp_dir),
        }
    }

    /// Creates a cache over `backend`.
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            cache: Arc::new(
                Cache::open_with_backend(Config::default(), backend)
                    .expect("Failed to open cache over backend"),
            ),
            temp_dir: None,
        }
    }

    /// Another handle to the cache, e.g. for a mediator's store.
    pub fn shared(&self) -> Arc<Cache> {
        Arc::clone(&self.cache)
    }

    /// Directory of a file-based cache.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes and reopens a file-based cache, returning the new handle.
    ///
    /// Every [`TestCache::shared`] handle must be dropped first, or the
    /// directory lock is still held. Panics for in-memory caches.
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("Only file caches can be reopened");
        drop(self.cache);
        let cache = Cache::open(temp_dir.path()).expect("Failed to reopen file cache");
        Self {
            cache: Arc::new(cache),
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestCache {
    type Target = Cache;

    fn deref(&self) -> &Self::Target {
        &self.cache
    }
}

/// Reopens a cache over a shared in-memory journal, as after a restart.
pub fn reopen_memory(journal: &InMemoryBackend) -> Cache {
    Cache::open_with_backend(Config::default(), Box::new(journal.clone()))
        .expect("Failed to reopen in-memory cache")
}

/// A post-shaped JSON item with the given id.
pub fn item(id: i64) -> Item {
    let body = json!({
        "id": id,
        "author": "feedsync",
        "content": format!("post {id}"),
        "likes": 0,
    });
    Item::new(id, body.to_string().into_bytes())
}

/// Items for `ids`, in the given order.
pub fn items(ids: impl IntoIterator<Item = i64>) -> Vec<Item> {
    ids.into_iter().map(item).collect()
}

/// Cached ids, newest first.
pub fn cached_ids(cache: &Cache) -> Vec<i64> {
    cache
        .items_newest_first(None)
        .expect("Failed to list cached items")
        .iter()
        .map(|item| item.id.as_i64())
        .collect()
}

/// Shorthand for `ItemId::new`.
pub fn id(n: i64) -> ItemId {
    ItemId::new(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{ItemStore, RemoteKey, RemoteKeyStore, TransactionCoordinator};

    #[test]
    fn item_payload_is_json() {
        let value: serde_json::Value = serde_json::from_slice(&item(7).payload).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["content"], "post 7");
    }

    #[test]
    fn file_cache_reopens_with_state() {
        let cache = TestCache::file();
        cache
            .run_atomic(|txn| {
                cache.upsert(txn, RemoteKey::after(id(3)))?;
                cache.insert_all(txn, &items([3, 2, 1]))
            })
            .unwrap();

        let cache = cache.reopen();
        assert_eq!(cached_ids(&cache), vec![3, 2, 1]);
        assert_eq!(cache.max_after_id().unwrap(), Some(id(3)));
        assert!(cache.path().is_some());
    }
}
