//! Inspect command implementation.

use feedsync_core::{Cache, Config, KeyKind, JOURNAL_FILE};
use serde::Serialize;
use std::path::Path;

/// Cache inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Cache directory.
    pub path: String,
    /// Number of cached items.
    pub item_count: usize,
    /// Largest cached id.
    pub newest_item_id: Option<i64>,
    /// Smallest cached id.
    pub oldest_item_id: Option<i64>,
    /// `After` key.
    pub after_key: Option<i64>,
    /// `Before` key.
    pub before_key: Option<i64>,
    /// Sequence number of the last commit.
    pub committed_seq: u64,
    /// Journal size in bytes.
    pub journal_size: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.join(JOURNAL_FILE).exists() {
        return Err(format!("No cache found at {}", path.display()).into());
    }

    let cache = Cache::open_with_config(path, Config::new().create_if_missing(false))?;
    let result = inspect(path, &cache)?;
    cache.close()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn inspect(path: &Path, cache: &Cache) -> Result<InspectResult, Box<dyn std::error::Error>> {
    Ok(InspectResult {
        path: path.display().to_string(),
        item_count: cache.item_count()?,
        newest_item_id: cache.newest_item_id()?.map(|id| id.as_i64()),
        oldest_item_id: cache.oldest_item_id()?.map(|id| id.as_i64()),
        after_key: cache.remote_key(KeyKind::After)?.map(|id| id.as_i64()),
        before_key: cache.remote_key(KeyKind::Before)?.map(|id| id.as_i64()),
        committed_seq: cache.committed_seq().as_u64(),
        journal_size: cache.journal_size()?,
    })
}

fn print_text_output(result: &InspectResult) {
    fn show(id: Option<i64>) -> String {
        id.map_or_else(|| "-".to_string(), |id| id.to_string())
    }

    println!("Cache: {}", result.path);
    println!();
    println!("Items:");
    println!("  Count:  {}", result.item_count);
    println!("  Newest: {}", show(result.newest_item_id));
    println!("  Oldest: {}", show(result.oldest_item_id));
    println!();
    println!("Remote keys:");
    println!("  After:  {}", show(result.after_key));
    println!("  Before: {}", show(result.before_key));
    println!();
    println!("Journal:");
    println!("  Size:          {} bytes", result.journal_size);
    println!("  Committed seq: {}", result.committed_seq);
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{Item, ItemId, ItemStore, RemoteKey, RemoteKeyStore, TransactionCoordinator};

    #[test]
    fn reports_keys_and_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        cache
            .run_atomic(|txn| {
                cache.upsert(txn, RemoteKey::after(ItemId::new(50)))?;
                cache.insert_all(txn, &[Item::new(50, vec![]), Item::new(48, vec![])])
            })
            .unwrap();

        let result = inspect(dir.path(), &cache).unwrap();
        assert_eq!(result.item_count, 2);
        assert_eq!(result.newest_item_id, Some(50));
        assert_eq!(result.oldest_item_id, Some(48));
        assert_eq!(result.after_key, Some(50));
        assert_eq!(result.before_key, None);
        assert_eq!(result.committed_seq, 1);
        assert!(result.journal_size > 0);
        assert_eq!(cache.max_after_id().unwrap(), Some(ItemId::new(50)));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["before_key"], serde_json::Value::Null);
    }
}
