//! Cache directory layout and locking.
//!
//! ```text
//! <cache_path>/
//! ├─ LOCK          # advisory lock, one writer process at a time
//! └─ journal.log   # write-ahead journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";

/// Name of the journal file inside a cache directory.
pub const JOURNAL_FILE: &str = "journal.log";

/// An opened cache directory. Holds the exclusive lock until dropped.
#[derive(Debug)]
pub(crate) struct CacheDir {
    path: PathBuf,
    _lock_file: File,
}

impl CacheDir {
    /// Opens (and optionally creates) the directory and takes its lock.
    ///
    /// Fails with [`CoreError::CacheLocked`] if another handle holds it.
    pub(crate) fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(CoreError::invalid_directory(format!(
                    "cache directory does not exist: {}",
                    path.display()
                )));
            }
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_directory(format!(
                "not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::CacheLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Path of the journal file inside this directory.
    pub(crate) fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_directory_and_lock() {
        let root = tempdir().unwrap();
        let path = root.path().join("cache");

        let dir = CacheDir::open(&path, true).unwrap();
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.journal_path(), path.join(JOURNAL_FILE));
        assert_eq!(dir.path(), path);
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let root = tempdir().unwrap();
        let result = CacheDir::open(&root.path().join("absent"), false);
        assert!(matches!(result, Err(CoreError::InvalidDirectory { .. })));
    }

    #[test]
    fn second_open_is_locked_out() {
        let root = tempdir().unwrap();
        let _held = CacheDir::open(root.path(), true).unwrap();
        assert!(matches!(
            CacheDir::open(root.path(), true),
            Err(CoreError::CacheLocked)
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let root = tempdir().unwrap();
        drop(CacheDir::open(root.path(), true).unwrap());
        assert!(CacheDir::open(root.path(), true).is_ok());
    }
}
