//! Cache configuration.

/// Default upper bound for a single item payload (1 MiB).
pub const DEFAULT_MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Configuration for opening a cache.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the cache directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to `sync` the journal after every commit, on top of the
    /// flush that always happens.
    pub sync_on_commit: bool,

    /// Largest accepted item payload, in bytes.
    pub max_item_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the largest accepted item payload.
    #[must_use]
    pub const fn max_item_size(mut self, bytes: usize) -> Self {
        self.max_item_size = bytes;
        self
    }
}
