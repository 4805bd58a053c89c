//! Mediator configuration.

use crate::mediator::{LoadDirection, PageSize};

/// What an empty page from Refresh or Append reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPagePolicy {
    /// The remote may have more later: report `more_data_available = true`.
    #[default]
    RecheckLater,
    /// An empty page is the end of data: report `false`.
    EndOfData,
}

impl EmptyPagePolicy {
    /// Flag reported for an empty page under this policy.
    #[must_use]
    pub const fn more_data_available(self) -> bool {
        matches!(self, Self::RecheckLater)
    }
}

/// Configuration for a [`SyncMediator`](crate::SyncMediator).
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// Page size for Append and incremental Refresh.
    pub page_size: PageSize,
    /// Page size for the first Refresh of an empty cache.
    pub initial_load_size: PageSize,
    /// Reported flag for empty pages.
    pub empty_page_policy: EmptyPagePolicy,
}

impl MediatorConfig {
    /// Creates a configuration with the given page size. The initial load
    /// size defaults to three pages.
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            initial_load_size: page_size.saturating_mul(3),
            empty_page_policy: EmptyPagePolicy::default(),
        }
    }

    /// Sets the initial load size.
    pub fn with_initial_load_size(mut self, size: PageSize) -> Self {
        self.initial_load_size = size;
        self
    }

    /// Sets the empty page policy.
    pub fn with_empty_page_policy(mut self, policy: EmptyPagePolicy) -> Self {
        self.empty_page_policy = policy;
        self
    }

    /// Refresh with the regular page size.
    #[must_use]
    pub fn refresh(&self) -> LoadDirection {
        LoadDirection::Refresh {
            page_size: self.page_size,
        }
    }

    /// Refresh sized for the first load of an empty cache.
    #[must_use]
    pub fn initial_refresh(&self) -> LoadDirection {
        LoadDirection::Refresh {
            page_size: self.initial_load_size,
        }
    }

    /// Append with the regular page size.
    #[must_use]
    pub fn append(&self) -> LoadDirection {
        LoadDirection::Append {
            page_size: self.page_size,
        }
    }
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self::new(PageSize::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MediatorConfig::default();
        assert_eq!(config.page_size.get(), 20);
        assert_eq!(config.initial_load_size.get(), 60);
        assert_eq!(config.empty_page_policy, EmptyPagePolicy::RecheckLater);
    }

    #[test]
    fn builder_and_direction_helpers() {
        let config = MediatorConfig::new(PageSize::new(5).unwrap())
            .with_initial_load_size(PageSize::new(8).unwrap())
            .with_empty_page_policy(EmptyPagePolicy::EndOfData);

        assert_eq!(config.refresh().page_size().map(PageSize::get), Some(5));
        assert_eq!(config.initial_refresh().page_size().map(PageSize::get), Some(8));
        assert_eq!(config.append().page_size().map(PageSize::get), Some(5));
        assert!(!config.empty_page_policy.more_data_available());
    }
}
