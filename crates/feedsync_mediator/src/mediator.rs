//! The load/merge state machine.

use crate::config::MediatorConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteResponse, RemoteSource};
use feedsync_core::{ItemStore, KeyKind, RemoteKey, RemoteKeyStore, TransactionCoordinator};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of items requested per page. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSize(NonZeroU32);

impl PageSize {
    /// Twenty items.
    pub const DEFAULT: Self = match NonZeroU32::new(20) {
        Some(n) => Self(n),
        None => unreachable!(),
    };

    /// Returns `None` for zero.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The size as a number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The size as a `usize`.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::try_from(self.get()).unwrap_or(usize::MAX)
    }

    /// Multiplies, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_mul(self, factor: u32) -> Self {
        match NonZeroU32::new(factor) {
            Some(factor) => Self(self.0.saturating_mul(factor)),
            None => self,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a load should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDirection {
    /// Fetch items newer than the `After` key, or the latest page if the
    /// cache has never been loaded.
    Refresh {
        /// Items to request.
        page_size: PageSize,
    },
    /// Reserved. Always succeeds with more data available.
    Prepend,
    /// Fetch items older than the `Before` key.
    Append {
        /// Items to request.
        page_size: PageSize,
    },
}

impl LoadDirection {
    /// Page size of a fetching direction.
    #[must_use]
    pub fn page_size(&self) -> Option<PageSize> {
        match self {
            Self::Refresh { page_size } | Self::Append { page_size } => Some(*page_size),
            Self::Prepend => None,
        }
    }

    /// Lowercase direction name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh { .. } => "refresh",
            Self::Prepend => "prepend",
            Self::Append { .. } => "append",
        }
    }
}

/// Result of one load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The load finished.
    ///
    /// `more_data_available` is `false` after a merged page and after an
    /// Append with no `Before` key; an empty page reports what the
    /// [`EmptyPagePolicy`](crate::EmptyPagePolicy) says; Prepend reports
    /// `true`.
    Success {
        /// Whether the caller may request this direction again.
        more_data_available: bool,
    },
    /// The load failed. Nothing was written.
    Error(SyncError),
}

impl LoadOutcome {
    /// Whether the load succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The reported flag, if the load succeeded.
    #[must_use]
    pub fn more_data_available(&self) -> Option<bool> {
        match self {
            Self::Success {
                more_data_available,
            } => Some(*more_data_available),
            Self::Error(_) => None,
        }
    }

    /// The error, if the load failed.
    #[must_use]
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Success { .. } => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Converts into a `Result` of the reported flag.
    ///
    /// # Errors
    ///
    /// Returns the load's error.
    pub fn into_result(self) -> SyncResult<bool> {
        match self {
            Self::Success {
                more_data_available,
            } => Ok(more_data_available),
            Self::Error(e) => Err(e),
        }
    }
}

/// Shared cancellation flag for a load.
///
/// Cancelling only takes effect before the merge; a committed merge stays.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters kept across loads.
#[derive(Debug, Clone, Default)]
pub struct MediatorStats {
    /// Loads that returned `Success`.
    pub loads_completed: u64,
    /// Items written by merges.
    pub items_merged: u64,
    /// Refresh or Append loads that got an empty page.
    pub empty_pages: u64,
    /// Loads that returned `Error`.
    pub errors: u64,
    /// Message of the most recent error.
    pub last_error: Option<String>,
}

/// What a successful load did.
struct Loaded {
    merged: usize,
    empty_page: bool,
    more_data_available: bool,
}

impl Loaded {
    fn without_fetch(more_data_available: bool) -> Self {
        Self {
            merged: 0,
            empty_page: false,
            more_data_available,
        }
    }
}

/// Reconciles a remote paged feed with the local cache.
///
/// Each [`load`](Self::load) reads one remote key, fetches one page, and
/// merges it together with the updated key in a single transaction. Errors
/// never leave a half-applied merge behind.
///
/// At most one Refresh and one Append run at a time per mediator; a second
/// call in the same direction waits for the first.
pub struct SyncMediator<R, S> {
    remote: R,
    store: S,
    config: MediatorConfig,
    refresh_gate: Mutex<()>,
    append_gate: Mutex<()>,
    stats: RwLock<MediatorStats>,
}

impl<R, S> SyncMediator<R, S>
where
    R: RemoteSource,
    S: ItemStore + RemoteKeyStore + TransactionCoordinator,
{
    /// Creates a mediator with default configuration.
    pub fn new(remote: R, store: S) -> Self {
        Self::with_config(remote, store, MediatorConfig::default())
    }

    /// Creates a mediator with custom configuration.
    pub fn with_config(remote: R, store: S, config: MediatorConfig) -> Self {
        Self {
            remote,
            store,
            config,
            refresh_gate: Mutex::new(()),
            append_gate: Mutex::new(()),
            stats: RwLock::new(MediatorStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Returns the remote source.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets the current stats.
    pub fn stats(&self) -> MediatorStats {
        self.stats.read().clone()
    }

    /// Runs one load.
    pub fn load(&self, direction: LoadDirection) -> LoadOutcome {
        self.load_cancellable(direction, &CancelToken::new())
    }

    /// Runs one load that `cancel` can stop before its merge.
    pub fn load_cancellable(&self, direction: LoadDirection, cancel: &CancelToken) -> LoadOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(direction, cancel)))
            .unwrap_or_else(|payload| Err(SyncError::Internal(panic_message(payload.as_ref()))));
        self.finish(direction, result)
    }

    fn run(&self, direction: LoadDirection, cancel: &CancelToken) -> SyncResult<Loaded> {
        match direction {
            LoadDirection::Prepend => {
                debug!("prepend is a no-op");
                Ok(Loaded::without_fetch(true))
            }
            LoadDirection::Refresh { page_size } => {
                let _gate = self.refresh_gate.lock();
                let response = match self.store.max_after_id()? {
                    Some(after) => {
                        debug!(%after, %page_size, "refresh: fetching newer items");
                        self.remote.fetch_after(after, page_size)?
                    }
                    None => {
                        debug!(%page_size, "refresh: no after key, fetching latest");
                        self.remote.fetch_latest(page_size)?
                    }
                };
                self.merge_page(KeyKind::After, response, cancel)
            }
            LoadDirection::Append { page_size } => {
                let _gate = self.append_gate.lock();
                let Some(before) = self.store.min_before_id()? else {
                    debug!("append: no before key, end of data");
                    return Ok(Loaded::without_fetch(false));
                };
                debug!(%before, %page_size, "append: fetching older items");
                let response = self.remote.fetch_before(before, page_size)?;
                self.merge_page(KeyKind::Before, response, cancel)
            }
        }
    }

    /// Checks the response and commits the page with its boundary key.
    fn merge_page(
        &self,
        kind: KeyKind,
        response: RemoteResponse,
        cancel: &CancelToken,
    ) -> SyncResult<Loaded> {
        let items = response.into_page()?;
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let (Some(first), Some(last)) = (items.first(), items.last()) else {
            let more_data_available = self.config.empty_page_policy.more_data_available();
            debug!(key = %kind, more_data_available, "empty page, nothing to merge");
            return Ok(Loaded {
                merged: 0,
                empty_page: true,
                more_data_available,
            });
        };
        let boundary = match kind {
            KeyKind::After => first.id,
            KeyKind::Before => last.id,
        };

        self.store.run_atomic(|txn| {
            self.store.upsert(txn, RemoteKey::new(kind, boundary))?;
            self.store.insert_all(txn, &items)
        })?;
        debug!(key = %kind, %boundary, items = items.len(), "page merged");

        Ok(Loaded {
            merged: items.len(),
            empty_page: false,
            more_data_available: false,
        })
    }

    fn finish(&self, direction: LoadDirection, result: SyncResult<Loaded>) -> LoadOutcome {
        let mut stats = self.stats.write();
        match result {
            Ok(loaded) => {
                stats.loads_completed += 1;
                stats.items_merged += loaded.merged as u64;
                if loaded.empty_page {
                    stats.empty_pages += 1;
                }
                LoadOutcome::Success {
                    more_data_available: loaded.more_data_available,
                }
            }
            Err(e) => {
                warn!(direction = direction.name(), error = %e, "load failed");
                stats.errors += 1;
                stats.last_error = Some(e.to_string());
                LoadOutcome::Error(e)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during load".to_string()
    }
}
