//! Remote source abstraction.

use crate::error::{SyncError, SyncResult};
use crate::mediator::PageSize;
use feedsync_core::{Item, ItemId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A paged, newest-first view of the remote feed.
///
/// This trait abstracts the network side of a load, allowing for different
/// implementations (HTTP, scripted mocks for testing, etc.). Connection-level
/// failures are returned as errors; a response that arrived but reports a
/// failure is returned as a [`RemoteResponse`] with a non-success status.
pub trait RemoteSource: Send + Sync {
    /// The newest `limit` items.
    fn fetch_latest(&self, limit: PageSize) -> SyncResult<RemoteResponse>;

    /// Up to `limit` items newer than `id`, newest first.
    fn fetch_after(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse>;

    /// Up to `limit` items older than `id`, newest first.
    fn fetch_before(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse>;
}

impl<R: RemoteSource + ?Sized> RemoteSource for Arc<R> {
    fn fetch_latest(&self, limit: PageSize) -> SyncResult<RemoteResponse> {
        (**self).fetch_latest(limit)
    }

    fn fetch_after(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        (**self).fetch_after(id, limit)
    }

    fn fetch_before(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        (**self).fetch_before(id, limit)
    }
}

/// A response from the remote: status line plus an optional page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Status message.
    pub message: String,
    /// Decoded page, newest first. `None` when the remote sent no body.
    pub body: Option<Vec<Item>>,
}

impl RemoteResponse {
    /// A `200 OK` response carrying `items`.
    pub fn ok(items: Vec<Item>) -> Self {
        Self {
            status: 200,
            message: "OK".to_string(),
            body: Some(items),
        }
    }

    /// A failed response with no body.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Extracts the page.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Api`] if the status is not a success or the
    /// body is missing.
    pub fn into_page(self) -> SyncResult<Vec<Item>> {
        if !self.is_success() {
            return Err(SyncError::api(self.status, self.message));
        }
        self.body
            .ok_or_else(|| SyncError::api(self.status, self.message))
    }
}

/// One call made against a [`MockRemoteSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    /// `fetch_latest(limit)`.
    Latest {
        /// Requested page size.
        limit: u32,
    },
    /// `fetch_after(id, limit)`.
    After {
        /// Boundary id.
        id: ItemId,
        /// Requested page size.
        limit: u32,
    },
    /// `fetch_before(id, limit)`.
    Before {
        /// Boundary id.
        id: ItemId,
        /// Requested page size.
        limit: u32,
    },
}

#[derive(Debug, Clone)]
enum MockFailure {
    Status(u16, String),
    MissingBody,
    Network(String),
}

/// A scripted in-memory feed for testing.
///
/// Holds a set of items ordered by id and serves pages from it the way a
/// well-behaved server would. Every call is logged, and a failure can be
/// injected for all following calls.
#[derive(Debug, Default)]
pub struct MockRemoteSource {
    feed: Mutex<BTreeMap<ItemId, Item>>,
    calls: Mutex<Vec<RemoteCall>>,
    failure: Mutex<Option<MockFailure>>,
}

impl MockRemoteSource {
    /// Creates an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed holding `items`.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let source = Self::new();
        source.publish(items);
        source
    }

    /// Adds items to the feed, as if newly posted remotely.
    pub fn publish(&self, items: impl IntoIterator<Item = Item>) {
        let mut feed = self.feed.lock();
        for item in items {
            feed.insert(item.id, item);
        }
    }

    /// Makes every following call answer with `status`.
    pub fn fail_with_status(&self, status: u16, message: impl Into<String>) {
        *self.failure.lock() = Some(MockFailure::Status(status, message.into()));
    }

    /// Makes every following call answer `200 OK` without a body.
    pub fn omit_body(&self) {
        *self.failure.lock() = Some(MockFailure::MissingBody);
    }

    /// Makes every following call fail at the connection level.
    pub fn fail_network(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(MockFailure::Network(message.into()));
    }

    /// Clears an injected failure.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn respond(
        &self,
        call: RemoteCall,
        page: impl FnOnce(&BTreeMap<ItemId, Item>) -> Vec<Item>,
    ) -> SyncResult<RemoteResponse> {
        self.calls.lock().push(call);
        match self.failure.lock().clone() {
            Some(MockFailure::Status(status, message)) => {
                return Ok(RemoteResponse::error(status, message))
            }
            Some(MockFailure::MissingBody) => {
                return Ok(RemoteResponse {
                    status: 200,
                    message: "OK".to_string(),
                    body: None,
                })
            }
            Some(MockFailure::Network(message)) => return Err(SyncError::network(message)),
            None => {}
        }
        let items = page(&self.feed.lock());
        Ok(RemoteResponse::ok(items))
    }
}

impl RemoteSource for MockRemoteSource {
    fn fetch_latest(&self, limit: PageSize) -> SyncResult<RemoteResponse> {
        let n = limit.as_usize();
        self.respond(RemoteCall::Latest { limit: limit.get() }, |feed| {
            feed.values().rev().take(n).cloned().collect()
        })
    }

    fn fetch_after(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        let n = limit.as_usize();
        self.respond(RemoteCall::After { id, limit: limit.get() }, |feed| {
            // The `n` items closest above `id`, so no gap opens under the
            // new `After` boundary.
            let mut page: Vec<Item> = feed
                .range(ItemId::new(id.as_i64().saturating_add(1))..)
                .take(n)
                .map(|(_, item)| item.clone())
                .collect();
            page.reverse();
            page
        })
    }

    fn fetch_before(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        let n = limit.as_usize();
        self.respond(RemoteCall::Before { id, limit: limit.get() }, |feed| {
            feed.range(..id).rev().take(n).map(|(_, item)| item.clone()).collect()
        })
    }
}
