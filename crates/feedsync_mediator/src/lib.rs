//! # feedsync mediator
//!
//! Keeps a local [`Cache`](feedsync_core::Cache) in step with a remote,
//! paged, newest-first feed.
//!
//! This crate provides:
//! - [`RemoteSource`], the network side of a load, with an HTTP/JSON
//!   implementation and a scripted mock
//! - [`SyncMediator`], the load/merge state machine
//! - [`MediatorConfig`] and [`SyncError`]
//!
//! ## Loads
//!
//! | direction | reads | fetches | writes on a non-empty page |
//! |---|---|---|---|
//! | Refresh | `After` | after `After`, or latest | `After` = newest id, items |
//! | Prepend | nothing | nothing | nothing |
//! | Append | `Before` | before `Before` | `Before` = oldest id, items |
//!
//! The key and the items of one page are committed in a single transaction.
//! A failed load writes nothing.
//!
//! ```rust
//! use feedsync_core::{Cache, Item, ItemId, RemoteKeyStore};
//! use feedsync_mediator::{LoadDirection, MockRemoteSource, PageSize, SyncMediator};
//!
//! let remote = MockRemoteSource::with_items((48..=50).map(|id| Item::new(id, vec![])));
//! let mediator = SyncMediator::new(remote, Cache::open_in_memory().unwrap());
//!
//! let outcome = mediator.load(LoadDirection::Refresh { page_size: PageSize::DEFAULT });
//! assert_eq!(outcome.more_data_available(), Some(false));
//! assert_eq!(mediator.store().max_after_id().unwrap(), Some(ItemId::new(50)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod mediator;
mod remote;

pub use config::{EmptyPagePolicy, MediatorConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRemoteSource, HttpResponse};
pub use mediator::{CancelToken, LoadDirection, LoadOutcome, MediatorStats, PageSize, SyncMediator};
pub use remote::{MockRemoteSource, RemoteCall, RemoteResponse, RemoteSource};
