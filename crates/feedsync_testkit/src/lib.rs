//! # feedsync testkit
//!
//! Test utilities for feedsync.
//!
//! This crate provides:
//! - [`FaultyBackend`], a journal backend that fails on command
//! - [`FaultyStore`], a store wrapper that rejects item inserts on command
//! - cache and item fixtures
//! - proptest strategies for feeds and page sizes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_testkit::prelude::*;
//!
//! let cache = TestCache::file();
//! cache.run_atomic(|txn| cache.insert_all(txn, &items([3, 2, 1])))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
