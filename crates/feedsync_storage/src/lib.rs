//! # feedsync storage
//!
//! Byte stores that back the feedsync cache journal.
//!
//! A backend knows nothing about items, remote keys or journal records. It
//! hands out offsets for appended bytes, reads them back, and can be cut
//! back to an earlier length when a commit has to be undone.
//!
//! - [`InMemoryBackend`] keeps everything in a `Vec<u8>`; used by tests and
//!   by caches opened with `Cache::open_in_memory`.
//! - [`FileBackend`] writes to a single file through the OS file APIs.
//!
//! ```rust
//! use feedsync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"journal bytes").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"journal");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
