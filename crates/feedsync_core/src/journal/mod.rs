//! Write-ahead journal.
//!
//! Every merge is written to the journal and flushed before it becomes
//! visible in the in-memory tables. On open the journal is replayed to
//! rebuild those tables.
//!
//! ## Record format
//!
//! ```text
//! | magic "FSJL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little-endian; the CRC covers everything before it.
//!
//! ## Recovery policy
//!
//! - A header or payload cut short at the tail is a crash mid-write. The
//!   reader stops there as if the log ended cleanly; the transaction it
//!   belonged to has no `Commit` and is skipped.
//! - A CRC mismatch, wrong magic, unknown type or newer version is
//!   corruption and fails the open.
//!
//! Only transactions with a `Commit` record are replayed, in commit order.

mod reader;
mod record;
mod writer;

pub use reader::JournalReader;
pub use record::{compute_crc32, JournalRecord, JournalRecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use writer::JournalManager;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;
