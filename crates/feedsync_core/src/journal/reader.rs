//! Sequential journal reader.

use crate::error::{CoreError, CoreResult};
use crate::journal::record::{compute_crc32, JournalRecord, JournalRecordType};
use crate::journal::{CRC_SIZE, HEADER_SIZE, JOURNAL_MAGIC, JOURNAL_VERSION};
use feedsync_storage::StorageBackend;
use parking_lot::MutexGuard;

/// Iterator over `(offset, record)` pairs, front to back.
///
/// Holds the journal lock for its whole lifetime, so no commit can
/// interleave with a scan. A truncated tail ends the iteration; any other
/// malformed record yields one error and then ends it.
pub struct JournalReader<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    size: u64,
    offset: u64,
    finished: bool,
}

impl<'a> JournalReader<'a> {
    pub(crate) fn new(backend: MutexGuard<'a, Box<dyn StorageBackend>>) -> CoreResult<Self> {
        let size = backend.size()?;
        Ok(Self {
            backend,
            size,
            offset: 0,
            finished: false,
        })
    }

    /// Offset just past the last record returned so far. After a clean
    /// end this is where the intact part of the journal stops.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, JournalRecord)>> {
        let offset = self.offset;
        let remaining = self.size - offset;
        if remaining < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let header = self.backend.read_at(offset, HEADER_SIZE)?;
        if header[0..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(offset, "bad magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(
                offset,
                format!("unsupported record version {version}"),
            ));
        }
        let record_type = JournalRecordType::from_byte(header[6]).ok_or_else(|| {
            CoreError::journal_corruption(offset, format!("unknown record type {}", header[6]))
        })?;
        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

        let total = (HEADER_SIZE + len + CRC_SIZE) as u64;
        if remaining < total {
            return Ok(None);
        }

        let rest = self.backend.read_at(offset + HEADER_SIZE as u64, len + CRC_SIZE)?;
        let (payload, crc_bytes) = rest.split_at(len);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut covered = header;
        covered.extend_from_slice(payload);
        let actual = compute_crc32(&covered);
        if actual != expected {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let record = JournalRecord::decode_payload(record_type, payload, offset)?;
        self.offset = offset + total;
        Ok(Some((offset, record)))
    }
}

impl Iterator for JournalReader<'_> {
    type Item = CoreResult<(u64, JournalRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
