//! Journal record types and their byte encoding.

use crate::error::{CoreError, CoreResult};
use crate::item::{Item, RemoteKey};
use crate::journal::{CRC_SIZE, HEADER_SIZE};
use crate::types::{ItemId, KeyKind, SequenceNumber, TransactionId};

/// Magic bytes opening every record.
pub const JOURNAL_MAGIC: [u8; 4] = *b"FSJL";

/// Current record format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Type byte of a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JournalRecordType {
    /// Start of a transaction.
    Begin = 1,
    /// Remote key upsert.
    PutKey = 2,
    /// Item insert.
    PutItem = 3,
    /// Transaction commit.
    Commit = 4,
}

impl JournalRecordType {
    /// Decodes a type byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::PutKey),
            3 => Some(Self::PutItem),
            4 => Some(Self::Commit),
            _ => None,
        }
    }

    /// Encodes the type byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Upper-case name used in dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Begin => "BEGIN",
            Self::PutKey => "PUT_KEY",
            Self::PutItem => "PUT_ITEM",
            Self::Commit => "COMMIT",
        }
    }
}

/// One entry in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// Start of a transaction.
    Begin {
        /// Transaction id.
        txid: TransactionId,
    },
    /// Upsert of a remote key.
    PutKey {
        /// Transaction id.
        txid: TransactionId,
        /// The key's new value.
        key: RemoteKey,
    },
    /// Insert (or idempotent overwrite) of an item.
    PutItem {
        /// Transaction id.
        txid: TransactionId,
        /// The item.
        item: Item,
    },
    /// Commit of a transaction.
    Commit {
        /// Transaction id.
        txid: TransactionId,
        /// Commit sequence number.
        sequence: SequenceNumber,
    },
}

impl JournalRecord {
    /// Largest item payload a record can carry (4-byte length field).
    pub const MAX_ITEM_PAYLOAD: usize = u32::MAX as usize - 20;

    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> JournalRecordType {
        match self {
            Self::Begin { .. } => JournalRecordType::Begin,
            Self::PutKey { .. } => JournalRecordType::PutKey,
            Self::PutItem { .. } => JournalRecordType::PutItem,
            Self::Commit { .. } => JournalRecordType::Commit,
        }
    }

    /// Returns the transaction this record belongs to.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        match self {
            Self::Begin { txid }
            | Self::PutKey { txid, .. }
            | Self::PutItem { txid, .. }
            | Self::Commit { txid, .. } => *txid,
        }
    }

    /// Serializes the payload (without envelope).
    ///
    /// # Errors
    ///
    /// Fails if an item payload does not fit the length field.
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&self.txid().as_u64().to_le_bytes());

        match self {
            Self::Begin { .. } => {}
            Self::PutKey { key, .. } => {
                buf.push(key.kind.as_byte());
                buf.extend_from_slice(&key.id.as_i64().to_le_bytes());
            }
            Self::PutItem { item, .. } => {
                if item.payload.len() > Self::MAX_ITEM_PAYLOAD {
                    return Err(CoreError::invalid_operation(format!(
                        "item {} payload of {} bytes does not fit a journal record",
                        item.id,
                        item.payload.len()
                    )));
                }
                buf.extend_from_slice(&item.id.as_i64().to_le_bytes());
                buf.extend_from_slice(&(item.payload.len() as u32).to_le_bytes());
                buf.extend_from_slice(&item.payload);
            }
            Self::Commit { sequence, .. } => {
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Serializes the full record including envelope and CRC.
    ///
    /// # Errors
    ///
    /// Fails if the payload cannot be encoded.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("journal record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes a payload of the given type. `offset` is only used for error
    /// reporting.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JournalCorruption`] if the payload is malformed.
    pub fn decode_payload(
        record_type: JournalRecordType,
        payload: &[u8],
        offset: u64,
    ) -> CoreResult<Self> {
        let mut cursor = PayloadCursor {
            bytes: payload,
            offset,
        };
        let txid = TransactionId::new(cursor.u64()?);

        let record = match record_type {
            JournalRecordType::Begin => Self::Begin { txid },
            JournalRecordType::PutKey => {
                let kind_byte = cursor.u8()?;
                let kind = KeyKind::from_byte(kind_byte).ok_or_else(|| {
                    CoreError::journal_corruption(offset, format!("unknown key kind {kind_byte}"))
                })?;
                let id = ItemId::new(cursor.i64()?);
                Self::PutKey {
                    txid,
                    key: RemoteKey::new(kind, id),
                }
            }
            JournalRecordType::PutItem => {
                let id = ItemId::new(cursor.i64()?);
                let len = cursor.u32()? as usize;
                let payload = cursor.take(len)?.to_vec();
                Self::PutItem {
                    txid,
                    item: Item { id, payload },
                }
            }
            JournalRecordType::Commit => Self::Commit {
                txid,
                sequence: SequenceNumber::new(cursor.u64()?),
            },
        };

        if !cursor.bytes.is_empty() {
            return Err(CoreError::journal_corruption(
                offset,
                format!("{} trailing payload bytes", cursor.bytes.len()),
            ));
        }
        Ok(record)
    }
}

struct PayloadCursor<'a> {
    bytes: &'a [u8],
    offset: u64,
}

impl<'a> PayloadCursor<'a> {
    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(CoreError::journal_corruption(
                self.offset,
                format!("payload too short: wanted {n} bytes, {} left", self.bytes.len()),
            ));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn i64(&mut self) -> CoreResult<i64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(raw))
    }
}

/// CRC32 (IEEE polynomial, reflected).
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    !data.iter().fold(0xFFFF_FFFF_u32, |crc, &byte| {
        (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_envelope(bytes: &[u8]) -> JournalRecord {
        let record_type = JournalRecordType::from_byte(bytes[6]).unwrap();
        let len = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;
        JournalRecord::decode_payload(record_type, &bytes[HEADER_SIZE..HEADER_SIZE + len], 0)
            .unwrap()
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn envelope_layout() {
        let record = JournalRecord::Commit {
            txid: TransactionId::new(2),
            sequence: SequenceNumber::new(5),
        };
        let bytes = record.encode().unwrap();

        assert_eq!(&bytes[0..4], b"FSJL");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), JOURNAL_VERSION);
        assert_eq!(bytes[6], JournalRecordType::Commit.as_byte());
        assert_eq!(bytes.len(), HEADER_SIZE + 16 + CRC_SIZE);

        let body_end = bytes.len() - CRC_SIZE;
        let stored = u32::from_le_bytes([
            bytes[body_end],
            bytes[body_end + 1],
            bytes[body_end + 2],
            bytes[body_end + 3],
        ]);
        assert_eq!(stored, compute_crc32(&bytes[..body_end]));
    }

    #[test]
    fn put_item_keeps_payload_and_negative_ids() {
        let record = JournalRecord::PutItem {
            txid: TransactionId::new(9),
            item: Item::new(-4, br#"{"id":-4}"#.to_vec()),
        };
        assert_eq!(decode_envelope(&record.encode().unwrap()), record);
    }

    #[test]
    fn put_key_carries_kind() {
        let record = JournalRecord::PutKey {
            txid: TransactionId::new(1),
            key: RemoteKey::before(ItemId::new(48)),
        };
        assert_eq!(decode_envelope(&record.encode().unwrap()), record);
    }

    #[test]
    fn unknown_key_kind_is_corruption() {
        let mut payload = 1u64.to_le_bytes().to_vec();
        payload.push(7);
        payload.extend_from_slice(&3i64.to_le_bytes());

        let err = JournalRecord::decode_payload(JournalRecordType::PutKey, &payload, 40)
            .unwrap_err();
        assert!(matches!(err, CoreError::JournalCorruption { offset: 40, .. }));
    }

    #[test]
    fn short_and_long_payloads_are_corruption() {
        assert!(JournalRecord::decode_payload(JournalRecordType::Begin, &[1, 2, 3], 0).is_err());

        let mut long = 1u64.to_le_bytes().to_vec();
        long.push(0);
        assert!(JournalRecord::decode_payload(JournalRecordType::Begin, &long, 0).is_err());
    }
}
