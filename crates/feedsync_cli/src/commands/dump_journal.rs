//! Dump journal command implementation.

use super::open_journal;
use feedsync_core::journal::{JournalManager, JournalRecord};
use serde::Serialize;
use std::path::Path;

/// Journal record representation for output.
#[derive(Debug, Serialize)]
pub struct JournalRecordInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Record type.
    pub record_type: &'static str,
    /// Transaction ID.
    pub txid: u64,
    /// Remote key kind (PUT_KEY only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_kind: Option<&'static str>,
    /// Item or key id (PUT_KEY and PUT_ITEM).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Commit sequence number (COMMIT only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Item payload size in bytes (PUT_ITEM only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
}

impl JournalRecordInfo {
    fn new(offset: u64, record: &JournalRecord) -> Self {
        let mut info = Self {
            offset,
            record_type: record.record_type().name(),
            txid: record.txid().as_u64(),
            key_kind: None,
            id: None,
            sequence: None,
            payload_size: None,
        };
        match record {
            JournalRecord::Begin { .. } => {}
            JournalRecord::PutKey { key, .. } => {
                info.key_kind = Some(key.kind.name());
                info.id = Some(key.id.as_i64());
            }
            JournalRecord::PutItem { item, .. } => {
                info.id = Some(item.id.as_i64());
                info.payload_size = Some(item.payload.len());
            }
            JournalRecord::Commit { sequence, .. } => {
                info.sequence = Some(sequence.as_u64());
            }
        }
        info
    }
}

/// Runs the dump-journal command.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let journal = open_journal(path)?;
    let (records, error) = read_records(&journal, limit)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => print_text_output(&records),
    }

    match error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Reads up to `limit` records. A corrupt record stops the scan; the
/// records before it are still returned along with the error text.
fn read_records(
    journal: &JournalManager,
    limit: Option<usize>,
) -> Result<(Vec<JournalRecordInfo>, Option<String>), Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    for entry in journal.reader()?.take(max_records) {
        match entry {
            Ok((offset, record)) => records.push(JournalRecordInfo::new(offset, &record)),
            Err(e) => return Ok((records, Some(e.to_string()))),
        }
    }
    Ok((records, None))
}

fn print_text_output(records: &[JournalRecordInfo]) {
    println!(
        "{:>10}  {:<8}  {:>8}  {:<6}  {:>12}  {:>8}",
        "OFFSET", "TYPE", "TXID", "KEY", "ID", "SEQ/SIZE"
    );
    println!("{}", "-".repeat(62));

    for record in records {
        let detail = record
            .sequence
            .map(|s| s.to_string())
            .or_else(|| record.payload_size.map(|n| format!("{n}B")))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>10}  {:<8}  {:>8}  {:<6}  {:>12}  {:>8}",
            record.offset,
            record.record_type,
            record.txid,
            record.key_kind.unwrap_or("-"),
            record.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            detail
        );
    }

    println!();
    println!("Total: {} records", records.len());
}
