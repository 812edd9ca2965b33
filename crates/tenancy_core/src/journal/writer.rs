//! Journal writer and recovery reader.

use crate::error::{CoreError, CoreResult};
use crate::journal::entry::{
    compute_crc32, EntryType, JournalEntry, CRC_SIZE, HEADER_SIZE, JOURNAL_MAGIC, JOURNAL_VERSION,
};
use crate::tables::RowKey;
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tenancy_storage::Backend;

/// A transaction found complete (with its commit entry) during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTxn {
    /// Transaction ID.
    pub txid: TransactionId,
    /// Commit sequence.
    pub sequence: SequenceNumber,
    /// Writes in journal order; `None` is a delete.
    pub writes: Vec<(RowKey, Option<Vec<u8>>)>,
}

/// Outcome of scanning the journal.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    /// Committed transactions in commit order.
    pub committed: Vec<CommittedTxn>,
    /// Transactions that began but never committed.
    pub incomplete: usize,
    /// Total frames decoded.
    pub frames: usize,
    /// Bytes of torn tail ignored at the end.
    pub torn_tail: u64,
    /// Offset just past the last commit frame; everything after it is
    /// an unfinished transaction or a torn tail.
    pub committed_len: u64,
    /// Highest transaction id seen.
    pub max_txid: u64,
}

/// Append-only transaction journal over a [`Backend`].
pub struct Journal {
    backend: Mutex<Box<dyn Backend>>,
    sync_on_commit: bool,
}

impl Journal {
    /// Creates a journal on `backend`.
    pub fn new(backend: Box<dyn Backend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Writes a whole transaction (begin, writes, commit) with one append.
    ///
    /// If the append or sync fails, the journal is truncated back to where
    /// it was so no partial transaction lingers before later commits.
    pub fn append_transaction(
        &self,
        txid: TransactionId,
        writes: &[(RowKey, Option<Vec<u8>>)],
        sequence: SequenceNumber,
    ) -> CoreResult<()> {
        let mut buf = JournalEntry::Begin { txid }.encode_frame()?;
        for (key, row) in writes {
            let entry = match row {
                Some(row) => JournalEntry::Put {
                    txid,
                    key: *key,
                    row: row.clone(),
                },
                None => JournalEntry::Delete { txid, key: *key },
            };
            buf.extend_from_slice(&entry.encode_frame()?);
        }
        buf.extend_from_slice(&JournalEntry::Commit { txid, sequence }.encode_frame()?);

        let mut backend = self.backend.lock();
        let before = backend.size()?;
        let result = backend.append(&buf).and_then(|_| {
            if self.sync_on_commit {
                backend.sync()
            } else {
                Ok(())
            }
        });
        if let Err(err) = result {
            if let Err(rollback) = backend.truncate(before) {
                tracing::error!(%txid, error = %rollback, "failed to roll back torn journal append");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Cuts the journal back to `len` bytes, dropping a torn tail.
    pub fn truncate(&self, len: u64) -> CoreResult<()> {
        let mut backend = self.backend.lock();
        backend.truncate(len)?;
        backend.sync()?;
        Ok(())
    }

    /// Empties the journal after a checkpoint.
    pub fn reset(&self) -> CoreResult<()> {
        self.truncate(0)
    }

    /// Decodes every frame.
    ///
    /// A truncated header or payload at the end is treated as the end of
    /// the log. Bad magic, unknown versions or types, and CRC mismatches are
    /// fatal.
    fn frames(&self) -> CoreResult<(Vec<(JournalEntry, u64)>, u64)> {
        let data = self.backend.lock().read_all()?;
        decode_frames(&data)
    }

    /// Groups entries into committed transactions.
    pub fn replay(&self) -> CoreResult<Replay> {
        let (frames, torn_tail) = self.frames()?;
        let mut replay = Replay {
            frames: frames.len(),
            torn_tail,
            ..Replay::default()
        };
        let mut open: HashMap<TransactionId, Vec<(RowKey, Option<Vec<u8>>)>> = HashMap::new();

        for (entry, end) in frames {
            replay.max_txid = replay.max_txid.max(entry.txid().as_u64());
            match entry {
                JournalEntry::Begin { txid } => {
                    open.insert(txid, Vec::new());
                }
                JournalEntry::Put { txid, key, row } => {
                    if let Some(writes) = open.get_mut(&txid) {
                        writes.push((key, Some(row)));
                    }
                }
                JournalEntry::Delete { txid, key } => {
                    if let Some(writes) = open.get_mut(&txid) {
                        writes.push((key, None));
                    }
                }
                JournalEntry::Commit { txid, sequence } => {
                    let writes = open.remove(&txid).ok_or_else(|| {
                        CoreError::journal_corruption(format!("commit without begin for {txid}"))
                    })?;
                    replay.committed.push(CommittedTxn {
                        txid,
                        sequence,
                        writes,
                    });
                    replay.committed_len = end;
                }
            }
        }

        replay.incomplete = open.len();
        Ok(replay)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

/// Decodes frames from raw journal bytes, pairing each entry with the
/// offset just past it. Also returns the torn-tail size.
fn decode_frames(data: &[u8]) -> CoreResult<(Vec<(JournalEntry, u64)>, u64)> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining < HEADER_SIZE {
            break;
        }
        let header = &data[offset..offset + HEADER_SIZE];
        if header[0..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(format!(
                "invalid magic at offset {offset}"
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(format!(
                "unsupported version {version} at offset {offset}"
            )));
        }
        let type_byte = header[6];
        let entry_type = EntryType::from_byte(type_byte).ok_or_else(|| {
            CoreError::journal_corruption(format!(
                "unknown entry type {type_byte} at offset {offset}"
            ))
        })?;
        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if remaining < frame_len {
            break;
        }

        let body = &data[offset..offset + HEADER_SIZE + len];
        let crc_bytes = &data[offset + HEADER_SIZE + len..offset + frame_len];
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = compute_crc32(body);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let entry = JournalEntry::decode_payload(entry_type, &body[HEADER_SIZE..])?;
        offset += frame_len;
        entries.push((entry, offset as u64));
    }

    Ok((entries, (data.len() - offset) as u64))
}
