//! Journal entries and their framing.

use crate::error::{CoreError, CoreResult};
use crate::tables::{RowKey, TableKind};
use crate::types::{SequenceNumber, TransactionId};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"TJNL";

/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Type byte of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    /// Transaction start.
    Begin = 1,
    /// Row insert or replace.
    Put = 2,
    /// Row removal.
    Delete = 3,
    /// Transaction commit.
    Commit = 4,
}

impl EntryType {
    /// Converts a byte to an entry type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::Commit),
            _ => None,
        }
    }
}

/// One framed journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// Transaction start.
    Begin {
        /// Transaction ID.
        txid: TransactionId,
    },
    /// Row insert or replace.
    Put {
        /// Transaction ID.
        txid: TransactionId,
        /// Row key.
        key: RowKey,
        /// CBOR-encoded row.
        row: Vec<u8>,
    },
    /// Row removal.
    Delete {
        /// Transaction ID.
        txid: TransactionId,
        /// Row key.
        key: RowKey,
    },
    /// Transaction commit.
    Commit {
        /// Transaction ID.
        txid: TransactionId,
        /// Sequence assigned at commit.
        sequence: SequenceNumber,
    },
}

impl JournalEntry {
    /// Returns the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::Begin { .. } => EntryType::Begin,
            Self::Put { .. } => EntryType::Put,
            Self::Delete { .. } => EntryType::Delete,
            Self::Commit { .. } => EntryType::Commit,
        }
    }

    /// Returns the owning transaction.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        match self {
            Self::Begin { txid }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => *txid,
        }
    }

    fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.txid().as_u64().to_le_bytes());
        match self {
            Self::Begin { .. } => {}
            Self::Put { key, row, .. } => {
                buf.push(key.table().as_byte());
                buf.extend_from_slice(&key.id_bytes());
                let len = u32::try_from(row.len())
                    .map_err(|_| CoreError::invalid_data("row too large for journal"))?;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(row);
            }
            Self::Delete { key, .. } => {
                buf.push(key.table().as_byte());
                buf.extend_from_slice(&key.id_bytes());
            }
            Self::Commit { sequence, .. } => {
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }
        }
        Ok(buf)
    }

    /// Encodes the entry as a complete frame.
    pub fn encode_frame(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_data("journal payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        frame.push(self.entry_type() as u8);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a payload of the given type.
    pub(crate) fn decode_payload(entry_type: EntryType, payload: &[u8]) -> CoreResult<Self> {
        let mut cursor = Cursor::new(payload);
        let txid = TransactionId::new(cursor.u64()?);
        let entry = match entry_type {
            EntryType::Begin => Self::Begin { txid },
            EntryType::Put => {
                let key = cursor.key()?;
                let len = cursor.u32()? as usize;
                let row = cursor.take(len)?.to_vec();
                Self::Put { txid, key, row }
            }
            EntryType::Delete => {
                let key = cursor.key()?;
                Self::Delete { txid, key }
            }
            EntryType::Commit => Self::Commit {
                txid,
                sequence: SequenceNumber::new(cursor.u64()?),
            },
        };
        if !cursor.is_done() {
            return Err(CoreError::journal_corruption("trailing bytes in entry payload"));
        }
        Ok(entry)
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let end = end.ok_or_else(|| CoreError::journal_corruption("entry payload too short"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn key(&mut self) -> CoreResult<RowKey> {
        let table_byte = self.take(1)?[0];
        let table = TableKind::from_byte(table_byte).ok_or_else(|| {
            CoreError::journal_corruption(format!("unknown table {table_byte}"))
        })?;
        let mut id = [0u8; 16];
        id.copy_from_slice(self.take(16)?);
        Ok(RowKey::from_parts(table, id))
    }

    fn is_done(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// CRC32 (IEEE polynomial) over `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordId;

    #[test]
    fn crc_matches_reference_vector() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn put_frame_layout() {
        let entry = JournalEntry::Put {
            txid: TransactionId::new(9),
            key: RowKey::Record(RecordId::new()),
            row: vec![0xA1, 0x01, 0x02],
        };
        let frame = entry.encode_frame().unwrap();
        assert_eq!(&frame[0..4], &JOURNAL_MAGIC);
        assert_eq!(frame[6], EntryType::Put as u8);
        let len = u32::from_le_bytes([frame[7], frame[8], frame[9], frame[10]]) as usize;
        assert_eq!(frame.len(), HEADER_SIZE + len + CRC_SIZE);

        let payload = &frame[HEADER_SIZE..HEADER_SIZE + len];
        assert_eq!(JournalEntry::decode_payload(EntryType::Put, payload).unwrap(), entry);
    }

    #[test]
    fn short_payload_is_corruption() {
        let result = JournalEntry::decode_payload(EntryType::Commit, &[1, 0, 0]);
        assert!(matches!(result, Err(CoreError::JournalCorruption { .. })));
    }
}
