//! Checkpoint image.
//!
//! ```text
//! | magic "TIMG" (4) | version (2) | sequence (8) | length (4) | CBOR rows (N) | crc32 (4) |
//! ```
//!
//! The image holds every row as of `sequence`. Recovery loads it, then
//! replays journal transactions committed after that sequence.

use crate::error::{CoreError, CoreResult};
use crate::journal::compute_crc32;
use crate::tables::Row;
use crate::types::SequenceNumber;
use tenancy_storage::Backend;

/// Magic bytes at the start of an image.
pub const IMAGE_MAGIC: [u8; 4] = *b"TIMG";

/// Current image format version.
pub const IMAGE_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2 + 8 + 4;

/// A decoded checkpoint image.
#[derive(Debug, Clone, Default)]
pub(crate) struct Image {
    pub sequence: SequenceNumber,
    pub rows: Vec<Row>,
}

impl Image {
    pub(crate) fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut body = Vec::new();
        ciborium::into_writer(&self.rows, &mut body).map_err(|e| CoreError::codec(e.to_string()))?;
        let len = u32::try_from(body.len())
            .map_err(|_| CoreError::codec(format!("image too large: {} bytes", body.len())))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len() + 4);
        buf.extend_from_slice(&IMAGE_MAGIC);
        buf.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        buf.extend_from_slice(&self.sequence.as_u64().to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&body);
        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes an image. Empty input means no checkpoint was ever taken.
    ///
    /// Images are replaced atomically, so unlike the journal a short image
    /// is corruption rather than a torn tail.
    pub(crate) fn decode(data: &[u8]) -> CoreResult<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() < HEADER_SIZE + 4 {
            return Err(CoreError::invalid_format("checkpoint image too short"));
        }
        if data[0..4] != IMAGE_MAGIC {
            return Err(CoreError::invalid_format("invalid checkpoint image magic"));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version > IMAGE_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported checkpoint image version: {version}"
            )));
        }
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&data[6..14]);
        let len = u32::from_le_bytes([data[14], data[15], data[16], data[17]]) as usize;
        if data.len() != HEADER_SIZE + len + 4 {
            return Err(CoreError::invalid_format(format!(
                "checkpoint image length mismatch: header says {len} bytes"
            )));
        }

        let crc_offset = HEADER_SIZE + len;
        let expected = u32::from_le_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);
        let actual = compute_crc32(&data[..crc_offset]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let rows: Vec<Row> = ciborium::from_reader(&data[HEADER_SIZE..crc_offset])
            .map_err(|e| CoreError::codec(e.to_string()))?;
        Ok(Some(Self {
            sequence: SequenceNumber::new(u64::from_le_bytes(seq)),
            rows,
        }))
    }

    pub(crate) fn load(backend: &dyn Backend) -> CoreResult<Option<Self>> {
        Self::decode(&backend.read_all()?)
    }

    pub(crate) fn store(&self, backend: &mut dyn Backend) -> CoreResult<()> {
        backend.replace(&self.encode()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Property;
    use crate::tables::PropertyRow;
    use chrono::Utc;
    use tenancy_storage::MemoryBackend;

    fn sample() -> Image {
        Image {
            sequence: SequenceNumber::new(9),
            rows: vec![Row::Property(PropertyRow {
                ordinal: 0,
                property: Property::new("Elm Street", "12 Elm St", Utc::now()),
            })],
        }
    }

    #[test]
    fn store_then_load() {
        let mut backend = MemoryBackend::new();
        let image = sample();
        image.store(&mut backend).unwrap();
        let loaded = Image::load(&backend).unwrap().unwrap();
        assert_eq!(loaded.sequence, image.sequence);
        assert_eq!(loaded.rows, image.rows);
    }

    #[test]
    fn empty_means_no_image() {
        assert!(Image::decode(&[]).unwrap().is_none());
    }

    #[test]
    fn corrupted_body_fails_checksum() {
        let mut bytes = sample().encode().unwrap();
        bytes[HEADER_SIZE + 1] ^= 0xFF;
        assert!(matches!(
            Image::decode(&bytes),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_image_is_invalid() {
        let bytes = sample().encode().unwrap();
        assert!(matches!(
            Image::decode(&bytes[..bytes.len() - 2]),
            Err(CoreError::InvalidFormat { .. })
        ));
    }
}
