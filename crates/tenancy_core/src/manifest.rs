//! Store manifest.

use crate::error::{CoreError, CoreResult};
use crate::types::SequenceNumber;
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Metadata persisted next to the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Layout version of the store directory.
    pub format_version: u16,
    /// Schema version the stored rows conform to.
    pub schema_version: u32,
    /// Sequence captured by the last checkpoint image.
    #[serde(default)]
    pub last_checkpoint: Option<SequenceNumber>,
}

impl Manifest {
    /// Creates a manifest for a fresh store.
    #[must_use]
    pub fn new(schema_version: u32) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            schema_version,
            last_checkpoint: None,
        }
    }

    /// Encodes the manifest as pretty JSON.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| CoreError::codec(e.to_string()))
    }

    /// Decodes and validates a manifest.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let manifest: Self = serde_json::from_slice(data)
            .map_err(|e| CoreError::invalid_format(format!("unreadable manifest: {e}")))?;
        if manifest.format_version > FORMAT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported format version: {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }
}
