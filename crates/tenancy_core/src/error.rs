//! Error types for the inspection store.

use crate::model::{PropertyId, RecordId, RoomId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tenancy_storage::StorageError),

    /// I/O error outside a backend (directory, lock, manifest).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Row could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// The target record does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// The target room does not exist, or is not owned by the given record.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The target property does not exist.
    #[error("property not found: {0}")]
    PropertyNotFound(PropertyId),

    /// Input rejected before any transaction was opened.
    #[error("invalid data: {message}")]
    InvalidData {
        /// What was wrong with the input.
        message: String,
    },

    /// A transaction failed to commit; the previous state is authoritative.
    #[error("operation failed: {detail}")]
    OperationFailed {
        /// Description of the failure.
        detail: String,
    },

    /// The store could not be opened.
    #[error("store initialization failed: {reason}")]
    Initialization {
        /// Why opening failed.
        reason: String,
    },

    /// The store failed to initialize earlier and stays unusable.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// The original initialization failure.
        reason: String,
    },

    /// The journal is corrupted or invalid.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Unsupported on-disk format or schema version.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Another process holds the store directory.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// A schema migration failed.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Creates an operation failed error.
    pub fn operation_failed(detail: impl Into<String>) -> Self {
        Self::OperationFailed {
            detail: detail.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a migration failed error.
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }

    /// Returns true for the stale-reference family of errors.
    ///
    /// Callers holding an outdated id treat these as "nothing happened".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound(_) | Self::RoomNotFound(_) | Self::PropertyNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_family() {
        assert!(CoreError::RecordNotFound(RecordId::new()).is_not_found());
        assert!(CoreError::RoomNotFound(RoomId::new()).is_not_found());
        assert!(CoreError::PropertyNotFound(PropertyId::new()).is_not_found());
        assert!(!CoreError::invalid_data("x").is_not_found());
    }

    #[test]
    fn display_includes_id() {
        let id = RecordId::new();
        let message = CoreError::RecordNotFound(id).to_string();
        assert!(message.contains(&id.to_string()));
    }
}
