//! Offline integrity check of a store directory.

use crate::dir::StoreDir;
use crate::error::CoreResult;
use crate::image::Image;
use crate::journal::Journal;
use crate::manifest::Manifest;
use crate::tables::Row;
use crate::types::SequenceNumber;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tenancy_storage::MemoryBackend;

/// What [`verify`] found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// The manifest, if present.
    pub manifest: Option<Manifest>,
    /// Sequence captured by the checkpoint image.
    pub image_sequence: Option<SequenceNumber>,
    /// Rows in the checkpoint image.
    pub image_rows: usize,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Decoded journal frames.
    pub frames: usize,
    /// Committed transactions in the journal.
    pub committed: usize,
    /// Transactions without a commit.
    pub incomplete: usize,
    /// Torn bytes at the end of the journal.
    pub torn_tail: u64,
    /// Highest committed sequence found.
    pub last_sequence: SequenceNumber,
    /// Every problem found; empty means the store is sound.
    pub problems: Vec<String>,
}

impl VerifyReport {
    /// Whether no problems were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

fn read_or_empty(path: &Path) -> CoreResult<Vec<u8>> {
    if path.exists() {
        Ok(fs::read(path)?)
    } else {
        Ok(Vec::new())
    }
}

/// Checks the manifest, checkpoint image and journal without modifying
/// anything.
///
/// The directory lock is held for the duration of the check, so this fails
/// with `StoreLocked` while the store is open elsewhere. Damage is reported
/// in [`VerifyReport::problems`] rather than as an error.
pub fn verify(path: &Path) -> CoreResult<VerifyReport> {
    let dir = StoreDir::open(path, false)?;
    let mut report = VerifyReport::default();

    match dir.load_manifest() {
        Ok(manifest) => report.manifest = manifest,
        Err(err) => report.problems.push(format!("manifest: {err}")),
    }

    match Image::decode(&read_or_empty(&dir.image_path())?) {
        Ok(Some(image)) => {
            report.image_sequence = Some(image.sequence);
            report.image_rows = image.rows.len();
            report.last_sequence = image.sequence;
        }
        Ok(None) => {}
        Err(err) => report.problems.push(format!("checkpoint image: {err}")),
    }

    let bytes = read_or_empty(&dir.journal_path())?;
    report.journal_bytes = bytes.len() as u64;
    let journal = Journal::new(Box::new(MemoryBackend::with_data(bytes)), false);
    match journal.replay() {
        Ok(replay) => {
            report.frames = replay.frames;
            report.committed = replay.committed.len();
            report.incomplete = replay.incomplete;
            report.torn_tail = replay.torn_tail;
            for txn in &replay.committed {
                report.last_sequence = report.last_sequence.max(txn.sequence);
                for (key, bytes) in &txn.writes {
                    if let Some(bytes) = bytes {
                        if let Err(err) = Row::decode(*key, bytes) {
                            report
                                .problems
                                .push(format!("journal {} row {key:?}: {err}", txn.txid));
                        }
                    }
                }
            }
        }
        Err(err) => report.problems.push(format!("journal: {err}")),
    }

    Ok(report)
}
