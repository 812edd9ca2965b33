//! Store statistics.

use crate::types::SequenceNumber;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters, updated as the store runs.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    commits: AtomicU64,
    failures: AtomicU64,
    checkpoints: AtomicU64,
}

impl Counters {
    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Stored properties.
    pub properties: usize,
    /// Stored records.
    pub records: usize,
    /// Stored rooms.
    pub rooms: usize,
    /// Photo tokens across all rooms.
    pub photos: usize,
    /// Last committed sequence.
    pub sequence: SequenceNumber,
    /// Journal size in bytes since the last checkpoint.
    pub journal_bytes: u64,
    /// Commits since open.
    pub commits: u64,
    /// Failed operations since open.
    pub failures: u64,
    /// Checkpoints since open.
    pub checkpoints: u64,
}

impl StoreStats {
    pub(crate) fn with_counters(mut self, counters: &Counters) -> Self {
        self.commits = counters.commits.load(Ordering::Relaxed);
        self.failures = counters.failures.load(Ordering::Relaxed);
        self.checkpoints = counters.checkpoints.load(Ordering::Relaxed);
        self
    }
}
