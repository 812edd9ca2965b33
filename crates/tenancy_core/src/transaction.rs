//! Write transactions.
//!
//! A [`WriteTxn`] stages puts and deletes on top of the committed
//! [`Tables`]. Reads inside the transaction see its own pending writes.
//! Nothing touches the tables until the store commits the staged writes
//! to the journal and applies them.

use crate::model::{PropertyId, RecordId, RoomId};
use crate::tables::{PropertyRow, RecordRow, RoomRow, Row, RowKey, Tables};
use crate::types::TransactionId;
use chrono::{DateTime, Utc};

/// A staged change to one row.
#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    /// Insert or replace the row.
    Put(Row),
    /// Remove the row.
    Delete,
}

/// An open write transaction.
#[derive(Debug)]
pub(crate) struct WriteTxn<'a> {
    id: TransactionId,
    base: &'a Tables,
    /// Staged writes in the order they were issued; one entry per key.
    writes: Vec<(RowKey, PendingWrite)>,
    next_ordinal: u64,
    now: DateTime<Utc>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(id: TransactionId, base: &'a Tables, now: DateTime<Utc>) -> Self {
        Self {
            id,
            base,
            writes: Vec::new(),
            next_ordinal: base.next_ordinal(),
            now,
        }
    }

    pub(crate) fn id(&self) -> TransactionId {
        self.id
    }

    /// The instant this transaction stamps on rows it touches.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Reserves `count` consecutive insertion ordinals.
    pub(crate) fn reserve_ordinals(&mut self, count: u64) -> u64 {
        let first = self.next_ordinal;
        self.next_ordinal += count;
        first
    }

    fn pending(&self, key: RowKey) -> Option<&PendingWrite> {
        self.writes.iter().find(|(k, _)| *k == key).map(|(_, w)| w)
    }

    fn stage(&mut self, key: RowKey, write: PendingWrite) {
        if let Some(slot) = self.writes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = write;
        } else {
            self.writes.push((key, write));
        }
    }

    /// Reads a row as this transaction currently sees it.
    pub(crate) fn get(&self, key: RowKey) -> Option<Row> {
        match self.pending(key) {
            Some(PendingWrite::Put(row)) => Some(row.clone()),
            Some(PendingWrite::Delete) => None,
            None => self.base.get(key),
        }
    }

    pub(crate) fn property(&self, id: PropertyId) -> Option<PropertyRow> {
        match self.get(RowKey::Property(id)) {
            Some(Row::Property(row)) => Some(row),
            _ => None,
        }
    }

    pub(crate) fn record(&self, id: RecordId) -> Option<RecordRow> {
        match self.get(RowKey::Record(id)) {
            Some(Row::Record(row)) => Some(row),
            _ => None,
        }
    }

    pub(crate) fn room(&self, id: RoomId) -> Option<RoomRow> {
        match self.get(RowKey::Room(id)) {
            Some(Row::Room(row)) => Some(row),
            _ => None,
        }
    }

    pub(crate) fn exists(&self, key: RowKey) -> bool {
        self.get(key).is_some()
    }

    /// Records whose parent is `property`, as seen by this transaction.
    pub(crate) fn records_linked_to(&self, property: PropertyId) -> Vec<RecordRow> {
        let mut ids: Vec<RecordId> = self.base.record_ids().collect();
        for (key, write) in &self.writes {
            if let (RowKey::Record(id), PendingWrite::Put(_)) = (key, write) {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        let mut linked: Vec<RecordRow> = ids
            .into_iter()
            .filter_map(|id| self.record(id))
            .filter(|row| row.property_id == Some(property))
            .collect();
        linked.sort_by_key(|row| row.ordinal);
        linked
    }

    /// Keys of every committed row, children before parents.
    pub(crate) fn committed_keys(&self) -> Vec<RowKey> {
        self.base.keys()
    }

    pub(crate) fn put(&mut self, row: Row) {
        self.stage(row.key(), PendingWrite::Put(row));
    }

    pub(crate) fn delete(&mut self, key: RowKey) {
        self.stage(key, PendingWrite::Delete);
    }

    pub(crate) fn into_writes(self) -> Vec<(RowKey, PendingWrite)> {
        self.writes
    }
}
