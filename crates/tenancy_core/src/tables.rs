//! Normalized rows and the canonical in-memory tables.
//!
//! Records own rooms (`room_ids` on the record row, `record_id` on the room
//! row; cascade-capable). Records reference properties by foreign key only
//! (`property_id`; no cascade, nulled on property delete).

use crate::error::{CoreError, CoreResult};
use crate::model::{Property, PropertyId, Record, RecordId, Room, RoomId, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Which table a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableKind {
    /// Properties.
    Properties = 1,
    /// Records.
    Records = 2,
    /// Rooms.
    Rooms = 3,
}

impl TableKind {
    /// Converts a journal byte to a table kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Properties),
            2 => Some(Self::Records),
            3 => Some(Self::Rooms),
            _ => None,
        }
    }

    /// Converts the table kind to its journal byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Primary key of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    /// A property row.
    Property(PropertyId),
    /// A record row.
    Record(RecordId),
    /// A room row.
    Room(RoomId),
}

impl RowKey {
    /// Table the key belongs to.
    #[must_use]
    pub fn table(&self) -> TableKind {
        match self {
            Self::Property(_) => TableKind::Properties,
            Self::Record(_) => TableKind::Records,
            Self::Room(_) => TableKind::Rooms,
        }
    }

    /// Raw id bytes.
    #[must_use]
    pub fn id_bytes(&self) -> [u8; 16] {
        match self {
            Self::Property(id) => *id.as_bytes(),
            Self::Record(id) => *id.as_bytes(),
            Self::Room(id) => *id.as_bytes(),
        }
    }

    /// Rebuilds a key from its journal parts.
    #[must_use]
    pub fn from_parts(table: TableKind, bytes: [u8; 16]) -> Self {
        let uuid = Uuid::from_bytes(bytes);
        match table {
            TableKind::Properties => Self::Property(uuid.into()),
            TableKind::Records => Self::Record(uuid.into()),
            TableKind::Rooms => Self::Room(uuid.into()),
        }
    }
}

/// Stored property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PropertyRow {
    pub ordinal: u64,
    pub property: Property,
}

/// Stored record; rooms are referenced by id, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecordRow {
    pub ordinal: u64,
    pub id: RecordId,
    pub title: String,
    pub stage: Stage,
    pub room_ids: Vec<RoomId>,
    pub reminder_interval_days: u32,
    pub next_reminder_at: Option<DateTime<Utc>>,
    pub property_id: Option<PropertyId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordRow {
    /// Splits a record graph into its row and its room rows.
    pub(crate) fn split(record: &Record, ordinal: u64) -> (Self, Vec<RoomRow>) {
        let rooms = record
            .rooms
            .iter()
            .enumerate()
            .map(|(i, room)| RoomRow {
                ordinal: ordinal + 1 + i as u64,
                record_id: record.id,
                room: room.clone(),
            })
            .collect();
        let row = Self {
            ordinal,
            id: record.id,
            title: record.title.clone(),
            stage: record.stage,
            room_ids: record.rooms.iter().map(|r| r.id).collect(),
            reminder_interval_days: record.reminder_interval_days,
            next_reminder_at: record.next_reminder_at,
            property_id: record.property_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        (row, rooms)
    }

    /// Copies the scalar fields into a record shell without rooms.
    pub(crate) fn to_record_shell(&self) -> Record {
        Record {
            id: self.id,
            title: self.title.clone(),
            stage: self.stage,
            rooms: Vec::with_capacity(self.room_ids.len()),
            reminder_interval_days: self.reminder_interval_days,
            next_reminder_at: self.next_reminder_at,
            property_id: self.property_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Bumps `updated_at` and recomputes the reminder, like [`Record::touch`].
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let mut shell = self.to_record_shell();
        shell.touch(now)?;
        self.updated_at = shell.updated_at;
        self.next_reminder_at = shell.next_reminder_at;
        Ok(())
    }
}

/// Stored room with a back-pointer to its owning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RoomRow {
    pub ordinal: u64,
    pub record_id: RecordId,
    pub room: Room,
}

/// Any stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Row {
    Property(PropertyRow),
    Record(RecordRow),
    Room(RoomRow),
}

impl Row {
    pub(crate) fn key(&self) -> RowKey {
        match self {
            Self::Property(row) => RowKey::Property(row.property.id),
            Self::Record(row) => RowKey::Record(row.id),
            Self::Room(row) => RowKey::Room(row.room.id),
        }
    }

    pub(crate) fn ordinal(&self) -> u64 {
        match self {
            Self::Property(row) => row.ordinal,
            Self::Record(row) => row.ordinal,
            Self::Room(row) => row.ordinal,
        }
    }

    /// Encodes the row as CBOR.
    pub(crate) fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::codec(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a row and checks it belongs to `key`.
    pub(crate) fn decode(key: RowKey, bytes: &[u8]) -> CoreResult<Self> {
        let row: Row = ciborium::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))?;
        if row.key() != key {
            return Err(CoreError::codec(format!(
                "row key mismatch: journal says {key:?}, payload says {:?}",
                row.key()
            )));
        }
        Ok(row)
    }
}

/// The committed state of all three tables.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    properties: HashMap<PropertyId, PropertyRow>,
    records: HashMap<RecordId, RecordRow>,
    rooms: HashMap<RoomId, RoomRow>,
    next_ordinal: u64,
}

impl Tables {
    pub(crate) fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut tables = Self::default();
        for row in rows {
            tables.apply(row.key(), Some(row));
        }
        tables
    }

    /// Applies a committed put (`Some`) or delete (`None`).
    pub(crate) fn apply(&mut self, key: RowKey, row: Option<Row>) {
        if let Some(row) = &row {
            self.next_ordinal = self.next_ordinal.max(row.ordinal() + 1);
        }
        match (key, row) {
            (_, Some(Row::Property(row))) => {
                self.properties.insert(row.property.id, row);
            }
            (_, Some(Row::Record(row))) => {
                self.records.insert(row.id, row);
            }
            (_, Some(Row::Room(row))) => {
                self.rooms.insert(row.room.id, row);
            }
            (RowKey::Property(id), None) => {
                self.properties.remove(&id);
            }
            (RowKey::Record(id), None) => {
                self.records.remove(&id);
            }
            (RowKey::Room(id), None) => {
                self.rooms.remove(&id);
            }
        }
    }

    pub(crate) fn next_ordinal(&self) -> u64 {
        self.next_ordinal
    }

    pub(crate) fn property(&self, id: PropertyId) -> Option<&PropertyRow> {
        self.properties.get(&id)
    }

    pub(crate) fn record(&self, id: RecordId) -> Option<&RecordRow> {
        self.records.get(&id)
    }

    pub(crate) fn room(&self, id: RoomId) -> Option<&RoomRow> {
        self.rooms.get(&id)
    }

    pub(crate) fn get(&self, key: RowKey) -> Option<Row> {
        match key {
            RowKey::Property(id) => self.property(id).cloned().map(Row::Property),
            RowKey::Record(id) => self.record(id).cloned().map(Row::Record),
            RowKey::Room(id) => self.room(id).cloned().map(Row::Room),
        }
    }

    /// Properties in insertion order.
    pub(crate) fn properties_ordered(&self) -> Vec<&PropertyRow> {
        let mut rows: Vec<_> = self.properties.values().collect();
        rows.sort_by_key(|row| row.ordinal);
        rows
    }

    /// Records in insertion order.
    pub(crate) fn records_ordered(&self) -> Vec<&RecordRow> {
        let mut rows: Vec<_> = self.records.values().collect();
        rows.sort_by_key(|row| row.ordinal);
        rows
    }

    /// Every key, children before parents: rooms, records, then properties.
    pub(crate) fn keys(&self) -> Vec<RowKey> {
        self.rooms
            .keys()
            .map(|id| RowKey::Room(*id))
            .chain(self.records.keys().map(|id| RowKey::Record(*id)))
            .chain(self.properties.keys().map(|id| RowKey::Property(*id)))
            .collect()
    }

    pub(crate) fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.keys().copied()
    }

    pub(crate) fn counts(&self) -> (usize, usize, usize) {
        (self.properties.len(), self.records.len(), self.rooms.len())
    }

    pub(crate) fn photo_count(&self) -> usize {
        self.rooms.values().map(|row| row.room.photos.len()).sum()
    }

    /// Every row, properties first, each table in insertion order.
    pub(crate) fn rows(&self) -> Vec<Row> {
        let mut rooms: Vec<_> = self.rooms.values().collect();
        rooms.sort_by_key(|row| row.ordinal);
        self.properties_ordered()
            .into_iter()
            .cloned()
            .map(Row::Property)
            .chain(self.records_ordered().into_iter().cloned().map(Row::Record))
            .chain(rooms.into_iter().cloned().map(Row::Room))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoomType;

    #[test]
    fn row_cbor_roundtrip_checks_key() {
        let property = Property::new("Loft", "", Utc::now());
        let row = Row::Property(PropertyRow {
            ordinal: 0,
            property: property.clone(),
        });
        let bytes = row.encode().unwrap();
        assert_eq!(Row::decode(row.key(), &bytes).unwrap(), row);

        let wrong = RowKey::Property(PropertyId::new());
        assert!(matches!(Row::decode(wrong, &bytes), Err(CoreError::Codec { .. })));
    }

    #[test]
    fn split_keeps_room_order() {
        let record = Record::new("", Stage::MoveIn, Utc::now())
            .with_rooms(&[(RoomType::Kitchen, 1), (RoomType::Bedroom, 1)]);
        let (row, rooms) = RecordRow::split(&record, 10);
        assert_eq!(row.room_ids, vec![record.rooms[0].id, record.rooms[1].id]);
        assert_eq!(rooms[0].ordinal, 11);
        assert_eq!(rooms[1].ordinal, 12);
        assert!(rooms.iter().all(|r| r.record_id == record.id));
    }

    #[test]
    fn apply_tracks_next_ordinal_and_order() {
        let now = Utc::now();
        let first = Property::new("A", "", now);
        let second = Property::new("B", "", now);
        let mut tables = Tables::default();
        tables.apply(
            RowKey::Property(second.id),
            Some(Row::Property(PropertyRow { ordinal: 5, property: second.clone() })),
        );
        tables.apply(
            RowKey::Property(first.id),
            Some(Row::Property(PropertyRow { ordinal: 2, property: first.clone() })),
        );
        assert_eq!(tables.next_ordinal(), 6);
        let names: Vec<_> = tables
            .properties_ordered()
            .iter()
            .map(|r| r.property.name.as_str())
            .collect();
        assert_eq!(names, ["A", "B"]);

        tables.apply(RowKey::Property(first.id), None);
        assert!(tables.property(first.id).is_none());
    }

    #[test]
    fn table_kind_bytes() {
        for kind in [TableKind::Properties, TableKind::Records, TableKind::Rooms] {
            assert_eq!(TableKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(TableKind::from_byte(0), None);
    }
}
