//! Owned entity graphs assembled from the tables.
//!
//! Everything handed out of the store is built here by copying rows into
//! fresh values. Nested lists are copied in stored order, so a detached
//! graph never aliases store state and never reorders children.

use crate::model::{Property, Record, Room, RoomId};
use crate::tables::{RecordRow, Tables};
use serde::{Deserialize, Serialize};

/// A property with the records currently linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGraph {
    /// The property itself.
    pub property: Property,
    /// Linked records in insertion order, each with its rooms.
    pub records: Vec<Record>,
}

impl PropertyGraph {
    /// Number of linked records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Photos across every linked record.
    #[must_use]
    pub fn total_photos(&self) -> usize {
        self.records.iter().map(Record::total_photos).sum()
    }
}

/// Rebuilds a record with its rooms in `room_ids` order.
pub(crate) fn record(tables: &Tables, row: &RecordRow) -> Record {
    assemble(row, |id| tables.room(id).map(|r| r.room.clone()))
}

/// Rebuilds a record, looking rooms up through `room`.
pub(crate) fn assemble(row: &RecordRow, room: impl Fn(RoomId) -> Option<Room>) -> Record {
    let mut record = row.to_record_shell();
    for room_id in &row.room_ids {
        match room(*room_id) {
            Some(found) => record.rooms.push(found),
            None => {
                tracing::warn!(record = %row.id, room = %room_id, "record lists a missing room");
            }
        }
    }
    record
}

pub(crate) fn room(tables: &Tables, id: RoomId) -> Option<Room> {
    tables.room(id).map(|row| row.room.clone())
}

/// All properties in insertion order.
pub(crate) fn properties(tables: &Tables) -> Vec<Property> {
    tables
        .properties_ordered()
        .into_iter()
        .map(|row| row.property.clone())
        .collect()
}

/// All records in insertion order.
pub(crate) fn records(tables: &Tables) -> Vec<Record> {
    tables
        .records_ordered()
        .into_iter()
        .map(|row| record(tables, row))
        .collect()
}

/// The property plus its linked records.
pub(crate) fn property_graph(tables: &Tables, property: &Property) -> PropertyGraph {
    let records = tables
        .records_ordered()
        .into_iter()
        .filter(|row| row.property_id == Some(property.id))
        .map(|row| record(tables, row))
        .collect();
    PropertyGraph {
        property: property.clone(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoomType, Stage};
    use crate::tables::{PropertyRow, Row};
    use chrono::Utc;

    fn tables_with(record: &Record, property: &Property) -> Tables {
        let (row, rooms) = RecordRow::split(record, 1);
        let mut rows = vec![
            Row::Property(PropertyRow {
                ordinal: 0,
                property: property.clone(),
            }),
            Row::Record(row),
        ];
        rows.extend(rooms.into_iter().map(Row::Room));
        Tables::from_rows(rows)
    }

    #[test]
    fn rooms_come_back_in_list_order() {
        let property = Property::new("Harbor", "", Utc::now());
        let record = Record::new("", Stage::MoveIn, Utc::now())
            .with_rooms(&[(RoomType::Kitchen, 1), (RoomType::Bedroom, 2), (RoomType::Other, 1)])
            .for_property(property.id);
        let tables = tables_with(&record, &property);

        assert_eq!(records(&tables), vec![record.clone()]);
        let graph = property_graph(&tables, &property);
        assert_eq!(graph.record_count(), 1);
        assert_eq!(graph.records[0].rooms, record.rooms);
    }

    #[test]
    fn detached_copy_is_independent() {
        let property = Property::new("Harbor", "", Utc::now());
        let mut record = Record::new("", Stage::Living, Utc::now())
            .with_rooms(&[(RoomType::Bathroom, 1)]);
        record.rooms[0].photos = vec!["a.jpg".into(), "b.jpg".into()];
        let tables = tables_with(&record, &property);

        let mut detached = records(&tables).remove(0);
        detached.rooms[0].photos.clear();
        detached.title.push_str("changed");

        let again = records(&tables).remove(0);
        assert_eq!(again.rooms[0].photos.len(), 2);
        assert_eq!(again.title, "");
    }

    #[test]
    fn unlinked_records_are_not_in_graph() {
        let property = Property::new("Harbor", "", Utc::now());
        let record = Record::new("", Stage::MoveOut, Utc::now());
        let tables = tables_with(&record, &property);
        assert_eq!(property_graph(&tables, &property).record_count(), 0);
    }
}
