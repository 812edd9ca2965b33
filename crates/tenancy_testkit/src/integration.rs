//! Operation harness that replays generated mutations and checks the
//! store's invariants after each one.

use crate::fixtures::TestStore;
use crate::generators::{ParentPick, StoreOp};
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tenancy_core::{
    Collections, ParentChange, Property, Record, RecordPatch, Room, RoomId, Store,
};

/// Replays [`StoreOp`]s against a store and tracks what it expects back.
pub struct OperationHarness {
    /// The store under test.
    pub test_store: TestStore,
    /// Expected photo tokens per room.
    photos: HashMap<RoomId, Vec<String>>,
    /// Emissions observed so far.
    feed: Receiver<Arc<Collections>>,
    /// Emissions the harness expects to have been published.
    expected_emissions: usize,
}

impl OperationHarness {
    /// Creates a harness over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(TestStore::memory())
    }

    /// Creates a harness over an existing test store.
    pub fn with_store(test_store: TestStore) -> Self {
        let feed = test_store.watch();
        let photos = test_store
            .records()
            .iter()
            .flat_map(|r| r.rooms.iter())
            .map(|room| (room.id, room.photos.clone()))
            .collect();
        Self {
            test_store,
            photos,
            feed,
            expected_emissions: 0,
        }
    }

    /// The store under test.
    pub fn store(&self) -> &Store {
        &self.test_store
    }

    fn nth_record(&self, n: usize) -> Option<Record> {
        let records = self.store().records();
        if records.is_empty() {
            return None;
        }
        Some(records[n % records.len()].clone())
    }

    fn nth_room(&self, n: usize) -> Option<Room> {
        let rooms: Vec<Room> = self
            .store()
            .records()
            .into_iter()
            .flat_map(|r| r.rooms)
            .collect();
        if rooms.is_empty() {
            return None;
        }
        Some(rooms[n % rooms.len()].clone())
    }

    fn nth_property(&self, n: usize) -> Option<Property> {
        let properties = self.store().properties();
        if properties.is_empty() {
            return None;
        }
        Some(properties[n % properties.len()].clone())
    }

    /// Applies one operation. Returns whether a mutating store call ran.
    pub fn apply(&mut self, op: &StoreOp) -> bool {
        let called = self.apply_inner(op);
        if called {
            self.expected_emissions += 1;
        }
        called
    }

    fn apply_inner(&mut self, op: &StoreOp) -> bool {
        match op {
            StoreOp::CreateProperty { name } => {
                self.store()
                    .create_property(name.clone(), "")
                    .expect("create_property failed");
                true
            }
            StoreOp::CreateRecord {
                stage,
                interval,
                plan,
                property,
            } => {
                let mut record = Record::new("", *stage, self.store().now())
                    .with_rooms(plan)
                    .with_reminder(*interval);
                if let Some(p) = property.and_then(|p| self.nth_property(p)) {
                    record = record.for_property(p.id);
                }
                let record = self
                    .store()
                    .create_record(record)
                    .expect("create_record failed");
                for room in &record.rooms {
                    self.photos.insert(room.id, Vec::new());
                }
                true
            }
            StoreOp::UpdateRecord {
                record,
                stage,
                interval,
                parent,
            } => {
                let Some(record) = self.nth_record(*record) else {
                    return false;
                };
                let mut patch = RecordPatch::new();
                patch.stage = *stage;
                patch.reminder_interval_days = *interval;
                patch.parent = match parent {
                    ParentPick::Keep => ParentChange::Keep,
                    ParentPick::Clear => ParentChange::Clear,
                    ParentPick::Set(n) => match self.nth_property(*n) {
                        Some(p) => ParentChange::Set(p.id),
                        None => ParentChange::Keep,
                    },
                };
                self.store()
                    .update_record(record.id, patch)
                    .expect("update_record failed");
                true
            }
            StoreOp::DeleteRecord { record } => {
                let Some(record) = self.nth_record(*record) else {
                    return false;
                };
                self.store()
                    .delete_record(record.id)
                    .expect("delete_record failed");
                for room in &record.rooms {
                    self.photos.remove(&room.id);
                }
                true
            }
            StoreOp::AddRoom { record, room_type } => {
                let Some(record) = self.nth_record(*record) else {
                    return false;
                };
                let room = self
                    .store()
                    .add_room(record.id, Room::new(*room_type, self.store().now()))
                    .expect("add_room failed");
                self.photos.insert(room.id, Vec::new());
                true
            }
            StoreOp::DeleteRoom { record, room } => {
                let Some(record) = self.nth_record(*record) else {
                    return false;
                };
                if record.rooms.is_empty() {
                    return false;
                }
                let room = &record.rooms[room % record.rooms.len()];
                self.store()
                    .delete_room(room.id, record.id)
                    .expect("delete_room failed");
                self.photos.remove(&room.id);
                true
            }
            StoreOp::AddPhoto { room, token } => {
                let Some(room) = self.nth_room(*room) else {
                    return false;
                };
                self.store()
                    .add_photo(room.id, token.clone())
                    .expect("add_photo failed");
                self.photos.entry(room.id).or_default().push(token.clone());
                true
            }
            StoreOp::RemovePhoto { room, index } => {
                let Some(room) = self.nth_room(*room) else {
                    return false;
                };
                let removed = self
                    .store()
                    .remove_photo(room.id, *index)
                    .expect("remove_photo failed");
                let expected = self.photos.entry(room.id).or_default();
                if *index < expected.len() {
                    let token = expected.remove(*index);
                    assert_eq!(removed, Some(token), "removed the wrong photo");
                } else {
                    assert_eq!(removed, None, "out-of-range removal returned a token");
                }
                true
            }
            StoreOp::DeleteProperty { property } => {
                let Some(property) = self.nth_property(*property) else {
                    return false;
                };
                self.store()
                    .delete_property(property.id)
                    .expect("delete_property failed");
                true
            }
            StoreOp::UnlinkRecord { record } => {
                let Some(record) = self.nth_record(*record) else {
                    return false;
                };
                self.store()
                    .unlink_record(record.id)
                    .expect("unlink_record failed");
                true
            }
            StoreOp::AdvanceClock { hours } => {
                self.test_store.advance(Duration::hours(i64::from(*hours)));
                false
            }
        }
    }

    /// Applies every operation, verifying after each one.
    pub fn run(&mut self, ops: &[StoreOp]) {
        for op in ops {
            self.apply(op);
            self.verify();
        }
    }

    /// Asserts every structural invariant of the current state.
    pub fn verify(&self) {
        let store = self.store();
        let current = store.current();
        let properties = store.properties();
        let records = store.records();

        for property in &current.properties {
            let stored = store.property(property.id).expect("published property is missing");
            assert_eq!(&stored, property, "published property is stale");
        }
        for record in &current.records {
            let stored = store.record(record.id).expect("published record is missing");
            assert_eq!(&stored, record, "published record is stale");
        }

        let property_ids: HashSet<_> = properties.iter().map(|p| p.id).collect();
        let mut room_ids = HashSet::new();
        let mut photo_total = 0;

        for record in &records {
            assert!(
                record.reminder_is_consistent(),
                "reminder out of sync for {}",
                record.id
            );
            assert!(record.updated_at >= record.created_at);
            if let Some(parent) = record.property_id {
                assert!(
                    property_ids.contains(&parent),
                    "record {} links to missing property {parent}",
                    record.id
                );
            }

            let mut expected_photos = 0;
            for room in &record.rooms {
                assert!(room_ids.insert(room.id), "room {} appears twice", room.id);
                let expected = self.photos.get(&room.id).cloned().unwrap_or_default();
                assert_eq!(room.photos, expected, "photo list drifted for {}", room.id);
                expected_photos += expected.len();
            }
            assert_eq!(record.total_photos(), expected_photos);
            photo_total += expected_photos;
        }

        assert_eq!(room_ids.len(), self.photos.len(), "room set drifted");

        let stats = store.stats();
        assert_eq!(stats.properties, properties.len());
        assert_eq!(stats.records, records.len());
        assert_eq!(stats.rooms, room_ids.len());
        assert_eq!(stats.photos, photo_total);
    }

    /// Drains the watch channel and checks one emission per mutating call,
    /// in order. Calls that changed nothing repeat the previous sequence.
    pub fn verify_emissions(&self) {
        let emissions: Vec<_> = self.feed.try_iter().collect();
        assert_eq!(emissions.len(), self.expected_emissions, "emission count");
        for pair in emissions.windows(2) {
            assert!(pair[0].sequence <= pair[1].sequence, "emissions out of order");
        }
        if let Some(last) = emissions.last() {
            assert_eq!(**last, *self.store().current(), "last emission is not current");
        }
    }
}

impl Default for OperationHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_core::{RoomType, Stage};

    #[test]
    fn harness_tracks_photos() {
        let mut harness = OperationHarness::new();
        harness.run(&[
            StoreOp::CreateRecord {
                stage: Stage::MoveIn,
                interval: 30,
                plan: vec![(RoomType::Kitchen, 1)],
                property: None,
            },
            StoreOp::AddPhoto {
                room: 0,
                token: "a.jpg".into(),
            },
            StoreOp::AddPhoto {
                room: 0,
                token: "b.jpg".into(),
            },
            StoreOp::RemovePhoto { room: 0, index: 0 },
            StoreOp::RemovePhoto { room: 0, index: 4 },
        ]);
        assert_eq!(harness.store().records()[0].total_photos(), 1);
        assert_eq!(harness.expected_emissions, 5);
        harness.verify_emissions();
    }

    #[test]
    fn operations_without_targets_are_skipped() {
        let mut harness = OperationHarness::new();
        assert!(!harness.apply(&StoreOp::DeleteRecord { record: 3 }));
        assert!(!harness.apply(&StoreOp::AddPhoto {
            room: 0,
            token: "x.jpg".into()
        }));
        harness.verify();
        harness.verify_emissions();
    }

    #[test]
    fn deleting_a_property_keeps_links_valid() {
        let mut harness = OperationHarness::new();
        harness.run(&[
            StoreOp::CreateProperty {
                name: "Harbour".into(),
            },
            StoreOp::CreateRecord {
                stage: Stage::Living,
                interval: 0,
                plan: vec![],
                property: Some(0),
            },
            StoreOp::DeleteProperty { property: 0 },
        ]);
        assert_eq!(harness.store().records()[0].property_id, None);
        harness.verify_emissions();
    }
}
