//! End-to-end inspection scenarios.

use chrono::Duration;
use tenancy_core::{
    Config, CoreError, DateRange, Record, RecordPatch, RecordQuery, Room, RoomType, SortOrder,
    Stage, Store,
};
use tenancy_testkit::prelude::*;

#[test]
fn sunrise_apartment_lifecycle() {
    let test_store = TestStore::memory();
    let (property, record) = scenarios::sunrise_apartment(&test_store);

    assert_eq!(property.display_name(), "Sunrise Apt");
    assert_eq!(record.title, "");
    assert_eq!(record.display_title(), "Inspection 2024-03-01");
    assert_eq!(record.rooms.len(), 2);
    assert_eq!(record.rooms[0].display_name(), "Bedroom");
    assert_eq!(record.rooms[1].display_name(), "Kitchen");
    assert_eq!(record.next_reminder_at, None);

    let updated = test_store
        .update_record(record.id, RecordPatch::new().reminder_interval(30))
        .unwrap();
    assert_eq!(updated.reminder_interval_days, 30);
    assert_eq!(
        updated.next_reminder_at,
        Some(record.created_at + Duration::days(30))
    );

    test_store.delete_record(record.id).unwrap();
    assert_eq!(test_store.property(property.id).unwrap(), property);
    assert_eq!(test_store.property_graph(property.id).unwrap().record_count(), 0);
    assert!(test_store.records_for_property(property.id).unwrap().is_empty());
    assert_eq!(test_store.stats().rooms, 0);
}

#[test]
fn removing_photos_keeps_relative_order() {
    let test_store = TestStore::memory();
    let record = Record::new("Flat 2", Stage::Living, test_store.now())
        .with_rooms(&[(RoomType::Bathroom, 1)]);
    let record = test_store.create_record(record).unwrap();
    let room = record.rooms[0].id;
    for token in ["a.jpg", "b.jpg", "c.jpg"] {
        test_store.add_photo(room, token).unwrap();
    }

    let removed = test_store.remove_photo(room, 1).unwrap();
    assert_eq!(removed.as_deref(), Some("b.jpg"));
    assert_eq!(test_store.room(room).unwrap().photos, vec!["a.jpg", "c.jpg"]);

    let feed = test_store.watch();
    let sequence = test_store.current().sequence;
    assert_eq!(test_store.remove_photo(room, 5).unwrap(), None);
    let emitted: Vec<_> = feed.try_iter().collect();
    assert_eq!(emitted.len(), 1, "an out-of-range removal still emits once");
    assert_eq!(emitted[0].sequence, sequence);
    assert_eq!(test_store.room(room).unwrap().photos, vec!["a.jpg", "c.jpg"]);
    assert_eq!(test_store.record(record.id).unwrap().total_photos(), 2);
}

#[test]
fn sorting_never_reintroduces_filtered_records() {
    let test_store = TestStore::memory();
    let mut ids = Vec::new();
    for (title, gap_days) in [("first", 10), ("second", 1), ("third", 0)] {
        let record = Record::new(title, Stage::MoveIn, test_store.now());
        ids.push(test_store.create_record(record).unwrap().id);
        test_store.advance_days(gap_days);
    }
    let [t1, t2, t3] = [ids[0], ids[1], ids[2]];

    let ascending = test_store.query_records(&RecordQuery {
        order: SortOrder::Ascending,
        ..RecordQuery::default()
    });
    let ascending: Vec<_> = ascending.iter().map(|r| r.id).collect();
    assert_eq!(ascending, vec![t1, t2, t3]);

    let descending = test_store.query_records(&RecordQuery::default());
    let descending: Vec<_> = descending.iter().map(|r| r.id).collect();
    assert_eq!(descending, vec![t3, t2, t1]);

    for order in [SortOrder::Ascending, SortOrder::Descending] {
        let recent = test_store.query_records(&RecordQuery {
            range: DateRange::Last7Days,
            order,
            ..RecordQuery::default()
        });
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|r| r.id != t1));
    }
}

#[test]
fn query_combines_search_stage_and_property() {
    let test_store = scenarios::populated_store(2, 3);
    let first = test_store.properties()[0].id;

    let hits = test_store.query_records(&RecordQuery {
        search: "visit 1".into(),
        stage: Some(Stage::Living),
        property: Some(first),
        ..RecordQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].property_id, Some(first));
    assert_eq!(hits[0].stage, Stage::Living);
}

#[test]
fn deleting_a_property_unlinks_its_records() {
    let test_store = TestStore::memory();
    let (property, record) = scenarios::sunrise_apartment(&test_store);
    test_store.advance_days(1);

    test_store.delete_property(property.id).unwrap();

    assert!(matches!(
        test_store.property(property.id),
        Err(CoreError::PropertyNotFound(id)) if id == property.id
    ));
    let record = test_store.record(record.id).unwrap();
    assert_eq!(record.property_id, None);
    assert_eq!(record.updated_at, fixture_start() + Duration::days(1));
    assert_eq!(record.rooms.len(), 2);
}

#[test]
fn detached_copies_do_not_alias_the_store() {
    let test_store = TestStore::memory();
    let (property, record) = scenarios::sunrise_apartment(&test_store);

    let mut graph = test_store.property_graph(property.id).unwrap();
    graph.records[0].title = "edited locally".into();
    graph.records[0].rooms.clear();
    graph.property.name.clear();

    let stored = test_store.record(record.id).unwrap();
    assert_eq!(stored.title, "");
    assert_eq!(stored.rooms.len(), 2);
    assert_eq!(test_store.property(property.id).unwrap().name, "Sunrise Apt");
}

#[test]
fn rooms_are_owned_by_one_record() {
    let test_store = TestStore::memory();
    let (_, record) = scenarios::sunrise_apartment(&test_store);
    let other = test_store
        .create_record(Record::new("other", Stage::MoveOut, test_store.now()))
        .unwrap();

    let room = record.rooms[0].id;
    assert!(matches!(
        test_store.delete_room(room, other.id),
        Err(CoreError::RoomNotFound(id)) if id == room
    ));

    let added = test_store
        .add_room(other.id, Room::new(RoomType::Loggia, test_store.now()))
        .unwrap();
    assert!(test_store.add_room(record.id, added.clone()).is_err());
    assert_eq!(test_store.record(other.id).unwrap().rooms, vec![added]);
}

#[test]
fn clear_all_empties_everything_in_one_emission() {
    let test_store = scenarios::populated_store(2, 2);
    let feed = test_store.watch();

    test_store.clear_all().unwrap();

    let emitted: Vec<_> = feed.try_iter().collect();
    assert_eq!(emitted.len(), 1);
    assert!(emitted[0].properties.is_empty());
    assert!(emitted[0].records.is_empty());
    assert_eq!(test_store.stats().rooms, 0);
}

#[test]
fn clear_all_on_an_empty_store_still_emits_once() {
    let test_store = TestStore::memory();
    let feed = test_store.watch();
    let journal_bytes = test_store.stats().journal_bytes;

    test_store.clear_all().unwrap();

    let emitted: Vec<_> = feed.try_iter().collect();
    assert_eq!(emitted.len(), 1);
    assert!(emitted[0].properties.is_empty());
    assert_eq!(emitted[0].sequence, test_store.current().sequence);
    assert_eq!(test_store.stats().journal_bytes, journal_bytes);
    assert_eq!(test_store.stats().commits, 0);
}

#[test]
fn failed_operations_change_nothing() {
    let test_store = TestStore::memory();
    scenarios::sunrise_apartment(&test_store);
    let before = snapshot(&test_store);
    let feed = test_store.watch();

    let orphan = Record::new("", Stage::MoveIn, test_store.now())
        .for_property(tenancy_core::PropertyId::new());
    assert!(test_store.create_record(orphan).unwrap_err().is_not_found());
    assert!(test_store
        .update_record(tenancy_core::RecordId::new(), RecordPatch::new())
        .unwrap_err()
        .is_not_found());
    let record = test_store.records()[0].id;
    assert!(matches!(
        test_store.update_record(record, RecordPatch::new().reminder_interval(u32::MAX)),
        Err(CoreError::InvalidData { .. })
    ));

    assert_eq!(snapshot(&test_store), before);
    assert!(feed.try_recv().is_err());
    assert_eq!(test_store.stats().failures, 3);
}

#[test]
fn unavailable_store_refuses_writes_and_publishes_empty() {
    let path = tempfile::tempdir().unwrap();
    let missing = path.path().join("never-created");
    let store = Store::open_or_unavailable(&missing, Config::default().create_if_missing(false));

    assert!(!store.is_available());
    assert!(store.current().records.is_empty());
    assert!(matches!(
        store.create_property("A", "B"),
        Err(CoreError::Unavailable { .. })
    ));
    assert!(store.properties().is_empty());
}
