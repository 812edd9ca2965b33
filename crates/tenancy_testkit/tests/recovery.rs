//! Crash and corruption recovery through the public store API.

use tenancy_core::{verify, Config, CoreError, Stage, Store};
use tenancy_testkit::prelude::*;

fn two_commits(test_store: &TestStore) -> (u64, u64) {
    test_store.create_property("First", "").unwrap();
    let after_first = test_store.stats().journal_bytes;
    test_store.create_property("Second", "").unwrap();
    let after_second = test_store.stats().journal_bytes;
    (after_first, after_second)
}

#[test]
fn interrupted_write_loses_only_the_last_transaction() {
    for test_store in [TestStore::memory(), TestStore::file()] {
        let (after_first, after_second) = two_commits(&test_store);
        assert!(after_second > after_first);

        let mut closed = test_store.close();
        closed.truncate_journal(after_first + (after_second - after_first) / 2);
        let test_store = closed.open().unwrap();

        let names: Vec<_> = test_store.properties().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["First"]);
        assert_eq!(test_store.stats().journal_bytes, after_first);

        test_store.create_property("Third", "").unwrap();
        let test_store = test_store.reopen();
        assert_eq!(test_store.properties().len(), 2);
    }
}

#[test]
fn torn_tail_garbage_is_discarded() {
    let test_store = TestStore::memory();
    let (_, after_second) = two_commits(&test_store);

    let mut closed = test_store.close();
    closed.append_to_journal(b"TJNL\x01");
    let test_store = closed.open().unwrap();

    assert_eq!(test_store.properties().len(), 2);
    assert_eq!(test_store.stats().journal_bytes, after_second);
}

#[test]
fn bad_magic_is_fatal() {
    let test_store = TestStore::memory();
    two_commits(&test_store);

    let mut closed = test_store.close();
    closed.corrupt_journal(0);
    assert!(matches!(
        closed.open(),
        Err(CoreError::JournalCorruption { .. })
    ));
}

#[test]
fn flipped_payload_byte_is_a_checksum_mismatch() {
    let test_store = TestStore::memory();
    let (after_first, _) = two_commits(&test_store);

    let mut closed = test_store.close();
    closed.corrupt_journal(after_first as usize + 12);
    assert!(matches!(
        closed.open(),
        Err(CoreError::ChecksumMismatch { .. })
    ));
}

#[test]
fn checkpoint_then_journal_replay() {
    let test_store = TestStore::file();
    let (property, record) = scenarios::sunrise_apartment(&test_store);
    test_store.checkpoint().unwrap();
    assert_eq!(test_store.stats().journal_bytes, 0);

    test_store.add_photo(record.rooms[0].id, "door.jpg").unwrap();
    let before = snapshot(&test_store);

    let test_store = test_store.reopen();
    assert_eq!(snapshot(&test_store), before);
    assert_eq!(test_store.property_graph(property.id).unwrap().total_photos(), 1);
}

#[test]
fn automatic_checkpoint_keeps_the_journal_small() {
    let test_store = TestStore::memory_with_config(Config::default().checkpoint_threshold(512));
    for n in 0..20 {
        let record = tenancy_core::Record::new(format!("Visit {n}"), Stage::Living, test_store.now())
            .with_rooms(&[(tenancy_core::RoomType::Storage, 2)]);
        test_store.create_record(record).unwrap();
    }
    let stats = test_store.stats();
    assert!(stats.checkpoints > 0);
    assert!(stats.journal_bytes < 2048);

    let test_store = test_store.reopen();
    assert_eq!(test_store.records().len(), 20);
    assert_eq!(test_store.stats().rooms, 40);
}

#[test]
fn verify_reports_without_repairing() {
    let test_store = TestStore::file();
    two_commits(&test_store);
    let mut closed = test_store.close();
    closed.append_to_journal(b"TJNL");
    let path = closed.path().unwrap();
    let journal_len = closed.journal_bytes().len() as u64;

    let report = verify(&path).unwrap();
    assert!(report.is_ok(), "{:?}", report.problems);
    assert_eq!(report.committed, 2);
    assert_eq!(report.torn_tail, 4);
    assert_eq!(closed.journal_bytes().len() as u64, journal_len);

    closed.corrupt_journal(0);
    let report = verify(&path).unwrap();
    assert!(!report.is_ok());
}

#[test]
fn second_open_of_a_directory_is_refused() {
    with_file_store(|_, path| {
        assert!(matches!(Store::open(path), Err(CoreError::StoreLocked)));
        let fallback = Store::open_or_unavailable(path, Config::default());
        assert!(!fallback.is_available());
    });
}
