//! Test fixtures and store helpers.
//!
//! Provides stores with a controllable clock, in memory or on disk, that can
//! be closed, tampered with and reopened.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tenancy_core::{
    Config, CoreResult, ManualClock, Property, Record, RoomType, Stage, Store,
};
use tenancy_storage::{Backend, MemoryBackend};

/// Directory name of the store inside a fixture's temp dir.
pub const STORE_DIR_NAME: &str = "inspections";

/// The instant every fixture clock starts at.
#[must_use]
pub fn fixture_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid fixture start")
}

/// Where a fixture keeps its bytes.
#[derive(Debug)]
enum Backing {
    Memory {
        journal: MemoryBackend,
        image: MemoryBackend,
    },
    File {
        temp_dir: TempDir,
    },
}

impl Backing {
    fn open(&self, config: Config, clock: &Arc<ManualClock>) -> CoreResult<Store> {
        match self {
            Backing::Memory { journal, image } => Store::open_with_backends(
                config,
                clock.clone(),
                Box::new(journal.clone()),
                Box::new(image.clone()),
            ),
            Backing::File { temp_dir } => {
                Store::open_with_clock(temp_dir.path().join(STORE_DIR_NAME), config, clock.clone())
            }
        }
    }
}

/// A test store with a manual clock and automatic cleanup.
#[derive(Debug)]
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The clock the store stamps writes with.
    pub clock: Arc<ManualClock>,
    config: Config,
    backing: Backing,
}

impl TestStore {
    /// Creates a store over shared in-memory backends.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates an in-memory store with `config`.
    pub fn memory_with_config(config: Config) -> Self {
        let backing = Backing::Memory {
            journal: MemoryBackend::new(),
            image: MemoryBackend::new(),
        };
        Self::create(config, backing)
    }

    /// Creates a store in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a file-backed store with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::create(config, Backing::File { temp_dir })
    }

    fn create(config: Config, backing: Backing) -> Self {
        let clock = Arc::new(ManualClock::new(fixture_start()));
        let store = backing
            .open(config.clone(), &clock)
            .expect("Failed to open test store");
        Self {
            store,
            clock,
            config,
            backing,
        }
    }

    /// Store directory, if file-backed.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.backing {
            Backing::Memory { .. } => None,
            Backing::File { temp_dir } => Some(temp_dir.path().join(STORE_DIR_NAME)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }

    /// Drops the store, keeping its bytes and clock.
    pub fn close(self) -> ClosedStore {
        let Self {
            store,
            clock,
            config,
            backing,
        } = self;
        drop(store);
        ClosedStore {
            clock,
            config,
            backing,
        }
    }

    /// Closes and reopens the store, running recovery.
    pub fn reopen(self) -> Self {
        self.close().open().expect("Failed to reopen test store")
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// The bytes of a closed [`TestStore`], ready to be damaged and reopened.
#[derive(Debug)]
pub struct ClosedStore {
    clock: Arc<ManualClock>,
    config: Config,
    backing: Backing,
}

impl ClosedStore {
    /// Opens the store again, returning the recovery result.
    pub fn open(self) -> CoreResult<TestStore> {
        let store = self.backing.open(self.config.clone(), &self.clock)?;
        Ok(TestStore {
            store,
            clock: self.clock,
            config: self.config,
            backing: self.backing,
        })
    }

    /// Store directory, if file-backed.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.backing {
            Backing::Memory { .. } => None,
            Backing::File { temp_dir } => Some(temp_dir.path().join(STORE_DIR_NAME)),
        }
    }

    /// Current journal bytes.
    pub fn journal_bytes(&self) -> Vec<u8> {
        match &self.backing {
            Backing::Memory { journal, .. } => journal.bytes(),
            Backing::File { temp_dir } => {
                std::fs::read(journal_file(temp_dir.path())).expect("Failed to read journal")
            }
        }
    }

    /// Appends raw bytes to the journal, as an interrupted write would.
    pub fn append_to_journal(&mut self, bytes: &[u8]) {
        match &mut self.backing {
            Backing::Memory { journal, .. } => {
                journal.append(bytes).expect("Failed to append to journal");
            }
            Backing::File { temp_dir } => {
                let mut file = OpenOptions::new()
                    .append(true)
                    .open(journal_file(temp_dir.path()))
                    .expect("Failed to open journal");
                file.write_all(bytes).expect("Failed to append to journal");
            }
        }
    }

    /// Cuts the journal down to `len` bytes.
    pub fn truncate_journal(&mut self, len: u64) {
        match &mut self.backing {
            Backing::Memory { journal, .. } => {
                journal.truncate(len).expect("Failed to truncate journal");
            }
            Backing::File { temp_dir } => {
                let file = OpenOptions::new()
                    .write(true)
                    .open(journal_file(temp_dir.path()))
                    .expect("Failed to open journal");
                file.set_len(len).expect("Failed to truncate journal");
            }
        }
    }

    /// Flips every bit of the journal byte at `offset`.
    pub fn corrupt_journal(&mut self, offset: usize) {
        match &mut self.backing {
            Backing::Memory { journal, .. } => journal.corrupt_byte(offset),
            Backing::File { temp_dir } => {
                let path = journal_file(temp_dir.path());
                let mut bytes = std::fs::read(&path).expect("Failed to read journal");
                if let Some(byte) = bytes.get_mut(offset) {
                    *byte ^= 0xFF;
                }
                std::fs::write(&path, bytes).expect("Failed to write journal");
            }
        }
    }
}

fn journal_file(temp_dir: &Path) -> PathBuf {
    temp_dir.join(STORE_DIR_NAME).join("journal.log")
}

/// The published collections as JSON, for readable equality failures.
pub fn snapshot(store: &Store) -> serde_json::Value {
    serde_json::to_value(&*store.current()).expect("Collections serialize to JSON")
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use tenancy_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     let property = store.create_property("Sunrise Apt", "1 Main St").unwrap();
///     assert_eq!(store.properties(), vec![property]);
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store)
}

/// Runs a test with a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store, &path)
}

/// Canned data sets.
pub mod scenarios {
    use super::*;

    /// "Sunrise Apt" with one untitled move-in record (bedroom and kitchen).
    pub fn sunrise_apartment(store: &Store) -> (Property, Record) {
        let property = store
            .create_property("Sunrise Apt", "1 Main St")
            .expect("Failed to create property");
        let record = Record::new("", Stage::MoveIn, store.now())
            .with_rooms(&[(RoomType::Bedroom, 1), (RoomType::Kitchen, 1)])
            .for_property(property.id);
        let record = store
            .create_record(record)
            .expect("Failed to create record");
        (property, record)
    }

    /// `properties` properties with `records_each` records, one day apart.
    pub fn populated_store(properties: usize, records_each: usize) -> TestStore {
        let test_store = TestStore::memory();
        for p in 0..properties {
            let property = test_store
                .create_property(format!("Property {p}"), format!("{p} Harbour Road"))
                .expect("Failed to create property");
            for r in 0..records_each {
                let stage = match r % 3 {
                    0 => Stage::MoveIn,
                    1 => Stage::Living,
                    _ => Stage::MoveOut,
                };
                let record = Record::new(format!("Visit {r}"), stage, test_store.now())
                    .with_rooms(&[(RoomType::Bedroom, 2), (RoomType::Bathroom, 1)])
                    .for_property(property.id);
                test_store
                    .create_record(record)
                    .expect("Failed to create record");
                test_store.advance_days(1);
            }
        }
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let test_store = TestStore::memory();
        assert!(test_store.properties().is_empty());
        assert!(test_store.path().is_none());
        assert_eq!(test_store.now(), fixture_start());
    }

    #[test]
    fn memory_store_survives_reopen() {
        let test_store = TestStore::memory();
        scenarios::sunrise_apartment(&test_store);
        let before = snapshot(&test_store);

        let test_store = test_store.reopen();
        assert_eq!(snapshot(&test_store), before);
    }

    #[test]
    fn file_store_survives_reopen() {
        let test_store = TestStore::file();
        let (property, _) = scenarios::sunrise_apartment(&test_store);

        let test_store = test_store.reopen();
        assert_eq!(test_store.property(property.id).unwrap(), property);
        assert_eq!(test_store.records().len(), 1);
    }

    #[test]
    fn clock_drives_timestamps() {
        with_temp_store(|test_store| {
            test_store.advance_days(2);
            let property = test_store.create_property("A", "").unwrap();
            assert_eq!(property.created_at, fixture_start() + Duration::days(2));
        });
    }

    #[test]
    fn populated_store_has_expected_counts() {
        let test_store = scenarios::populated_store(2, 3);
        let stats = test_store.stats();
        assert_eq!(stats.properties, 2);
        assert_eq!(stats.records, 6);
        assert_eq!(stats.rooms, 18);
    }
}
