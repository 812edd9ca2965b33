//! The store: single writer, journaled commits, published collections.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::detach::{self, PropertyGraph};
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::image::Image;
use crate::journal::Journal;
use crate::manifest::Manifest;
use crate::migration::MigrationManager;
use crate::model::{Property, PropertyId, Record, RecordId, Room, RoomId};
use crate::observe::{CollectionFeed, Collections, Subscription};
use crate::patch::{ParentChange, RecordPatch, RoomPatch};
use crate::query::{PropertyQuery, RecordQuery};
use crate::stats::{Counters, StoreStats};
use crate::tables::{PropertyRow, RecordRow, Row, RowKey, Tables};
use crate::transaction::{PendingWrite, WriteTxn};
use crate::types::{SequenceNumber, TransactionId};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tenancy_storage::{Backend, FileBackend, MemoryBackend};
use tracing::{debug, error, info, warn};

/// State only the writer touches.
struct Writer {
    next_txid: u64,
    sequence: SequenceNumber,
    image: Box<dyn Backend>,
    manifest: Option<Manifest>,
}

impl Writer {
    fn next_txid(&mut self) -> TransactionId {
        let id = TransactionId::new(self.next_txid);
        self.next_txid += 1;
        id
    }
}

struct Engine {
    config: Config,
    schema_version: Option<u32>,
    clock: Arc<dyn Clock>,
    dir: Option<StoreDir>,
    journal: Journal,
    writer: Mutex<Writer>,
    tables: RwLock<Tables>,
    feed: CollectionFeed,
    counters: Counters,
}

enum State {
    Ready(Box<Engine>),
    Unavailable {
        reason: String,
        feed: CollectionFeed,
    },
}

/// Handle to an inspection store.
///
/// Every mutating operation runs as one transaction: it is journaled,
/// applied, and the full collections are published to observers before the
/// call returns. Mutations are serialized; reads never block on each other.
///
/// `Store` is `Send + Sync`; share it with an `Arc`.
///
/// ```rust
/// use tenancy_core::{Record, RoomType, Stage, Store};
/// use chrono::Utc;
///
/// let store = Store::open_in_memory()?;
/// let property = store.create_property("Sunrise Apt", "1 Main St")?;
/// let record = Record::new("", Stage::MoveIn, Utc::now())
///     .with_rooms(&[(RoomType::Bedroom, 1), (RoomType::Kitchen, 1)])
///     .for_property(property.id);
/// let record = store.create_record(record)?;
///
/// assert_eq!(store.property_graph(property.id)?.record_count(), 1);
/// store.delete_record(record.id)?;
/// assert_eq!(store.property_graph(property.id)?.record_count(), 0);
/// # Ok::<(), tenancy_core::CoreError>(())
/// ```
pub struct Store {
    state: State,
}

impl Store {
    /// Opens (or creates) a store directory with default settings.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store directory with `config`.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        Self::open_with_clock(path, config, Arc::new(SystemClock))
    }

    /// Opens a store directory with an explicit time source.
    ///
    /// # Errors
    ///
    /// - `StoreLocked` if another process has the directory open
    /// - `InvalidFormat` for an unreadable manifest or a newer schema
    /// - `JournalCorruption` / `ChecksumMismatch` if recovery finds damage
    pub fn open_with_clock(
        path: impl AsRef<Path>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let dir = StoreDir::open(path.as_ref(), config.create_if_missing)?;

        let manifest = match dir.load_manifest()? {
            Some(mut manifest) => {
                let run = MigrationManager::builtin()
                    .run(manifest.schema_version, config.schema_version)?;
                if !run.applied.is_empty() {
                    info!(
                        from = manifest.schema_version,
                        to = run.final_version,
                        "migrated store schema"
                    );
                    manifest.schema_version = run.final_version;
                    dir.save_manifest(&manifest)?;
                }
                manifest
            }
            None => {
                let manifest = Manifest::new(config.schema_version);
                dir.save_manifest(&manifest)?;
                manifest
            }
        };

        let journal = FileBackend::open(&dir.journal_path())?;
        let image = FileBackend::open(&dir.image_path())?;
        let engine = Engine::recover(
            config,
            clock,
            Some(dir),
            Some(manifest),
            Box::new(journal),
            Box::new(image),
        )?;
        Ok(Self::ready(engine))
    }

    /// Opens an empty, non-persistent store.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_in_memory_with_clock(Arc::new(SystemClock))
    }

    /// Opens an empty, non-persistent store with an explicit time source.
    pub fn open_in_memory_with_clock(clock: Arc<dyn Clock>) -> CoreResult<Self> {
        Self::open_with_backends(
            Config::default(),
            clock,
            Box::new(MemoryBackend::new()),
            Box::new(MemoryBackend::new()),
        )
    }

    /// Opens a store over caller-provided journal and image backends.
    ///
    /// No directory, lock or manifest is involved.
    pub fn open_with_backends(
        config: Config,
        clock: Arc<dyn Clock>,
        journal: Box<dyn Backend>,
        image: Box<dyn Backend>,
    ) -> CoreResult<Self> {
        let engine = Engine::recover(config, clock, None, None, journal, image)?;
        Ok(Self::ready(engine))
    }

    /// Opens a store, or returns a permanently unavailable one on failure.
    ///
    /// The failure is logged once. Mutations on an unavailable store return
    /// [`CoreError::Unavailable`] and its published collections stay empty.
    pub fn open_or_unavailable(path: impl AsRef<Path>, config: Config) -> Self {
        let path = path.as_ref();
        match Self::open_with_config(path, config) {
            Ok(store) => store,
            Err(err) => {
                error!(path = %path.display(), error = %err, "store initialization failed");
                Self::unavailable(CoreError::Initialization {
                    reason: err.to_string(),
                }
                .to_string())
            }
        }
    }

    /// A store that refuses every mutation with `reason`.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: State::Unavailable {
                reason: reason.into(),
                feed: CollectionFeed::default(),
            },
        }
    }

    fn ready(engine: Engine) -> Self {
        Self {
            state: State::Ready(Box::new(engine)),
        }
    }

    fn engine(&self) -> CoreResult<&Engine> {
        match &self.state {
            State::Ready(engine) => Ok(engine),
            State::Unavailable { reason, .. } => Err(CoreError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }

    fn feed(&self) -> &CollectionFeed {
        match &self.state {
            State::Ready(engine) => &engine.feed,
            State::Unavailable { feed, .. } => feed,
        }
    }

    /// Whether the store opened successfully.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Store directory, for file-backed stores.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.engine()
            .ok()
            .and_then(|e| e.dir.as_ref())
            .map(|d| d.path().to_path_buf())
    }

    /// Schema version recorded in the manifest, for file-backed stores.
    #[must_use]
    pub fn schema_version(&self) -> Option<u32> {
        self.engine().ok()?.schema_version
    }

    /// The current instant according to the store's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match &self.state {
            State::Ready(engine) => engine.clock.now(),
            State::Unavailable { .. } => Utc::now(),
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates a property stamped with the current time.
    pub fn create_property(
        &self,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> CoreResult<Property> {
        let (name, address) = (name.into(), address.into());
        self.write("create_property", |txn| {
            let property = Property::new(name, address, txn.now());
            let ordinal = txn.reserve_ordinals(1);
            txn.put(Row::Property(PropertyRow {
                ordinal,
                property: property.clone(),
            }));
            debug!(property = %property.id, "created property");
            Ok(property)
        })
    }

    /// Inserts a record together with its rooms.
    ///
    /// The reminder is recomputed from `updated_at` and the interval, so
    /// the stored record always satisfies the reminder invariant.
    ///
    /// # Errors
    ///
    /// - `PropertyNotFound` if the record links to a missing property
    /// - `InvalidData` if the record or one of its rooms reuses an id, or
    ///   the reminder interval runs past the representable date range
    pub fn create_record(&self, mut record: Record) -> CoreResult<Record> {
        self.write("create_record", |txn| {
            record.sync_reminder()?;
            if txn.exists(RowKey::Record(record.id)) {
                return Err(CoreError::invalid_data(format!(
                    "record {} already exists",
                    record.id
                )));
            }
            if let Some(property) = record.property_id {
                if txn.property(property).is_none() {
                    return Err(CoreError::PropertyNotFound(property));
                }
            }
            let mut seen = HashSet::new();
            for room in &record.rooms {
                if !seen.insert(room.id) || txn.exists(RowKey::Room(room.id)) {
                    return Err(CoreError::invalid_data(format!(
                        "room {} already exists",
                        room.id
                    )));
                }
            }

            let ordinal = txn.reserve_ordinals(1 + record.rooms.len() as u64);
            let (row, rooms) = RecordRow::split(&record, ordinal);
            txn.put(Row::Record(row));
            for room in rooms {
                txn.put(Row::Room(room));
            }
            debug!(record = %record.id, rooms = record.rooms.len(), "created record");
            Ok(record)
        })
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the record is gone
    /// - `PropertyNotFound` if the patch links to a missing property
    /// - `InvalidData` if the reminder interval runs past the representable
    ///   date range
    pub fn update_record(&self, id: RecordId, patch: RecordPatch) -> CoreResult<Record> {
        self.write("update_record", |txn| {
            let mut row = txn.record(id).ok_or(CoreError::RecordNotFound(id))?;
            if let Some(title) = patch.title {
                row.title = title;
            }
            if let Some(stage) = patch.stage {
                row.stage = stage;
            }
            if let Some(days) = patch.reminder_interval_days {
                row.reminder_interval_days = days;
            }
            match patch.parent {
                ParentChange::Keep => {}
                ParentChange::Set(property) => {
                    if txn.property(property).is_none() {
                        return Err(CoreError::PropertyNotFound(property));
                    }
                    row.property_id = Some(property);
                }
                ParentChange::Clear => row.property_id = None,
            }
            row.touch(txn.now())?;
            txn.put(Row::Record(row.clone()));
            debug!(record = %id, "updated record");
            Ok(detach::assemble(&row, |room| txn.room(room).map(|r| r.room)))
        })
    }

    /// Deletes a record and every room it owns.
    pub fn delete_record(&self, id: RecordId) -> CoreResult<()> {
        self.write("delete_record", |txn| {
            let row = txn.record(id).ok_or(CoreError::RecordNotFound(id))?;
            for room in &row.room_ids {
                txn.delete(RowKey::Room(*room));
            }
            txn.delete(RowKey::Record(id));
            debug!(record = %id, rooms = row.room_ids.len(), "deleted record");
            Ok(())
        })
    }

    /// Appends a room to a record.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the record is gone
    /// - `InvalidData` if the room id is already used
    pub fn add_room(&self, record_id: RecordId, room: Room) -> CoreResult<Room> {
        self.write("add_room", |txn| {
            let mut record = txn
                .record(record_id)
                .ok_or(CoreError::RecordNotFound(record_id))?;
            if txn.exists(RowKey::Room(room.id)) {
                return Err(CoreError::invalid_data(format!(
                    "room {} already exists",
                    room.id
                )));
            }
            let ordinal = txn.reserve_ordinals(1);
            txn.put(Row::Room(crate::tables::RoomRow {
                ordinal,
                record_id,
                room: room.clone(),
            }));
            record.room_ids.push(room.id);
            record.touch(txn.now())?;
            txn.put(Row::Record(record));
            debug!(record = %record_id, room = %room.id, "added room");
            Ok(room)
        })
    }

    /// Changes a room's name and/or comment.
    pub fn update_room(&self, room_id: RoomId, patch: RoomPatch) -> CoreResult<Room> {
        self.write("update_room", |txn| {
            let mut row = txn.room(room_id).ok_or(CoreError::RoomNotFound(room_id))?;
            if let Some(name) = patch.custom_name {
                row.room.custom_name = name;
            }
            if let Some(comment) = patch.comment {
                row.room.comment = comment;
            }
            let room = row.room.clone();
            txn.put(Row::Room(row));
            debug!(room = %room_id, "updated room");
            Ok(room)
        })
    }

    /// Removes a room from its record, then deletes it.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the record is gone
    /// - `RoomNotFound` if the room is gone or belongs to another record
    pub fn delete_room(&self, room_id: RoomId, record_id: RecordId) -> CoreResult<()> {
        self.write("delete_room", |txn| {
            let mut record = txn
                .record(record_id)
                .ok_or(CoreError::RecordNotFound(record_id))?;
            match txn.room(room_id) {
                Some(room) if room.record_id == record_id => {}
                _ => return Err(CoreError::RoomNotFound(room_id)),
            }
            record.room_ids.retain(|id| *id != room_id);
            record.touch(txn.now())?;
            txn.put(Row::Record(record));
            txn.delete(RowKey::Room(room_id));
            debug!(record = %record_id, room = %room_id, "deleted room");
            Ok(())
        })
    }

    /// Appends a photo token to a room.
    pub fn add_photo(&self, room_id: RoomId, token: impl Into<String>) -> CoreResult<()> {
        let token = token.into();
        self.write("add_photo", |txn| {
            let mut row = txn.room(room_id).ok_or(CoreError::RoomNotFound(room_id))?;
            row.room.photos.push(token);
            debug!(room = %room_id, photos = row.room.photos.len(), "added photo");
            txn.put(Row::Room(row));
            Ok(())
        })
    }

    /// Removes the photo at `index` and returns its token.
    ///
    /// An out-of-range index changes nothing and returns `Ok(None)`. The
    /// unchanged collections are still emitted once.
    pub fn remove_photo(&self, room_id: RoomId, index: usize) -> CoreResult<Option<String>> {
        self.write("remove_photo", |txn| {
            let mut row = txn.room(room_id).ok_or(CoreError::RoomNotFound(room_id))?;
            if index >= row.room.photos.len() {
                debug!(room = %room_id, index, "photo index out of range");
                return Ok(None);
            }
            let token = row.room.photos.remove(index);
            txn.put(Row::Room(row));
            debug!(room = %room_id, index, "removed photo");
            Ok(Some(token))
        })
    }

    /// Deletes a property and unlinks its records in the same transaction.
    ///
    /// Records are kept; their `property_id` becomes `None`.
    pub fn delete_property(&self, id: PropertyId) -> CoreResult<()> {
        self.write("delete_property", |txn| {
            if txn.property(id).is_none() {
                return Err(CoreError::PropertyNotFound(id));
            }
            let linked = txn.records_linked_to(id);
            let unlinked = linked.len();
            for mut record in linked {
                record.property_id = None;
                record.touch(txn.now())?;
                txn.put(Row::Record(record));
            }
            txn.delete(RowKey::Property(id));
            debug!(property = %id, unlinked, "deleted property");
            Ok(())
        })
    }

    /// Clears a record's property link without deleting anything.
    pub fn unlink_record(&self, record_id: RecordId) -> CoreResult<()> {
        self.write("unlink_record", |txn| {
            let mut record = txn
                .record(record_id)
                .ok_or(CoreError::RecordNotFound(record_id))?;
            record.property_id = None;
            record.touch(txn.now())?;
            txn.put(Row::Record(record));
            debug!(record = %record_id, "unlinked record");
            Ok(())
        })
    }

    /// Deletes every property, record and room.
    ///
    /// On an empty store nothing is committed and the unchanged (empty)
    /// collections are emitted once.
    pub fn clear_all(&self) -> CoreResult<()> {
        self.write("clear_all", |txn| {
            let keys = txn.committed_keys();
            let count = keys.len();
            for key in keys {
                txn.delete(key);
            }
            debug!(rows = count, "cleared store");
            Ok(())
        })
    }

    fn write<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut WriteTxn<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let engine = match self.engine() {
            Ok(engine) => engine,
            Err(err) => {
                warn!(op, error = %err, "store unavailable");
                return Err(err);
            }
        };
        let result = engine.write(op, f);
        if let Err(err) = &result {
            engine.counters.record_failure();
            if err.is_not_found() {
                warn!(op, error = %err, "target not found");
            } else {
                error!(op, error = %err, "operation failed");
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns a property.
    pub fn property(&self, id: PropertyId) -> CoreResult<Property> {
        let tables = self.engine()?.tables.read();
        tables
            .property(id)
            .map(|row| row.property.clone())
            .ok_or(CoreError::PropertyNotFound(id))
    }

    /// Returns a record with its rooms.
    pub fn record(&self, id: RecordId) -> CoreResult<Record> {
        let tables = self.engine()?.tables.read();
        tables
            .record(id)
            .map(|row| detach::record(&tables, row))
            .ok_or(CoreError::RecordNotFound(id))
    }

    /// Returns a room.
    pub fn room(&self, id: RoomId) -> CoreResult<Room> {
        let tables = self.engine()?.tables.read();
        detach::room(&tables, id).ok_or(CoreError::RoomNotFound(id))
    }

    /// All properties in insertion order; empty when unavailable.
    #[must_use]
    pub fn properties(&self) -> Vec<Property> {
        self.current().properties.clone()
    }

    /// All records in insertion order; empty when unavailable.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.current().records.clone()
    }

    /// Records linked to a property, in insertion order.
    pub fn records_for_property(&self, id: PropertyId) -> CoreResult<Vec<Record>> {
        Ok(self.property_graph(id)?.records)
    }

    /// A property together with its linked records.
    pub fn property_graph(&self, id: PropertyId) -> CoreResult<PropertyGraph> {
        let tables = self.engine()?.tables.read();
        let property = tables
            .property(id)
            .map(|row| row.property.clone())
            .ok_or(CoreError::PropertyNotFound(id))?;
        Ok(detach::property_graph(&tables, &property))
    }

    /// Runs a record query against the published collections.
    #[must_use]
    pub fn query_records(&self, query: &RecordQuery) -> Vec<Record> {
        query.apply(&self.current().records, self.now())
    }

    /// Runs a property query against the published collections.
    #[must_use]
    pub fn query_properties(&self, query: &PropertyQuery) -> Vec<Property> {
        query.apply(&self.current().properties, self.now())
    }

    /// Counts and journal size.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let Ok(engine) = self.engine() else {
            return StoreStats::default();
        };
        let sequence = engine.feed.current().sequence;
        let tables = engine.tables.read();
        let (properties, records, rooms) = tables.counts();
        StoreStats {
            properties,
            records,
            rooms,
            photos: tables.photo_count(),
            sequence,
            journal_bytes: engine.journal.size().unwrap_or(0),
            ..StoreStats::default()
        }
        .with_counters(&engine.counters)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// The last published collections.
    #[must_use]
    pub fn current(&self) -> Arc<Collections> {
        self.feed().current()
    }

    /// Calls `callback` after every commit, on the committing thread.
    ///
    /// The callback must not call mutating operations on this store.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<Collections>) + Send + Sync + 'static,
    {
        self.feed().subscribe(callback)
    }

    /// Channel receiving the collections after every commit.
    pub fn watch(&self) -> Receiver<Arc<Collections>> {
        self.feed().watch()
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Writes a checkpoint image and empties the journal.
    pub fn checkpoint(&self) -> CoreResult<()> {
        let engine = self.engine()?;
        let mut writer = engine.writer.lock();
        engine.checkpoint(&mut writer)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Ready(engine) => f
                .debug_struct("Store")
                .field("path", &engine.dir.as_ref().map(StoreDir::path))
                .field("sequence", &engine.feed.current().sequence)
                .finish_non_exhaustive(),
            State::Unavailable { reason, .. } => f
                .debug_struct("Store")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

impl Engine {
    fn recover(
        config: Config,
        clock: Arc<dyn Clock>,
        dir: Option<StoreDir>,
        manifest: Option<Manifest>,
        journal: Box<dyn Backend>,
        image: Box<dyn Backend>,
    ) -> CoreResult<Self> {
        let (base, rows) = match Image::load(image.as_ref())? {
            Some(image) => (image.sequence, image.rows),
            None => (SequenceNumber::default(), Vec::new()),
        };
        let mut tables = Tables::from_rows(rows);

        let journal = Journal::new(journal, config.sync_on_commit);
        let replay = journal.replay()?;
        let size = journal.size()?;
        if replay.committed_len < size {
            warn!(
                bytes = size - replay.committed_len,
                torn = replay.torn_tail,
                incomplete = replay.incomplete,
                "discarding unfinished journal tail"
            );
            journal.truncate(replay.committed_len)?;
        }

        let mut sequence = base;
        let mut applied = 0usize;
        for txn in replay.committed {
            if txn.sequence <= base {
                continue;
            }
            for (key, bytes) in txn.writes {
                let row = bytes.map(|b| Row::decode(key, &b)).transpose()?;
                tables.apply(key, row);
            }
            sequence = sequence.max(txn.sequence);
            applied += 1;
        }
        info!(
            image = %base,
            replayed = applied,
            incomplete = replay.incomplete,
            sequence = %sequence,
            "recovered store"
        );

        let feed = CollectionFeed::new(collections(&tables, sequence));
        Ok(Self {
            config,
            schema_version: manifest.as_ref().map(|m| m.schema_version),
            clock,
            dir,
            journal,
            writer: Mutex::new(Writer {
                next_txid: replay.max_txid + 1,
                sequence,
                image,
                manifest,
            }),
            tables: RwLock::new(tables),
            feed,
            counters: Counters::default(),
        })
    }

    fn write<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut WriteTxn<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut writer = self.writer.lock();

        let (value, txid, writes) = {
            let tables = self.tables.read();
            let mut txn = WriteTxn::new(writer.next_txid(), &tables, self.clock.now());
            let value = f(&mut txn)?;
            (value, txn.id(), txn.into_writes())
        };
        if writes.is_empty() {
            debug!(op, "nothing to commit");
            self.feed.republish();
            return Ok(value);
        }

        let mut encoded = Vec::with_capacity(writes.len());
        for (key, write) in &writes {
            let bytes = match write {
                PendingWrite::Put(row) => Some(row.encode()?),
                PendingWrite::Delete => None,
            };
            encoded.push((*key, bytes));
        }

        let sequence = writer.sequence.next();
        self.journal
            .append_transaction(txid, &encoded, sequence)
            .map_err(|e| CoreError::operation_failed(format!("{op}: {e}")))?;
        writer.sequence = sequence;

        {
            let mut tables = self.tables.write();
            for (key, write) in writes {
                tables.apply(
                    key,
                    match write {
                        PendingWrite::Put(row) => Some(row),
                        PendingWrite::Delete => None,
                    },
                );
            }
        }
        self.counters.record_commit();
        debug!(op, %txid, %sequence, writes = encoded.len(), "committed");

        let published = collections(&self.tables.read(), sequence);
        self.feed.publish(published);

        self.maybe_checkpoint(&mut writer);
        Ok(value)
    }

    fn maybe_checkpoint(&self, writer: &mut Writer) {
        let threshold = self.config.checkpoint_threshold;
        if threshold == 0 {
            return;
        }
        match self.journal.size() {
            Ok(size) if size >= threshold => {
                if let Err(err) = self.checkpoint(writer) {
                    warn!(error = %err, "automatic checkpoint failed");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "could not read journal size"),
        }
    }

    fn checkpoint(&self, writer: &mut Writer) -> CoreResult<()> {
        let image = Image {
            sequence: writer.sequence,
            rows: self.tables.read().rows(),
        };
        image.store(writer.image.as_mut())?;
        self.journal.reset()?;

        if let (Some(dir), Some(manifest)) = (&self.dir, writer.manifest.as_mut()) {
            manifest.last_checkpoint = Some(writer.sequence);
            dir.save_manifest(manifest)?;
        }
        self.counters.record_checkpoint();
        info!(sequence = %writer.sequence, rows = image.rows.len(), "checkpoint complete");
        Ok(())
    }
}

fn collections(tables: &Tables, sequence: SequenceNumber) -> Collections {
    Collections {
        sequence,
        properties: detach::properties(tables),
        records: detach::records(tables),
    }
}
