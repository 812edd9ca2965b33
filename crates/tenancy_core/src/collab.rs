//! Boundaries to collaborators the store does not implement.
//!
//! Image files, local notifications and PDF rendering live outside this
//! crate. The traits here describe what the store hands them and what it
//! expects back.

use crate::model::{Record, RecordId, Room};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an image store.
#[derive(Debug, Error)]
pub enum ImageError {
    /// No image is stored under the token.
    #[error("image not found: {0}")]
    NotFound(String),

    /// The stored bytes could not be decoded.
    #[error("image could not be decoded: {0}")]
    Decode(String),

    /// Underlying I/O failure.
    #[error("image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores photo bytes and hands out file-name tokens.
///
/// Rooms persist only the tokens.
pub trait ImageStore: Send + Sync {
    /// Saves `bytes` and returns a stable token.
    fn save(&self, bytes: &[u8]) -> Result<String, ImageError>;

    /// Returns the bytes for `token`.
    fn load(&self, token: &str) -> Result<Vec<u8>, ImageError>;

    /// Deletes the file behind `token`.
    fn delete(&self, token: &str) -> Result<(), ImageError>;
}

/// Process-local image store, mostly for tests and tooling.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.lock().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.lock().is_empty()
    }
}

impl ImageStore for MemoryImageStore {
    fn save(&self, bytes: &[u8]) -> Result<String, ImageError> {
        let token = format!("{}.jpg", Uuid::new_v4());
        self.images.lock().insert(token.clone(), bytes.to_vec());
        Ok(token)
    }

    fn load(&self, token: &str) -> Result<Vec<u8>, ImageError> {
        let bytes = self
            .images
            .lock()
            .get(token)
            .cloned()
            .ok_or_else(|| ImageError::NotFound(token.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::Decode(format!("{token} is empty")));
        }
        Ok(bytes)
    }

    fn delete(&self, token: &str) -> Result<(), ImageError> {
        self.images
            .lock()
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| ImageError::NotFound(token.to_string()))
    }
}

/// Notification key for a record's reminder.
#[must_use]
pub fn reminder_identifier(record_id: RecordId) -> String {
    format!("record-reminder-{}", record_id.as_uuid())
}

/// A repeating reminder to (re)install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// Deterministic key derived from the record id.
    pub identifier: String,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Repeat interval in days.
    pub interval_days: u32,
    /// First delivery.
    pub first_fire_at: DateTime<Utc>,
}

impl ReminderRequest {
    /// Builds the request for `record`; `None` when reminders are off.
    #[must_use]
    pub fn for_record(record: &Record) -> Option<Self> {
        if record.reminder_interval_days == 0 {
            return None;
        }
        let first_fire_at = record.next_reminder_at?;
        Some(Self {
            identifier: reminder_identifier(record.id),
            title: format!("Inspection reminder: {}", record.display_title()),
            body: format!(
                "It has been {} days. Time to check the {} inspection.",
                record.reminder_interval_days, record.stage
            ),
            interval_days: record.reminder_interval_days,
            first_fire_at,
        })
    }
}

/// Installs and cancels local notifications.
pub trait ReminderScheduler: Send + Sync {
    /// Installs or replaces the reminder keyed by `request.identifier`.
    fn schedule(&self, request: ReminderRequest);

    /// Cancels the reminder with `identifier`, if any.
    fn cancel(&self, identifier: &str);
}

/// Schedules or cancels the reminder so it matches `record`.
pub fn sync_reminder(scheduler: &dyn ReminderScheduler, record: &Record) {
    match ReminderRequest::for_record(record) {
        Some(request) => scheduler.schedule(request),
        None => scheduler.cancel(&reminder_identifier(record.id)),
    }
}

/// A room with its photo bytes resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedRoom {
    /// The room.
    pub room: Room,
    /// Decoded photos, in room order, minus any that failed.
    pub photos: Vec<Vec<u8>>,
}

/// A record with every photo resolved, ready for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedRecord {
    /// The record; its rooms still carry tokens.
    pub record: Record,
    /// Rooms in record order.
    pub rooms: Vec<MaterializedRoom>,
}

impl MaterializedRecord {
    /// Loads photo bytes for every room.
    ///
    /// Photos that cannot be loaded are logged and left out.
    #[must_use]
    pub fn resolve(record: Record, images: &dyn ImageStore) -> Self {
        let rooms = record
            .rooms
            .iter()
            .map(|room| {
                let photos = room
                    .photos
                    .iter()
                    .filter_map(|token| match images.load(token) {
                        Ok(bytes) => Some(bytes),
                        Err(err) => {
                            tracing::warn!(room = %room.id, token = %token, error = %err, "skipping photo");
                            None
                        }
                    })
                    .collect();
                MaterializedRoom {
                    room: room.clone(),
                    photos,
                }
            })
            .collect();
        Self { record, rooms }
    }

    /// Number of photos that resolved.
    #[must_use]
    pub fn resolved_photos(&self) -> usize {
        self.rooms.iter().map(|r| r.photos.len()).sum()
    }
}

/// Renders a materialized record to a document.
pub trait PdfExporter {
    /// Writes the document and returns where it was saved.
    fn export(&self, record: &MaterializedRecord) -> std::io::Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoomType, Stage};
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: Mutex<Vec<ReminderRequest>>,
        cancelled: Mutex<Vec<String>>,
    }

    impl ReminderScheduler for RecordingScheduler {
        fn schedule(&self, request: ReminderRequest) {
            self.scheduled.lock().push(request);
        }
        fn cancel(&self, identifier: &str) {
            self.cancelled.lock().push(identifier.to_string());
        }
    }

    #[test]
    fn identifier_is_deterministic() {
        let id = RecordId::new();
        assert_eq!(reminder_identifier(id), reminder_identifier(id));
        assert!(reminder_identifier(id).starts_with("record-reminder-"));
    }

    #[test]
    fn request_requires_interval() {
        let record = Record::new("Flat 3", Stage::Living, Utc::now());
        assert!(ReminderRequest::for_record(&record).is_none());

        let record = record.with_reminder(14);
        let request = ReminderRequest::for_record(&record).unwrap();
        assert_eq!(request.interval_days, 14);
        assert_eq!(Some(request.first_fire_at), record.next_reminder_at);
        assert!(request.title.contains("Flat 3"));
    }

    #[test]
    fn sync_reminder_schedules_or_cancels() {
        let scheduler = RecordingScheduler::default();
        let record = Record::new("", Stage::Living, Utc::now()).with_reminder(7);
        sync_reminder(&scheduler, &record);
        sync_reminder(&scheduler, &record.clone().with_reminder(0));
        assert_eq!(scheduler.scheduled.lock().len(), 1);
        assert_eq!(*scheduler.cancelled.lock(), vec![reminder_identifier(record.id)]);
    }

    #[test]
    fn resolve_skips_broken_photos() {
        let images = Arc::new(MemoryImageStore::new());
        let good = images.save(b"jpeg-bytes").unwrap();
        let empty = images.save(b"").unwrap();

        let mut record =
            Record::new("", Stage::MoveIn, Utc::now()).with_rooms(&[(RoomType::Kitchen, 1)]);
        record.rooms[0].photos = vec![good, "missing.jpg".into(), empty];

        let materialized = MaterializedRecord::resolve(record, images.as_ref());
        assert_eq!(materialized.resolved_photos(), 1);
        assert_eq!(materialized.rooms[0].photos[0], b"jpeg-bytes");
    }

    #[test]
    fn memory_image_store_delete() {
        let images = MemoryImageStore::new();
        let token = images.save(b"x").unwrap();
        assert_eq!(images.len(), 1);
        images.delete(&token).unwrap();
        assert!(images.is_empty());
        assert!(matches!(images.delete(&token), Err(ImageError::NotFound(_))));
    }
}
