//! Inspection records.

use crate::error::{CoreError, CoreResult};
use crate::model::{PropertyId, RecordId, Room, RoomType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Point in the tenancy an inspection documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Handover at the start of a tenancy.
    MoveIn,
    /// Periodic check during the tenancy.
    Living,
    /// Handover at the end of a tenancy.
    MoveOut,
}

impl Stage {
    /// Short kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::MoveIn => "move-in",
            Stage::Living => "living",
            Stage::MoveOut => "move-out",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "move-in" | "movein" | "move_in" => Ok(Stage::MoveIn),
            "living" => Ok(Stage::Living),
            "move-out" | "moveout" | "move_out" => Ok(Stage::MoveOut),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

/// One inspection report with its rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier.
    pub id: RecordId,
    /// User title, may be empty.
    pub title: String,
    /// Inspection stage.
    pub stage: Stage,
    /// Owned rooms, in display order.
    pub rooms: Vec<Room>,
    /// Reminder interval in days; 0 disables reminders.
    pub reminder_interval_days: u32,
    /// Next reminder instant; set exactly when the interval is non-zero.
    pub next_reminder_at: Option<DateTime<Utc>>,
    /// Property this record belongs to, if any.
    pub property_id: Option<PropertyId>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record without rooms.
    #[must_use]
    pub fn new(title: impl Into<String>, stage: Stage, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            title: title.into(),
            stage,
            rooms: Vec::new(),
            reminder_interval_days: 0,
            next_reminder_at: None,
            property_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Generates rooms from onboarding choices.
    ///
    /// A type chosen more than once gets numbered names ("Bedroom 1",
    /// "Bedroom 2"); a type chosen once keeps an empty custom name.
    #[must_use]
    pub fn with_rooms(mut self, plan: &[(RoomType, usize)]) -> Self {
        for &(room_type, count) in plan {
            for n in 1..=count {
                let room = Room::new(room_type, self.created_at);
                let room = if count > 1 {
                    room.named(format!("{} {n}", room_type.canonical_name()))
                } else {
                    room
                };
                self.rooms.push(room);
            }
        }
        self
    }

    /// Links the record to a property.
    #[must_use]
    pub fn for_property(mut self, property_id: PropertyId) -> Self {
        self.property_id = Some(property_id);
        self
    }

    /// Sets the reminder interval and recomputes the next reminder.
    ///
    /// An interval that runs past the representable date range leaves
    /// `next_reminder_at` unset; the store rejects such a record.
    #[must_use]
    pub fn with_reminder(mut self, days: u32) -> Self {
        self.reminder_interval_days = days;
        self.next_reminder_at = self.reminder_due().ok().flatten();
        self
    }

    /// Title, else `"Inspection <creation date>"`.
    #[must_use]
    pub fn display_title(&self) -> Cow<'_, str> {
        if self.title.is_empty() {
            Cow::Owned(format!("Inspection {}", self.created_at.format("%Y-%m-%d")))
        } else {
            Cow::Borrowed(&self.title)
        }
    }

    /// Sum of photos over all rooms.
    #[must_use]
    pub fn total_photos(&self) -> usize {
        self.rooms.iter().map(Room::photo_count).sum()
    }

    fn reminder_due(&self) -> CoreResult<Option<DateTime<Utc>>> {
        let days = self.reminder_interval_days;
        if days == 0 {
            return Ok(None);
        }
        self.updated_at
            .checked_add_signed(Duration::days(i64::from(days)))
            .map(Some)
            .ok_or_else(|| {
                CoreError::invalid_data(format!(
                    "reminder interval of {days} days is out of range"
                ))
            })
    }

    /// Recomputes `next_reminder_at` from `updated_at` and the interval.
    ///
    /// # Errors
    ///
    /// `InvalidData` if the reminder would fall outside the representable
    /// date range. The record is left unchanged.
    pub fn sync_reminder(&mut self) -> CoreResult<()> {
        self.next_reminder_at = self.reminder_due()?;
        Ok(())
    }

    /// Bumps `updated_at` and keeps the reminder consistent with it.
    ///
    /// # Errors
    ///
    /// Same as [`Record::sync_reminder`]. On error the record is unchanged.
    pub fn touch(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let previous = self.updated_at;
        self.updated_at = now;
        self.sync_reminder().inspect_err(|_| self.updated_at = previous)
    }

    /// Whether the reminder fields agree with each other.
    #[must_use]
    pub fn reminder_is_consistent(&self) -> bool {
        match (self.next_reminder_at, self.reminder_due()) {
            (None, Ok(None)) => true,
            (Some(at), Ok(Some(due))) => at == due,
            _ => false,
        }
    }
}
