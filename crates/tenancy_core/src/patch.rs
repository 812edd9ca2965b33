//! Partial updates for records and rooms.
//!
//! Only the fields set on a patch change. Unset fields keep their stored
//! values.

use crate::model::{PropertyId, Stage};

/// What to do with a record's property link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentChange {
    /// Leave the link as it is.
    #[default]
    Keep,
    /// Link to this property.
    Set(PropertyId),
    /// Remove the link.
    Clear,
}

/// Partial update of a record.
///
/// ```rust
/// use tenancy_core::{RecordPatch, Stage};
///
/// let patch = RecordPatch::new().stage(Stage::MoveOut).reminder_interval(30);
/// assert_eq!(patch.title, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New title.
    pub title: Option<String>,
    /// New stage.
    pub stage: Option<Stage>,
    /// New reminder interval in days; 0 turns reminders off.
    pub reminder_interval_days: Option<u32>,
    /// Property link change.
    pub parent: ParentChange,
}

impl RecordPatch {
    /// An empty patch; applying it only bumps `updated_at`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the stage.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the reminder interval.
    #[must_use]
    pub fn reminder_interval(mut self, days: u32) -> Self {
        self.reminder_interval_days = Some(days);
        self
    }

    /// Links the record to `property`.
    #[must_use]
    pub fn link_to(mut self, property: PropertyId) -> Self {
        self.parent = ParentChange::Set(property);
        self
    }

    /// Removes the property link.
    #[must_use]
    pub fn unlink(mut self) -> Self {
        self.parent = ParentChange::Clear;
        self
    }
}

/// Partial update of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    /// New custom name; empty falls back to the room type's name.
    pub custom_name: Option<String>,
    /// New comment.
    pub comment: Option<String>,
}

impl RoomPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the custom name.
    #[must_use]
    pub fn custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
