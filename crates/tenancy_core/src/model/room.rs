//! Rooms and their photo references.

use crate::model::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// Bedroom.
    Bedroom,
    /// Kitchen.
    Kitchen,
    /// Bathroom.
    Bathroom,
    /// Balcony.
    Balcony,
    /// Loggia.
    Loggia,
    /// Wardrobe.
    Wardrobe,
    /// Storage room.
    Storage,
    /// Anything else.
    Other,
}

impl RoomType {
    /// Every room type, in wizard order.
    pub const ALL: [RoomType; 8] = [
        RoomType::Bedroom,
        RoomType::Kitchen,
        RoomType::Bathroom,
        RoomType::Balcony,
        RoomType::Loggia,
        RoomType::Wardrobe,
        RoomType::Storage,
        RoomType::Other,
    ];

    /// Canonical display name, used when a room has no custom name.
    #[must_use]
    pub const fn canonical_name(self) -> &'static str {
        match self {
            RoomType::Bedroom => "Bedroom",
            RoomType::Kitchen => "Kitchen",
            RoomType::Bathroom => "Bathroom",
            RoomType::Balcony => "Balcony",
            RoomType::Loggia => "Loggia",
            RoomType::Wardrobe => "Wardrobe",
            RoomType::Storage => "Storage",
            RoomType::Other => "Other",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A room inside a record, with an ordered list of photo tokens.
///
/// Photos are file-name tokens handed out by an
/// [`ImageStore`](crate::collab::ImageStore), never raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Stable identifier.
    pub id: RoomId,
    /// Kind of room.
    pub room_type: RoomType,
    /// Custom display name, may be empty.
    pub custom_name: String,
    /// Free-text comment.
    pub comment: String,
    /// Ordered photo tokens.
    pub photos: Vec<String>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Creates an empty room of the given type.
    #[must_use]
    pub fn new(room_type: RoomType, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RoomId::new(),
            room_type,
            custom_name: String::new(),
            comment: String::new(),
            photos: Vec::new(),
            created_at,
        }
    }

    /// Sets the custom name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.custom_name = name.into();
        self
    }

    /// Custom name, else the type's canonical name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.custom_name.is_empty() {
            self.room_type.canonical_name()
        } else {
            &self.custom_name
        }
    }

    /// Number of photos attached.
    #[must_use]
    pub fn photo_count(&self) -> usize {
        self.photos.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_type() {
        let room = Room::new(RoomType::Loggia, Utc::now());
        assert_eq!(room.display_name(), "Loggia");
        assert_eq!(room.named("Sunroom").display_name(), "Sunroom");
    }

    #[test]
    fn room_type_serializes_snake_case() {
        let json = serde_json::to_string(&RoomType::Wardrobe).unwrap();
        assert_eq!(json, "\"wardrobe\"");
    }
}
