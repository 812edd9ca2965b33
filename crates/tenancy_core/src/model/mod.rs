//! Entity model: properties, records and rooms.
//!
//! Every type here is a plain owned value. Nothing aliases store state.

mod id;
mod property;
mod record;
mod room;

pub use id::{PropertyId, RecordId, RoomId};
pub use property::{Property, UNTITLED_PROPERTY};
pub use record::{Record, Stage};
pub use room::{Room, RoomType};
