//! # Tenancy Core
//!
//! Local persistence and query layer for rental-property inspections.
//!
//! This crate provides:
//! - The entity model: properties, records (inspections) and rooms
//! - A journaled single-writer [`Store`] with checkpointing and recovery
//! - Owned, detached copies for every read
//! - Search, date-range and sort views over the published collections
//! - An observer feed that republishes the collections after every commit
//!
//! ## Relationships
//!
//! Records own their rooms: deleting a record deletes its rooms in the same
//! transaction. Records are linked to a property by id only: deleting a
//! property unlinks its records and keeps them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
pub mod collab;
mod config;
mod detach;
mod dir;
mod error;
mod image;
pub mod journal;
mod manifest;
pub mod migration;
pub mod model;
pub mod observe;
mod patch;
pub mod query;
mod stats;
mod store;
mod tables;
mod transaction;
mod types;
pub mod validation;
mod verify;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use detach::PropertyGraph;
pub use error::{CoreError, CoreResult};
pub use manifest::Manifest;
pub use migration::CURRENT_SCHEMA_VERSION;
pub use model::{
    Property, PropertyId, Record, RecordId, Room, RoomId, RoomType, Stage, UNTITLED_PROPERTY,
};
pub use observe::{CollectionFeed, Collections, Subscription};
pub use patch::{ParentChange, RecordPatch, RoomPatch};
pub use query::{DateRange, PropertyQuery, RecordQuery, SortOrder};
pub use stats::StoreStats;
pub use store::Store;
pub use tables::{RowKey, TableKind};
pub use types::{SequenceNumber, TransactionId};
pub use verify::{verify, VerifyReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn store_is_send_and_sync() {
        assert_send_sync::<Store>();
        assert_send_sync::<CollectionFeed>();
    }
}
