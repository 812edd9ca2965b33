//! Property-based test generators using proptest.
//!
//! Entity strategies produce values that are valid to insert. Operation
//! strategies refer to existing entities by position, so any generated
//! sequence can be replayed against any store state.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use tenancy_core::{Record, RoomType, Stage};

/// Strategy for room types.
pub fn room_type_strategy() -> impl Strategy<Value = RoomType> {
    prop::sample::select(RoomType::ALL.to_vec())
}

/// Strategy for inspection stages.
pub fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![Just(Stage::MoveIn), Just(Stage::Living), Just(Stage::MoveOut)]
}

/// Strategy for reminder intervals, including the disabled value 0.
pub fn reminder_interval_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        1 => Just(0u32),
        1 => Just(7u32),
        1 => Just(30u32),
        2 => 1u32..=365,
    ]
}

/// Strategy for titles; empty titles exercise the display fallback.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        3 => prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,24}").expect("Invalid regex"),
    ]
}

/// Strategy for photo tokens as handed out by an image store.
pub fn photo_token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{8}\\.jpg").expect("Invalid regex")
}

/// Strategy for onboarding room plans: room type with a count.
pub fn room_plan_strategy() -> impl Strategy<Value = Vec<(RoomType, usize)>> {
    prop::collection::vec((room_type_strategy(), 1usize..=3), 0..4)
}

/// Strategy for a record created at `created_at`, without a property link.
pub fn record_strategy(created_at: DateTime<Utc>) -> impl Strategy<Value = Record> {
    (
        title_strategy(),
        stage_strategy(),
        room_plan_strategy(),
        reminder_interval_strategy(),
    )
        .prop_map(move |(title, stage, plan, interval)| {
            Record::new(title, stage, created_at)
                .with_rooms(&plan)
                .with_reminder(interval)
        })
}

/// Strategy for creation offsets, in hours, relative to some base instant.
pub fn creation_offsets_strategy(len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..(24 * 400), len)
}

/// Converts hour offsets into timestamps.
#[must_use]
pub fn timestamps_from(base: DateTime<Utc>, offsets: &[i64]) -> Vec<DateTime<Utc>> {
    offsets.iter().map(|h| base + Duration::hours(*h)).collect()
}

/// Which parent a generated record update asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPick {
    /// Leave the link alone.
    Keep,
    /// Link to the property at this position.
    Set(usize),
    /// Remove the link.
    Clear,
}

/// A store mutation addressed by position.
///
/// Positions are taken modulo the current number of candidates; an
/// operation with no candidates is skipped by the harness.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Create a property.
    CreateProperty {
        /// Property name.
        name: String,
    },
    /// Create a record with generated rooms.
    CreateRecord {
        /// Stage.
        stage: Stage,
        /// Reminder interval.
        interval: u32,
        /// Rooms to generate.
        plan: Vec<(RoomType, usize)>,
        /// Property position to link to.
        property: Option<usize>,
    },
    /// Patch a record.
    UpdateRecord {
        /// Record position.
        record: usize,
        /// New stage.
        stage: Option<Stage>,
        /// New reminder interval.
        interval: Option<u32>,
        /// Parent change.
        parent: ParentPick,
    },
    /// Delete a record with its rooms.
    DeleteRecord {
        /// Record position.
        record: usize,
    },
    /// Add a room to a record.
    AddRoom {
        /// Record position.
        record: usize,
        /// Room type.
        room_type: RoomType,
    },
    /// Delete one of a record's rooms.
    DeleteRoom {
        /// Record position.
        record: usize,
        /// Room position inside the record.
        room: usize,
    },
    /// Append a photo to a room.
    AddPhoto {
        /// Room position across all records.
        room: usize,
        /// Token.
        token: String,
    },
    /// Remove a photo, possibly out of range.
    RemovePhoto {
        /// Room position across all records.
        room: usize,
        /// Photo index; may exceed the photo count.
        index: usize,
    },
    /// Delete a property.
    DeleteProperty {
        /// Property position.
        property: usize,
    },
    /// Unlink a record from its property.
    UnlinkRecord {
        /// Record position.
        record: usize,
    },
    /// Move the clock forward.
    AdvanceClock {
        /// Hours to advance.
        hours: u16,
    },
}

fn parent_pick_strategy() -> impl Strategy<Value = ParentPick> {
    prop_oneof![
        2 => Just(ParentPick::Keep),
        1 => any::<usize>().prop_map(ParentPick::Set),
        1 => Just(ParentPick::Clear),
    ]
}

/// Strategy for a single store operation.
pub fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        2 => prop::string::string_regex("[A-Z][a-z]{2,10}")
            .expect("Invalid regex")
            .prop_map(|name| StoreOp::CreateProperty { name }),
        3 => (
            stage_strategy(),
            reminder_interval_strategy(),
            room_plan_strategy(),
            prop::option::of(any::<usize>()),
        )
            .prop_map(|(stage, interval, plan, property)| StoreOp::CreateRecord {
                stage,
                interval,
                plan,
                property,
            }),
        2 => (
            any::<usize>(),
            prop::option::of(stage_strategy()),
            prop::option::of(reminder_interval_strategy()),
            parent_pick_strategy(),
        )
            .prop_map(|(record, stage, interval, parent)| StoreOp::UpdateRecord {
                record,
                stage,
                interval,
                parent,
            }),
        1 => any::<usize>().prop_map(|record| StoreOp::DeleteRecord { record }),
        2 => (any::<usize>(), room_type_strategy())
            .prop_map(|(record, room_type)| StoreOp::AddRoom { record, room_type }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(record, room)| StoreOp::DeleteRoom { record, room }),
        4 => (any::<usize>(), photo_token_strategy())
            .prop_map(|(room, token)| StoreOp::AddPhoto { room, token }),
        2 => (any::<usize>(), 0usize..6)
            .prop_map(|(room, index)| StoreOp::RemovePhoto { room, index }),
        1 => any::<usize>().prop_map(|property| StoreOp::DeleteProperty { property }),
        1 => any::<usize>().prop_map(|record| StoreOp::UnlinkRecord { record }),
        1 => (1u16..=72).prop_map(|hours| StoreOp::AdvanceClock { hours }),
    ]
}

/// Strategy for a sequence of operations.
pub fn store_op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(store_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture_start;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_records_keep_reminder_invariant(record in record_strategy(fixture_start())) {
            prop_assert!(record.reminder_is_consistent());
            prop_assert_eq!(record.updated_at, record.created_at);
        }

        #[test]
        fn generated_records_start_without_photos(record in record_strategy(fixture_start())) {
            prop_assert_eq!(record.total_photos(), 0);
        }

        #[test]
        fn tokens_look_like_file_names(token in photo_token_strategy()) {
            prop_assert!(token.ends_with(".jpg"));
            prop_assert_eq!(token.len(), 12);
        }

        #[test]
        fn operation_sequences_respect_bounds(ops in store_op_sequence_strategy(1, 20)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.len() < 20);
        }
    }

    #[test]
    fn timestamps_follow_offsets() {
        let times = timestamps_from(fixture_start(), &[0, 24]);
        assert_eq!(times[1] - times[0], Duration::days(1));
    }
}
