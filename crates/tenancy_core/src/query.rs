//! Read-only views over published collections.
//!
//! Nothing here touches the store. Views are recomputed on demand from a
//! [`Collections`](crate::observe::Collections) value and the parameters
//! passed in.
//!
//! Composition order is fixed: date filter, then text search, then the
//! record-only stage/property filters, then sort. Sorting last means a
//! filter can only ever shrink the sorted output.

use crate::model::{Property, PropertyId, Record, Stage};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

/// Creation-date presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateRange {
    /// No filtering.
    #[default]
    All,
    /// Since midnight UTC today.
    Today,
    /// The last 7 days.
    Last7Days,
    /// The last 30 days.
    Last30Days,
    /// The last 365 days.
    Last365Days,
}

impl DateRange {
    /// Earliest included instant, or `None` for [`DateRange::All`].
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            Self::Last7Days => Some(now - Duration::days(7)),
            Self::Last30Days => Some(now - Duration::days(30)),
            Self::Last365Days => Some(now - Duration::days(365)),
        }
    }

    /// Whether `created_at` falls in `[start, now]`.
    #[must_use]
    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.start(now) {
            None => true,
            Some(start) => start <= created_at && created_at <= now,
        }
    }

    /// Keeps items whose timestamp is in range, preserving order.
    pub fn filter<T, F>(self, items: Vec<T>, now: DateTime<Utc>, created_at: F) -> Vec<T>
    where
        F: Fn(&T) -> DateTime<Utc>,
    {
        if self == Self::All {
            return items;
        }
        items
            .into_iter()
            .filter(|item| self.contains(created_at(item), now))
            .collect()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last365Days => "365d",
        })
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "7d" | "week" => Ok(Self::Last7Days),
            "30d" | "month" => Ok(Self::Last30Days),
            "365d" | "year" => Ok(Self::Last365Days),
            other => Err(format!("unknown date range: {other}")),
        }
    }
}

/// Direction of the creation-date sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// Stable sort by `created_at`; ties keep their input order in both
    /// directions.
    pub fn sort<T, F>(self, items: &mut [T], created_at: F)
    where
        F: Fn(&T) -> DateTime<Utc>,
    {
        match self {
            Self::Ascending => items.sort_by(|a, b| created_at(a).cmp(&created_at(b))),
            Self::Descending => items.sort_by(|a, b| created_at(b).cmp(&created_at(a))),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

fn normalized(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Case-insensitive substring search over display titles.
///
/// A blank query returns the input unchanged.
#[must_use]
pub fn search_records(records: Vec<Record>, query: &str) -> Vec<Record> {
    let Some(needle) = normalized(query) else {
        return records;
    };
    records
        .into_iter()
        .filter(|r| r.display_title().to_lowercase().contains(&needle))
        .collect()
}

/// Case-insensitive substring search over display name and address.
///
/// A blank query returns the input unchanged.
#[must_use]
pub fn search_properties(properties: Vec<Property>, query: &str) -> Vec<Property> {
    let Some(needle) = normalized(query) else {
        return properties;
    };
    properties
        .into_iter()
        .filter(|p| {
            p.display_name().to_lowercase().contains(&needle)
                || p.address.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Parameters for a property list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyQuery {
    /// Free-text search.
    pub search: String,
    /// Creation-date preset.
    pub range: DateRange,
    /// Sort direction.
    pub order: SortOrder,
}

impl PropertyQuery {
    /// Applies the query to `properties` as of `now`.
    #[must_use]
    pub fn apply(&self, properties: &[Property], now: DateTime<Utc>) -> Vec<Property> {
        let filtered = self.range.filter(properties.to_vec(), now, |p| p.created_at);
        let mut found = search_properties(filtered, &self.search);
        self.order.sort(&mut found, |p| p.created_at);
        found
    }
}

/// Parameters for a record list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Free-text search.
    pub search: String,
    /// Creation-date preset.
    pub range: DateRange,
    /// Sort direction.
    pub order: SortOrder,
    /// Only this stage, if set.
    pub stage: Option<Stage>,
    /// Only records linked to this property, if set.
    pub property: Option<PropertyId>,
}

impl RecordQuery {
    /// Applies the query to `records` as of `now`.
    #[must_use]
    pub fn apply(&self, records: &[Record], now: DateTime<Utc>) -> Vec<Record> {
        let filtered = self.range.filter(records.to_vec(), now, |r| r.created_at);
        let mut found: Vec<Record> = search_records(filtered, &self.search)
            .into_iter()
            .filter(|r| self.stage.map_or(true, |stage| r.stage == stage))
            .filter(|r| self.property.map_or(true, |id| r.property_id == Some(id)))
            .collect();
        self.order.sort(&mut found, |r| r.created_at);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).unwrap()
    }

    fn record(title: &str, days_ago: i64) -> Record {
        Record::new(title, Stage::Living, now() - Duration::days(days_ago))
    }

    fn titles(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.display_title().into_owned()).collect()
    }

    #[test]
    fn blank_search_is_identity() {
        let input = vec![record("b", 1), record("a", 2)];
        assert_eq!(search_records(input.clone(), ""), input);
        assert_eq!(search_records(input.clone(), "   "), input);
    }

    #[test]
    fn search_is_case_insensitive_and_uses_display_title() {
        let input = vec![record("Kitchen Leak", 1), record("", 400), record("Garden", 2)];
        assert_eq!(titles(&search_records(input.clone(), "LEAK")), ["Kitchen Leak"]);
        let fallback = search_records(input, "inspection 2023");
        assert_eq!(fallback.len(), 1);
    }

    #[test]
    fn property_search_matches_address() {
        let properties = vec![
            Property::new("Sunrise Apt", "1 Main St", now()),
            Property::new("", "9 Elm Road", now()),
        ];
        assert_eq!(search_properties(properties.clone(), "main").len(), 1);
        assert_eq!(search_properties(properties, "elm")[0].address, "9 Elm Road");
    }

    #[test]
    fn today_starts_at_midnight() {
        let start = DateRange::Today.start(now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        assert!(DateRange::Today.contains(start, now()));
        assert!(!DateRange::Today.contains(start - Duration::seconds(1), now()));
    }

    #[test]
    fn bounds_are_inclusive_and_future_is_excluded() {
        let start = now() - Duration::days(7);
        assert!(DateRange::Last7Days.contains(start, now()));
        assert!(DateRange::Last7Days.contains(now(), now()));
        assert!(!DateRange::Last7Days.contains(now() + Duration::seconds(1), now()));
        assert!(DateRange::All.contains(now() + Duration::days(1), now()));
    }

    #[test]
    fn sort_both_directions() {
        let records = vec![record("t2", 2), record("t1", 3), record("t3", 1)];
        let asc = RecordQuery {
            order: SortOrder::Ascending,
            ..RecordQuery::default()
        };
        let desc = RecordQuery::default();
        assert_eq!(titles(&asc.apply(&records, now())), ["t1", "t2", "t3"]);
        assert_eq!(titles(&desc.apply(&records, now())), ["t3", "t2", "t1"]);
    }

    #[test]
    fn filter_then_sort_never_reintroduces() {
        let records = vec![record("t1", 40), record("t2", 20), record("t3", 1)];
        let query = RecordQuery {
            range: DateRange::Last30Days,
            order: SortOrder::Ascending,
            ..RecordQuery::default()
        };
        assert_eq!(titles(&query.apply(&records, now())), ["t2", "t3"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let at = now() - Duration::days(1);
        let records = vec![
            Record::new("first", Stage::MoveIn, at),
            Record::new("second", Stage::MoveIn, at),
        ];
        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let query = RecordQuery {
                order,
                ..RecordQuery::default()
            };
            assert_eq!(titles(&query.apply(&records, now())), ["first", "second"]);
        }
    }

    #[test]
    fn stage_and_property_filters() {
        let property = Property::new("P", "", now());
        let linked = record("linked", 1).for_property(property.id);
        let mut moved_out = record("out", 2);
        moved_out.stage = Stage::MoveOut;
        let records = vec![linked, moved_out];

        let by_stage = RecordQuery {
            stage: Some(Stage::MoveOut),
            ..RecordQuery::default()
        };
        assert_eq!(titles(&by_stage.apply(&records, now())), ["out"]);

        let by_property = RecordQuery {
            property: Some(property.id),
            ..RecordQuery::default()
        };
        assert_eq!(titles(&by_property.apply(&records, now())), ["linked"]);
    }

    #[test]
    fn property_query_composes() {
        let properties = vec![
            Property::new("Old Mill", "", now() - Duration::days(100)),
            Property::new("Mill Loft", "", now() - Duration::days(3)),
            Property::new("Harbor", "", now() - Duration::days(1)),
        ];
        let query = PropertyQuery {
            search: "mill".into(),
            range: DateRange::Last30Days,
            order: SortOrder::Ascending,
        };
        let names: Vec<_> = query
            .apply(&properties, now())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Mill Loft"]);
    }

    #[test]
    fn presets_parse() {
        assert_eq!("7d".parse::<DateRange>().unwrap(), DateRange::Last7Days);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert!("fortnight".parse::<DateRange>().is_err());
    }
}
