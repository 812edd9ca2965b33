//! Records command implementation.

use crate::Format;
use serde::Serialize;
use std::path::Path;
use tenancy_core::{Record, RecordQuery};

#[derive(Serialize)]
struct RecordLine {
    id: String,
    title: String,
    stage: String,
    rooms: usize,
    photos: usize,
    property: Option<String>,
    created_at: String,
    next_reminder_at: Option<String>,
}

impl From<&Record> for RecordLine {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.display_title().into_owned(),
            stage: record.stage.to_string(),
            rooms: record.rooms.len(),
            photos: record.total_photos(),
            property: record.property_id.map(|id| id.to_string()),
            created_at: record.created_at.to_rfc3339(),
            next_reminder_at: record.next_reminder_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Runs the records command.
pub fn run(
    path: &Path,
    query: &RecordQuery,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let records = store.query_records(query);
    let lines: Vec<RecordLine> = records.iter().map(RecordLine::from).collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
        Format::Text => {
            for line in &lines {
                println!(
                    "{}  {:<8}  {}  ({} rooms, {} photos)",
                    &line.created_at[..10],
                    line.stage,
                    line.title,
                    line.rooms,
                    line.photos
                );
            }
            println!();
            println!("{} of {} records", lines.len(), store.stats().records);
        }
    }
    Ok(())
}
