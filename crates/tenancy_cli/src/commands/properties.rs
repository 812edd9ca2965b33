//! Properties command implementation.

use crate::Format;
use serde::Serialize;
use std::path::Path;
use tenancy_core::PropertyQuery;

#[derive(Serialize)]
struct PropertyLine {
    id: String,
    name: String,
    address: String,
    records: usize,
    created_at: String,
}

/// Runs the properties command.
pub fn run(
    path: &Path,
    query: &PropertyQuery,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let mut lines = Vec::new();
    for property in store.query_properties(query) {
        let records = store.records_for_property(property.id)?.len();
        lines.push(PropertyLine {
            id: property.id.to_string(),
            name: property.display_name().to_string(),
            address: property.address.clone(),
            records,
            created_at: property.created_at.to_rfc3339(),
        });
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
        Format::Text => {
            for line in &lines {
                println!(
                    "{}  {}  {}  ({} records)",
                    &line.created_at[..10],
                    line.name,
                    line.address,
                    line.records
                );
            }
            println!();
            println!("{} of {} properties", lines.len(), store.stats().properties);
        }
    }
    Ok(())
}
