//! Inspect command implementation.

use crate::Format;
use serde::Serialize;
use std::path::Path;
use tenancy_core::StoreStats;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Schema version from the manifest.
    pub schema_version: Option<u32>,
    /// Counts and journal size.
    #[serde(flatten)]
    pub stats: StoreStats,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let result = InspectResult {
        path: path.display().to_string(),
        schema_version: store.schema_version(),
        stats: store.stats(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text(&result),
    }
    Ok(())
}

fn print_text(result: &InspectResult) {
    println!("Store: {}", result.path);
    if let Some(version) = result.schema_version {
        println!("Schema version: {version}");
    }
    println!();
    println!("Properties: {}", result.stats.properties);
    println!("Records:    {}", result.stats.records);
    println!("Rooms:      {}", result.stats.rooms);
    println!("Photos:     {}", result.stats.photos);
    println!();
    println!("Committed sequence: {}", result.stats.sequence);
    println!("Journal size:       {} bytes", result.stats.journal_bytes);
}
