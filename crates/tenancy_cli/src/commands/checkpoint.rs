//! Checkpoint command implementation.

use std::path::Path;
use tracing::info;

/// Runs the checkpoint command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let before = store.stats().journal_bytes;
    store.checkpoint()?;
    info!(journal_bytes = before, "checkpoint written");
    println!(
        "Checkpoint written at {} ({} journal bytes folded)",
        store.stats().sequence,
        before
    );
    Ok(())
}
