//! Verify command implementation.

use std::path::Path;
use tenancy_core::VerifyReport;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {}", path.display());
    println!();

    let report = tenancy_core::verify(path)?;
    print_report(&report);

    println!();
    if report.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

fn print_report(report: &VerifyReport) {
    match &report.manifest {
        Some(manifest) => println!(
            "Manifest: format v{}, schema v{}",
            manifest.format_version, manifest.schema_version
        ),
        None => println!("Manifest: missing"),
    }
    match report.image_sequence {
        Some(seq) => println!("Checkpoint image: {seq}, {} rows", report.image_rows),
        None => println!("Checkpoint image: none"),
    }
    println!(
        "Journal: {} bytes, {} frames, {} committed, {} incomplete",
        report.journal_bytes, report.frames, report.committed, report.incomplete
    );
    if report.torn_tail > 0 {
        println!("  Torn tail: {} bytes (dropped on next open)", report.torn_tail);
    }
    println!("Last sequence: {}", report.last_sequence);

    if !report.problems.is_empty() {
        println!();
        println!("Problems:");
        for problem in &report.problems {
            println!("  - {problem}");
        }
    }
}
