//! Verify command implementation.

use super::{CliError, CliResult};
use std::path::Path;
use tidelog_core::{verify_log, LogSummary, ReaderOptions};
use tidelog_storage::{default_env, Env};

/// Runs the verify command.
pub fn run(path: &Path, verify_checksums: bool) -> CliResult<()> {
    println!("Verifying log at {:?}", path);
    println!();

    let summary = check(path, verify_checksums)?;
    print_summary(&summary);

    println!();
    if summary.is_clean() {
        println!("✓ Log verification passed");
        Ok(())
    } else {
        println!("✗ Log verification failed");
        Err(CliError::Corrupted {
            corruptions: summary.corruptions,
            dropped_bytes: summary.dropped_bytes,
        })
    }
}

fn check(path: &Path, verify_checksums: bool) -> CliResult<LogSummary> {
    let env = default_env();
    if !env.file_exists(path) {
        return Err(CliError::MissingFile(path.to_path_buf()));
    }
    let file = env.new_sequential_file(path)?;
    let options = ReaderOptions::new().verify_checksums(verify_checksums);
    Ok(verify_log(file, options)?)
}

fn print_summary(summary: &LogSummary) {
    println!("  Records:       {}", summary.records);
    println!("  Payload bytes: {}", summary.payload_bytes);
    if let Some(offset) = summary.last_record_offset {
        println!("  Last record:   offset {}", offset);
    }
    println!("  Corruptions:   {}", summary.corruptions);
    println!("  Dropped bytes: {}", summary.dropped_bytes);
}
