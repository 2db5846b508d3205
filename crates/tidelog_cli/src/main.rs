//! Tidelog CLI
//!
//! Command-line tools for tidelog files.
//!
//! # Commands
//!
//! - `append` - Append records to a log
//! - `dump` - Print the records of a log
//! - `verify` - Check a log for corruption

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tidelog command-line log tools.
#[derive(Parser)]
#[command(name = "tidelog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the log file
    #[arg(global = true, short, long)]
    file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append each argument as one record
    Append {
        /// Continue an existing log instead of replacing it
        #[arg(short, long)]
        resume: bool,

        /// Sync the file before exiting
        #[arg(short, long)]
        sync: bool,

        /// Records to append
        #[arg(required = true)]
        records: Vec<String>,
    },

    /// Print the records of a log
    Dump {
        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check a log for corruption
    Verify {
        /// Do not check record checksums
        #[arg(long)]
        skip_checksums: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Append {
            resume,
            sync,
            records,
        } => {
            let path = cli.file.ok_or("Log file required for append")?;
            commands::append::run(&path, &records, resume, sync)?;
        }
        Commands::Dump { limit, format } => {
            let path = cli.file.ok_or("Log file required for dump")?;
            commands::dump::run(&path, limit, &format)?;
        }
        Commands::Verify { skip_checksums } => {
            let path = cli.file.ok_or("Log file required for verify")?;
            commands::verify::run(&path, !skip_checksums)?;
        }
        Commands::Version => {
            println!("Tidelog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tidelog Core v{}", tidelog_core::VERSION);
        }
    }

    Ok(())
}
