//! CLI command implementations.

pub mod append;
pub mod dump;
pub mod verify;

use std::path::PathBuf;
use thiserror::Error;
use tidelog_storage::StorageError;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The log file does not exist.
    #[error("log file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The log has corrupted records.
    #[error("verification failed: {corruptions} corruption(s), {dropped_bytes} bytes dropped")]
    Corrupted {
        /// Number of corruption events.
        corruptions: u64,
        /// Bytes skipped because of corruption.
        dropped_bytes: u64,
    },

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON output error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
