//! # Tidelog Core
//!
//! Block-framed, checksummed record log.
//!
//! This crate provides:
//! - [`LogWriter`] for appending logical records to a log file
//! - [`LogReader`] for reading them back, skipping damaged data
//! - [`verify_log`] for scanning a whole log
//! - The masked CRC32C used to protect each record ([`crc`])
//!
//! Files are reached through the [`tidelog_storage`] traits, so the same
//! writer runs against the OS file system or an in-memory fake.
//!
//! ## Example
//!
//! ```rust
//! use tidelog_core::{LogReader, LogWriter, ReaderOptions};
//! use tidelog_storage::MemEnv;
//! use std::path::Path;
//!
//! let env = MemEnv::new();
//! let path = Path::new("db/000001.log");
//!
//! let mut writer = LogWriter::create(&env, path).unwrap();
//! writer.add_record(b"put k1 v1").unwrap();
//! writer.sync().unwrap();
//!
//! let mut reader = LogReader::open(&env, path, ReaderOptions::default()).unwrap();
//! assert_eq!(reader.read_record().unwrap().unwrap(), b"put k1 v1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crc;
mod verify;
pub mod wal;

pub use config::ReaderOptions;
pub use verify::{verify_log, LogSummary};
pub use wal::{
    CorruptionCounter, LogReader, LogReporter, LogWriter, RecordType, Reporter, BLOCK_SIZE,
    HEADER_SIZE,
};

pub use tidelog_storage::{StorageError, StorageResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
