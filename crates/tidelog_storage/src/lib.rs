//! # Tidelog Storage
//!
//! Result type, file abstractions and environment for tidelog.
//!
//! This crate is the lowest layer of tidelog. Files here are **opaque
//! byte sinks**: they know nothing about log blocks, record headers or
//! checksums.
//!
//! ## Design Principles
//!
//! - Every fallible call returns [`StorageResult`]; errors are never swallowed
//! - Writable files buffer appends and expose `flush` / `sync` / `close`
//! - Manifest files sync their directory before their own data
//! - One process-wide [`default_env`], created lazily and never destroyed
//!
//! ## Available Implementations
//!
//! - [`PosixWritableFile`] / [`PosixSequentialFile`] / [`PosixEnv`] - OS files
//! - [`MemWritableFile`] / [`MemSequentialFile`] / [`MemEnv`] - For testing
//!
//! ## Example
//!
//! ```rust
//! use tidelog_storage::{Env, MemEnv, WritableFile};
//! use std::path::Path;
//!
//! let env = MemEnv::new();
//! let mut file = env.new_writable_file(Path::new("000001.log")).unwrap();
//! file.append(b"hello world").unwrap();
//! file.flush().unwrap();
//! assert_eq!(env.file_size(Path::new("000001.log")).unwrap(), 11);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod env;
mod error;
mod file;
mod memory;
mod options;

pub use backend::{SequentialFile, WritableFile};
pub use env::{default_env, Env, PosixEnv};
pub use error::{StatusKind, StorageError, StorageResult};
pub use file::{PosixSequentialFile, PosixWritableFile};
pub use memory::{FileOp, MemEnv, MemFile, MemSequentialFile, MemWritableFile};
pub use options::{FileOptions, SyncMode, DEFAULT_BUFFER_SIZE, DEFAULT_MANIFEST_PREFIX};
