//! Environment abstraction: how files are created, opened and removed.

use crate::backend::{SequentialFile, WritableFile};
use crate::error::{StorageError, StorageResult};
use crate::file::{PosixSequentialFile, PosixWritableFile};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{debug, error};

/// File-system capabilities needed by the log.
///
/// An `Env` holds no per-call mutable state and can be shared across
/// threads. Every method may block on storage I/O.
///
/// # Implementors
///
/// - [`PosixEnv`] - The operating system's file system, via [`default_env`]
/// - [`super::MemEnv`] - For testing
pub trait Env: Send + Sync {
    /// Creates a new writable file at `path`, truncating any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn new_writable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>>;

    /// Opens `path` for appending, creating it if it does not exist.
    ///
    /// Used to resume writing a log produced by an earlier run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    fn new_appendable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>>;

    /// Opens `path` for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    fn new_sequential_file(&self, path: &Path) -> StorageResult<Box<dyn SequentialFile>>;

    /// Deletes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    fn remove_file(&self, path: &Path) -> StorageResult<()>;

    /// Returns true if a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Returns the length of the file at `path` in bytes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    fn file_size(&self, path: &Path) -> StorageResult<u64>;
}

/// The operating system's file system.
///
/// The only instance is the process-wide one returned by [`default_env`].
/// Long-lived storage components hold `&'static` references to it, so it
/// must never be destroyed; dropping it aborts the process.
#[derive(Debug)]
pub struct PosixEnv {
    _private: (),
}

impl PosixEnv {
    fn new() -> Self {
        Self { _private: () }
    }
}

impl Drop for PosixEnv {
    fn drop(&mut self) {
        error!("PosixEnv singleton destroyed. Unsupported behavior!");
        eprintln!("PosixEnv singleton destroyed. Unsupported behavior!");
        std::process::abort();
    }
}

static DEFAULT_ENV: OnceCell<PosixEnv> = OnceCell::new();

/// Returns the process-wide default environment.
///
/// The environment is created on first use, exactly once, even when first
/// used from several threads at the same time.
///
/// # Example
///
/// ```no_run
/// use tidelog_storage::{default_env, Env, WritableFile};
/// use std::path::Path;
///
/// let env = default_env();
/// let mut file = env.new_writable_file(Path::new("000001.log")).unwrap();
/// file.append(b"record").unwrap();
/// file.sync().unwrap();
/// ```
pub fn default_env() -> &'static PosixEnv {
    DEFAULT_ENV.get_or_init(PosixEnv::new)
}

impl Env for PosixEnv {
    fn new_writable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>> {
        Ok(Box::new(PosixWritableFile::create(path)?))
    }

    fn new_appendable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>> {
        Ok(Box::new(PosixWritableFile::open_append(path)?))
    }

    fn new_sequential_file(&self, path: &Path) -> StorageResult<Box<dyn SequentialFile>> {
        Ok(Box::new(PosixSequentialFile::open(path)?))
    }

    fn remove_file(&self, path: &Path) -> StorageResult<()> {
        std::fs::remove_file(path).map_err(|e| StorageError::from_io(path.display(), &e))?;
        debug!(path = %path.display(), "removed file");
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_size(&self, path: &Path) -> StorageResult<u64> {
        let metadata =
            std::fs::metadata(path).map_err(|e| StorageError::from_io(path.display(), &e))?;
        Ok(metadata.len())
    }
}
