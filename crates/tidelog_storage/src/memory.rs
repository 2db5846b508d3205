//! In-memory files and environment for testing.
//!
//! Every in-memory file keeps a journal of the operations issued against it
//! and can be told to fail its N-th append, flush or sync. Tests use this to
//! check write ordering and error propagation without touching the disk.

use crate::backend::{SequentialFile, WritableFile};
use crate::env::Env;
use crate::error::{StatusKind, StorageError, StorageResult};
use crate::file::is_manifest;
use crate::options::DEFAULT_MANIFEST_PREFIX;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An operation issued against an in-memory writable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    /// `append` of the given number of bytes.
    Append(usize),
    /// `flush`.
    Flush,
    /// Directory sync issued by a manifest file's `sync`.
    SyncDir,
    /// `sync`.
    Sync,
    /// `close`.
    Close,
}

#[derive(Debug, Default)]
struct MemFileState {
    data: Vec<u8>,
    journal: Vec<FileOp>,
    appends: usize,
    flushes: usize,
    syncs: usize,
    fail_append_at: Option<usize>,
    fail_flush_at: Option<usize>,
    fail_sync_at: Option<usize>,
}

/// Shared contents of an in-memory file.
///
/// Cloning yields another handle to the same contents, so a test can keep a
/// `MemFile` while a writer owns the [`MemWritableFile`] built from it.
///
/// # Example
///
/// ```rust
/// use tidelog_storage::{MemFile, MemWritableFile, WritableFile};
///
/// let contents = MemFile::new();
/// let mut file = MemWritableFile::new(contents.clone());
/// file.append(b"test data").unwrap();
/// assert_eq!(contents.data(), b"test data");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemFile {
    state: Arc<Mutex<MemFileState>>,
}

impl MemFile {
    /// Creates an empty file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a file with pre-existing contents.
    ///
    /// Useful for testing resume and recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        let file = Self::default();
        file.state.lock().data = data;
        file
    }

    /// Returns a copy of the file contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// Returns the current file length.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.state.lock().data.len() as u64
    }

    /// Returns true if the file holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Returns the operations issued so far, in order.
    #[must_use]
    pub fn journal(&self) -> Vec<FileOp> {
        self.state.lock().journal.clone()
    }

    /// Forgets recorded operations.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Makes the `n`-th append from now (1-based) and every later one fail.
    pub fn fail_append_at(&self, n: usize) {
        let mut state = self.state.lock();
        state.fail_append_at = Some(state.appends + n);
    }

    /// Makes the `n`-th flush from now (1-based) and every later one fail.
    pub fn fail_flush_at(&self, n: usize) {
        let mut state = self.state.lock();
        state.fail_flush_at = Some(state.flushes + n);
    }

    /// Makes the `n`-th sync from now (1-based) and every later one fail.
    pub fn fail_sync_at(&self, n: usize) {
        let mut state = self.state.lock();
        state.fail_sync_at = Some(state.syncs + n);
    }

    /// Clears all injected faults.
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.fail_append_at = None;
        state.fail_flush_at = None;
        state.fail_sync_at = None;
    }

    /// Empties the file and forgets its journal, counters and faults.
    fn truncate(&self) {
        *self.state.lock() = MemFileState::default();
    }
}

fn injected(path: &Path, op: &str) -> StorageError {
    StorageError::new(
        StatusKind::Io,
        path.display(),
        Some(&format!("injected {op} failure")),
    )
}

/// A writable file whose bytes live in a [`MemFile`].
#[derive(Debug)]
pub struct MemWritableFile {
    file: MemFile,
    path: PathBuf,
    is_manifest: bool,
    closed: bool,
}

impl MemWritableFile {
    /// Creates a writable file appending to `file`.
    #[must_use]
    pub fn new(file: MemFile) -> Self {
        Self::with_path(file, Path::new("mem.log"))
    }

    /// Creates a writable file named `path`, appending to `file`.
    ///
    /// The name controls manifest detection and appears in error messages.
    #[must_use]
    pub fn with_path(file: MemFile, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            is_manifest: is_manifest(path, DEFAULT_MANIFEST_PREFIX),
            closed: false,
        }
    }

    /// Returns the shared contents.
    #[must_use]
    pub fn file(&self) -> &MemFile {
        &self.file
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::new(
                StatusKind::Io,
                self.path.display(),
                Some("file is closed"),
            ));
        }
        Ok(())
    }
}

impl WritableFile for MemWritableFile {
    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        let mut state = self.file.state.lock();
        state.journal.push(FileOp::Append(data.len()));
        state.appends += 1;
        if state.fail_append_at.is_some_and(|n| state.appends >= n) {
            return Err(injected(&self.path, "append"));
        }
        state.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_open()?;
        let mut state = self.file.state.lock();
        state.journal.push(FileOp::Flush);
        state.flushes += 1;
        if state.fail_flush_at.is_some_and(|n| state.flushes >= n) {
            return Err(injected(&self.path, "flush"));
        }
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_open()?;
        let mut state = self.file.state.lock();
        if self.is_manifest {
            state.journal.push(FileOp::SyncDir);
        }
        state.journal.push(FileOp::Sync);
        state.syncs += 1;
        if state.fail_sync_at.is_some_and(|n| state.syncs >= n) {
            return Err(injected(&self.path, "sync"));
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        if !self.closed {
            self.file.state.lock().journal.push(FileOp::Close);
            self.closed = true;
        }
        Ok(())
    }
}

/// A sequential reader over a snapshot of a [`MemFile`].
#[derive(Debug)]
pub struct MemSequentialFile {
    data: Vec<u8>,
    pos: usize,
}

impl MemSequentialFile {
    /// Creates a reader over a snapshot of `file` taken now.
    #[must_use]
    pub fn new(file: &MemFile) -> Self {
        Self::from_bytes(file.data())
    }

    /// Creates a reader over `data`.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl SequentialFile for MemSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        let available = self.data.len() - self.pos;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn skip(&mut self, n: u64) -> StorageResult<()> {
        let available = (self.data.len() - self.pos) as u64;
        // Skipping past the end leaves the reader at EOF, like a seek would.
        self.pos += n.min(available) as usize;
        Ok(())
    }
}

/// An in-memory [`Env`] whose files live in a shared table.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemEnv {
    files: Arc<Mutex<HashMap<PathBuf, MemFile>>>,
}

impl MemEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the contents of `path`, if it exists.
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<MemFile> {
        self.files.lock().get(path).cloned()
    }

    /// Returns the paths of all files, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Env for MemEnv {
    fn new_writable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>> {
        let file = self
            .files
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        file.truncate();
        Ok(Box::new(MemWritableFile::with_path(file, path)))
    }

    fn new_appendable_file(&self, path: &Path) -> StorageResult<Box<dyn WritableFile>> {
        let file = self
            .files
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        Ok(Box::new(MemWritableFile::with_path(file, path)))
    }

    fn new_sequential_file(&self, path: &Path) -> StorageResult<Box<dyn SequentialFile>> {
        let file = self.file(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(MemSequentialFile::new(&file)))
    }

    fn remove_file(&self, path: &Path) -> StorageResult<()> {
        match self.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(not_found(path)),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn file_size(&self, path: &Path) -> StorageResult<u64> {
        self.file(path).map(|f| f.len()).ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &Path) -> StorageError {
    StorageError::new(
        StatusKind::NotFound,
        path.display(),
        Some("No such file or directory"),
    )
}
