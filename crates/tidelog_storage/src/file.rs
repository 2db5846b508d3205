//! OS file implementations of the file traits.

use crate::backend::{SequentialFile, WritableFile};
use crate::error::{StatusKind, StorageError, StorageResult};
use crate::options::{FileOptions, SyncMode};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A buffered, append-only file backed by an OS file handle.
///
/// Appended bytes collect in a fixed-capacity buffer and are written to the
/// OS only when the buffer overflows or on `flush`, `sync` and `close`.
/// This amortizes system calls across many small log records.
///
/// # Durability
///
/// - `flush()` writes the buffer to the OS (survives a process crash)
/// - `sync()` additionally forces the file to stable storage
///
/// Files whose basename starts with the manifest prefix (`"MANIFEST"` by
/// default) sync their containing directory *before* the file itself. A
/// manifest names other files, so their directory entries must be durable
/// before the manifest referencing them is.
///
/// # Example
///
/// ```no_run
/// use tidelog_storage::{PosixWritableFile, WritableFile};
/// use std::path::Path;
///
/// let mut file = PosixWritableFile::create(Path::new("000001.log")).unwrap();
/// file.append(b"persistent data").unwrap();
/// file.sync().unwrap();
/// file.close().unwrap();
/// ```
#[derive(Debug)]
pub struct PosixWritableFile {
    /// `buf[..pos]` holds bytes not yet handed to the OS.
    buf: Box<[u8]>,
    pos: usize,
    /// `None` once the file has been closed.
    file: Option<File>,
    is_manifest: bool,
    filename: PathBuf,
    dirname: PathBuf,
    sync_mode: SyncMode,
    #[cfg(test)]
    sync_log: Vec<SyncTarget>,
}

/// What a single sync call was issued against.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncTarget {
    Directory(PathBuf),
    File(PathBuf),
}

impl PosixWritableFile {
    /// Creates (or truncates) the file at `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent directory does not exist, or `Io`
    /// for any other OS failure.
    pub fn create(path: &Path) -> StorageResult<Self> {
        Self::create_with(path, FileOptions::default())
    }

    /// Creates (or truncates) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent directory does not exist, or `Io`
    /// for any other OS failure.
    pub fn create_with(path: &Path, options: FileOptions) -> StorageResult<Self> {
        let mut open = OpenOptions::new();
        open.write(true).create(true).truncate(true);
        let file = open_with_mode(&mut open, path)?;
        debug!(path = %path.display(), "created writable file");
        Ok(Self::from_file(path, file, options))
    }

    /// Opens the file at `path` for appending, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent directory does not exist, or `Io`
    /// for any other OS failure.
    pub fn open_append(path: &Path) -> StorageResult<Self> {
        Self::open_append_with(path, FileOptions::default())
    }

    /// Opens the file at `path` for appending, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent directory does not exist, or `Io`
    /// for any other OS failure.
    pub fn open_append_with(path: &Path, options: FileOptions) -> StorageResult<Self> {
        let mut open = OpenOptions::new();
        open.append(true).create(true);
        let file = open_with_mode(&mut open, path)?;
        debug!(path = %path.display(), "opened appendable file");
        Ok(Self::from_file(path, file, options))
    }

    fn from_file(path: &Path, file: File, options: FileOptions) -> Self {
        Self {
            buf: vec![0u8; options.buffer_size.max(1)].into_boxed_slice(),
            pos: 0,
            file: Some(file),
            is_manifest: is_manifest(path, options.manifest_prefix),
            filename: path.to_path_buf(),
            dirname: dirname(path),
            sync_mode: options.sync_mode,
            #[cfg(test)]
            sync_log: Vec::new(),
        }
    }

    /// Returns the path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.filename
    }

    /// Returns true if the file gets the manifest directory-sync treatment.
    #[must_use]
    pub fn is_manifest(&self) -> bool {
        self.is_manifest
    }

    /// Returns the number of bytes waiting in the buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.pos
    }

    fn handle(&mut self) -> StorageResult<&mut File> {
        let filename = &self.filename;
        self.file.as_mut().ok_or_else(|| closed_error(filename))
    }

    /// Writes out `buf[..pos]`. The buffer is emptied only on success.
    fn flush_buffer(&mut self) -> StorageResult<()> {
        if self.pos == 0 {
            return Ok(());
        }
        let Some(file) = self.file.as_mut() else {
            return Err(closed_error(&self.filename));
        };
        write_unbuffered(file, &self.filename, &self.buf[..self.pos])?;
        self.pos = 0;
        Ok(())
    }

    fn sync_dir_if_manifest(&mut self) -> StorageResult<()> {
        if !self.is_manifest {
            return Ok(());
        }
        let dir = File::open(&self.dirname)
            .map_err(|e| StorageError::from_io(self.dirname.display(), &e))?;
        self.record_sync(SyncTargetKind::Directory);
        sync_handle(&dir, &self.dirname, SyncMode::All)
    }

    #[cfg(test)]
    fn record_sync(&mut self, kind: SyncTargetKind) {
        let target = match kind {
            SyncTargetKind::Directory => SyncTarget::Directory(self.dirname.clone()),
            SyncTargetKind::File => SyncTarget::File(self.filename.clone()),
        };
        self.sync_log.push(target);
    }

    #[cfg(not(test))]
    fn record_sync(&mut self, _kind: SyncTargetKind) {}
}

#[derive(Clone, Copy)]
enum SyncTargetKind {
    Directory,
    File,
}

impl WritableFile for PosixWritableFile {
    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        self.handle()?;

        // Fit as much as possible into the buffer.
        let copy_size = data.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + copy_size].copy_from_slice(&data[..copy_size]);
        self.pos += copy_size;
        let rest = &data[copy_size..];
        if rest.is_empty() {
            return Ok(());
        }

        // Buffer is full; drain it before taking more.
        self.flush_buffer()?;

        // Small writes go to the buffer, large ones straight to the OS.
        if rest.len() < self.buf.len() {
            self.buf[..rest.len()].copy_from_slice(rest);
            self.pos = rest.len();
            return Ok(());
        }
        match self.file.as_mut() {
            Some(file) => write_unbuffered(file, &self.filename, rest),
            None => Err(closed_error(&self.filename)),
        }
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.flush_buffer()
    }

    fn sync(&mut self) -> StorageResult<()> {
        // The manifest's directory goes first so that files it refers to
        // are never missing after recovery.
        self.sync_dir_if_manifest()?;
        self.flush_buffer()?;
        self.handle()?;
        self.record_sync(SyncTargetKind::File);
        match self.file.as_ref() {
            Some(file) => sync_handle(file, &self.filename, self.sync_mode),
            None => Err(closed_error(&self.filename)),
        }
    }

    fn close(&mut self) -> StorageResult<()> {
        let status = self.flush_buffer();
        if self.file.take().is_some() {
            debug!(path = %self.filename.display(), "closed writable file");
        }
        status
    }
}

impl Drop for PosixWritableFile {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.close() {
                warn!(path = %self.filename.display(), error = %e, "close on drop failed");
            }
        }
    }
}

/// A read-only file consumed front to back.
#[derive(Debug)]
pub struct PosixSequentialFile {
    file: File,
    filename: PathBuf,
}

impl PosixSequentialFile {
    /// Opens the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist, or `Io` otherwise.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| StorageError::from_io(path.display(), &e))?;
        Ok(Self {
            file,
            filename: path.to_path_buf(),
        })
    }
}

impl SequentialFile for PosixSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        loop {
            match self.file.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StorageError::from_io(self.filename.display(), &e)),
            }
        }
    }

    fn skip(&mut self, n: u64) -> StorageResult<()> {
        let delta = i64::try_from(n).map_err(|_| {
            StorageError::invalid_argument(format!("skip distance {n} out of range"))
        })?;
        self.file
            .seek(SeekFrom::Current(delta))
            .map_err(|e| StorageError::from_io(self.filename.display(), &e))?;
        Ok(())
    }
}

fn closed_error(path: &Path) -> StorageError {
    StorageError::new(StatusKind::Io, path.display(), Some("file is closed"))
}

/// Writes all of `data`, retrying writes interrupted by a signal.
fn write_unbuffered(file: &mut File, path: &Path, mut data: &[u8]) -> StorageResult<()> {
    while !data.is_empty() {
        match file.write(data) {
            Ok(0) => {
                let err = io::Error::from(io::ErrorKind::WriteZero);
                warn!(path = %path.display(), "write made no progress");
                return Err(StorageError::from_io(path.display(), &err));
            }
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "write failed");
                return Err(StorageError::from_io(path.display(), &e));
            }
        }
    }
    Ok(())
}

fn sync_handle(file: &File, path: &Path, mode: SyncMode) -> StorageResult<()> {
    let result = match mode {
        SyncMode::Data => file.sync_data(),
        SyncMode::All => file.sync_all(),
    };
    result.map_err(|e| {
        warn!(path = %path.display(), error = %e, "sync failed");
        StorageError::from_io(path.display(), &e)
    })
}

fn open_with_mode(open: &mut OpenOptions, path: &Path) -> StorageResult<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(0o644);
    }
    open.open(path)
        .map_err(|e| StorageError::from_io(path.display(), &e))
}

/// Returns the directory containing `path`, or `.` for a bare filename.
pub(crate) fn dirname(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Returns true if the basename of `path` starts with `prefix`.
pub(crate) fn is_manifest(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(prefix))
}
