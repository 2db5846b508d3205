//! File capability traits.

use crate::error::StorageResult;

/// A sequentially written, append-only file.
///
/// Implementations may buffer appended bytes in memory. Bytes become
/// visible to the operating system on `flush` and durable on `sync`.
///
/// # Invariants
///
/// - Bytes are written in exactly the order they were appended
/// - `flush` hands every buffered byte to the OS, but may not reach disk
/// - `sync` makes every appended byte durable against process and OS crash
/// - A file is exclusively owned; no concurrent appenders
///
/// # Implementors
///
/// - [`super::PosixWritableFile`] - Buffered writes over an OS file handle
/// - [`super::MemWritableFile`] - For testing
pub trait WritableFile: Send {
    /// Appends `data` to the end of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if draining the internal buffer fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Pushes all buffered bytes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Makes all appended bytes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Flushes buffered bytes and releases the underlying handle.
    ///
    /// # Errors
    ///
    /// Returns the first error from flushing or closing.
    fn close(&mut self) -> StorageResult<()>;
}

impl<W: WritableFile + ?Sized> WritableFile for Box<W> {
    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn close(&mut self) -> StorageResult<()> {
        (**self).close()
    }
}

/// A file read front to back.
pub trait SequentialFile: Send {
    /// Reads up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read; `0` means end of file.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize>;

    /// Skips `n` bytes forward.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying seek fails.
    fn skip(&mut self, n: u64) -> StorageResult<()>;
}

impl<R: SequentialFile + ?Sized> SequentialFile for Box<R> {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        (**self).read(buf)
    }

    fn skip(&mut self, n: u64) -> StorageResult<()> {
        (**self).skip(n)
    }
}
