//! Log writer.

use crate::crc;
use crate::wal::format::{RecordType, BLOCK_SIZE, HEADER_SIZE, MAX_RECORD_TYPE};
use std::path::Path;
use tidelog_storage::{Env, StorageResult, WritableFile};
use tracing::{trace, warn};

/// Zero bytes used to pad a block tail too short for a header.
const TRAILER: [u8; HEADER_SIZE - 1] = [0; HEADER_SIZE - 1];

/// Appends logical records to a log file.
///
/// Each call to [`add_record`](Self::add_record) splits its input into one
/// or more physical records so that no physical record crosses a
/// [`BLOCK_SIZE`] boundary, then appends and flushes each one in order.
/// The writer never syncs on its own; call [`sync`](Self::sync) (or sync the
/// file directly) when the records must be durable.
///
/// # Errors and recovery
///
/// The first failing append or flush aborts the call. Block accounting has
/// already advanced past the failed record at that point, and the file
/// tail is in an unknown state, so no further records should be added
/// through this writer. Reopen the log at a verified length instead.
///
/// # Example
///
/// ```rust
/// use tidelog_core::LogWriter;
/// use tidelog_storage::{MemFile, MemWritableFile};
///
/// let contents = MemFile::new();
/// let mut writer = LogWriter::new(MemWritableFile::new(contents.clone()));
/// writer.add_record(b"hello").unwrap();
/// assert_eq!(writer.block_offset(), 12);
/// assert_eq!(contents.len(), 12);
/// ```
#[derive(Debug)]
pub struct LogWriter<W: WritableFile> {
    dest: W,
    /// Bytes already used in the current block. May equal `BLOCK_SIZE`
    /// right after a record fills a block exactly.
    block_offset: usize,
    /// CRC32C of each single type byte, so a record's checksum only has to
    /// be extended over its payload.
    type_crc: [u32; MAX_RECORD_TYPE as usize + 1],
}

impl<W: WritableFile> LogWriter<W> {
    /// Creates a writer that appends to `dest`, which must be empty.
    pub fn new(dest: W) -> Self {
        Self::with_offset(dest, 0)
    }

    /// Creates a writer that appends to `dest`, which already holds
    /// `dest_length` bytes of log data.
    ///
    /// Framing resumes at `dest_length % BLOCK_SIZE` within the current
    /// block, so logs written by an earlier run can be extended.
    pub fn with_offset(dest: W, dest_length: u64) -> Self {
        Self {
            dest,
            block_offset: (dest_length % BLOCK_SIZE as u64) as usize,
            type_crc: init_type_crc(),
        }
    }

    /// Appends one logical record.
    ///
    /// An empty record is still written, as a single empty `Full` record.
    ///
    /// # Errors
    ///
    /// Returns the first error from the underlying file. Fragments already
    /// written stay in the file.
    pub fn add_record(&mut self, record: &[u8]) -> StorageResult<()> {
        let mut left = record;
        let mut begin = true;

        // Runs at least once so empty records are emitted.
        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                // Switch to a new block, padding the tail with zeroes.
                self.block_offset = 0;
                if leftover > 0 {
                    self.dest.append(&TRAILER[..leftover])?;
                }
            }

            // A zero-length fragment is possible when exactly a header fits.
            let avail = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_length = left.len().min(avail);
            let end = fragment_length == left.len();
            let (fragment, rest) = left.split_at(fragment_length);

            self.emit_physical_record(RecordType::for_fragment(begin, end), fragment)?;
            left = rest;
            begin = false;

            if left.is_empty() {
                return Ok(());
            }
        }
    }

    fn emit_physical_record(&mut self, kind: RecordType, payload: &[u8]) -> StorageResult<()> {
        debug_assert!(payload.len() <= usize::from(u16::MAX));
        debug_assert!(self.block_offset + HEADER_SIZE + payload.len() <= BLOCK_SIZE);

        let length = payload.len() as u16;
        let checksum = crc::mask(crc::extend(self.type_crc[usize::from(kind.as_byte())], payload));

        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&checksum.to_le_bytes());
        header[4..6].copy_from_slice(&length.to_le_bytes());
        header[6] = kind.as_byte();

        let result = self.write_physical(&header, payload);
        // Advances even on failure; the tail is unusable either way.
        self.block_offset += HEADER_SIZE + payload.len();

        match &result {
            Ok(()) => trace!(?kind, length, block_offset = self.block_offset, "emitted record"),
            Err(e) => warn!(?kind, length, error = %e, "failed to emit record"),
        }
        result
    }

    fn write_physical(&mut self, header: &[u8], payload: &[u8]) -> StorageResult<()> {
        self.dest.append(header)?;
        self.dest.append(payload)?;
        self.dest.flush()
    }

    /// Returns the write position within the current block, in
    /// `0..BLOCK_SIZE`.
    ///
    /// Always equal to the number of bytes written through this writer plus
    /// the initial length, modulo [`BLOCK_SIZE`].
    #[must_use]
    pub fn block_offset(&self) -> usize {
        self.block_offset % BLOCK_SIZE
    }

    /// Makes every record added so far durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be synced.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.dest.sync()
    }

    /// Returns the underlying file.
    #[must_use]
    pub fn file(&self) -> &W {
        &self.dest
    }

    /// Returns the underlying file mutably.
    pub fn file_mut(&mut self) -> &mut W {
        &mut self.dest
    }

    /// Consumes the writer and returns the underlying file.
    pub fn into_inner(self) -> W {
        self.dest
    }
}

impl LogWriter<Box<dyn WritableFile>> {
    /// Creates a new, empty log at `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(env: &dyn Env, path: &Path) -> StorageResult<Self> {
        Ok(Self::new(env.new_writable_file(path)?))
    }

    /// Opens the log at `path` for appending, creating it if missing, and
    /// resumes block framing at its current length.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or measured.
    pub fn resume(env: &dyn Env, path: &Path) -> StorageResult<Self> {
        let length = if env.file_exists(path) {
            env.file_size(path)?
        } else {
            0
        };
        Ok(Self::with_offset(env.new_appendable_file(path)?, length))
    }
}

fn init_type_crc() -> [u32; MAX_RECORD_TYPE as usize + 1] {
    let mut table = [0u32; MAX_RECORD_TYPE as usize + 1];
    for kind in RecordType::ALL {
        table[usize::from(kind.as_byte())] = crc::value(&[kind.as_byte()]);
    }
    table
}
