//! Log reader.
//!
//! Reads logical records back from a log written by [`super::LogWriter`].
//!
//! ## Recovery policy
//!
//! The reader never fails on bad data. Damaged bytes are skipped and
//! reported to a [`Reporter`], and reading resumes at the next intact
//! record:
//!
//! - **Checksum mismatch** or an impossible length: the rest of the block is
//!   dropped, since the length field cannot be trusted.
//! - **Orphan fragments** (`Middle`/`Last` with no `First`) and
//!   **unterminated fragments** (`First` followed by another `First` or a
//!   `Full`) are dropped.
//! - **Unknown record types** are dropped.
//! - **Zero-filled regions** (preallocated space) are skipped silently.
//!
//! A record cut short by the end of the file is a torn write from a crash,
//! not corruption: it ends the log cleanly and is not reported.
//!
//! Only errors from the underlying file are returned as `Err`.

use crate::config::ReaderOptions;
use crate::crc;
use crate::wal::format::{RecordType, BLOCK_SIZE, HEADER_SIZE};
use std::path::Path;
use tidelog_storage::{Env, SequentialFile, StorageError, StorageResult};
use tracing::warn;

/// Receives notice of data the reader had to skip.
pub trait Reporter {
    /// Called when roughly `bytes` bytes were dropped because of `reason`.
    fn corruption(&mut self, bytes: usize, reason: &StorageError);
}

impl<P: Reporter + ?Sized> Reporter for &mut P {
    fn corruption(&mut self, bytes: usize, reason: &StorageError) {
        (**self).corruption(bytes, reason);
    }
}

/// Reporter that logs every corruption with `warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn corruption(&mut self, bytes: usize, reason: &StorageError) {
        warn!(bytes, reason = %reason, "dropping corrupted log data");
    }
}

/// Reporter that tallies corruption events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorruptionCounter {
    /// Number of corruption events.
    pub events: u64,
    /// Total bytes dropped.
    pub dropped_bytes: u64,
    /// Reason of the first event, if any.
    pub first: Option<StorageError>,
}

impl Reporter for CorruptionCounter {
    fn corruption(&mut self, bytes: usize, reason: &StorageError) {
        warn!(bytes, reason = %reason, "dropping corrupted log data");
        self.events += 1;
        self.dropped_bytes += bytes as u64;
        if self.first.is_none() {
            self.first = Some(reason.clone());
        }
    }
}

/// Outcome of reading one physical record. Payloads are index ranges into
/// the block buffer.
enum Physical {
    Record {
        kind: RecordType,
        offset: u64,
        start: usize,
        end: usize,
    },
    Unknown {
        kind: u8,
        size: usize,
    },
    Bad,
    Eof,
}

/// Reads logical records from a log file.
///
/// # Example
///
/// ```rust
/// use tidelog_core::{LogReader, LogWriter};
/// use tidelog_storage::{MemFile, MemSequentialFile, MemWritableFile};
///
/// let contents = MemFile::new();
/// let mut writer = LogWriter::new(MemWritableFile::new(contents.clone()));
/// writer.add_record(b"one").unwrap();
/// writer.add_record(b"two").unwrap();
///
/// let mut reader = LogReader::new(MemSequentialFile::new(&contents));
/// assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"one"[..]));
/// assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"two"[..]));
/// assert_eq!(reader.read_record().unwrap(), None);
/// ```
#[derive(Debug)]
pub struct LogReader<R: SequentialFile, P: Reporter = LogReporter> {
    file: R,
    reporter: P,
    verify_checksums: bool,
    /// One block of file data; `buf_start..buf_end` is still unread.
    backing: Box<[u8]>,
    buf_start: usize,
    buf_end: usize,
    /// The last read returned a short block.
    eof: bool,
    /// File offset just past the data in `backing`.
    end_of_buffer_offset: u64,
    last_record_offset: u64,
    /// Set after an I/O error; iteration stops.
    failed: bool,
}

impl<R: SequentialFile> LogReader<R, LogReporter> {
    /// Creates a reader with default options that logs corruption.
    pub fn new(file: R) -> Self {
        Self::with_reporter(file, LogReporter, ReaderOptions::default())
    }
}

impl<R: SequentialFile, P: Reporter> LogReader<R, P> {
    /// Creates a reader that sends corruption notices to `reporter`.
    pub fn with_reporter(file: R, reporter: P, options: ReaderOptions) -> Self {
        Self {
            file,
            reporter,
            verify_checksums: options.verify_checksums,
            backing: vec![0u8; BLOCK_SIZE].into_boxed_slice(),
            buf_start: 0,
            buf_end: 0,
            eof: false,
            end_of_buffer_offset: 0,
            last_record_offset: 0,
            failed: false,
        }
    }

    /// Reads the next logical record.
    ///
    /// Returns `Ok(None)` at the end of the log.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying file cannot be read.
    pub fn read_record(&mut self) -> StorageResult<Option<Vec<u8>>> {
        let mut scratch = Vec::new();
        let mut in_fragmented_record = false;
        // Offset of the First fragment of the record being assembled.
        let mut prospective_offset = 0;

        loop {
            match self.read_physical_record()? {
                Physical::Record {
                    kind: RecordType::Full,
                    offset,
                    start,
                    end,
                } => {
                    if in_fragmented_record && !scratch.is_empty() {
                        self.report(scratch.len(), "partial record without end");
                    }
                    self.last_record_offset = offset;
                    return Ok(Some(self.backing[start..end].to_vec()));
                }
                Physical::Record {
                    kind: RecordType::First,
                    offset,
                    start,
                    end,
                } => {
                    if in_fragmented_record && !scratch.is_empty() {
                        self.report(scratch.len(), "partial record without end");
                    }
                    prospective_offset = offset;
                    scratch.clear();
                    scratch.extend_from_slice(&self.backing[start..end]);
                    in_fragmented_record = true;
                }
                Physical::Record {
                    kind: RecordType::Middle,
                    start,
                    end,
                    ..
                } => {
                    if in_fragmented_record {
                        scratch.extend_from_slice(&self.backing[start..end]);
                    } else {
                        self.report(end - start, "missing start of fragmented record");
                    }
                }
                Physical::Record {
                    kind: RecordType::Last,
                    start,
                    end,
                    ..
                } => {
                    if in_fragmented_record {
                        scratch.extend_from_slice(&self.backing[start..end]);
                        self.last_record_offset = prospective_offset;
                        return Ok(Some(scratch));
                    }
                    self.report(end - start, "missing start of fragmented record");
                }
                Physical::Record {
                    kind: RecordType::Zero,
                    start,
                    end,
                    ..
                } => {
                    self.report(end - start + scratch.len(), "unknown record type 0");
                    in_fragmented_record = false;
                    scratch.clear();
                }
                Physical::Unknown { kind, size } => {
                    let reason = format!("unknown record type {kind}");
                    self.report(size + scratch.len(), &reason);
                    in_fragmented_record = false;
                    scratch.clear();
                }
                Physical::Bad => {
                    if in_fragmented_record {
                        self.report(scratch.len(), "error in middle of record");
                        in_fragmented_record = false;
                        scratch.clear();
                    }
                }
                // A fragmented record cut off by the end of the file was
                // torn by a crash; it is dropped without a report.
                Physical::Eof => return Ok(None),
            }
        }
    }

    /// Returns the file offset of the first physical record of the last
    /// logical record returned by [`read_record`](Self::read_record).
    #[must_use]
    pub fn last_record_offset(&self) -> u64 {
        self.last_record_offset
    }

    /// Returns the reporter.
    #[must_use]
    pub fn reporter(&self) -> &P {
        &self.reporter
    }

    /// Consumes the reader and returns its reporter.
    pub fn into_reporter(self) -> P {
        self.reporter
    }

    fn read_physical_record(&mut self) -> StorageResult<Physical> {
        loop {
            let available = self.buf_end - self.buf_start;
            if available < HEADER_SIZE {
                if self.eof {
                    // A header cut off by the end of the file is a torn
                    // write, not corruption.
                    self.clear_buffer();
                    return Ok(Physical::Eof);
                }
                // The previous block is used up; what is left is padding.
                self.fill_block()?;
                continue;
            }

            let header = &self.backing[self.buf_start..self.buf_start + HEADER_SIZE];
            let stored = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let length = usize::from(u16::from_le_bytes([header[4], header[5]]));
            let kind = header[6];

            if HEADER_SIZE + length > available {
                self.clear_buffer();
                if self.eof {
                    // Payload cut off by the end of the file.
                    return Ok(Physical::Eof);
                }
                self.report(available, "bad record length");
                return Ok(Physical::Bad);
            }

            if kind == RecordType::Zero.as_byte() && length == 0 {
                // Preallocated space. Skip the rest of the block silently.
                self.clear_buffer();
                return Ok(Physical::Bad);
            }

            if self.verify_checksums {
                // The checksum covers the type byte and the payload, which
                // sit next to each other in the buffer.
                let covered =
                    self.buf_start + HEADER_SIZE - 1..self.buf_start + HEADER_SIZE + length;
                if crc::unmask(stored) != crc::value(&self.backing[covered]) {
                    // The length may be the corrupt field, so the whole
                    // remaining block is dropped.
                    self.clear_buffer();
                    self.report(available, "checksum mismatch");
                    return Ok(Physical::Bad);
                }
            }

            let start = self.buf_start + HEADER_SIZE;
            let end = start + length;
            self.buf_start = end;
            let remaining = (self.buf_end - self.buf_start) as u64;
            let offset = self.end_of_buffer_offset - remaining - (HEADER_SIZE + length) as u64;

            return Ok(match RecordType::from_byte(kind) {
                Some(kind) => Physical::Record {
                    kind,
                    offset,
                    start,
                    end,
                },
                None => Physical::Unknown {
                    kind,
                    size: HEADER_SIZE + length,
                },
            });
        }
    }

    /// Reads the next block into the buffer, marking EOF on a short read.
    fn fill_block(&mut self) -> StorageResult<()> {
        self.clear_buffer();
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = match self.file.read(&mut self.backing[filled..]) {
                Ok(n) => n,
                Err(e) => {
                    self.eof = true;
                    self.failed = true;
                    return Err(e);
                }
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.buf_end = filled;
        self.end_of_buffer_offset += filled as u64;
        if filled < BLOCK_SIZE {
            self.eof = true;
        }
        Ok(())
    }

    fn clear_buffer(&mut self) {
        self.buf_start = 0;
        self.buf_end = 0;
    }

    fn report(&mut self, bytes: usize, reason: &str) {
        self.reporter.corruption(bytes, &StorageError::corruption(reason));
    }
}

impl LogReader<Box<dyn SequentialFile>, LogReporter> {
    /// Opens the log at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    pub fn open(env: &dyn Env, path: &Path, options: ReaderOptions) -> StorageResult<Self> {
        Ok(Self::with_reporter(
            env.new_sequential_file(path)?,
            LogReporter,
            options,
        ))
    }
}

impl<R: SequentialFile, P: Reporter> Iterator for LogReader<R, P> {
    type Item = StorageResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::LogWriter;
    use proptest::prelude::*;
    use tidelog_storage::{MemEnv, MemFile, MemSequentialFile, MemWritableFile};

    fn write_log(records: &[Vec<u8>]) -> MemFile {
        let contents = MemFile::new();
        let mut writer = LogWriter::new(MemWritableFile::new(contents.clone()));
        for record in records {
            writer.add_record(record).unwrap();
        }
        contents
    }

    fn read_all(data: Vec<u8>) -> (Vec<Vec<u8>>, CorruptionCounter) {
        read_all_with(data, ReaderOptions::default())
    }

    fn read_all_with(data: Vec<u8>, options: ReaderOptions) -> (Vec<Vec<u8>>, CorruptionCounter) {
        let mut reader = LogReader::with_reporter(
            MemSequentialFile::from_bytes(data),
            CorruptionCounter::default(),
            options,
        );
        let mut records = Vec::new();
        while let Some(record) = reader.read_record().unwrap() {
            records.push(record);
        }
        (records, reader.into_reporter())
    }

    /// Builds a raw physical record with a correct checksum.
    fn raw_record(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut covered = vec![kind];
        covered.extend_from_slice(payload);
        let mut out = crc::mask(crc::value(&covered)).to_le_bytes().to_vec();
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.push(kind);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn empty_log() {
        let (records, counter) = read_all(Vec::new());
        assert!(records.is_empty());
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn reads_back_small_and_empty_records() {
        let written = vec![b"foo".to_vec(), Vec::new(), b"bar".to_vec()];
        let (records, counter) = read_all(write_log(&written).data());
        assert_eq!(records, written);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn reads_back_fragmented_records() {
        let written = vec![
            vec![1u8; 10],
            vec![2u8; BLOCK_SIZE - HEADER_SIZE],
            vec![3u8; 100_000],
            vec![4u8; 5],
        ];
        let (records, counter) = read_all(write_log(&written).data());
        assert_eq!(records, written);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn skips_block_trailer_padding() {
        // Leaves 6 bytes at the end of block 0, which must be padded.
        let first = vec![b'a'; BLOCK_SIZE - HEADER_SIZE - 6];
        let written = vec![first, b"next".to_vec()];
        let contents = write_log(&written);
        assert_eq!(contents.len(), (BLOCK_SIZE + HEADER_SIZE + 4) as u64);

        let (records, counter) = read_all(contents.data());
        assert_eq!(records, written);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn last_record_offset_points_at_first_fragment() {
        let written = vec![b"a".to_vec(), vec![7u8; 40_000], b"b".to_vec()];
        let contents = write_log(&written);
        let mut reader = LogReader::new(MemSequentialFile::new(&contents));

        reader.read_record().unwrap().unwrap();
        assert_eq!(reader.last_record_offset(), 0);
        reader.read_record().unwrap().unwrap();
        assert_eq!(reader.last_record_offset(), (HEADER_SIZE + 1) as u64);
        reader.read_record().unwrap().unwrap();
        assert_eq!(
            reader.last_record_offset(),
            (HEADER_SIZE + 1 + HEADER_SIZE + 40_000 + HEADER_SIZE) as u64
        );
    }

    #[test]
    fn torn_payload_is_clean_end() {
        let written = vec![b"kept".to_vec(), vec![9u8; 1000]];
        let mut data = write_log(&written).data();
        data.truncate(data.len() - 10);

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"kept".to_vec()]);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn torn_header_is_clean_end() {
        let written = vec![b"kept".to_vec(), b"lost".to_vec()];
        let mut data = write_log(&written).data();
        data.truncate(HEADER_SIZE + 4 + 3);

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"kept".to_vec()]);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn torn_fragmented_record_is_clean_end() {
        let written = vec![b"kept".to_vec(), vec![5u8; 50_000]];
        let mut data = write_log(&written).data();
        // Cut inside the Last fragment in block 1.
        data.truncate(BLOCK_SIZE + 100);

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"kept".to_vec()]);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn checksum_mismatch_drops_rest_of_block() {
        // r0 Full in block 0; r1 First in block 0, Last in block 1; r2 Full.
        let written = vec![vec![0u8; 20_000], vec![1u8; 20_000], vec![2u8; 20_000]];
        let mut data = write_log(&written).data();
        data[HEADER_SIZE + 10] ^= 0xFF;

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![vec![2u8; 20_000]]);
        assert_eq!(counter.events, 2);
        let tail_of_r1 = 20_000 - (BLOCK_SIZE - (HEADER_SIZE + 20_000) - HEADER_SIZE);
        assert_eq!(counter.dropped_bytes, (BLOCK_SIZE + tail_of_r1) as u64);
        assert!(counter.first.unwrap().message().contains("checksum mismatch"));
    }

    #[test]
    fn checksums_can_be_skipped() {
        let mut data = write_log(&[b"hello".to_vec()]).data();
        data[HEADER_SIZE] = b'j';

        let options = ReaderOptions::new().verify_checksums(false);
        let (records, counter) = read_all_with(data, options);
        assert_eq!(records, vec![b"jello".to_vec()]);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn corrupted_header_length_is_reported() {
        let written = vec![b"one".to_vec(), b"two".to_vec()];
        let mut data = write_log(&written).data();
        // Second record claims more bytes than the block holds.
        data[HEADER_SIZE + 3 + 4] = 0xFF;
        data[HEADER_SIZE + 3 + 5] = 0x7F;
        // Pad so the block is not the last one.
        data.resize(BLOCK_SIZE, 0);
        data.extend(raw_record(RecordType::Full.as_byte(), b"three"));

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"one".to_vec(), b"three".to_vec()]);
        assert_eq!(counter.events, 1);
        assert_eq!(counter.dropped_bytes, (BLOCK_SIZE - HEADER_SIZE - 3) as u64);
    }

    #[test]
    fn zero_filled_tail_is_skipped() {
        let mut data = write_log(&[b"real".to_vec()]).data();
        data.resize(4096, 0);

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"real".to_vec()]);
        assert_eq!(counter.events, 0);
    }

    #[test]
    fn unknown_record_type_is_reported() {
        let mut data = raw_record(9, b"mystery");
        data.extend(raw_record(RecordType::Full.as_byte(), b"known"));

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"known".to_vec()]);
        assert_eq!(counter.events, 1);
        assert_eq!(counter.dropped_bytes, (HEADER_SIZE + 7) as u64);
        assert!(counter
            .first
            .unwrap()
            .message()
            .contains("unknown record type 9"));
    }

    #[test]
    fn orphan_fragments_are_reported() {
        let mut data = raw_record(RecordType::Middle.as_byte(), b"mid");
        data.extend(raw_record(RecordType::Last.as_byte(), b"last"));
        data.extend(raw_record(RecordType::Full.as_byte(), b"whole"));

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"whole".to_vec()]);
        assert_eq!(counter.events, 2);
        assert_eq!(counter.dropped_bytes, 7);
    }

    #[test]
    fn unterminated_fragment_is_reported() {
        let mut data = raw_record(RecordType::First.as_byte(), b"dangling");
        data.extend(raw_record(RecordType::Full.as_byte(), b"whole"));

        let (records, counter) = read_all(data);
        assert_eq!(records, vec![b"whole".to_vec()]);
        assert_eq!(counter.events, 1);
        assert_eq!(counter.dropped_bytes, 8);
    }

    #[derive(Debug)]
    struct BrokenFile;

    impl SequentialFile for BrokenFile {
        fn read(&mut self, _buf: &mut [u8]) -> StorageResult<usize> {
            Err(StorageError::io_error("disk on fire"))
        }

        fn skip(&mut self, _n: u64) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn read_errors_are_returned() {
        let mut reader = LogReader::new(BrokenFile);
        assert!(reader.read_record().unwrap_err().is_io_error());

        let mut iter = LogReader::new(BrokenFile);
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn iterator_yields_all_records() {
        let written: Vec<Vec<u8>> = (0..50u8).map(|i| vec![i; usize::from(i) * 300]).collect();
        let reader = LogReader::new(MemSequentialFile::new(&write_log(&written)));
        let records: Vec<Vec<u8>> = reader.collect::<StorageResult<_>>().unwrap();
        assert_eq!(records, written);
    }

    #[test]
    fn open_through_env() {
        let env = MemEnv::new();
        let path = Path::new("db/000003.log");
        let mut writer = LogWriter::create(&env, path).unwrap();
        writer.add_record(b"persisted").unwrap();

        let mut reader = LogReader::open(&env, path, ReaderOptions::default()).unwrap();
        assert_eq!(reader.read_record().unwrap().unwrap(), b"persisted");

        let missing = LogReader::open(&env, Path::new("db/none.log"), ReaderOptions::default());
        assert!(missing.err().unwrap().is_not_found());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_records_survive_round_trip(
            records in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40_000), 0..12)
        ) {
            let contents = write_log(&records);
            let (read, counter) = read_all(contents.data());
            prop_assert_eq!(read, records);
            prop_assert_eq!(counter.events, 0);
        }

        #[test]
        fn prop_resumed_log_reads_back(
            first in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..20_000), 0..6),
            second in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..20_000), 0..6),
        ) {
            let contents = write_log(&first);
            let mut writer =
                LogWriter::with_offset(MemWritableFile::new(contents.clone()), contents.len());
            for record in &second {
                writer.add_record(record).unwrap();
            }

            let (read, _) = read_all(contents.data());
            let expected: Vec<Vec<u8>> = first.into_iter().chain(second).collect();
            prop_assert_eq!(read, expected);
        }
    }
}
