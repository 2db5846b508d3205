//! Whole-log verification.

use crate::config::ReaderOptions;
use crate::wal::{CorruptionCounter, LogReader};
use tidelog_storage::{SequentialFile, StorageResult};
use tracing::{debug, warn};

/// Result of scanning a log from start to end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// Number of intact logical records.
    pub records: u64,
    /// Total payload bytes of those records.
    pub payload_bytes: u64,
    /// Offset of the last intact record, if any.
    pub last_record_offset: Option<u64>,
    /// Number of corruption events.
    pub corruptions: u64,
    /// Bytes dropped because of corruption.
    pub dropped_bytes: u64,
}

impl LogSummary {
    /// Returns true if no corruption was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corruptions == 0
    }
}

/// Reads every record in `file` and summarizes what was found.
///
/// Corruption does not stop the scan; it is counted in the summary. A torn
/// final record is treated as the end of the log and is not counted.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn verify_log<R: SequentialFile>(file: R, options: ReaderOptions) -> StorageResult<LogSummary> {
    let mut reader = LogReader::with_reporter(file, CorruptionCounter::default(), options);
    let mut summary = LogSummary::default();

    while let Some(record) = reader.read_record()? {
        summary.records += 1;
        summary.payload_bytes += record.len() as u64;
        summary.last_record_offset = Some(reader.last_record_offset());
    }

    let counter = reader.into_reporter();
    summary.corruptions = counter.events;
    summary.dropped_bytes = counter.dropped_bytes;

    if summary.is_clean() {
        debug!(records = summary.records, "log verified");
    } else {
        warn!(
            records = summary.records,
            corruptions = summary.corruptions,
            dropped_bytes = summary.dropped_bytes,
            "log has corruption"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{LogWriter, HEADER_SIZE};
    use tidelog_storage::{MemFile, MemSequentialFile, MemWritableFile};

    fn sample_log() -> MemFile {
        let contents = MemFile::new();
        let mut writer = LogWriter::new(MemWritableFile::new(contents.clone()));
        writer.add_record(b"alpha").unwrap();
        writer.add_record(&[0u8; 50_000]).unwrap();
        writer.add_record(b"omega").unwrap();
        contents
    }

    #[test]
    fn clean_log() {
        let summary =
            verify_log(MemSequentialFile::new(&sample_log()), ReaderOptions::default()).unwrap();
        assert!(summary.is_clean());
        assert_eq!(summary.records, 3);
        assert_eq!(summary.payload_bytes, 50_010);
        assert_eq!(summary.dropped_bytes, 0);
        assert!(summary.last_record_offset.unwrap() > 50_000);
    }

    #[test]
    fn empty_log() {
        let summary =
            verify_log(MemSequentialFile::from_bytes(Vec::new()), ReaderOptions::default())
                .unwrap();
        assert_eq!(summary, LogSummary::default());
    }

    #[test]
    fn corrupted_log() {
        let mut data = sample_log().data();
        data[HEADER_SIZE] ^= 0x01;

        let summary =
            verify_log(MemSequentialFile::from_bytes(data), ReaderOptions::default()).unwrap();
        assert!(!summary.is_clean());
        // The rest of block 0 is lost, taking the First fragment with it.
        assert_eq!(summary.records, 1);
        assert_eq!(summary.corruptions, 2);
    }

    #[test]
    fn corruption_invisible_without_checksums() {
        let mut data = sample_log().data();
        data[HEADER_SIZE] ^= 0x01;

        let options = ReaderOptions::new().verify_checksums(false);
        let summary = verify_log(MemSequentialFile::from_bytes(data), options).unwrap();
        assert!(summary.is_clean());
        assert_eq!(summary.records, 3);
    }
}
