//! Integration tests against the real file system.

use std::path::Path;
use tempfile::tempdir;
use tidelog_core::{verify_log, LogReader, LogWriter, ReaderOptions, BLOCK_SIZE, HEADER_SIZE};
use tidelog_storage::{
    default_env, Env, FileOptions, PosixSequentialFile, PosixWritableFile, SyncMode,
    WritableFile,
};

fn read_all(path: &Path) -> Vec<Vec<u8>> {
    LogReader::open(default_env(), path, ReaderOptions::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn write_sync_and_read_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.log");

    let mut writer = LogWriter::create(default_env(), &path).unwrap();
    let records: Vec<Vec<u8>> = (0..20u32)
        .map(|i| i.to_le_bytes().repeat(i as usize * 500))
        .collect();
    for record in &records {
        writer.add_record(record).unwrap();
    }
    writer.sync().unwrap();

    assert_eq!(
        default_env().file_size(&path).unwrap() % BLOCK_SIZE as u64,
        writer.block_offset() as u64
    );
    assert_eq!(read_all(&path), records);
}

#[test]
fn resume_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000002.log");

    {
        let mut writer = LogWriter::create(default_env(), &path).unwrap();
        writer.add_record(&vec![1u8; BLOCK_SIZE]).unwrap();
        writer.add_record(b"before").unwrap();
        writer.file_mut().close().unwrap();
    }

    let length = default_env().file_size(&path).unwrap();
    let mut writer = LogWriter::resume(default_env(), &path).unwrap();
    assert_eq!(writer.block_offset() as u64, length % BLOCK_SIZE as u64);
    writer.add_record(b"after").unwrap();
    writer.add_record(&vec![2u8; 70_000]).unwrap();
    writer.sync().unwrap();
    drop(writer);

    let records = read_all(&path);
    assert_eq!(records.len(), 4);
    assert_eq!(records[1], b"before");
    assert_eq!(records[2], b"after");
    assert_eq!(records[3], vec![2u8; 70_000]);
}

#[test]
fn crash_torn_tail_recovers_earlier_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000003.log");

    let mut writer = LogWriter::create(default_env(), &path).unwrap();
    writer.add_record(b"committed").unwrap();
    writer.add_record(&vec![7u8; 5000]).unwrap();
    writer.sync().unwrap();
    drop(writer);

    // Simulate a crash halfway through the second record.
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len((HEADER_SIZE + 9 + HEADER_SIZE + 2500) as u64).unwrap();
    drop(file);

    let file = PosixSequentialFile::open(&path).unwrap();
    let summary = verify_log(file, ReaderOptions::default()).unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.records, 1);
    assert_eq!(read_all(&path), vec![b"committed".to_vec()]);
}

#[test]
fn manifest_log_with_small_buffer_and_full_sync() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("MANIFEST-000004");
    let options = FileOptions::new().buffer_size(100).sync_mode(SyncMode::All);

    let file = PosixWritableFile::create_with(&path, options).unwrap();
    assert!(file.is_manifest());

    let mut writer = LogWriter::new(file);
    writer.add_record(b"edit: add file 5").unwrap();
    writer.add_record(&vec![3u8; 1000]).unwrap();
    writer.sync().unwrap();
    writer.into_inner().close().unwrap();

    assert_eq!(
        read_all(&path),
        vec![b"edit: add file 5".to_vec(), vec![3u8; 1000]]
    );
}

#[test]
fn corrupted_file_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000005.log");

    let mut writer = LogWriter::create(default_env(), &path).unwrap();
    writer.add_record(b"first").unwrap();
    writer.add_record(b"second").unwrap();
    writer.sync().unwrap();
    drop(writer);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[HEADER_SIZE + 1] ^= 0x40;
    std::fs::write(&path, &bytes).unwrap();

    let file = PosixSequentialFile::open(&path).unwrap();
    let summary = verify_log(file, ReaderOptions::default()).unwrap();
    assert!(!summary.is_clean());
    assert_eq!(summary.records, 0);
    assert_eq!(summary.dropped_bytes, bytes.len() as u64);
}
