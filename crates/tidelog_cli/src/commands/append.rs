//! Append command implementation.

use super::CliResult;
use std::path::Path;
use tidelog_core::LogWriter;
use tidelog_storage::default_env;
use tracing::info;

/// Summary of an append run.
#[derive(Debug, PartialEq, Eq)]
pub struct AppendResult {
    /// Records appended.
    pub records: usize,
    /// Payload bytes appended.
    pub bytes: usize,
    /// Position within the current block after the last record.
    pub block_offset: usize,
}

/// Runs the append command.
pub fn run(path: &Path, records: &[String], resume: bool, sync: bool) -> CliResult<()> {
    let result = append(path, records, resume, sync)?;
    println!(
        "Appended {} record(s), {} bytes (block offset {})",
        result.records, result.bytes, result.block_offset
    );
    Ok(())
}

fn append(path: &Path, records: &[String], resume: bool, sync: bool) -> CliResult<AppendResult> {
    let env = default_env();
    let mut writer = if resume {
        LogWriter::resume(env, path)?
    } else {
        LogWriter::create(env, path)?
    };

    let mut bytes = 0;
    for record in records {
        writer.add_record(record.as_bytes())?;
        bytes += record.len();
    }
    if sync {
        writer.sync()?;
    }
    writer.file_mut().close()?;

    info!(path = %path.display(), records = records.len(), bytes, "appended records");
    Ok(AppendResult {
        records: records.len(),
        bytes,
        block_offset: writer.block_offset(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tidelog_core::{LogReader, ReaderOptions, HEADER_SIZE};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn append_creates_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000001.log");

        let result = append(&path, &strings(&["a", "bc"]), false, true).unwrap();
        assert_eq!(result.records, 2);
        assert_eq!(result.bytes, 3);
        assert_eq!(result.block_offset, 2 * HEADER_SIZE + 3);
    }

    #[test]
    fn append_resume_extends_and_plain_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000001.log");

        append(&path, &strings(&["one"]), false, false).unwrap();
        append(&path, &strings(&["two"]), true, false).unwrap();
        let records: Vec<Vec<u8>> =
            LogReader::open(default_env(), &path, ReaderOptions::default())
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
        assert_eq!(records, vec![b"one".to_vec(), b"two".to_vec()]);

        append(&path, &strings(&["three"]), false, false).unwrap();
        let records: Vec<Vec<u8>> =
            LogReader::open(default_env(), &path, ReaderOptions::default())
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
        assert_eq!(records, vec![b"three".to_vec()]);
    }

    #[test]
    fn append_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/000001.log");
        assert!(append(&path, &strings(&["x"]), false, false).is_err());
    }
}
