//! Dump command implementation.

use super::{CliError, CliResult};
use serde::Serialize;
use std::path::Path;
use tidelog_core::{LogReader, ReaderOptions};
use tidelog_storage::{default_env, Env};

/// Bytes of payload shown in the preview.
const PREVIEW_LEN: usize = 32;

/// Log record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset of the record's first fragment in the file.
    pub offset: u64,
    /// Payload length in bytes.
    pub length: usize,
    /// Printable preview of the payload.
    pub preview: String,
}

/// Runs the dump command.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> CliResult<()> {
    let records = read_records(path, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn read_records(path: &Path, limit: Option<usize>) -> CliResult<Vec<RecordInfo>> {
    let env = default_env();
    if !env.file_exists(path) {
        return Err(CliError::MissingFile(path.to_path_buf()));
    }

    let mut reader = LogReader::open(env, path, ReaderOptions::default())?;
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    while records.len() < max_records {
        let Some(payload) = reader.read_record()? else {
            break;
        };
        records.push(RecordInfo {
            offset: reader.last_record_offset(),
            length: payload.len(),
            preview: preview(&payload),
        });
    }

    Ok(records)
}

/// Renders up to `PREVIEW_LEN` bytes, escaping anything not printable.
fn preview(payload: &[u8]) -> String {
    let shown = &payload[..payload.len().min(PREVIEW_LEN)];
    let mut out: String = shown
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect();
    if payload.len() > PREVIEW_LEN {
        out.push_str("...");
    }
    out
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Log Records ({} total)", records.len());
    println!("================");
    println!();

    for record in records {
        println!(
            "[{:08}] {:>8} bytes  {}",
            record.offset, record.length, record.preview
        );
    }
}
