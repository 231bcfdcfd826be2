//! Serialize records to standalone JSONL logs.

use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;
use crate::error::Result;
use crate::transcript::Record;

/// Write values as one JSON object per line, creating parent directories.
pub fn write_jsonl<'a>(path: &Path, values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
    let write_err = |source| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut out = String::new();
    for value in values {
        out.push_str(&serde_json::to_string(value)?);
        out.push('\n');
    }
    std::fs::write(path, out).map_err(write_err)
}

/// Emit one rewritten segment under its session-derived file name.
pub fn emit_segment(output_dir: &Path, session_id: Uuid, records: &[Record]) -> Result<PathBuf> {
    let path = output_dir.join(format!("{session_id}.jsonl"));
    write_jsonl(&path, records.iter().map(Record::as_value))?;
    Ok(path)
}
