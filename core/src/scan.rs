//! Shared scanning over a directory tree of transcript logs.
//!
//! The expected layout is `<projects_dir>/<project>/<session>.jsonl`.
//! Projects and files are visited in sorted order so reports are
//! deterministic across runs.

use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;

/// Caps for a directory scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Stop after this many log files across all projects.
    pub max_files: usize,
    /// Stop reading a file after this many lines.
    pub max_lines_per_file: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_files: 100,
            max_lines_per_file: 2000,
        }
    }
}

/// Totals for a completed scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanTotals {
    pub files_scanned: usize,
    pub records_scanned: usize,
}

/// Present-and-truthy test used for flag-like fields, mirroring how the
/// transcript format leaves flags absent rather than false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::ScanDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Visit every parseable record under `projects_dir`, up to the caps.
///
/// Unreadable files and unparseable lines are skipped with a warning; only
/// a missing or unreadable `projects_dir` itself is an error.
pub(crate) fn visit_records(
    projects_dir: &Path,
    options: ScanOptions,
    mut visit: impl FnMut(&Path, &Value),
) -> Result<ScanTotals> {
    let mut totals = ScanTotals::default();

    'projects: for project in sorted_entries(projects_dir)? {
        if !project.is_dir() {
            continue;
        }
        let files = match sorted_entries(&project) {
            Ok(files) => files,
            Err(err) => {
                warn!("skipping unreadable project directory: {err}");
                continue;
            }
        };
        for file in files {
            if file.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            if totals.files_scanned >= options.max_files {
                break 'projects;
            }
            totals.files_scanned += 1;

            let text = match std::fs::read_to_string(&file) {
                Ok(text) => text,
                Err(err) => {
                    warn!("failed to read {}: {err}", file.display());
                    continue;
                }
            };
            for line in text.lines().take(options.max_lines_per_file) {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                    totals.records_scanned += 1;
                    visit(&file, &value);
                }
            }
        }
    }

    Ok(totals)
}
