//! Discover structural variants across a directory tree of transcript logs.
//!
//! Records with the same shape collapse onto one signature; volatile
//! per-record fields are wildcarded so they do not explode the variant set,
//! while `type` fields keep their value so differently-typed records stay
//! distinct.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use crate::emit::write_jsonl;
use crate::error::Result;
use crate::scan::ScanOptions;
use crate::scan::ScanTotals;
use crate::scan::is_truthy;
use crate::scan::visit_records;

/// Fields whose values vary per record without changing its shape.
const VOLATILE_FIELDS: &[&str] = &[
    "uuid",
    "parentUuid",
    "timestamp",
    "sessionId",
    "requestId",
    "id",
    "messageId",
    "leafUuid",
    "cwd",
    "gitBranch",
    "version",
    "usage",
    "snapshot",
    "durationMs",
    "stop_reason",
    "stop_sequence",
];

/// Flag-like fields tallied when present and truthy.
const SPECIAL_FIELDS: &[&str] = &[
    "isCompactSummary",
    "toolUseResult",
    "isSidechain",
    "isCompletedToolBlock",
    "isMeta",
    "agentId",
];

/// Canonical signature of a JSON value's structure.
///
/// Object keys are sorted, volatile fields appear as `key:*`, a list is
/// represented by its first element, and strings under a `.type` path
/// capture their value.
pub fn structure_signature(value: &Value, path: &str) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    if VOLATILE_FIELDS.contains(&key.as_str()) {
                        format!("{key}:*")
                    } else {
                        let child_path = format!("{path}.{key}");
                        format!("{key}:{}", structure_signature(&map[key], &child_path))
                    }
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => match items.first() {
            Some(first) => format!("[{}]", structure_signature(first, &format!("{path}[0]"))),
            None => "[]".to_string(),
        },
        Value::String(text) => {
            if path.ends_with(".type") {
                format!("str:{text}")
            } else {
                "str".to_string()
            }
        }
        Value::Bool(_) => "bool".to_string(),
        Value::Number(number) => {
            if number.is_i64() || number.is_u64() {
                "int".to_string()
            } else {
                "float".to_string()
            }
        }
        Value::Null => "null".to_string(),
    }
}

/// One unique structure with a representative example.
#[derive(Debug)]
pub struct StructureVariant {
    pub count: usize,
    /// First record seen with this structure.
    pub example: Value,
    /// File the example came from.
    pub source: PathBuf,
}

/// Aggregated structural report over a projects directory.
#[derive(Debug, Default)]
pub struct StructureReport {
    pub totals: ScanTotals,
    pub type_counts: BTreeMap<String, usize>,
    pub content_block_types: BTreeMap<String, usize>,
    pub tool_names: BTreeMap<String, usize>,
    pub special_fields: BTreeMap<String, usize>,
    /// Keyed by structure signature.
    pub structures: BTreeMap<String, StructureVariant>,
}

pub fn analyze_projects(projects_dir: &Path, options: ScanOptions) -> Result<StructureReport> {
    let mut report = StructureReport::default();

    let totals = visit_records(projects_dir, options, |path, record| {
        let record_type = record
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("NO_TYPE");
        *report.type_counts.entry(record_type.to_string()).or_default() += 1;

        for field in SPECIAL_FIELDS {
            if record.get(*field).is_some_and(is_truthy) {
                *report.special_fields.entry((*field).to_string()).or_default() += 1;
            }
        }

        match record.get("message").and_then(|message| message.get("content")) {
            Some(Value::Array(blocks)) => {
                for block in blocks {
                    let Some(block) = block.as_object() else {
                        continue;
                    };
                    let block_type = block
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    *report
                        .content_block_types
                        .entry(block_type.to_string())
                        .or_default() += 1;
                    if block_type == "tool_use" {
                        let name = block
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown");
                        *report.tool_names.entry(name.to_string()).or_default() += 1;
                    }
                }
            }
            Some(Value::String(_)) => {
                *report
                    .content_block_types
                    .entry("STRING_CONTENT".to_string())
                    .or_default() += 1;
            }
            _ => {}
        }

        report
            .structures
            .entry(structure_signature(record, ""))
            .and_modify(|variant| variant.count += 1)
            .or_insert_with(|| StructureVariant {
                count: 1,
                example: record.clone(),
                source: path.to_path_buf(),
            });
    })?;

    report.totals = totals;
    Ok(report)
}

/// Write one example record per structure variant. Returns how many.
pub fn export_structure_examples(report: &StructureReport, path: &Path) -> Result<usize> {
    write_jsonl(path, report.structures.values().map(|variant| &variant.example))?;
    Ok(report.structures.len())
}
