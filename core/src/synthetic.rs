//! Assemble a synthetic single-chain transcript from categorized examples.
//!
//! The result is a fresh log whose records are real examples strung onto a
//! linear parent chain under one synthetic session, suitable for driving an
//! exporter end-to-end without shipping anyone's actual history.

use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::datetime;
use time::macros::format_description;
use uuid::Uuid;

use crate::categorize::CATEGORY_FIELD;
use crate::emit::write_jsonl;
use crate::error::Error;
use crate::error::Result;

/// Categories whose examples render cleanly in an exported transcript.
const INCLUDE_CATEGORIES: &[&str] = &[
    "user:text_string",
    "user:text_blocks",
    "user:command_xml",
    "user:continuation",
    "user:local_stdout",
    "user:with_image",
    "user:blocks:[\"document\"]",
    "assistant:text_only",
    "assistant:tool_only",
    "assistant:text+tool",
    "assistant:thinking_only",
];

/// Category prefixes that are noise in a synthetic log.
const SKIP_PREFIXES: &[&str] = &["user:tool_result", "user:with_caveat", "system:"];

/// Special fields carried over from the example when present.
const CARRIED_FIELDS: &[&str] = &["toolUseResult", "isCompactSummary", "isMeta", "agentId"];

const SYNTHETIC_CWD: &str = "/tmp/tsplit-fixture";
const SYNTHETIC_VERSION: &str = "2.1.5";

/// Start of the synthetic clock; each record lands one minute later.
const BASE_TIME: OffsetDateTime = datetime!(2026-01-13 10:00:00 UTC);

fn should_include(category: &str) -> bool {
    if SKIP_PREFIXES.iter().any(|skip| category.starts_with(skip)) {
        return false;
    }
    INCLUDE_CATEGORIES.contains(&category)
}

fn synthetic_timestamp(index: usize) -> Result<String> {
    let format: &[FormatItem] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].000Z");
    let stamp = BASE_TIME + Duration::minutes(index as i64);
    Ok(stamp.format(format)?)
}

/// Result of a synthetic build.
#[derive(Debug)]
pub struct SyntheticLog {
    pub session_id: Uuid,
    pub path: PathBuf,
    /// Categories of the included records, in output order.
    pub categories: Vec<String>,
}

/// Build a fresh linear transcript from a category-examples export and
/// write it to `<output_dir>/<session_id>.jsonl`.
pub fn build_synthetic_log(examples_path: &Path, output_dir: &Path) -> Result<SyntheticLog> {
    let text = std::fs::read_to_string(examples_path).map_err(|source| Error::ReadFile {
        path: examples_path.to_path_buf(),
        source,
    })?;

    let mut examples = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(trimmed)?;
        let include = record
            .get(CATEGORY_FIELD)
            .and_then(Value::as_str)
            .is_some_and(should_include);
        if include {
            examples.push(record);
        }
    }

    let session_id = Uuid::new_v4();
    let mut records = Vec::with_capacity(examples.len());
    let mut categories = Vec::with_capacity(examples.len());
    let mut parent = Value::Null;

    for (index, example) in examples.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        let category = example.get(CATEGORY_FIELD).cloned().unwrap_or(Value::Null);
        categories.push(
            category
                .as_str()
                .unwrap_or_default()
                .to_string(),
        );

        let mut record = Map::new();
        record.insert("uuid".to_string(), json!(id));
        record.insert("parentUuid".to_string(), std::mem::take(&mut parent));
        record.insert(
            "type".to_string(),
            example.get("type").cloned().unwrap_or(Value::Null),
        );
        record.insert(
            "message".to_string(),
            example.get("message").cloned().unwrap_or(Value::Null),
        );
        record.insert("sessionId".to_string(), json!(session_id.to_string()));
        record.insert("isSidechain".to_string(), json!(false));
        record.insert("userType".to_string(), json!("external"));
        record.insert("cwd".to_string(), json!(SYNTHETIC_CWD));
        record.insert("version".to_string(), json!(SYNTHETIC_VERSION));
        record.insert("gitBranch".to_string(), json!(""));
        record.insert("timestamp".to_string(), json!(synthetic_timestamp(index)?));
        record.insert(CATEGORY_FIELD.to_string(), category);

        for field in CARRIED_FIELDS {
            if let Some(value) = example.get(*field) {
                record.insert((*field).to_string(), value.clone());
            }
        }

        parent = json!(id);
        records.push(Value::Object(record));
    }

    let path = output_dir.join(format!("{session_id}.jsonl"));
    write_jsonl(&path, &records)?;

    Ok(SyntheticLog {
        session_id,
        path,
        categories,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn write_examples(dir: &Path, lines: &[Value]) -> PathBuf {
        let path = dir.join("categorized_examples.jsonl");
        let text = lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn builds_a_linear_chain_under_one_session() {
        let dir = TempDir::new().unwrap();
        let examples = write_examples(
            dir.path(),
            &[
                json!({"_category": "user:text_string", "type": "user",
                       "message": {"content": "hi"}}),
                json!({"_category": "assistant:text_only", "type": "assistant",
                       "message": {"content": [{"type": "text", "text": "hello"}]}}),
                json!({"_category": "user:tool_result", "type": "user",
                       "message": {"content": "skipped"}}),
                json!({"_category": "system:init", "type": "system"}),
            ],
        );

        let log = build_synthetic_log(&examples, dir.path()).unwrap();
        assert_eq!(
            log.categories,
            vec!["user:text_string", "assistant:text_only"]
        );
        assert_eq!(
            log.path.file_name().and_then(|name| name.to_str()),
            Some(format!("{}.jsonl", log.session_id).as_str())
        );

        let text = std::fs::read_to_string(&log.path).unwrap();
        let records: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);

        assert!(records[0]["parentUuid"].is_null());
        assert_eq!(records[1]["parentUuid"], records[0]["uuid"]);
        for record in &records {
            assert_eq!(record["sessionId"], json!(log.session_id.to_string()));
        }
        assert_eq!(records[0]["timestamp"], json!("2026-01-13T10:00:00.000Z"));
        assert_eq!(records[1]["timestamp"], json!("2026-01-13T10:01:00.000Z"));
    }

    #[test]
    fn special_fields_are_carried_over() {
        let dir = TempDir::new().unwrap();
        let examples = write_examples(
            dir.path(),
            &[json!({"_category": "assistant:tool_only", "type": "assistant",
                     "message": {"content": [{"type": "tool_use", "name": "Bash", "input": {}}]},
                     "isMeta": true})],
        );

        let log = build_synthetic_log(&examples, dir.path()).unwrap();
        let text = std::fs::read_to_string(&log.path).unwrap();
        let record: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(record["isMeta"], json!(true));
        assert_eq!(record["cwd"], json!(SYNTHETIC_CWD));
    }

    #[test]
    fn timestamps_roll_over_the_hour() {
        assert_eq!(synthetic_timestamp(0).unwrap(), "2026-01-13T10:00:00.000Z");
        assert_eq!(synthetic_timestamp(61).unwrap(), "2026-01-13T11:01:00.000Z");
    }

    #[test]
    fn records_without_category_are_excluded() {
        let dir = TempDir::new().unwrap();
        let examples = write_examples(
            dir.path(),
            &[json!({"type": "user", "message": {"content": "no category"}})],
        );

        let log = build_synthetic_log(&examples, dir.path()).unwrap();
        assert!(log.categories.is_empty());
        let text = std::fs::read_to_string(&log.path).unwrap();
        assert!(text.is_empty());
    }
}
