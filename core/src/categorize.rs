//! Stateless per-record display classification.
//!
//! Categories describe how a record would be transcribed by an exporter.
//! They are reporting labels only and play no part in segmentation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;

use crate::emit::write_jsonl;
use crate::error::Result;
use crate::scan::ScanOptions;
use crate::scan::is_truthy;
use crate::scan::visit_records;

/// Marker field added to exported category examples.
pub const CATEGORY_FIELD: &str = "_category";

/// Kinds that are never transcribed.
const UNTRANSCRIBED_TYPES: &[&str] = &["file-history-snapshot", "queue-operation", "summary"];

fn collect_block_types(blocks: &[Value]) -> BTreeSet<&str> {
    blocks
        .iter()
        .filter_map(|block| block.as_object())
        .map(|block| block.get("type").and_then(Value::as_str).unwrap_or("unknown"))
        .collect()
}

/// Label a record with its display category, or `None` when it should not
/// be transcribed at all.
pub fn categorize_record(record: &Value) -> Option<String> {
    let record_type = record.get("type").and_then(Value::as_str);

    if record_type.is_some_and(|kind| UNTRANSCRIBED_TYPES.contains(&kind)) {
        return None;
    }

    if record_type == Some("system") {
        let subtype = record.get("subtype").and_then(Value::as_str).unwrap_or("");
        return Some(format!("system:{subtype}"));
    }

    let message = record.get("message");
    if message.is_some_and(|message| !message.is_object()) {
        return None;
    }
    let content = message.and_then(|message| message.get("content"));

    if record_type == Some("user") {
        if record.get("toolUseResult").is_some_and(is_truthy) {
            return Some("user:tool_result".to_string());
        }

        if let Some(text) = content.and_then(Value::as_str) {
            if text.contains("<command-name>") || text.contains("<command-message>") {
                return Some("user:command_xml".to_string());
            }
            if text.starts_with("Caveat:") || text.contains("<local-command-caveat>") {
                return Some("user:with_caveat".to_string());
            }
            if text.contains("<local-command-stdout>") {
                return Some("user:local_stdout".to_string());
            }
            if text.starts_with("This session is being continued") {
                return Some("user:continuation".to_string());
            }
            return Some("user:text_string".to_string());
        }

        if let Some(blocks) = content.and_then(Value::as_array) {
            let block_types = collect_block_types(blocks);
            if block_types.contains("tool_result") {
                return Some("user:tool_result_block".to_string());
            }
            if block_types.contains("image") {
                return Some("user:with_image".to_string());
            }
            if block_types.contains("text") {
                return Some("user:text_blocks".to_string());
            }
            return Some(format!(
                "user:blocks:{:?}",
                block_types.iter().collect::<Vec<_>>()
            ));
        }
    }

    if record_type == Some("assistant") {
        let Some(blocks) = content.and_then(Value::as_array) else {
            return Some("assistant:non_list_content".to_string());
        };

        let block_types = collect_block_types(blocks);
        let has_text = blocks.iter().any(|block| {
            block.get("type").and_then(Value::as_str) == Some("text")
                && block
                    .get("text")
                    .and_then(Value::as_str)
                    .is_some_and(|text| !text.trim().is_empty())
        });
        let has_tool = block_types.contains("tool_use");

        if block_types.contains("thinking") {
            return Some(
                if has_text {
                    "assistant:thinking+text"
                } else {
                    "assistant:thinking_only"
                }
                .to_string(),
            );
        }
        if has_tool && !has_text {
            return Some("assistant:tool_only".to_string());
        }
        if has_tool && has_text {
            return Some("assistant:text+tool".to_string());
        }
        if has_text {
            return Some("assistant:text_only".to_string());
        }
        return Some(format!(
            "assistant:blocks:{:?}",
            block_types.iter().collect::<Vec<_>>()
        ));
    }

    Some(format!("unknown:{}", record_type.unwrap_or("NO_TYPE")))
}

/// Occurrence count and representative records for one category.
#[derive(Debug, Default)]
pub struct CategoryEntry {
    pub count: usize,
    /// Up to two example records.
    pub examples: Vec<Value>,
}

/// Aggregate categories over a projects directory.
pub fn scan_categories(
    projects_dir: &Path,
    options: ScanOptions,
) -> Result<BTreeMap<String, CategoryEntry>> {
    let mut categories: BTreeMap<String, CategoryEntry> = BTreeMap::new();

    visit_records(projects_dir, options, |_, record| {
        if let Some(category) = categorize_record(record) {
            let entry = categories.entry(category).or_default();
            entry.count += 1;
            if entry.examples.len() < 2 {
                entry.examples.push(record.clone());
            }
        }
    })?;

    Ok(categories)
}

/// Export one example per category, tagged with [`CATEGORY_FIELD`].
/// Returns how many were written.
pub fn export_category_examples(
    categories: &BTreeMap<String, CategoryEntry>,
    path: &Path,
) -> Result<usize> {
    let mut tagged = Vec::new();
    for (category, entry) in categories {
        let Some(example) = entry.examples.first() else {
            continue;
        };
        let mut example = example.clone();
        if let Some(object) = example.as_object_mut() {
            object.insert(CATEGORY_FIELD.to_string(), Value::String(category.clone()));
        }
        tagged.push(example);
    }
    write_jsonl(path, &tagged)?;
    Ok(tagged.len())
}
