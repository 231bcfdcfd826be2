//! In-memory transcript log: records in physical order plus identifier lookup.
//!
//! Records are kept as raw JSON objects so unknown payload fields survive a
//! rewrite untouched; the typed accessors below only read the handful of
//! fields the engine cares about. Physical (file) order and logical
//! (parent-link) order are tracked separately — physical order is the only
//! reliable order once a compaction severs the parent chain.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::error::Result;

pub(crate) const ID_FIELD: &str = "uuid";
pub(crate) const PARENT_FIELD: &str = "parentUuid";
pub(crate) const TYPE_FIELD: &str = "type";
pub(crate) const SUBTYPE_FIELD: &str = "subtype";
pub(crate) const SESSION_FIELD: &str = "sessionId";
pub(crate) const COMPACT_SUMMARY_FIELD: &str = "isCompactSummary";

/// Subtype of a system record that marks a compaction boundary.
const COMPACT_BOUNDARY_SUBTYPE: &str = "compact_boundary";

/// Classified record kinds. Anything outside the conversational set is
/// carried as [`RecordKind::Other`] and passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    User,
    Assistant,
    System,
    Summary,
    Other,
}

/// One line of a transcript log.
#[derive(Debug, Clone)]
pub struct Record {
    value: Value,
}

impl Record {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn id(&self) -> Option<&str> {
        self.value.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.value.get(PARENT_FIELD).and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.value.get(SESSION_FIELD).and_then(Value::as_str)
    }

    /// Raw value of the `type` field.
    pub fn record_type(&self) -> Option<&str> {
        self.value.get(TYPE_FIELD).and_then(Value::as_str)
    }

    pub fn subtype(&self) -> Option<&str> {
        self.value.get(SUBTYPE_FIELD).and_then(Value::as_str)
    }

    pub fn kind(&self) -> RecordKind {
        match self.record_type() {
            Some("user") => RecordKind::User,
            Some("assistant") => RecordKind::Assistant,
            Some("system") => RecordKind::System,
            Some("summary") => RecordKind::Summary,
            _ => RecordKind::Other,
        }
    }

    pub fn is_compact_summary(&self) -> bool {
        self.value
            .get(COMPACT_SUMMARY_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A compaction marker terminates a chain walk and is never emitted.
    pub fn is_compaction_marker(&self) -> bool {
        self.is_compact_summary()
            || (self.kind() == RecordKind::System
                && self.subtype() == Some(COMPACT_BOUNDARY_SUBTYPE))
    }

    /// A live conversational turn: a user or assistant message that is not
    /// a compaction summary.
    pub fn is_conversation_turn(&self) -> bool {
        matches!(self.kind(), RecordKind::User | RecordKind::Assistant)
            && !self.is_compact_summary()
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// A parsed transcript: records in file order plus an id → position index.
#[derive(Debug, Default)]
pub struct Transcript {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    skipped_lines: usize,
}

impl Transcript {
    /// Parse one record per line.
    ///
    /// Blank lines are ignored; lines that fail to parse are dropped and
    /// counted, never fatal. Records without an identifier are retained in
    /// physical order but are unreachable by identifier lookup.
    pub fn parse(text: &str) -> Self {
        let mut records = Vec::new();
        let mut index = HashMap::new();
        let mut skipped_lines = 0;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    let record = Record::new(value);
                    if let Some(id) = record.id() {
                        // Last occurrence wins on duplicate identifiers.
                        index.insert(id.to_string(), records.len());
                    }
                    records.push(record);
                }
                Err(err) => {
                    skipped_lines += 1;
                    debug!("dropping unparseable transcript line: {err}");
                }
            }
        }

        Self {
            records,
            index,
            skipped_lines,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records reachable by identifier lookup.
    pub fn indexed_len(&self) -> usize {
        self.index.len()
    }

    /// Input lines dropped as unparseable.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    /// Physical position of the record with this identifier.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

#[cfg(test)]
pub(crate) fn transcript_from_values(values: &[Value]) -> Transcript {
    let text = values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    Transcript::parse(&text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_skips_malformed_lines() {
        let text = concat!(
            "{\"uuid\":\"a\",\"type\":\"user\"}\n",
            "not json at all\n",
            "\n",
            "{\"uuid\":\"b\",\"type\":\"assistant\",\"parentUuid\":\"a\"}\n",
        );
        let transcript = Transcript::parse(text);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.skipped_lines(), 1);
        assert_eq!(transcript.get("b").unwrap().parent_id(), Some("a"));
    }

    #[test]
    fn records_without_identifier_stay_in_physical_order() {
        let transcript = transcript_from_values(&[
            json!({"type": "file-history-snapshot"}),
            json!({"uuid": "a", "type": "user"}),
        ]);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.indexed_len(), 1);
        assert_eq!(transcript.position("a"), Some(1));
    }

    #[test]
    fn duplicate_identifier_last_occurrence_wins() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "n": 1}),
            json!({"uuid": "a", "type": "user", "n": 2}),
        ]);
        assert_eq!(transcript.position("a"), Some(1));
        assert_eq!(transcript.get("a").unwrap().as_value()["n"], json!(2));
    }

    #[test]
    fn compaction_marker_forms() {
        let summary = Record::new(json!({"uuid": "s", "type": "user", "isCompactSummary": true}));
        assert!(summary.is_compaction_marker());
        assert!(!summary.is_conversation_turn());

        let boundary =
            Record::new(json!({"uuid": "b", "type": "system", "subtype": "compact_boundary"}));
        assert!(boundary.is_compaction_marker());

        let plain = Record::new(json!({"uuid": "p", "type": "system", "subtype": "other"}));
        assert!(!plain.is_compaction_marker());
    }

    #[test]
    fn kind_classification() {
        assert_eq!(Record::new(json!({"type": "user"})).kind(), RecordKind::User);
        assert_eq!(
            Record::new(json!({"type": "assistant"})).kind(),
            RecordKind::Assistant
        );
        assert_eq!(
            Record::new(json!({"type": "summary"})).kind(),
            RecordKind::Summary
        );
        assert_eq!(
            Record::new(json!({"type": "queue-operation"})).kind(),
            RecordKind::Other
        );
        assert_eq!(Record::new(json!({})).kind(), RecordKind::Other);
    }
}
