//! Identity rewriting: turn a segment into a self-contained log.

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::segment::Segment;
use crate::transcript::ID_FIELD;
use crate::transcript::PARENT_FIELD;
use crate::transcript::Record;
use crate::transcript::SESSION_FIELD;

/// Rewrite one segment under a fresh session identifier.
///
/// Every record receives a newly generated identifier and the supplied
/// session identifier. Parent references are remapped through the segment's
/// old→new table; a reference to anything outside the segment — always the
/// case for the first record, whose original parent was a compaction marker
/// or absent — becomes null. All other fields pass through unchanged.
pub fn rewrite_segment(segment: &Segment, session_id: Uuid) -> Vec<Record> {
    let session = session_id.to_string();
    let mut old_to_new: HashMap<String, String> = HashMap::new();
    let mut rewritten = Vec::with_capacity(segment.len());

    for record in segment.records() {
        let new_id = Uuid::new_v4().to_string();
        if let Some(old_id) = record.id() {
            old_to_new.insert(old_id.to_string(), new_id.clone());
        }

        let new_parent = record
            .parent_id()
            .and_then(|parent| old_to_new.get(parent))
            .map_or(Value::Null, |parent| Value::String(parent.clone()));

        let mut value = record.as_value().clone();
        if let Some(object) = value.as_object_mut() {
            object.insert(ID_FIELD.to_string(), Value::String(new_id));
            object.insert(SESSION_FIELD.to_string(), Value::String(session.clone()));
            object.insert(PARENT_FIELD.to_string(), new_parent);
        }
        rewritten.push(Record::new(value));
    }

    rewritten
}
