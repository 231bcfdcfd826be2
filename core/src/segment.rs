//! Segmentation: recover the live ancestor chain of a transcript and split
//! it into compaction-bounded sub-logs.
//!
//! The walk only ever follows parent links backward from a chosen head, so
//! branches abandoned by a revert are never visited. When a walk stops at a
//! compaction marker the logical chain is severed by construction; the
//! record immediately preceding the marker in file order is the only signal
//! for what came before, and segmentation continues from there. That
//! physical-adjacency fallback is an invariant of the input format, not a
//! heuristic discovered here.

use std::collections::HashSet;

use tracing::debug;
use tracing::warn;

use crate::transcript::Record;
use crate::transcript::Transcript;

/// Resolve the head of the live conversation: the last record in file order
/// that is a user or assistant turn and not a compaction summary.
///
/// `None` means there is nothing to segment.
pub fn resolve_head(transcript: &Transcript) -> Option<&str> {
    transcript
        .records()
        .iter()
        .rev()
        .find(|record| record.is_conversation_turn())
        .and_then(Record::id)
}

/// Terminal state of one backward walk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkEnd {
    /// A null parent link: the true start of the log.
    Root,
    /// Stopped in front of a compaction marker with this identifier.
    Boundary(String),
    /// The next identifier was not in the index.
    Missing,
    /// An identifier repeated within this walk.
    Cycle,
}

struct Walk {
    /// Physical positions of the collected records, newest first.
    chain: Vec<usize>,
    end: WalkEnd,
}

fn walk_chain(transcript: &Transcript, start: &str) -> Walk {
    let mut chain = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = Some(start.to_string());

    while let Some(id) = current {
        // A repeated identifier would walk forever; stop and report it.
        if !seen.insert(id.clone()) {
            return Walk {
                chain,
                end: WalkEnd::Cycle,
            };
        }
        let Some(pos) = transcript.position(&id) else {
            return Walk {
                chain,
                end: WalkEnd::Missing,
            };
        };
        let record = &transcript.records()[pos];
        if record.is_compaction_marker() {
            // The marker bounds the segment but is never part of it.
            return Walk {
                chain,
                end: WalkEnd::Boundary(id),
            };
        }
        chain.push(pos);
        current = record.parent_id().map(str::to_string);
    }

    Walk {
        chain,
        end: WalkEnd::Root,
    }
}

/// The record physically preceding a compaction marker starts the previous
/// chain; the marker's own parent link does not point there.
fn previous_chain_head(transcript: &Transcript, marker_id: &str) -> Option<String> {
    let pos = transcript.position(marker_id)?;
    let prev = pos.checked_sub(1)?;
    transcript.records().get(prev)?.id().map(str::to_string)
}

/// One compaction-bounded slice of the live history, oldest record first.
#[derive(Debug)]
pub struct Segment {
    records: Vec<Record>,
}

impl Segment {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Anomaly counters for one segmentation run.
///
/// These are data-quality signals, not failures; the partition is still
/// produced best-effort.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStats {
    /// Walks that ended on a parent identifier absent from the index.
    pub broken_chains: usize,
    /// Walks that revisited an identifier.
    pub cycles: usize,
}

/// Split the live ancestry of `head` into segments, oldest segment first.
pub fn extract_segments(transcript: &Transcript, head: &str) -> (Vec<Segment>, SegmentStats) {
    let mut segments = Vec::new();
    let mut stats = SegmentStats::default();
    let mut current_head = Some(head.to_string());

    while let Some(start) = current_head.take() {
        let walk = walk_chain(transcript, &start);
        match &walk.end {
            WalkEnd::Root => {}
            WalkEnd::Boundary(marker_id) => {
                current_head = previous_chain_head(transcript, marker_id);
                if current_head.is_none() {
                    debug!("marker {marker_id} has no identified physical predecessor; at start of log");
                }
            }
            WalkEnd::Missing => {
                stats.broken_chains += 1;
                warn!(
                    "parent chain broken after {} records; emitting partial segment",
                    walk.chain.len()
                );
            }
            WalkEnd::Cycle => {
                stats.cycles += 1;
                warn!("parent chain revisits an identifier; emitting partial segment");
            }
        }

        if !walk.chain.is_empty() {
            let mut records: Vec<Record> = walk
                .chain
                .iter()
                .map(|&pos| transcript.records()[pos].clone())
                .collect();
            // Collected newest first; segments are chronological.
            records.reverse();
            segments.push(Segment { records });
        }
    }

    // Discovery order is newest segment first; callers expect oldest first.
    segments.reverse();
    (segments, stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transcript::transcript_from_values;

    fn segment_ids(segment: &Segment) -> Vec<&str> {
        segment.records().iter().filter_map(Record::id).collect()
    }

    #[test]
    fn splits_at_compaction_marker_using_physical_fallback() {
        // A <- B <- C, then a boundary marker with no parent, then D whose
        // parent link points at the marker, then E.
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": null}),
            json!({"uuid": "b", "type": "assistant", "parentUuid": "a"}),
            json!({"uuid": "c", "type": "user", "parentUuid": "b"}),
            json!({"uuid": "m", "type": "system", "subtype": "compact_boundary", "parentUuid": null}),
            json!({"uuid": "d", "type": "user", "parentUuid": "m"}),
            json!({"uuid": "e", "type": "assistant", "parentUuid": "d"}),
        ]);

        let head = resolve_head(&transcript).unwrap();
        assert_eq!(head, "e");

        let (segments, stats) = extract_segments(&transcript, head);
        assert_eq!(segments.len(), 2);
        assert_eq!(segment_ids(&segments[0]), vec!["a", "b", "c"]);
        assert_eq!(segment_ids(&segments[1]), vec!["d", "e"]);
        assert_eq!(stats, SegmentStats::default());

        // The marker itself is never part of any segment.
        let total: usize = segments.iter().map(Segment::len).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn empty_log_has_no_head() {
        let transcript = transcript_from_values(&[]);
        assert!(resolve_head(&transcript).is_none());
    }

    #[test]
    fn head_skips_summaries_and_non_conversation_records() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": null}),
            json!({"uuid": "b", "type": "assistant", "parentUuid": "a"}),
            json!({"uuid": "s", "type": "user", "isCompactSummary": true, "parentUuid": null}),
            json!({"type": "file-history-snapshot"}),
        ]);
        assert_eq!(resolve_head(&transcript), Some("b"));
    }

    #[test]
    fn log_of_only_markers_has_no_head() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "s", "type": "user", "isCompactSummary": true}),
            json!({"uuid": "m", "type": "system", "subtype": "compact_boundary"}),
        ]);
        assert!(resolve_head(&transcript).is_none());
    }

    #[test]
    fn dangling_parent_truncates_the_segment() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": null}),
            json!({"uuid": "b", "type": "user", "parentUuid": "missing"}),
        ]);

        let head = resolve_head(&transcript).unwrap();
        assert_eq!(head, "b");

        let (segments, stats) = extract_segments(&transcript, head);
        assert_eq!(segments.len(), 1);
        assert_eq!(segment_ids(&segments[0]), vec!["b"]);
        assert_eq!(stats.broken_chains, 1);
        assert_eq!(stats.cycles, 0);
    }

    #[test]
    fn branch_not_reachable_from_head_is_dropped() {
        // B and C share parent A; only C is on the live path.
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": null}),
            json!({"uuid": "b", "type": "assistant", "parentUuid": "a"}),
            json!({"uuid": "c", "type": "assistant", "parentUuid": "a"}),
        ]);

        let head = resolve_head(&transcript).unwrap();
        assert_eq!(head, "c");

        let (segments, _) = extract_segments(&transcript, head);
        assert_eq!(segments.len(), 1);
        assert_eq!(segment_ids(&segments[0]), vec!["a", "c"]);
    }

    #[test]
    fn cycle_is_reported_instead_of_looping() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": "b"}),
            json!({"uuid": "b", "type": "assistant", "parentUuid": "a"}),
        ]);

        let (segments, stats) = extract_segments(&transcript, "b");
        assert_eq!(stats.cycles, 1);
        assert_eq!(segments.len(), 1);
        assert_eq!(segment_ids(&segments[0]), vec!["a", "b"]);
    }

    #[test]
    fn marker_as_first_physical_record_ends_segmentation() {
        let transcript = transcript_from_values(&[
            json!({"uuid": "m", "type": "system", "subtype": "compact_boundary"}),
            json!({"uuid": "d", "type": "user", "parentUuid": "m"}),
            json!({"uuid": "e", "type": "assistant", "parentUuid": "d"}),
        ]);

        let (segments, stats) = extract_segments(&transcript, "e");
        assert_eq!(segments.len(), 1);
        assert_eq!(segment_ids(&segments[0]), vec!["d", "e"]);
        assert_eq!(stats, SegmentStats::default());
    }

    #[test]
    fn marker_preceded_by_unidentified_record_ends_segmentation() {
        let transcript = transcript_from_values(&[
            json!({"type": "file-history-snapshot"}),
            json!({"uuid": "m", "type": "system", "subtype": "compact_boundary"}),
            json!({"uuid": "d", "type": "user", "parentUuid": "m"}),
        ]);

        let (segments, _) = extract_segments(&transcript, "d");
        assert_eq!(segments.len(), 1);
        assert_eq!(segment_ids(&segments[0]), vec!["d"]);
    }

    #[test]
    fn compact_summary_parent_also_bounds_a_segment() {
        // The boundary can be a summary record rather than a system marker.
        let transcript = transcript_from_values(&[
            json!({"uuid": "a", "type": "user", "parentUuid": null}),
            json!({"uuid": "s", "type": "user", "isCompactSummary": true, "parentUuid": null}),
            json!({"uuid": "d", "type": "user", "parentUuid": "s"}),
        ]);

        let (segments, _) = extract_segments(&transcript, "d");
        assert_eq!(segments.len(), 2);
        assert_eq!(segment_ids(&segments[0]), vec!["a"]);
        assert_eq!(segment_ids(&segments[1]), vec!["d"]);
    }
}
