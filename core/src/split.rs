//! End-to-end split of one transcript file into segment fixtures.

use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use crate::emit::emit_segment;
use crate::error::Result;
use crate::rewrite::rewrite_segment;
use crate::segment::SegmentStats;
use crate::segment::extract_segments;
use crate::segment::resolve_head;
use crate::transcript::Transcript;

/// One emitted segment file.
#[derive(Debug)]
pub struct SegmentOutput {
    pub session_id: Uuid,
    pub path: PathBuf,
    pub record_count: usize,
}

/// Best-effort summary of one split run.
///
/// Anomalies are reported here as counts rather than raised as errors; the
/// partition is always produced from whatever survived.
#[derive(Debug, Default)]
pub struct SplitReport {
    /// Records parsed, in physical order.
    pub records_total: usize,
    /// Records reachable by identifier.
    pub records_indexed: usize,
    /// Input lines dropped as unparseable.
    pub skipped_lines: usize,
    /// Identifier of the resolved head, when one exists.
    pub head: Option<String>,
    pub stats: SegmentStats,
    pub outputs: Vec<SegmentOutput>,
}

impl SplitReport {
    pub fn segment_count(&self) -> usize {
        self.outputs.len()
    }
}

/// Split `input` into per-segment logs under `output_dir`.
///
/// A transcript with no live head yields an empty report and writes
/// nothing; that is a normal outcome, not an error.
pub fn split_file(input: &Path, output_dir: &Path) -> Result<SplitReport> {
    let transcript = Transcript::load(input)?;
    info!(
        "loaded {} records ({} with identifiers) from {}",
        transcript.len(),
        transcript.indexed_len(),
        input.display()
    );

    let mut report = SplitReport {
        records_total: transcript.len(),
        records_indexed: transcript.indexed_len(),
        skipped_lines: transcript.skipped_lines(),
        ..Default::default()
    };

    let Some(head) = resolve_head(&transcript).map(str::to_string) else {
        info!("no live conversation head in {}; nothing to segment", input.display());
        return Ok(report);
    };
    report.head = Some(head.clone());

    let (segments, stats) = extract_segments(&transcript, &head);
    report.stats = stats;

    for segment in &segments {
        let session_id = Uuid::new_v4();
        let rewritten = rewrite_segment(segment, session_id);
        let path = emit_segment(output_dir, session_id, &rewritten)?;
        report.outputs.push(SegmentOutput {
            session_id,
            path,
            record_count: rewritten.len(),
        });
    }

    info!(
        "wrote {} segment(s) from {}",
        report.outputs.len(),
        input.display()
    );
    Ok(report)
}
