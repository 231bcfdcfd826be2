//! Root of the `tsplit-core` library.

// Library code reports through the tracing stack only; user-visible output
// belongs to the CLI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod analyze;
mod categorize;
mod emit;
mod error;
mod rewrite;
mod scan;
mod segment;
mod split;
mod synthetic;
mod transcript;

pub use analyze::StructureReport;
pub use analyze::StructureVariant;
pub use analyze::analyze_projects;
pub use analyze::export_structure_examples;
pub use analyze::structure_signature;
pub use categorize::CATEGORY_FIELD;
pub use categorize::CategoryEntry;
pub use categorize::categorize_record;
pub use categorize::export_category_examples;
pub use categorize::scan_categories;
pub use emit::emit_segment;
pub use emit::write_jsonl;
pub use error::Error;
pub use error::Result;
pub use rewrite::rewrite_segment;
pub use scan::ScanOptions;
pub use scan::ScanTotals;
pub use segment::Segment;
pub use segment::SegmentStats;
pub use segment::extract_segments;
pub use segment::resolve_head;
pub use split::SegmentOutput;
pub use split::SplitReport;
pub use split::split_file;
pub use synthetic::SyntheticLog;
pub use synthetic::build_synthetic_log;
pub use transcript::Record;
pub use transcript::RecordKind;
pub use transcript::Transcript;
