//! `tsplit` — offline toolkit for conversational transcript logs.
//!
//! Subcommands: `split` (cut a log into replayable fixtures at compaction
//! boundaries), `analyze` (survey record structure variants), `categorize`
//! (survey display categories), and `synth` (assemble a synthetic log from
//! categorized examples).

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tsplit_core::CategoryEntry;
use tsplit_core::ScanOptions;
use tsplit_core::SplitReport;
use tsplit_core::StructureReport;
use tsplit_core::analyze_projects;
use tsplit_core::build_synthetic_log;
use tsplit_core::export_category_examples;
use tsplit_core::export_structure_examples;
use tsplit_core::scan_categories;
use tsplit_core::split_file;

/// Transcript segmentation toolkit
#[derive(Debug, Parser)]
#[command(name = "tsplit", version, about = "Offline toolkit for transcript logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split transcript logs into per-segment fixture files
    Split(SplitArgs),
    /// Report unique record structure variants across logged sessions
    Analyze(ScanArgs),
    /// Report per-record display categories across logged sessions
    Categorize(ScanArgs),
    /// Build a synthetic transcript from categorized examples
    Synth(SynthArgs),
}

#[derive(Debug, Parser)]
struct SplitArgs {
    /// Input JSONL transcript files
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Output directory for segment files
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: PathBuf,
}

#[derive(Debug, Parser)]
struct ScanArgs {
    /// Directory of per-project transcript logs (defaults to ~/.claude/projects)
    #[arg(long = "projects-dir", value_name = "DIR")]
    projects_dir: Option<PathBuf>,

    /// Maximum log files to scan
    #[arg(long = "max-files", default_value_t = 100)]
    max_files: usize,

    /// Maximum lines to read per file
    #[arg(long = "max-lines", default_value_t = 2000)]
    max_lines: usize,

    /// Export one example per variant to a JSONL file
    #[arg(long = "export", value_name = "FILE")]
    export: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct SynthArgs {
    /// Categorized examples file (from `tsplit categorize --export`)
    #[arg(
        long = "examples",
        value_name = "FILE",
        default_value = "categorized_examples.jsonl"
    )]
    examples: PathBuf,

    /// Output directory for the synthetic log
    #[arg(long = "output", value_name = "DIR")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Split(args) => run_split(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Categorize(args) => run_categorize(args),
        Command::Synth(args) => run_synth(args),
    }
}

fn init_logging() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_projects_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".claude").join("projects"))
        .context("could not determine home directory; pass --projects-dir")
}

impl ScanArgs {
    fn projects_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.projects_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_projects_dir(),
        }
    }

    fn options(&self) -> ScanOptions {
        ScanOptions {
            max_files: self.max_files,
            max_lines_per_file: self.max_lines,
        }
    }
}

fn run_split(args: SplitArgs) -> anyhow::Result<()> {
    let mut failures = 0usize;
    for input in &args.inputs {
        println!("Loading {}...", input.display());
        match split_file(input, &args.output_dir) {
            Ok(report) => print_split_report(&report),
            Err(err) => {
                failures += 1;
                error!("failed to split {}: {err}", input.display());
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} input file(s) failed");
    }
    Ok(())
}

fn print_split_report(report: &SplitReport) {
    println!(
        "  Loaded {} records, {} with identifiers ({} lines skipped)",
        report.records_total, report.records_indexed, report.skipped_lines
    );

    let Some(head) = &report.head else {
        println!("  No live conversation head; nothing to segment");
        return;
    };
    println!("  Head: {head}");
    println!(
        "  Extracted {} segment(s) following the compaction chain",
        report.segment_count()
    );
    for (index, output) in report.outputs.iter().enumerate() {
        let name = output
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "  Segment {index}: {} records -> {name}",
            output.record_count
        );
    }
    if report.stats.broken_chains > 0 || report.stats.cycles > 0 {
        println!(
            "  WARNING: {} broken chain(s), {} cycle(s); review the affected segments",
            report.stats.broken_chains, report.stats.cycles
        );
    }
}

fn run_analyze(args: ScanArgs) -> anyhow::Result<()> {
    let projects_dir = args.projects_dir()?;
    let report = analyze_projects(&projects_dir, args.options())?;
    print_structure_report(&report);

    if let Some(path) = &args.export {
        let count = export_structure_examples(&report, path)?;
        println!("\nExported {count} examples to {}", path.display());
    }
    Ok(())
}

fn print_counts(title: &str, counts: &BTreeMap<String, usize>, limit: usize) {
    println!("\n=== {title} ===");
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in entries.into_iter().take(limit) {
        println!("  {name}: {count}");
    }
}

fn print_structure_report(report: &StructureReport) {
    println!(
        "Scanned {} files, {} records",
        report.totals.files_scanned, report.totals.records_scanned
    );

    print_counts("Record Types", &report.type_counts, usize::MAX);
    print_counts("Content Block Types", &report.content_block_types, usize::MAX);
    print_counts("Tool Names", &report.tool_names, 20);
    print_counts("Special Fields", &report.special_fields, usize::MAX);

    println!(
        "\n=== Unique Structure Variants: {} ===",
        report.structures.len()
    );

    // Group variants by the record type of their example.
    let mut by_type: BTreeMap<&str, Vec<&tsplit_core::StructureVariant>> = BTreeMap::new();
    for variant in report.structures.values() {
        let record_type = variant
            .example
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("NO_TYPE");
        by_type.entry(record_type).or_default().push(variant);
    }

    for (record_type, mut variants) in by_type {
        variants.sort_by(|a, b| b.count.cmp(&a.count));
        println!("\n--- {record_type} ({} variants) ---", variants.len());
        for (index, variant) in variants.iter().enumerate() {
            println!("\n  [{record_type}#{index}] count={}", variant.count);
            println!("  Source: {}", variant.source.display());
            let pretty =
                serde_json::to_string_pretty(&variant.example).unwrap_or_default();
            for line in truncate_chars(&pretty, 500).lines() {
                println!("    {line}");
            }
        }
    }
}

/// Cut a preview at a character boundary, marking the cut with an ellipsis.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}\n...")
}

fn run_categorize(args: ScanArgs) -> anyhow::Result<()> {
    let projects_dir = args.projects_dir()?;
    let categories = scan_categories(&projects_dir, args.options())?;
    print_categories(&categories);

    if let Some(path) = &args.export {
        let count = export_category_examples(&categories, path)?;
        println!("\nExported {count} category examples to {}", path.display());
    }
    Ok(())
}

/// Categories an exporter would drop rather than render.
fn is_skipped_category(category: &str) -> bool {
    category.contains("tool_result") || category == "user:with_caveat"
}

fn print_categories(categories: &BTreeMap<String, CategoryEntry>) {
    let rule = "=".repeat(60);

    // Group by prefix, in a fixed presentation order.
    let mut groups: BTreeMap<&str, Vec<(&String, &CategoryEntry)>> = BTreeMap::new();
    for (category, entry) in categories {
        let prefix = category.split(':').next().unwrap_or("unknown");
        groups.entry(prefix).or_default().push((category, entry));
    }

    let mut total_renderable = 0usize;
    let mut total_skip = 0usize;

    for prefix in ["user", "assistant", "system", "unknown"] {
        let Some(entries) = groups.get_mut(prefix) else {
            continue;
        };
        entries.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

        println!("\n{rule}");
        println!("=== {} ===", prefix.to_uppercase());
        println!("{rule}");

        for (category, entry) in entries.iter() {
            let skip = is_skipped_category(category);
            if skip {
                total_skip += entry.count;
            } else {
                total_renderable += entry.count;
            }
            let marker = if skip { "  [SKIP]" } else { "" };
            println!("\n{category}: {}{marker}", entry.count);

            if let Some(example) = entry.examples.first() {
                print_example_preview(example);
            }
        }
    }

    println!("\n{rule}");
    println!("SUMMARY: {total_renderable} renderable, {total_skip} skip");
    println!("{rule}");
}

fn print_example_preview(example: &Value) {
    let Some(content) = example
        .get("message")
        .and_then(|message| message.get("content"))
    else {
        return;
    };

    match content {
        Value::String(text) => {
            let preview: String = text.chars().take(200).collect();
            println!("  Content: {}...", preview.replace('\n', "\\n"));
        }
        Value::Array(blocks) => {
            let summaries: Vec<String> = blocks.iter().take(3).map(block_summary).collect();
            println!("  Blocks: {summaries:?}");
        }
        _ => {}
    }
}

fn block_summary(block: &Value) -> String {
    let block_type = block.get("type").and_then(Value::as_str).unwrap_or("unknown");
    match block_type {
        "text" => {
            let text = block.get("text").and_then(Value::as_str).unwrap_or("");
            let preview: String = text.chars().take(100).collect();
            format!("text:\"{}...\"", preview.replace('\n', "\\n"))
        }
        "tool_use" => {
            let name = block.get("name").and_then(Value::as_str).unwrap_or("unknown");
            format!("tool_use:{name}")
        }
        "thinking" => {
            let len = block
                .get("thinking")
                .and_then(Value::as_str)
                .map_or(0, str::len);
            format!("thinking:{len}chars")
        }
        other => other.to_string(),
    }
}

fn run_synth(args: SynthArgs) -> anyhow::Result<()> {
    let log = build_synthetic_log(&args.examples, &args.output)?;
    println!(
        "Wrote {} records to {}",
        log.categories.len(),
        log.path.display()
    );
    println!("Session ID: {}", log.session_id);
    println!("\nCategories included:");
    for category in &log.categories {
        println!("  - {category}");
    }
    Ok(())
}
