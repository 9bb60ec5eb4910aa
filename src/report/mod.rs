//! Report generation for find-overlap
//!
//! The console report goes to stdout in the fixed layout users paste `dd`
//! commands from. The optional JSON report carries the same data plus run
//! metadata.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::{OverlapOutcome, OverlapRange};
use crate::planner::RestorationPlan;

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub timestamp: String,
    /// Tool version
    pub version: String,
    /// Device or file scanned, if any
    pub source: Option<String>,
    /// Hash dump the digests were loaded from, if any
    pub hash_dump: Option<String>,
}

/// Outcome label used in the JSON report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    Ambiguous,
    NotFound,
}

/// One reported overlap and the restore that goes with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub range: OverlapRange,
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub full: bool,
    pub plan: RestorationPlan,
    pub dd_commands: [String; 2],
}

impl CandidateReport {
    pub fn new(range: OverlapRange, total_blocks: u64, block_size: u64) -> Self {
        let plan = RestorationPlan::new(&range, total_blocks, block_size);
        let dd_commands = plan.dd_commands();
        Self {
            range,
            a: range.a(),
            b: range.b(),
            c: range.c(),
            full: range.is_full(),
            plan,
            dd_commands,
        }
    }
}

/// Everything a run found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapReport {
    pub metadata: ReportMetadata,
    pub block_size: u64,
    pub total_blocks: u64,
    pub outcome: OutcomeKind,
    pub candidates: Vec<CandidateReport>,
}

impl OverlapReport {
    pub fn new(
        metadata: ReportMetadata,
        outcome: &OverlapOutcome,
        total_blocks: u64,
        block_size: u64,
    ) -> Self {
        let kind = match outcome {
            OverlapOutcome::Found(_) => OutcomeKind::Found,
            OverlapOutcome::Ambiguous(_) => OutcomeKind::Ambiguous,
            OverlapOutcome::NotFound => OutcomeKind::NotFound,
        };
        let candidates = outcome
            .candidates()
            .iter()
            .map(|range| CandidateReport::new(*range, total_blocks, block_size))
            .collect();

        Self {
            metadata,
            block_size,
            total_blocks,
            outcome: kind,
            candidates,
        }
    }
}

/// Build report metadata stamped with the current local time
pub fn create_report_metadata(source: Option<&Path>, hash_dump: Option<&Path>) -> ReportMetadata {
    ReportMetadata {
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: source.map(|path| path.display().to_string()),
        hash_dump: hash_dump.map(|path| path.display().to_string()),
    }
}

/// Human-readable report, exactly as printed to stdout
pub fn render_console(outcome: &OverlapOutcome, total_blocks: u64, block_size: u64) -> String {
    let mut out = String::new();

    if matches!(outcome, OverlapOutcome::NotFound) {
        out.push_str("No overlapping range found\n");
        return out;
    }

    let _ = writeln!(out, "Block size: {block_size} bytes");
    if matches!(outcome, OverlapOutcome::Ambiguous(_)) {
        out.push_str("WARNING: Multiple overlapping ranges found\n");
    }

    for range in outcome.candidates() {
        out.push('\n');
        render_candidate(&mut out, range, total_blocks, block_size);
    }
    out
}

fn render_candidate(out: &mut String, range: &OverlapRange, total_blocks: u64, block_size: u64) {
    let _ = writeln!(out, "Overlap of size {} blocks found.", range.length);
    let _ = writeln!(
        out,
        "Range [{}:{}) overlaps [{}:{}).",
        range.a(),
        range.b(),
        range.b(),
        range.c()
    );
    if !range.is_full() {
        let _ = writeln!(
            out,
            "WARNING: only {} of {} shifted blocks match; verify before restoring.",
            range.length, range.shift
        );
    }
    let plan = RestorationPlan::new(range, total_blocks, block_size);
    out.push_str(&plan.to_string());
}

/// Write the JSON report through a temporary file and rename it into place
pub fn save_json_report(path: &Path, report: &OverlapReport) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(report)?;
    let tmp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&serialized)?;
        file.sync_all()?;
    }

    fs::rename(tmp_path, path)?;
    Ok(())
}
