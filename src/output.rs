//! CLI output formatting.
//!
//! # Display Contract
//!
//! Every file gets exactly one status line, optionally followed by indented
//! context lines:
//!
//! 1. **Status line**: a status marker and the engine's message, starting in
//!    column 0. Filtering on unindented lines yields one line per file.
//! 2. **Context lines**: `Output:`, `Metadata:`, `Optimizer:`, `Error:`,
//!    always indented.
//!
//! ```text
//! ok   photo.png => photo.webp (original deleted)
//!     Output: photo.webp
//!     Metadata: 2 blocks removed
//!     Optimizer: cwebp
//! skip notes.txt: unsupported file type (.txt); expected jpeg, jpg, png or webp
//! FAIL icon.png: image has transparency, which JPEG cannot store; choose png or webp instead
//!     Error: transparency-conflict
//!
//! 3 files: 1 converted, 0 compressed, 0 cleaned, 1 skipped, 1 failed
//! ```
//!
//! `check` prints the plan for each file instead:
//!
//! ```text
//! photo.png → photo.webp (convert, source removed)
//! icon.png ✗ image has transparency, which JPEG cannot store; choose png or webp instead
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects. Logging goes to stderr separately.

use crate::batch::BatchSummary;
use crate::convert::ConvertError;
use crate::plan::{Action, Plan};
use crate::types::{ConversionOutcome, OutcomeStatus, file_label};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn status_marker(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Failed => "FAIL",
        s if s.is_skipped() => "skip",
        _ => "ok  ",
    }
}

/// Format one outcome: the status line plus indented context lines.
pub fn format_outcome(outcome: &ConversionOutcome) -> Vec<String> {
    let mut lines = vec![format!("{} {}", status_marker(outcome.status), outcome.message)];

    if let Some(output) = &outcome.output {
        lines.push(format!("{}Output: {}", indent(1), file_label(output)));
    }
    match outcome.metadata_removed {
        0 => {}
        1 => lines.push(format!("{}Metadata: 1 block removed", indent(1))),
        n => lines.push(format!("{}Metadata: {n} blocks removed", indent(1))),
    }
    if let Some(tool) = &outcome.optimizer {
        lines.push(format!("{}Optimizer: {tool}", indent(1)));
    }
    if outcome.status == OutcomeStatus::Failed {
        if let Some(kind) = outcome.error {
            // Same spelling as the JSON report
            let name = serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("{kind:?}"));
            lines.push(format!("{}Error: {name}", indent(1)));
        }
    }
    lines
}

pub fn print_outcome(outcome: &ConversionOutcome) {
    for line in format_outcome(outcome) {
        println!("{line}");
    }
}

/// Format the plan (or the reason there is none) for one file.
pub fn format_plan(source: &Path, plan: &Result<Plan, ConvertError>) -> Vec<String> {
    let name = file_label(source);
    let line = match plan {
        Ok(Plan::AlreadyInFormat) => format!("{name} = already in target format, nothing to do"),
        Ok(Plan::Write(write)) => {
            let detail = match write.action {
                Action::Clean if write.in_place => "clean, in place",
                Action::Clean => "clean",
                Action::Compress if write.in_place => "compress, in place",
                Action::Compress => "compress",
                Action::Convert if write.remove_source => "convert, source removed",
                Action::Convert => "convert",
            };
            format!("{name} → {} ({detail})", file_label(&write.output))
        }
        Err(err) => format!("{name} ✗ {err}"),
    };
    vec![line]
}

pub fn print_plan(source: &Path, plan: &Result<Plan, ConvertError>) {
    for line in format_plan(source, plan) {
        println!("{line}");
    }
}

/// One-line batch total.
pub fn format_summary(summary: &BatchSummary) -> String {
    let total = summary.total();
    let noun = if total == 1 { "file" } else { "files" };
    format!("{total} {noun}: {summary}")
}

pub fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", format_summary(summary));
}
