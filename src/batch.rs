//! Parallel batch runner.
//!
//! Applies one set of [`ConversionSettings`] to a list of files on the rayon
//! pool. Each file is independent: a failure is reported through the sink
//! and counted, and the rest of the batch carries on.
//!
//! Outcomes are delivered as each file finishes, so their order follows
//! completion, not input order. The [`BatchSummary`] totals are the same
//! whatever the order.

use crate::config::ConversionConfig;
use crate::convert::Converter;
use crate::imaging::ImageBackend;
use crate::types::{
    CompressionLevel, ConversionOutcome, ConversionRequest, OutcomeStatus, TargetFormat,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::info;

/// Receives one outcome per file, from any worker thread.
pub trait MessageSink: Sync {
    fn deliver(&self, outcome: ConversionOutcome);
}

impl<F> MessageSink for F
where
    F: Fn(ConversionOutcome) + Sync,
{
    fn deliver(&self, outcome: ConversionOutcome) {
        self(outcome)
    }
}

/// Forwards outcomes to a channel, for a printer thread on the other end.
pub struct ChannelSink(pub Sender<ConversionOutcome>);

impl MessageSink for ChannelSink {
    fn deliver(&self, outcome: ConversionOutcome) {
        // Receiver gone means nobody is listening; the summary still counts it.
        let _ = self.0.send(outcome);
    }
}

/// Settings shared by every file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSettings {
    pub target: TargetFormat,
    pub compression: CompressionLevel,
    pub delete_original: bool,
    pub strip_metadata: bool,
    pub overwrite: bool,
}

impl ConversionSettings {
    pub fn new(target: TargetFormat) -> Self {
        Self::from_config(&ConversionConfig::default(), target)
    }

    /// Settings from the `[conversion]` config section, with the target
    /// chosen by the caller.
    pub fn from_config(config: &ConversionConfig, target: TargetFormat) -> Self {
        Self {
            target,
            compression: config.compression,
            delete_original: config.delete_original,
            strip_metadata: config.strip_metadata,
            overwrite: config.overwrite,
        }
    }

    pub fn request_for(&self, source: &Path) -> ConversionRequest {
        ConversionRequest {
            source: source.to_path_buf(),
            target: self.target,
            compression: self.compression,
            delete_original: self.delete_original,
            strip_metadata: self.strip_metadata,
            overwrite: self.overwrite,
        }
    }
}

/// Per-status counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub converted: usize,
    pub compressed: usize,
    pub cleaned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &ConversionOutcome) {
        match outcome.status {
            OutcomeStatus::Converted => self.converted += 1,
            OutcomeStatus::Compressed => self.compressed += 1,
            OutcomeStatus::CleanedInPlace | OutcomeStatus::CleanedNewFile => self.cleaned += 1,
            OutcomeStatus::SkippedUnsupported | OutcomeStatus::SkippedSameFormatNoCompress => {
                self.skipped += 1
            }
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            converted: self.converted + other.converted,
            compressed: self.compressed + other.compressed,
            cleaned: self.cleaned + other.cleaned,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }

    pub fn total(&self) -> usize {
        self.converted + self.compressed + self.cleaned + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} converted, {} compressed, {} cleaned, {} skipped, {} failed",
            self.converted, self.compressed, self.cleaned, self.skipped, self.failed
        )
    }
}

/// Convert every path with the same settings, in parallel.
///
/// Duplicate paths are processed once. Every file produces exactly one
/// outcome on `sink`.
pub fn convert_batch<B: ImageBackend>(
    converter: &Converter<'_, B>,
    paths: &[PathBuf],
    settings: &ConversionSettings,
    sink: &impl MessageSink,
) -> BatchSummary {
    let unique = dedupe(paths);
    info!(
        files = unique.len(),
        target = %settings.target,
        compression = %settings.compression,
        "starting batch"
    );

    let summary = unique
        .par_iter()
        .map(|path| {
            let outcome = converter.process(&settings.request_for(path));
            let mut summary = BatchSummary::default();
            summary.record(&outcome);
            sink.deliver(outcome);
            summary
        })
        .reduce(BatchSummary::default, BatchSummary::merge);

    info!(%summary, "batch finished");
    summary
}

/// First occurrence of each path, in input order.
fn dedupe(paths: &[PathBuf]) -> Vec<&Path> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| seen.insert(*p))
        .collect()
}
