//! Shared types passed between the engine, the batch runner and callers.
//!
//! A [`ConversionRequest`] is built by the caller for every dropped file and
//! yields exactly one [`ConversionOutcome`]. Neither carries state across
//! requests.

use crate::convert::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output formats the converter can write.
///
/// Also used to describe a source file's format, since the supported input
/// set is the same three formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Jpeg, TargetFormat::Png, TargetFormat::Webp];

    /// Canonical file extension (without the dot) used for new files.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
        }
    }

    /// Map a file extension (case-insensitive, no dot) to a format.
    ///
    /// `jpg` and `jpeg` both map to [`TargetFormat::Jpeg`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(TargetFormat::Jpeg),
            "png" => Some(TargetFormat::Png),
            "webp" => Some(TargetFormat::Webp),
            _ => None,
        }
    }

    /// Format of a file judged by its extension alone.
    pub fn of_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.'))
            .ok_or_else(|| ConvertError::InvalidTargetFormat(s.to_string()))
    }
}

/// Coarse user-facing compression tier.
///
/// Mapped to codec parameters by
/// [`compression_params`](crate::imaging::compression_params).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl CompressionLevel {
    pub fn is_none(self) -> bool {
        self == CompressionLevel::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionLevel::None => "none",
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionLevel {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(CompressionLevel::None),
            "low" => Ok(CompressionLevel::Low),
            "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            _ => Err(ConvertError::InvalidCompressionLevel(s.to_string())),
        }
    }
}

/// One file to convert, with the settings captured when it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub target: TargetFormat,
    pub compression: CompressionLevel,
    pub delete_original: bool,
    /// Re-encode files already in the target format just to drop metadata.
    pub strip_metadata: bool,
    /// Replace an existing file at the output path instead of failing.
    pub overwrite: bool,
}

impl ConversionRequest {
    /// A request with the default policy: strip metadata, keep the
    /// original, never overwrite.
    pub fn new(source: impl Into<PathBuf>, target: TargetFormat) -> Self {
        Self {
            source: source.into(),
            target,
            compression: CompressionLevel::None,
            delete_original: false,
            strip_metadata: true,
            overwrite: false,
        }
    }

    pub fn with_compression(mut self, compression: CompressionLevel) -> Self {
        self.compression = compression;
        self
    }

    pub fn deleting_original(mut self, delete_original: bool) -> Self {
        self.delete_original = delete_original;
        self
    }
}

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    SkippedUnsupported,
    SkippedSameFormatNoCompress,
    CleanedInPlace,
    CleanedNewFile,
    Converted,
    Compressed,
    Failed,
}

impl OutcomeStatus {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            OutcomeStatus::CleanedInPlace
                | OutcomeStatus::CleanedNewFile
                | OutcomeStatus::Converted
                | OutcomeStatus::Compressed
        )
    }

    pub fn is_skipped(self) -> bool {
        matches!(
            self,
            OutcomeStatus::SkippedUnsupported | OutcomeStatus::SkippedSameFormatNoCompress
        )
    }
}

/// Error categories surfaced to callers alongside failed or skipped outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    UnsupportedFormat,
    TransparencyConflict,
    CodecFailure,
    FilesystemFailure,
    InvalidTargetFormat,
    InvalidCompressionLevel,
}

/// Result of processing one [`ConversionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub status: OutcomeStatus,
    /// Human-readable status line body (no styling).
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Metadata blocks found in the source and not carried into the output.
    #[serde(skip_serializing_if = "is_zero")]
    pub metadata_removed: usize,
    /// External optimizer that post-processed the output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ConversionOutcome {
    pub fn new(source: &Path, status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            status,
            message: message.into(),
            output: None,
            error: None,
            metadata_removed: 0,
            optimizer: None,
        }
    }

    /// Convert a per-file error into its outcome.
    ///
    /// Unsupported extensions are reported as a skip, everything else as a
    /// failure.
    pub fn from_error(source: &Path, err: &ConvertError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::UnsupportedFormat => OutcomeStatus::SkippedUnsupported,
            _ => OutcomeStatus::Failed,
        };
        let mut outcome = Self::new(source, status, format!("{}: {}", file_label(source), err));
        outcome.error = Some(kind);
        outcome
    }

    pub fn with_output(mut self, output: &Path) -> Self {
        self.output = Some(output.to_path_buf());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// File name of `path` for status messages, falling back to the full path.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
