//! Pure decision logic for a single request.
//!
//! [`plan`] decides which branch a request takes and which files it will
//! write, without touching the filesystem or decoding anything. The engine
//! in [`convert`](crate::convert) adds the checks that need the decoded
//! image (transparency) and then executes the plan.
//!
//! | Source vs target | Compression | delete original | Action | Output |
//! |---|---|---|---|---|
//! | same | none | yes | clean | source path (replaced) |
//! | same | none | no | clean | `<base>-clean<ext>` |
//! | same | some | yes | compress | source path (replaced) |
//! | same | some | no | compress | `<base>-compressed<ext>` |
//! | different | any | yes | convert | `<base>.<target>`, source removed |
//! | different | any | no | convert | `<base>-converted.<target>` |
//!
//! With `strip_metadata` off, the same-format/no-compression rows are
//! skipped instead.

use crate::convert::ConvertError;
use crate::imaging::{EncodeOptions, compression_params};
use crate::naming;
use crate::types::{ConversionRequest, OutcomeStatus, TargetFormat};
use std::path::PathBuf;

/// What a write plan does to the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Re-encode in the source format with default settings.
    Clean,
    /// Re-encode in the source format with compression settings.
    Compress,
    /// Encode into a different format.
    Convert,
}

/// Files and encoder settings for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub action: Action,
    pub source_format: TargetFormat,
    /// Format the staging file is encoded in.
    pub format: TargetFormat,
    pub options: EncodeOptions,
    /// Preferred name of the working copy the encoder writes into.
    pub staging: PathBuf,
    /// Final name of the result.
    pub output: PathBuf,
    /// The output is the source path itself (atomic replace).
    pub in_place: bool,
    /// Delete the source once the output is in place.
    pub remove_source: bool,
}

impl WritePlan {
    /// Status reported when this plan completes.
    pub fn status(&self) -> OutcomeStatus {
        match self.action {
            Action::Clean if self.in_place => OutcomeStatus::CleanedInPlace,
            Action::Clean => OutcomeStatus::CleanedNewFile,
            Action::Compress => OutcomeStatus::Compressed,
            Action::Convert => OutcomeStatus::Converted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Already in the target format and nothing was asked of it.
    AlreadyInFormat,
    Write(WritePlan),
}

/// Decide what a request will do.
///
/// Fails only with [`ConvertError::UnsupportedFormat`].
pub fn plan(request: &ConversionRequest) -> Result<Plan, ConvertError> {
    let source = &request.source;
    let source_format = TargetFormat::of_path(source)
        .ok_or_else(|| ConvertError::UnsupportedFormat(extension_label(source)))?;
    let target = request.target;
    let delete = request.delete_original;

    if naming::is_same_format(target, source) {
        if request.compression.is_none() {
            if !request.strip_metadata {
                return Ok(Plan::AlreadyInFormat);
            }
            return Ok(Plan::Write(WritePlan {
                action: Action::Clean,
                source_format,
                format: target,
                options: EncodeOptions::Defaults,
                staging: naming::temp_path(source),
                output: if delete {
                    source.clone()
                } else {
                    naming::clean_path(source)
                },
                in_place: delete,
                remove_source: false,
            }));
        }

        return Ok(Plan::Write(WritePlan {
            action: Action::Compress,
            source_format,
            format: target,
            options: compression_params(target, request.compression),
            staging: naming::temp_compressed_path(source),
            output: if delete {
                source.clone()
            } else {
                naming::compressed_path(source)
            },
            in_place: delete,
            remove_source: false,
        }));
    }

    Ok(Plan::Write(WritePlan {
        action: Action::Convert,
        source_format,
        format: target,
        options: compression_params(target, request.compression),
        staging: naming::temp_converted_path(source, target),
        output: if delete {
            naming::renamed_path(source, target)
        } else {
            naming::converted_path(source, target)
        },
        in_place: false,
        remove_source: delete,
    }))
}

fn extension_label(path: &std::path::Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| "no extension".to_string())
}
