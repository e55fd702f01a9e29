//! Per-file conversion engine.
//!
//! Takes one [`ConversionRequest`] and carries it through a fixed sequence:
//!
//! 1. Reject unsupported extensions and paths that are not regular files.
//! 2. Plan the branch and file names ([`plan`](crate::plan)).
//! 3. Decode the source; refuse JPEG targets for images with an alpha channel.
//! 4. Copy the pixels into a fresh buffer, dropping every metadata block.
//! 5. Encode into a staging sibling, optionally run an external optimizer.
//! 6. Move the staging file to its final name, then remove the source if the
//!    request converts and deletes.
//!
//! The source file is never opened for writing. In-place results replace it
//! with a single rename, so a crash at any point leaves either the untouched
//! original or the complete new file. Every error becomes a
//! [`ConversionOutcome`]; nothing here panics or aborts a batch.
//!
//! ## Naming
//!
//! ```text
//! photo.png  --(to webp, keep)-->          photo-converted.webp
//! photo.png  --(to webp, delete)-->        photo.webp
//! photo.jpg  --(to jpeg, keep)-->          photo-clean.jpg
//! photo.jpg  --(to jpeg, medium, keep)-->  photo-compressed.jpg
//! ```

use crate::imaging::{
    BackendError, ImageBackend, Optimizer, RustBackend, clean_copy, has_transparency,
};
use crate::plan::{self, Action, Plan, WritePlan};
use crate::staging::{self, StagedFile};
use crate::types::{
    ConversionOutcome, ConversionRequest, ErrorKind, OutcomeStatus, TargetFormat, file_label,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unsupported file type ({0}); expected jpeg, jpg, png or webp")]
    UnsupportedFormat(String),
    #[error("image has transparency, which JPEG cannot store; choose png or webp instead")]
    TransparencyConflict,
    #[error("{0}")]
    Codec(#[from] BackendError),
    #[error("could not {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not a valid file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("output already exists: {} (enable overwrite to replace it)", .0.display())]
    OutputExists(PathBuf),
    #[error("'{0}' is not a valid target format (expected jpeg, png or webp)")]
    InvalidTargetFormat(String),
    #[error("'{0}' is not a valid compression level (expected none, low, medium or high)")]
    InvalidCompressionLevel(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::TransparencyConflict => ErrorKind::TransparencyConflict,
            Self::Codec(BackendError::Io(_)) => ErrorKind::FilesystemFailure,
            Self::Codec(_) => ErrorKind::CodecFailure,
            Self::Filesystem { .. } | Self::NotAFile(_) | Self::OutputExists(_) => {
                ErrorKind::FilesystemFailure
            }
            Self::InvalidTargetFormat(_) => ErrorKind::InvalidTargetFormat,
            Self::InvalidCompressionLevel(_) => ErrorKind::InvalidCompressionLevel,
        }
    }
}

fn fs_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ConvertError {
    let path = path.to_path_buf();
    move |source| ConvertError::Filesystem {
        action,
        path,
        source,
    }
}

/// Runs requests against one backend and optimizer.
///
/// `Sync` whenever the backend is, so a single converter serves a whole
/// parallel batch.
pub struct Converter<'a, B: ImageBackend> {
    backend: &'a B,
    optimizer: Optimizer,
}

impl<'a, B: ImageBackend> Converter<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            optimizer: Optimizer::disabled(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Process one request. Never fails: errors are folded into the outcome.
    pub fn process(&self, request: &ConversionRequest) -> ConversionOutcome {
        let span = info_span!(
            "convert",
            source = %request.source.display(),
            target = %request.target
        );
        let _guard = span.enter();

        match self.run(request) {
            Ok(outcome) => {
                info!(status = ?outcome.status, "{}", outcome.message);
                outcome
            }
            Err(err) => {
                if err.kind() == ErrorKind::UnsupportedFormat {
                    debug!(error = %err, "skipped");
                } else {
                    warn!(error = %err, "conversion failed");
                }
                ConversionOutcome::from_error(&request.source, &err)
            }
        }
    }

    /// Everything [`process`](Self::process) would check, without writing.
    ///
    /// Decodes the source only when the target is JPEG, to detect
    /// transparency.
    pub fn preview(&self, request: &ConversionRequest) -> Result<Plan, ConvertError> {
        let plan = self.checked_plan(request)?;
        if let Plan::Write(write) = &plan {
            check_output_free(request, write)?;
            if request.target == TargetFormat::Jpeg {
                let image = self.backend.open(&request.source)?;
                if has_transparency(&image) {
                    return Err(ConvertError::TransparencyConflict);
                }
            }
        }
        Ok(plan)
    }

    fn checked_plan(&self, request: &ConversionRequest) -> Result<Plan, ConvertError> {
        let plan = plan::plan(request)?;
        if !request.source.is_file() {
            return Err(ConvertError::NotAFile(request.source.clone()));
        }
        Ok(plan)
    }

    fn run(&self, request: &ConversionRequest) -> Result<ConversionOutcome, ConvertError> {
        let write = match self.checked_plan(request)? {
            Plan::AlreadyInFormat => {
                return Ok(ConversionOutcome::new(
                    &request.source,
                    OutcomeStatus::SkippedSameFormatNoCompress,
                    format!(
                        "{} is already {} (nothing to do)",
                        file_label(&request.source),
                        request.target
                    ),
                ));
            }
            Plan::Write(write) => write,
        };
        check_output_free(request, &write)?;

        let image = self.backend.open(&request.source)?;
        if request.target == TargetFormat::Jpeg && has_transparency(&image) {
            return Err(ConvertError::TransparencyConflict);
        }

        let metadata_removed = match self.backend.read_metadata(&request.source) {
            Ok(report) => {
                debug!(blocks = report.len(), "metadata inventory");
                report.len()
            }
            Err(e) => {
                debug!(error = %e, "could not inventory metadata");
                0
            }
        };

        let cleaned = clean_copy(&image);
        drop(image);

        let optimizer = self.execute(request, &write, &cleaned)?;

        let mut outcome = ConversionOutcome::new(
            &request.source,
            write.status(),
            describe(request, &write),
        )
        .with_output(&write.output);
        outcome.metadata_removed = metadata_removed;
        outcome.optimizer = optimizer.map(str::to_string);
        Ok(outcome)
    }

    /// Encode, optimize and commit. The staging file is removed on every
    /// early return.
    fn execute(
        &self,
        request: &ConversionRequest,
        write: &WritePlan,
        image: &image::DynamicImage,
    ) -> Result<Option<&'static str>, ConvertError> {
        let staged = StagedFile::reserve(&write.staging)
            .map_err(fs_error("create working copy", &write.staging))?;
        debug!(staging = %staged.path().display(), format = %write.format, "encoding");
        self.backend
            .save(image, staged.path(), write.format, &write.options)?;

        let optimizer = self
            .optimizer
            .optimize(staged.path(), write.format, &write.options);

        if write.in_place || request.overwrite {
            staged
                .persist(&write.output)
                .map_err(fs_error("replace", &write.output))?;
        } else {
            staged.persist_noclobber(&write.output).map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    ConvertError::OutputExists(write.output.clone())
                } else {
                    fs_error("write", &write.output)(e)
                }
            })?;
        }

        if write.remove_source {
            if let Err(e) = fs::remove_file(&request.source) {
                // Keep exactly one copy: the untouched original.
                staging::discard(&write.output);
                return Err(fs_error("remove original", &request.source)(e));
            }
            debug!(path = %request.source.display(), "removed original");
        }
        Ok(optimizer)
    }
}

fn check_output_free(request: &ConversionRequest, write: &WritePlan) -> Result<(), ConvertError> {
    if !write.in_place && !request.overwrite && write.output.exists() {
        return Err(ConvertError::OutputExists(write.output.clone()));
    }
    Ok(())
}

fn describe(request: &ConversionRequest, write: &WritePlan) -> String {
    let source = file_label(&request.source);
    let output = file_label(&write.output);
    match write.action {
        Action::Clean if write.in_place => format!("{source}: metadata removed in place"),
        Action::Clean => format!("{source} => {output} (metadata removed)"),
        Action::Compress if write.in_place => {
            format!("{source}: compressed in place ({})", request.compression)
        }
        Action::Compress => format!("{source} => {output} (compressed, {})", request.compression),
        Action::Convert if write.remove_source => {
            format!("{source} => {output} (original deleted)")
        }
        Action::Convert => format!("{source} => {output}"),
    }
}

/// Process one request with the built-in codecs and no external tools.
pub fn process(request: &ConversionRequest) -> ConversionOutcome {
    let backend = RustBackend::new();
    Converter::new(&backend).process(request)
}
