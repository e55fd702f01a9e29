//! Image codec trait and shared types.
//!
//! The [`ImageBackend`] trait is the only place pixels are decoded or
//! encoded. The engine decides *what* to write; the backend does the codec
//! work and raises on malformed input.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::metadata::MetadataReport;
use super::params::EncodeOptions;
use crate::types::TargetFormat;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode {format}: {reason}")]
    Encode {
        format: TargetFormat,
        reason: String,
    },
}

/// Trait for image codecs.
///
/// `Sync` so one backend can be shared by every worker in a batch.
pub trait ImageBackend: Sync {
    /// Decode an image from disk.
    fn open(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` into `path` as `format`, creating or truncating the file.
    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: TargetFormat,
        options: &EncodeOptions,
    ) -> Result<(), BackendError>;

    /// List the metadata blocks embedded in a file's container.
    fn read_metadata(&self, path: &Path) -> Result<MetadataReport, BackendError>;
}
