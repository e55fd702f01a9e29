//! Image codecs, pure Rust, plus optional external optimizers.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Encode JPEG** | `image::codecs::jpeg::JpegEncoder` |
//! | **Encode PNG** | `image::codecs::png::PngEncoder` (compression + adaptive filter) |
//! | **Encode WebP** | `image::codecs::webp::WebPEncoder` (lossless), `webp::Encoder` (lossy) |
//! | **Metadata inventory** | container walk (JPEG segments, PNG/WebP chunks) |
//! | **Further compression** | `pngquant` / `cwebp`, when installed |
//!
//! The module is split into:
//! - **Parameters**: compression levels mapped to encoder settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Metadata**: which blocks a file carries, so outcomes can report what
//!   cleaning removed
//! - **Optimizer**: best-effort post-processing of staged files

pub mod backend;
pub mod metadata;
pub mod optimizer;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use metadata::{MetadataKind, MetadataReport};
pub use optimizer::Optimizer;
pub use params::{EncodeOptions, PngCompressLevel, Quality, compression_params};
pub use rust_backend::{RustBackend, clean_copy, has_transparency};
