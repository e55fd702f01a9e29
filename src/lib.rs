//! # Image Converter
//!
//! Converts, recompresses and strips metadata from JPEG, PNG and WebP files.
//! Each file is decoded, its pixels are copied into a fresh buffer, and the
//! buffer is encoded into the target format. Nothing but pixels survives, so
//! EXIF, XMP, ICC, IPTC and text blocks never reach the output.
//!
//! # Architecture: One Request, One Outcome
//!
//! ```text
//! paths ──scan──▶ files ──batch──▶ ConversionRequest ──convert──▶ ConversionOutcome ──▶ sink
//!                          (rayon)          │
//!                                           ├─ plan     which branch, which file names
//!                                           ├─ imaging  decode / clean copy / encode
//!                                           └─ staging  write beside, then rename
//! ```
//!
//! Every request is independent. A failure becomes a `Failed` outcome for
//! that file and the batch moves on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`convert`] | Per-file engine: validation, transparency check, encode, commit |
//! | [`plan`] | Pure branch and file-name decisions for a request |
//! | [`batch`] | Parallel runner, message sink, per-status summary |
//! | [`staging`] | Self-cleaning temporary files and atomic commits |
//! | [`naming`] | Output and staging file-name conventions |
//! | [`imaging`] | Codec backend, compression parameters, metadata inventory, external optimizers |
//! | [`scan`] | Expands command-line paths and directories into files |
//! | [`config`] | `image-converter.toml` loading, validation and merging |
//! | [`types`] | Requests, outcomes, formats and error kinds shared by all of the above |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Originals Are Never Opened for Writing
//!
//! Results are encoded into a `-temp` sibling and renamed into place. An
//! in-place result replaces the original with that rename; a converted file
//! with `delete_original` removes the original only after the new file
//! exists. If the removal fails, the new file is removed again so exactly one
//! copy remains.
//!
//! ## Linked Codecs, Optional Tools
//!
//! Decoding and encoding use the `image` crate, plus libwebp through the
//! `webp` crate for lossy WebP. `pngquant` and `cwebp` are used when
//! installed and skipped when not; they never decide whether a conversion
//! succeeds.
//!
//! ## Compression Levels
//!
//! | level | jpeg / webp | png |
//! |---|---|---|
//! | none | codec defaults | codec defaults |
//! | low | quality 90 | compress-level 1 |
//! | medium | quality 70 | compress-level 6 |
//! | high | quality 50 | compress-level 9 |
//!
//! WebP at level `none` is written losslessly.

pub mod batch;
pub mod config;
pub mod convert;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod plan;
pub mod scan;
pub mod staging;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
