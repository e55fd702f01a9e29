//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` (format guessed from content) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 75 default) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression + adaptive filter) |
//! | Encode → WebP (defaults) | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → WebP (quality) | `webp::Encoder` (libwebp, lossy) |
//! | Metadata listing | [`metadata::scan_file`](super::metadata::scan_file) |
//!
//! None of the encoders write EXIF, XMP, ICC or text blocks, so anything
//! encoded here is metadata-free.

use super::backend::{BackendError, ImageBackend};
use super::metadata::{self, MetadataReport};
use super::params::{EncodeOptions, PngCompressLevel, Quality};
use crate::types::TargetFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::error::{EncodingError, ImageFormatHint};
use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Pixel};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the image carries transparency.
///
/// True for any color type with an alpha channel. Palette images with a
/// `tRNS` transparency entry are expanded to RGBA/LA by the PNG decoder, so
/// they are covered by the same check.
pub fn has_transparency(image: &DynamicImage) -> bool {
    image.color().has_alpha()
}

/// Copy decoded pixels into a freshly allocated buffer of the same color type.
///
/// The result shares nothing with the decoder's output, so no auxiliary data
/// a decoder may attach can reach the encoder.
pub fn clean_copy(image: &DynamicImage) -> DynamicImage {
    fn fresh<P: Pixel>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>> {
        ImageBuffer::from_fn(buf.width(), buf.height(), |x, y| *buf.get_pixel(x, y))
    }

    match image {
        DynamicImage::ImageLuma8(b) => DynamicImage::ImageLuma8(fresh(b)),
        DynamicImage::ImageLumaA8(b) => DynamicImage::ImageLumaA8(fresh(b)),
        DynamicImage::ImageRgb8(b) => DynamicImage::ImageRgb8(fresh(b)),
        DynamicImage::ImageRgba8(b) => DynamicImage::ImageRgba8(fresh(b)),
        DynamicImage::ImageLuma16(b) => DynamicImage::ImageLuma16(fresh(b)),
        DynamicImage::ImageLumaA16(b) => DynamicImage::ImageLumaA16(fresh(b)),
        DynamicImage::ImageRgb16(b) => DynamicImage::ImageRgb16(fresh(b)),
        DynamicImage::ImageRgba16(b) => DynamicImage::ImageRgba16(fresh(b)),
        DynamicImage::ImageRgb32F(b) => DynamicImage::ImageRgb32F(fresh(b)),
        DynamicImage::ImageRgba32F(b) => DynamicImage::ImageRgba32F(fresh(b)),
        other => other.clone(),
    }
}

/// Narrow the pixel layout to something the target encoder accepts.
///
/// JPEG takes 8-bit gray or RGB; WebP takes 8-bit with or without alpha;
/// PNG takes 8/16-bit but not float.
fn prepare_for(format: TargetFormat, image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match format {
        TargetFormat::Jpeg => match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
            DynamicImage::ImageLuma16(_) => Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        TargetFormat::Webp => match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
            img if img.color().has_alpha() => {
                Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
            }
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        TargetFormat::Png => match image {
            DynamicImage::ImageRgb32F(_) => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
            DynamicImage::ImageRgba32F(_) => {
                Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
            }
            _ => Cow::Borrowed(image),
        },
    }
}

fn png_compression(level: PngCompressLevel) -> CompressionType {
    match level.value() {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_error(format: TargetFormat, err: image::ImageError) -> BackendError {
    match err {
        image::ImageError::IoError(e) => BackendError::Io(e),
        other => BackendError::Encode {
            format,
            reason: other.to_string(),
        },
    }
}

/// Lossy WebP through libwebp, which only takes 8-bit RGB or RGBA.
fn encode_lossy_webp(image: &DynamicImage, quality: Quality) -> image::ImageResult<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    let quality = f32::from(quality.value());
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    };
    encoded.map(|memory| memory.to_vec()).map_err(|e| {
        image::ImageError::Encoding(EncodingError::new(
            ImageFormatHint::Exact(ImageFormat::WebP),
            format!("libwebp: {e:?}"),
        ))
    })
}

/// Encode into an open writer.
fn encode<W: Write>(
    image: &DynamicImage,
    mut writer: W,
    format: TargetFormat,
    options: &EncodeOptions,
) -> image::ImageResult<()> {
    match (format, options) {
        (TargetFormat::Jpeg, EncodeOptions::Lossy { quality }) => {
            image.write_with_encoder(JpegEncoder::new_with_quality(writer, quality.value()))
        }
        (TargetFormat::Jpeg, _) => image.write_with_encoder(JpegEncoder::new(writer)),
        (TargetFormat::Png, EncodeOptions::Png { compress_level }) => {
            image.write_with_encoder(PngEncoder::new_with_quality(
                writer,
                png_compression(*compress_level),
                PngFilter::Adaptive,
            ))
        }
        (TargetFormat::Png, _) => image.write_with_encoder(PngEncoder::new(writer)),
        (TargetFormat::Webp, EncodeOptions::Lossy { quality }) => {
            let encoded = encode_lossy_webp(image, *quality)?;
            writer.write_all(&encoded)?;
            Ok(())
        }
        (TargetFormat::Webp, _) => image.write_with_encoder(WebPEncoder::new_lossless(writer)),
    }
}

impl ImageBackend for RustBackend {
    fn open(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| match e {
                image::ImageError::IoError(io) => BackendError::Io(io),
                other => BackendError::Decode {
                    path: path.display().to_string(),
                    reason: other.to_string(),
                },
            })
    }

    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: TargetFormat,
        options: &EncodeOptions,
    ) -> Result<(), BackendError> {
        let prepared = prepare_for(format, image);
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        encode(&prepared, &mut writer, format, options).map_err(|e| encode_error(format, e))?;
        // Flush and sync before the caller renames this file into place.
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_metadata(&self, path: &Path) -> Result<MetadataReport, BackendError> {
        Ok(metadata::scan_file(path)?)
    }
}
