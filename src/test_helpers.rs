//! Shared test utilities for the image-converter test suite.
//!
//! Provides synthetic images, metadata injection for JPEG and PNG files, and
//! directory assertions. PNG fixtures are written with the `png` crate so
//! chunks can be chosen by hand.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let src = tmp.path().join("photo.jpeg");
//! write_image(&src, &DynamicImage::ImageRgb8(rgb_pattern(32, 32)));
//! inject_jpeg_exif(&src);
//!
//! let before = snapshot(tmp.path());
//! // ... run something that must not touch the directory ...
//! assert_eq!(snapshot(tmp.path()), before);
//! ```

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

/// Deterministic RGB gradient, distinct enough that codecs can't cheat.
pub fn rgb_pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) * 37 % 256) as u8,
        ])
    })
}

/// Like [`rgb_pattern`] with a varying alpha channel.
pub fn rgba_pattern(width: u32, height: u32) -> RgbaImage {
    let rgb = rgb_pattern(width, height);
    RgbaImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Rgba([r, g, b, ((x * 31 + y * 17) % 256) as u8])
    })
}

/// Save an image, choosing the format from the path's extension.
pub fn write_image(path: &Path, image: &DynamicImage) {
    image
        .save(path)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

// =========================================================================
// Metadata injection
// =========================================================================

/// Minimal big-endian EXIF block: TIFF header plus one empty IFD.
const EXIF_PAYLOAD: &[u8] = b"Exif\0\0MM\0*\0\0\0\x08\0\0\0\0\0\0";

/// Insert an APP1 EXIF segment right after the JPEG SOI marker.
pub fn inject_jpeg_exif(path: &Path) {
    let data = fs::read(path).unwrap();
    assert_eq!(&data[..2], b"\xFF\xD8", "not a JPEG: {}", path.display());

    let seg_len = (EXIF_PAYLOAD.len() + 2) as u16;
    let mut out = Vec::with_capacity(data.len() + EXIF_PAYLOAD.len() + 4);
    out.extend_from_slice(&data[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(EXIF_PAYLOAD);
    out.extend_from_slice(&data[2..]);
    fs::write(path, out).unwrap();
}

/// Rewrite a PNG with a `tEXt` chunk, keeping its pixels and color type.
pub fn inject_png_text(path: &Path, key: &str, value: &str) {
    let image = image::open(path).unwrap();
    let color = match &image {
        DynamicImage::ImageLuma8(_) => png::ColorType::Grayscale,
        DynamicImage::ImageLumaA8(_) => png::ColorType::GrayscaleAlpha,
        DynamicImage::ImageRgb8(_) => png::ColorType::Rgb,
        DynamicImage::ImageRgba8(_) => png::ColorType::Rgba,
        other => panic!("unsupported fixture color type {:?}", other.color()),
    };

    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = png::Encoder::new(file, image.width(), image.height());
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.add_text_chunk(key.into(), value.into()).unwrap();
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(image.as_bytes()).unwrap();
    writer.finish().unwrap();
}

/// Write a 2×2 indexed PNG whose palette entry 0 is fully transparent via
/// `tRNS`; the image has no alpha channel of its own.
pub fn write_palette_with_trns(path: &Path) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = png::Encoder::new(file, 2, 2);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![255, 0, 0, 0, 0, 255]);
    encoder.set_trns(vec![0]);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[0, 1, 1, 0]).unwrap();
    writer.finish().unwrap();
}

// =========================================================================
// Directory assertions
// =========================================================================

/// Sorted file names directly inside `dir`.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// File name to contents for every file directly inside `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .map(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&p).unwrap())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn injected_png_still_decodes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        write_image(&path, &DynamicImage::ImageRgb8(rgb_pattern(8, 8)));
        inject_png_text(&path, "Comment", "hello");

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgb8);
        assert_eq!(img.to_rgb8(), rgb_pattern(8, 8));
    }

    #[test]
    fn palette_fixture_decodes_with_alpha() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("indexed.png");
        write_palette_with_trns(&path);

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn injected_jpeg_still_decodes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        write_image(&path, &DynamicImage::ImageRgb8(rgb_pattern(16, 16)));
        inject_jpeg_exif(&path);

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));
    }

    #[test]
    fn snapshot_sees_content_changes() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), b"1").unwrap();
        let before = snapshot(tmp.path());
        fs::write(tmp.path().join("a"), b"2").unwrap();
        assert_ne!(snapshot(tmp.path()), before);
    }
}
