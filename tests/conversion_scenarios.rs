//! End-to-end conversion scenarios on real files.
//!
//! Every test runs the real codecs against a temp directory and checks the
//! directory afterwards: which files exist, which bytes changed, and that no
//! staging leftovers remain. External optimizers are disabled so results do
//! not depend on what is installed.
//!
//! Run with: cargo test --test conversion_scenarios

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use image_converter::batch::{ConversionSettings, convert_batch};
use image_converter::convert::Converter;
use image_converter::imaging::metadata::scan_file;
use image_converter::imaging::{MetadataKind, RustBackend};
use image_converter::scan::expand_inputs;
use image_converter::types::{
    CompressionLevel, ConversionOutcome, ConversionRequest, ErrorKind, OutcomeStatus, TargetFormat,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

// =========================================================================
// Fixtures
// =========================================================================

fn opaque(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 11) as u8, ((x ^ y) * 5) as u8])
    }))
}

fn translucent(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 9) as u8, (y * 3) as u8, 200, 64 + ((x + y) * 13 % 128) as u8])
    }))
}

fn write(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

/// Insert an APP1 EXIF segment after the JPEG SOI marker.
fn add_exif(path: &Path) {
    const PAYLOAD: &[u8] = b"Exif\0\0MM\0*\0\0\0\x08\0\0\0\0\0\0";
    let data = fs::read(path).unwrap();
    let mut out = data[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((PAYLOAD.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(PAYLOAD);
    out.extend_from_slice(&data[2..]);
    fs::write(path, out).unwrap();
}

/// Insert a `tIME` chunk before IEND.
/// Write an 8-bit RGBA PNG carrying a `tEXt` chunk.
fn write_png_with_text(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    let rgba = image.to_rgba8();
    let file = BufWriter::new(File::create(&path).unwrap());
    let mut encoder = png::Encoder::new(file, rgba.width(), rgba.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .add_text_chunk("Comment".into(), "shot on a phone".into())
        .unwrap();
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(rgba.as_raw()).unwrap();
    writer.finish().unwrap();
    path
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| (p.file_name().unwrap().to_string_lossy().into_owned(), fs::read(&p).unwrap()))
        .collect()
}

fn assert_no_artifacts(dir: &Path) {
    for name in listing(dir) {
        assert!(!name.contains("-temp"), "staging leftover: {name}");
    }
}

fn run(request: ConversionRequest) -> ConversionOutcome {
    let backend = RustBackend::new();
    Converter::new(&backend).process(&request)
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn png_to_webp_medium_replacing_original() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "photo.png", &opaque(40, 30));

    let outcome = run(
        ConversionRequest::new(&src, TargetFormat::Webp)
            .with_compression(CompressionLevel::Medium)
            .deleting_original(true),
    );

    assert_eq!(outcome.status, OutcomeStatus::Converted, "{}", outcome.message);
    assert_eq!(listing(tmp.path()), vec!["photo.webp"]);
    let out = image::open(tmp.path().join("photo.webp")).unwrap();
    assert_eq!((out.width(), out.height()), (40, 30));
}

#[test]
fn jpeg_clean_keeps_original_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "photo.jpeg", &opaque(32, 32));
    add_exif(&src);
    let before = fs::read(&src).unwrap();

    let outcome = run(ConversionRequest::new(&src, TargetFormat::Jpeg));

    assert_eq!(outcome.status, OutcomeStatus::CleanedNewFile);
    assert_eq!(listing(tmp.path()), vec!["photo-clean.jpeg", "photo.jpeg"]);
    assert_eq!(fs::read(&src).unwrap(), before);
    assert!(scan_file(&src).unwrap().contains(MetadataKind::Exif));
    assert!(!scan_file(&tmp.path().join("photo-clean.jpeg"))
        .unwrap()
        .contains(MetadataKind::Exif));
}

#[test]
fn transparent_png_to_jpeg_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "icon.png", &translucent(16, 16));
    let before = snapshot(tmp.path());

    for delete in [false, true] {
        let outcome = run(
            ConversionRequest::new(tmp.path().join("icon.png"), TargetFormat::Jpeg)
                .deleting_original(delete),
        );
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error, Some(ErrorKind::TransparencyConflict));
        assert_eq!(snapshot(tmp.path()), before);
    }
}

#[test]
fn unsupported_extensions_change_nothing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("anim.gif"), b"GIF89a").unwrap();
    fs::write(tmp.path().join("scan.tiff"), b"II*\0").unwrap();
    fs::write(tmp.path().join("README"), b"hello").unwrap();
    let before = snapshot(tmp.path());

    for name in ["anim.gif", "scan.tiff", "README"] {
        for target in TargetFormat::ALL {
            let outcome = run(
                ConversionRequest::new(tmp.path().join(name), target).deleting_original(true),
            );
            assert_eq!(outcome.status, OutcomeStatus::SkippedUnsupported);
            assert_eq!(outcome.error, Some(ErrorKind::UnsupportedFormat));
        }
    }
    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn in_place_cleaning_keeps_path_and_lossless_pixels() {
    let tmp = TempDir::new().unwrap();
    let original = translucent(20, 12);
    let png = write_png_with_text(tmp.path(), "shot.png", &original);
    assert!(!scan_file(&png).unwrap().is_empty());
    let webp = write(tmp.path(), "art.webp", &original);

    for src in [&png, &webp] {
        let ext = src.extension().unwrap().to_str().unwrap();
        let target: TargetFormat = ext.parse().unwrap();
        let outcome = run(ConversionRequest::new(src, target).deleting_original(true));

        assert_eq!(outcome.status, OutcomeStatus::CleanedInPlace);
        assert_eq!(outcome.output.as_deref(), Some(src.as_path()));
        assert!(scan_file(src).unwrap().is_empty());
        assert_eq!(image::open(src).unwrap().to_rgba8(), original.to_rgba8());
    }
    assert_eq!(listing(tmp.path()), vec!["art.webp", "shot.png"]);
}

#[test]
fn in_place_jpeg_cleaning_strips_exif() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "photo.jpg", &opaque(24, 24));
    add_exif(&src);

    let outcome = run(ConversionRequest::new(&src, TargetFormat::Jpeg).deleting_original(true));

    assert_eq!(outcome.status, OutcomeStatus::CleanedInPlace);
    assert!(outcome.metadata_removed >= 1);
    assert!(!scan_file(&src).unwrap().contains(MetadataKind::Exif));
    let out = image::open(&src).unwrap();
    assert_eq!((out.width(), out.height()), (24, 24));
    assert_eq!(listing(tmp.path()), vec!["photo.jpg"]);
}

#[test]
fn lossless_round_trip_preserves_pixels() {
    let tmp = TempDir::new().unwrap();
    let original = translucent(17, 9);
    let src = write(tmp.path(), "pic.png", &original);

    let there = run(ConversionRequest::new(&src, TargetFormat::Webp).deleting_original(true));
    assert_eq!(there.status, OutcomeStatus::Converted);
    let back = run(
        ConversionRequest::new(tmp.path().join("pic.webp"), TargetFormat::Png)
            .deleting_original(true),
    );
    assert_eq!(back.status, OutcomeStatus::Converted);

    assert_eq!(listing(tmp.path()), vec!["pic.png"]);
    assert_eq!(image::open(&src).unwrap().to_rgba8(), original.to_rgba8());
}

#[test]
fn lossy_round_trip_keeps_dimensions() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "pic.png", &opaque(33, 21));

    run(ConversionRequest::new(&src, TargetFormat::Jpeg).deleting_original(true));
    let back = run(
        ConversionRequest::new(tmp.path().join("pic.jpeg"), TargetFormat::Png)
            .deleting_original(true),
    );

    assert_eq!(back.status, OutcomeStatus::Converted);
    let out = image::open(&src).unwrap();
    assert_eq!((out.width(), out.height()), (33, 21));
    assert!(scan_file(&src).unwrap().is_empty());
}

#[test]
fn keeping_original_leaves_it_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "photo.png", &opaque(16, 16));
    let before = fs::read(&src).unwrap();

    let converted = run(ConversionRequest::new(&src, TargetFormat::Jpeg));
    let compressed = run(
        ConversionRequest::new(&src, TargetFormat::Png).with_compression(CompressionLevel::High),
    );

    assert_eq!(converted.status, OutcomeStatus::Converted);
    assert_eq!(compressed.status, OutcomeStatus::Compressed);
    assert_eq!(fs::read(&src).unwrap(), before);
    assert_eq!(
        listing(tmp.path()),
        vec!["photo-compressed.png", "photo-converted.jpeg", "photo.png"]
    );
}

#[test]
fn second_run_refuses_to_clobber_outputs() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "photo.png", &opaque(8, 8));

    let first = run(ConversionRequest::new(&src, TargetFormat::Webp));
    let converted = tmp.path().join("photo-converted.webp");
    let first_bytes = fs::read(&converted).unwrap();
    let second = run(ConversionRequest::new(&src, TargetFormat::Webp));

    assert_eq!(first.status, OutcomeStatus::Converted);
    assert_eq!(second.status, OutcomeStatus::Failed);
    assert_eq!(second.error, Some(ErrorKind::FilesystemFailure));
    assert_eq!(fs::read(&converted).unwrap(), first_bytes);
    assert_no_artifacts(tmp.path());
}

#[test]
fn directory_batch_reports_every_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.png", &opaque(8, 8));
    write(tmp.path(), "b.jpeg", &opaque(8, 8));
    write(tmp.path(), "c.png", &translucent(8, 8));
    fs::write(tmp.path().join("notes.txt"), b"not an image").unwrap();

    let files = expand_inputs(&[tmp.path().to_path_buf()], false).unwrap();
    assert_eq!(files.len(), 3);

    let backend = RustBackend::new();
    let converter = Converter::new(&backend);
    let mut settings = ConversionSettings::new(TargetFormat::Jpeg);
    settings.delete_original = true;
    let seen = Mutex::new(Vec::new());
    let sink = |outcome: ConversionOutcome| seen.lock().unwrap().push(outcome);

    let summary = convert_batch(&converter, &files, &settings, &sink);

    assert_eq!(summary.converted, 1);
    assert_eq!(summary.cleaned, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(seen.into_inner().unwrap().len(), 3);
    assert_eq!(
        listing(tmp.path()),
        vec!["a.jpeg", "b.jpeg", "c.png", "notes.txt"]
    );
    assert_no_artifacts(tmp.path());
}
