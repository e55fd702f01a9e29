//! Sibling-file naming for working copies and outputs.
//!
//! Every file the converter writes lives next to its source and is named
//! after it: the source's base (directory + stem) followed by a marker and an
//! extension. The source extension keeps its original spelling and case for
//! same-format outputs; cross-format outputs use the canonical target
//! extension.
//!
//! | Purpose | Name |
//! |---|---|
//! | Working copy (same format) | `<base>-temp<ext>` |
//! | Recompression staging | `<base>-temp-compressed<ext>` |
//! | Conversion staging | `<base>-temp.<target>` |
//! | Cleaned sibling | `<base>-clean<ext>` |
//! | Compressed sibling | `<base>-compressed<ext>` |
//! | Converted sibling | `<base>-converted.<target>` |
//! | Converted replacement | `<base>.<target>` |
//!
//! Staging names are only a starting point: the [`staging`](crate::staging)
//! module appends a random `-XXXXXX` if the name is already taken.

use crate::staging::RANDOM_SUFFIX_LEN;
use crate::types::TargetFormat;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const TEMP_MARKER: &str = "-temp";
pub const CLEAN_MARKER: &str = "-clean";
pub const COMPRESSED_MARKER: &str = "-compressed";
pub const CONVERTED_MARKER: &str = "-converted";

/// Extensions accepted as conversion sources (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];

/// Whether the path's extension is one the converter reads.
pub fn is_supported(path: &Path) -> bool {
    TargetFormat::of_path(path).is_some()
}

/// Whether `path` is already in `target` format, judged by extension.
///
/// Case-insensitive; `.jpg` and `jpeg` are equal.
pub fn is_same_format(target: TargetFormat, path: &Path) -> bool {
    TargetFormat::of_path(path) == Some(target)
}

/// Split a path into its base (parent joined with the file stem) and its
/// extension including the leading dot (empty if there is none).
fn split(path: &Path) -> (PathBuf, String) {
    let stem = path.file_stem().unwrap_or_default();
    let base = match path.parent() {
        Some(parent) => parent.join(stem),
        None => PathBuf::from(stem),
    };
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (base, ext)
}

/// `<base><marker><ext>`; `ext` carries its own leading dot.
fn with_marker(base: &Path, marker: &str, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(marker);
    name.push(ext);
    PathBuf::from(name)
}

/// Working copy used for same-format cleaning: `<base>-temp<ext>`.
pub fn temp_path(source: &Path) -> PathBuf {
    let (base, ext) = split(source);
    with_marker(&base, TEMP_MARKER, &ext)
}

/// Staging file for a same-format recompression: `<base>-temp-compressed<ext>`.
pub fn temp_compressed_path(source: &Path) -> PathBuf {
    let (base, ext) = split(source);
    with_marker(&base, &format!("{TEMP_MARKER}{COMPRESSED_MARKER}"), &ext)
}

/// Staging file for a cross-format conversion: `<base>-temp.<target>`.
pub fn temp_converted_path(source: &Path, target: TargetFormat) -> PathBuf {
    let (base, _) = split(source);
    with_marker(&base, TEMP_MARKER, &format!(".{}", target.extension()))
}

/// Cleaned sibling kept next to the original: `<base>-clean<ext>`.
pub fn clean_path(source: &Path) -> PathBuf {
    let (base, ext) = split(source);
    with_marker(&base, CLEAN_MARKER, &ext)
}

/// Recompressed sibling kept next to the original: `<base>-compressed<ext>`.
pub fn compressed_path(source: &Path) -> PathBuf {
    let (base, ext) = split(source);
    with_marker(&base, COMPRESSED_MARKER, &ext)
}

/// Converted sibling kept next to the original: `<base>-converted.<target>`.
pub fn converted_path(source: &Path, target: TargetFormat) -> PathBuf {
    let (base, _) = split(source);
    with_marker(&base, CONVERTED_MARKER, &format!(".{}", target.extension()))
}

/// Replacement for a deleted original: `<base>.<target>`.
pub fn renamed_path(source: &Path, target: TargetFormat) -> PathBuf {
    let (base, _) = split(source);
    with_marker(&base, "", &format!(".{}", target.extension()))
}

/// Whether a file name looks like one of our staging files
/// (`x-temp.png`, `x-temp-compressed.png`, `x-temp-Ab12cd.webp`).
///
/// Directory scans skip these so a crashed run's leftovers are not fed back
/// in as sources.
pub fn is_staging_artifact(path: &Path) -> bool {
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
        return false;
    };
    let Some(idx) = stem.rfind(TEMP_MARKER) else {
        return false;
    };
    let rest = &stem[idx + TEMP_MARKER.len()..];
    rest.is_empty()
        || rest.strip_prefix('-').is_some_and(|tail| {
            tail.split('-')
                .all(|part| part == &COMPRESSED_MARKER[1..] || is_random_suffix(part))
        })
}

fn is_random_suffix(part: &str) -> bool {
    part.len() == RANDOM_SUFFIX_LEN && part.chars().all(|c| c.is_ascii_alphanumeric())
}
