//! Input expansion.
//!
//! Turns the paths given on the command line into the list of files a batch
//! will process:
//!
//! - Files are passed through as given, supported or not, so the engine can
//!   report every one of them. Missing paths are passed through too and fail
//!   as "not a valid file".
//! - Directories are expanded to the supported images directly inside them,
//!   or anywhere below them with `recursive`. Unsupported files and leftover
//!   staging files (`*-temp*`) found this way are left out silently.
//!
//! Results keep command-line order; directory contents are sorted by name.
//! A path reached twice is listed once.

use crate::naming;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Expand command-line inputs into files.
pub fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for path in scan_directory(input, recursive)? {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        } else if seen.insert(input.clone()) {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Supported images inside `dir`, sorted by name within each directory.
///
/// An unreadable `dir` is an error; unreadable subdirectories are skipped
/// with a warning.
pub fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: dir.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !naming::is_supported(path) {
            debug!(path = %path.display(), "not an image, skipped");
        } else if naming::is_staging_artifact(path) {
            debug!(path = %path.display(), "staging leftover, skipped");
        } else {
            found.push(path.to_path_buf());
        }
    }
    debug!(dir = %dir.display(), files = found.len(), "scanned directory");
    Ok(found)
}
