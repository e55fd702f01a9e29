//! Staged files: temporary siblings that clean up after themselves.
//!
//! Every byte the converter writes goes into a [`StagedFile`] first. A staged
//! file is a [`tempfile::TempPath`] reserved next to its final name, so two
//! workers can never share one, and it is deleted on drop unless it has been
//! persisted. An early return or a panic between reserving and persisting
//! therefore leaves no `-temp` artifact behind.
//!
//! Persisting is a single rename on the same filesystem, so the final name
//! always refers to either the old file or the complete new one:
//!
//! - [`StagedFile::persist`] replaces whatever is at the destination.
//! - [`StagedFile::persist_noclobber`] fails with
//!   [`io::ErrorKind::AlreadyExists`] instead of replacing.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

/// Random characters appended when the preferred staging name is taken.
pub const RANDOM_SUFFIX_LEN: usize = 6;

/// A reserved temporary file, removed on drop unless persisted.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    /// Reserve `preferred`, or `<stem>-XXXXXX<ext>` next to it if that name
    /// is already taken.
    ///
    /// The file is created empty and closed; callers write through the path.
    pub fn reserve(preferred: &Path) -> io::Result<Self> {
        let dir = match preferred.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let stem = preferred.file_stem().unwrap_or_default();
        let suffix = match preferred.extension() {
            Some(ext) => {
                let mut s = OsString::from(".");
                s.push(ext);
                s
            }
            None => OsString::new(),
        };

        let exact = Builder::new()
            .prefix(stem)
            .suffix(&suffix)
            .rand_bytes(0)
            .tempfile_in(dir);
        let file = match exact {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let mut prefix = stem.to_os_string();
                prefix.push("-");
                Builder::new()
                    .prefix(&prefix)
                    .suffix(&suffix)
                    .rand_bytes(RANDOM_SUFFIX_LEN)
                    .tempfile_in(dir)?
            }
            Err(e) => return Err(e),
        };

        let path = file.into_temp_path();
        debug!(path = %path.display(), "reserved staging file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move into `dest`, replacing any existing file.
    ///
    /// On failure the staging file is removed.
    pub fn persist(self, dest: &Path) -> io::Result<()> {
        self.path.persist(dest)?;
        Ok(())
    }

    /// Move into `dest` only if nothing exists there yet.
    pub fn persist_noclobber(self, dest: &Path) -> io::Result<()> {
        self.path.persist_noclobber(dest)?;
        Ok(())
    }
}

/// Remove a file we created, logging instead of failing.
///
/// Used to roll back an output whose transaction could not complete.
pub fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "rolled back output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not roll back output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::dir_listing;
    use tempfile::TempDir;

    #[test]
    fn reserve_uses_preferred_name_when_free() {
        let tmp = TempDir::new().unwrap();
        let staged = StagedFile::reserve(&tmp.path().join("a-temp.png")).unwrap();
        assert_eq!(staged.path(), tmp.path().join("a-temp.png"));
        assert_eq!(fs::metadata(staged.path()).unwrap().len(), 0);
    }

    #[test]
    fn reserve_adds_random_suffix_to_taken_names() {
        let tmp = TempDir::new().unwrap();
        let preferred = tmp.path().join("a-temp.png");
        fs::write(&preferred, b"user file").unwrap();

        let first = StagedFile::reserve(&preferred).unwrap();
        let second = StagedFile::reserve(&preferred).unwrap();
        assert_ne!(first.path(), second.path());
        for staged in [&first, &second] {
            let name = staged.path().file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with("a-temp-") && name.ends_with(".png"), "{name}");
            assert_eq!(name.len(), "a-temp-.png".len() + RANDOM_SUFFIX_LEN);
            assert!(crate::naming::is_staging_artifact(staged.path()), "{name}");
        }
        // The pre-existing file is untouched
        assert_eq!(fs::read(&preferred).unwrap(), b"user file");
    }

    #[test]
    fn drop_removes_unpersisted_file() {
        let tmp = TempDir::new().unwrap();
        {
            let staged = StagedFile::reserve(&tmp.path().join("x-temp.webp")).unwrap();
            fs::write(staged.path(), b"half written").unwrap();
        }
        assert!(dir_listing(tmp.path()).is_empty());
    }

    #[test]
    fn persist_replaces_destination() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("photo.png");
        fs::write(&dest, b"old").unwrap();

        let staged = StagedFile::reserve(&tmp.path().join("photo-temp.png")).unwrap();
        fs::write(staged.path(), b"new").unwrap();
        staged.persist(&dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert_eq!(dir_listing(tmp.path()), vec!["photo.png"]);
    }

    #[test]
    fn failed_persist_removes_staging_file() {
        let tmp = TempDir::new().unwrap();
        let staged = StagedFile::reserve(&tmp.path().join("photo-temp.png")).unwrap();
        fs::write(staged.path(), b"new").unwrap();

        let missing_dir = tmp.path().join("gone").join("photo.png");
        assert!(staged.persist(&missing_dir).is_err());
        assert!(dir_listing(tmp.path()).is_empty());
    }

    #[test]
    fn persist_noclobber_writes_new_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("photo-clean.png");

        let staged = StagedFile::reserve(&tmp.path().join("photo-temp.png")).unwrap();
        fs::write(staged.path(), b"clean").unwrap();
        staged.persist_noclobber(&dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"clean");
        assert_eq!(dir_listing(tmp.path()), vec!["photo-clean.png"]);
    }

    #[test]
    fn persist_noclobber_refuses_existing_destination() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("photo.webp");
        fs::write(&dest, b"someone else's").unwrap();

        let staged = StagedFile::reserve(&tmp.path().join("photo-temp.webp")).unwrap();
        fs::write(staged.path(), b"ours").unwrap();
        let err = staged.persist_noclobber(&dest).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dest).unwrap(), b"someone else's");
        // Staging file dropped with the failed call
        assert_eq!(dir_listing(tmp.path()), vec!["photo.webp"]);
    }

    #[test]
    fn discard_ignores_missing_files() {
        let tmp = TempDir::new().unwrap();
        discard(&tmp.path().join("nothing.png"));
    }
}
