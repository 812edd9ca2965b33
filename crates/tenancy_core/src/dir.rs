//! Store directory management.
//!
//! ```text
//! <store>/
//! ├─ MANIFEST       # format version, schema version, last checkpoint
//! ├─ LOCK           # advisory lock for single-process access
//! ├─ journal.log    # committed transactions since the last checkpoint
//! └─ image.dat      # checkpoint image of all tables
//! ```

use crate::error::{CoreError, CoreResult};
use crate::manifest::Manifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "MANIFEST";
const MANIFEST_TEMP: &str = "MANIFEST.tmp";
const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "journal.log";
const IMAGE_FILE: &str = "image.dat";

/// An exclusively locked store directory.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (or creates) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if the directory is missing and `create_if_missing`
    ///   is false, or the path is not a directory
    /// - `StoreLocked` if another process holds the lock
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Journal file path.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }

    /// Checkpoint image path.
    #[must_use]
    pub fn image_path(&self) -> PathBuf {
        self.path.join(IMAGE_FILE)
    }

    /// Manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Loads the manifest; `None` for a new store.
    pub fn load_manifest(&self) -> CoreResult<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        if data.is_empty() {
            return Ok(None);
        }
        Manifest::decode(&data).map(Some)
    }

    /// Writes the manifest with write-then-rename.
    pub fn save_manifest(&self, manifest: &Manifest) -> CoreResult<()> {
        let temp = self.path.join(MANIFEST_TEMP);
        let mut file = File::create(&temp)?;
        file.write_all(&manifest.encode()?)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, self.manifest_path())?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("store");
        let dir = StoreDir::open(&path, true).unwrap();
        assert!(dir.path().is_dir());
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.journal_path(), path.join("journal.log"));
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let tmp = tempdir().unwrap();
        let err = StoreDir::open(&tmp.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn second_open_is_locked() {
        let tmp = tempdir().unwrap();
        let _held = StoreDir::open(tmp.path(), true).unwrap();
        assert!(matches!(
            StoreDir::open(tmp.path(), true),
            Err(CoreError::StoreLocked)
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let tmp = tempdir().unwrap();
        drop(StoreDir::open(tmp.path(), true).unwrap());
        assert!(StoreDir::open(tmp.path(), true).is_ok());
    }

    #[test]
    fn manifest_persists() {
        let tmp = tempdir().unwrap();
        let dir = StoreDir::open(tmp.path(), true).unwrap();
        assert!(dir.load_manifest().unwrap().is_none());

        let manifest = Manifest::new(2);
        dir.save_manifest(&manifest).unwrap();
        assert_eq!(dir.load_manifest().unwrap(), Some(manifest));
        assert!(!tmp.path().join(MANIFEST_TEMP).exists());
    }
}
