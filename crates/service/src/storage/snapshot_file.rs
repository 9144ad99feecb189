use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use models::DatabaseRecord;
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::DatabaseError;

/// Suffix of the sibling file each save is staged in before the swap.
pub const TEMP_SUFFIX: &str = ".new";

/// JSON snapshot on disk, replaced atomically on every commit.
///
/// A commit writes the full record to `<path>.new`, syncs it and renames it
/// over `path`. Readers of `path` therefore see either the previous or the
/// new snapshot, never a torn one, and a crash before the rename leaves the
/// previous snapshot in place.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    temp_path: PathBuf,
    file_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SnapshotFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let mut temp: OsString = path.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        Self { path, temp_path: PathBuf::from(temp), file_lock: Mutex::new(()), generation: AtomicU64::new(0) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Whether a committed snapshot exists at the target path.
    pub fn exists(&self) -> Result<bool, DatabaseError> {
        self.path.try_exists().map_err(|e| DatabaseError::io(&self.path, e))
    }

    /// Number of commits that reached the rename step since this handle was created.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Read and decode the committed snapshot. Any decode problem makes the
    /// whole file unusable; nothing is salvaged.
    pub fn read(&self) -> Result<DatabaseRecord, DatabaseError> {
        let bytes = fs::read(&self.path).map_err(|e| DatabaseError::io(&self.path, e))?;
        DatabaseRecord::from_slice(&bytes)
            .map_err(|source| DatabaseError::Corrupt { path: self.path.clone(), source })
    }

    /// Capture a record and commit it.
    ///
    /// `snapshot` runs under the file lock, so a later commit always writes
    /// state at least as new as an earlier one.
    pub fn commit<F>(&self, snapshot: F) -> Result<(), DatabaseError>
    where
        F: FnOnce() -> DatabaseRecord,
    {
        let _guard = self.file_lock.lock();

        let bytes = snapshot().to_json_pretty().map_err(DatabaseError::Encode)?;
        self.write_temp(&bytes)?;

        let replacing = self.exists()?;
        if let Err(e) = fs::rename(&self.temp_path, &self.path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(DatabaseError::io(&self.path, e));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(path = %self.path.display(), bytes = bytes.len(), replacing, generation, "snapshot committed");
        Ok(())
    }

    fn write_temp(&self, bytes: &[u8]) -> Result<(), DatabaseError> {
        if let Some(parent) = self.temp_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DatabaseError::io(parent, e))?;
        }

        let mut file = File::create(&self.temp_path).map_err(|e| DatabaseError::io(&self.temp_path, e))?;
        file.write_all(bytes).map_err(|e| DatabaseError::io(&self.temp_path, e))?;
        file.sync_all().map_err(|e| DatabaseError::io(&self.temp_path, e))?;
        Ok(())
    }
}
