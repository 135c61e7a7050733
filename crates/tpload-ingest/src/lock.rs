//! Advisory folder lock
//!
//! A marker file inside the watched folder tells other loader runs that the
//! folder is being processed. The lock is local to the folder's filesystem;
//! it coordinates processes on one host, nothing more.

use crate::error::LockError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// How the marker is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Atomic create-fails-if-exists; a present marker means the folder is busy
    #[default]
    Exclusive,
    /// Open the marker, creating it if absent. A present marker is reused
    /// without error, so two runs can both "hold" the folder. This is not
    /// mutual exclusion.
    OpenOrCreate,
}

/// Lock marker location and policy for one folder
#[derive(Debug, Clone)]
pub struct FolderLock {
    marker: Option<PathBuf>,
    policy: LockPolicy,
}

impl FolderLock {
    /// Lock `folder` through `lock_filename`; an empty name disables locking
    pub fn new(folder: &Path, lock_filename: &str, policy: LockPolicy) -> Self {
        let marker = (!lock_filename.is_empty()).then(|| folder.join(lock_filename));
        Self { marker, policy }
    }

    pub fn marker_path(&self) -> Option<&Path> {
        self.marker.as_deref()
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Whether a marker is currently present
    pub fn is_locked(&self) -> bool {
        self.marker.as_deref().is_some_and(Path::exists)
    }

    /// Create the marker and return a guard that removes it
    pub fn acquire(&self) -> Result<FolderLockGuard, LockError> {
        let Some(path) = self.marker.clone() else {
            return Ok(FolderLockGuard { marker: None });
        };

        let mut options = OpenOptions::new();
        match self.policy {
            LockPolicy::Exclusive => options.write(true).create_new(true),
            LockPolicy::OpenOrCreate => options.append(true).create(true),
        };

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LockError::Busy { path });
            },
            Err(source) => return Err(LockError::Create { path, source }),
        };

        if self.policy == LockPolicy::Exclusive {
            // owner hint for operators; the lock itself is the file's existence
            let stamp = format!(
                "pid={} acquired={}\n",
                std::process::id(),
                chrono::Utc::now().to_rfc3339()
            );
            if let Err(source) = file.write_all(stamp.as_bytes()) {
                let _ = std::fs::remove_file(&path);
                return Err(LockError::Create { path, source });
            }
        }

        Ok(FolderLockGuard { marker: Some(path) })
    }
}

/// Held lock; removes the marker on [`release`](Self::release) or drop
#[derive(Debug)]
#[must_use = "the folder is unlocked as soon as the guard is dropped"]
pub struct FolderLockGuard {
    marker: Option<PathBuf>,
}

impl FolderLockGuard {
    /// Remove the marker, reporting failure
    ///
    /// A marker that is already gone counts as released.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.marker.take() {
            Some(path) => remove_marker(&path).map_err(|source| LockError::Remove { path, source }),
            None => Ok(()),
        }
    }
}

impl Drop for FolderLockGuard {
    fn drop(&mut self) {
        if let Some(path) = self.marker.take() {
            if let Err(e) = remove_marker(&path) {
                warn!(marker = %path.display(), error = %e, "Failed to remove lock marker");
            }
        }
    }
}

fn remove_marker(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MARKER: &str = ".tpload.lck";

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let lock = FolderLock::new(dir.path(), MARKER, LockPolicy::Exclusive);

        let guard = lock.acquire().unwrap();
        assert!(lock.is_locked());
        assert!(dir.path().join(MARKER).exists());

        guard.release().unwrap();
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_exclusive_rejects_second_holder() {
        let dir = TempDir::new().unwrap();
        let lock = FolderLock::new(dir.path(), MARKER, LockPolicy::Exclusive);

        let _guard = lock.acquire().unwrap();
        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, LockError::Busy { .. }));
    }

    #[test]
    fn test_open_or_create_reuses_existing_marker() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MARKER), "").unwrap();
        let lock = FolderLock::new(dir.path(), MARKER, LockPolicy::OpenOrCreate);

        let first = lock.acquire().unwrap();
        let second = lock.acquire().unwrap();

        first.release().unwrap();
        assert!(!lock.is_locked());
        // marker already gone
        second.release().unwrap();
    }

    #[test]
    fn test_drop_removes_marker() {
        let dir = TempDir::new().unwrap();
        let lock = FolderLock::new(dir.path(), MARKER, LockPolicy::Exclusive);
        {
            let _guard = lock.acquire().unwrap();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_empty_filename_disables_lock() {
        let dir = TempDir::new().unwrap();
        let lock = FolderLock::new(dir.path(), "", LockPolicy::Exclusive);
        assert!(lock.marker_path().is_none());

        let a = lock.acquire().unwrap();
        let b = lock.acquire().unwrap();
        a.release().unwrap();
        b.release().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_failure_in_missing_folder() {
        let dir = TempDir::new().unwrap();
        let lock = FolderLock::new(&dir.path().join("absent"), MARKER, LockPolicy::Exclusive);
        assert!(matches!(lock.acquire().unwrap_err(), LockError::Create { .. }));
    }
}
