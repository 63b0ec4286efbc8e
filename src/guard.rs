//! Exclusive, self-restoring substitution of a source file's contents.
//!
//! A [`FileSwap`] holds the per-path lock for as long as mutated text is on
//! disk. Dropping it (normally, on `?`, or while unwinding) writes the
//! original text back before the lock is released, so the next holder always
//! starts from the original file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::error::MutationError;

/// Sibling file holding the original text while a mutant is on disk.
pub fn backup_path(source_file: &Path) -> PathBuf {
    let mut backup = source_file.to_path_buf();
    let name = format!(
        ".{}.mutator.bak",
        source_file.file_name().unwrap_or_default().to_string_lossy()
    );
    backup.set_file_name(name);
    backup
}

/// Check if a backup file exists from a previous interrupted run.
pub fn check_interrupted_run(source_file: &Path) -> Option<PathBuf> {
    let bak = backup_path(source_file);
    if bak.exists() { Some(bak) } else { None }
}

/// Restore source from a leftover backup and remove the backup.
pub fn restore_from_backup(source_file: &Path, backup_file: &Path) -> Result<(), MutationError> {
    fs::copy(backup_file, source_file).map_err(|source| MutationError::Restore {
        path: source_file.to_path_buf(),
        source,
    })?;
    fs::remove_file(backup_file).map_err(|source| MutationError::Restore {
        path: backup_file.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// One lock per path, created on first use.
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Block on a path lock. A poisoned lock only means another holder
/// panicked, and that holder's drop already restored the file.
pub fn lock_path(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mutated contents on disk, restored on [`FileSwap::restore`] or drop.
pub struct FileSwap<'a> {
    path: &'a Path,
    original: &'a str,
    backup: PathBuf,
    restored: bool,
    // Dropped after `Drop::drop` has restored the file.
    _held: MutexGuard<'a, ()>,
}

impl<'a> FileSwap<'a> {
    /// Block until `lock` is free, then replace `path` with `mutated`.
    pub fn acquire(
        lock: &'a Mutex<()>,
        path: &'a Path,
        original: &'a str,
        mutated: &str,
    ) -> Result<Self, MutationError> {
        Self::swap_in(lock_path(lock), path, original, mutated)
    }

    /// Replace `path` with `mutated` under an already-held path lock.
    ///
    /// If the mutant cannot be written the original is put back before the
    /// error is returned; a failure to do that surfaces as
    /// [`MutationError::Restore`] instead of the write error.
    pub fn swap_in(
        held: MutexGuard<'a, ()>,
        path: &'a Path,
        original: &'a str,
        mutated: &str,
    ) -> Result<Self, MutationError> {
        let backup = backup_path(path);
        fs::write(&backup, original).map_err(|source| MutationError::Backup {
            path: backup.clone(),
            source,
        })?;

        let mut swap = FileSwap {
            path,
            original,
            backup,
            restored: false,
            _held: held,
        };

        if let Err(source) = fs::write(path, mutated) {
            warn!(path = %path.display(), err = %source, "mutant write failed, restoring");
            swap.restore()?;
            return Err(MutationError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
        debug!(path = %path.display(), "mutant swapped in");
        Ok(swap)
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    /// Write the original text back. Idempotent once it has succeeded.
    pub fn restore(&mut self) -> Result<(), MutationError> {
        if self.restored {
            return Ok(());
        }
        fs::write(self.path, self.original).map_err(|source| MutationError::Restore {
            path: self.path.to_path_buf(),
            source,
        })?;
        self.restored = true;
        if let Err(e) = fs::remove_file(&self.backup) {
            debug!(backup = %self.backup.display(), err = %e, "could not remove backup");
        }
        Ok(())
    }
}

impl Drop for FileSwap<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!(
                path = %self.path.display(),
                backup = %self.backup.display(),
                err = %e,
                "original source could not be restored; backup left in place"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_for_same_path_returns_same_lock() {
        let locks = FileLocks::new();
        let a = locks.lock_for(Path::new("/tmp/A.sol"));
        let b = locks.lock_for(Path::new("/tmp/A.sol"));
        let c = locks.lock_for(Path::new("/tmp/B.sol"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn restore_removes_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.sol");
        fs::write(&path, "orig").unwrap();
        let lock = Mutex::new(());
        let mut swap = FileSwap::acquire(&lock, &path, "orig", "mutated").unwrap();
        assert!(backup_path(&path).exists());
        swap.restore().unwrap();
        assert!(!backup_path(&path).exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "orig");
    }
}
