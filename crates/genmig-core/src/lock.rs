//! Per-project run lock

use crate::error::{CommitError, MigrationError};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Exclusive lock file held for the duration of a run
///
/// Removed when dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock file, failing if it already exists
    ///
    /// # Errors
    /// Returns [`MigrationError::Locked`] if another run holds the lock
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, MigrationError> {
        let path = path.into();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(MigrationError::Locked { path });
            }
            Err(e) => return Err(CommitError::io(path, e).into()),
        };

        // pid is informational only
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            tracing::warn!(path = %path.display(), error = %e, "failed to record pid in lock file");
        }
        tracing::debug!(path = %path.display(), "run lock acquired");
        Ok(Self { path })
    }

    /// Lock file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".genmig.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert!(matches!(
            RunLock::acquire(&path),
            Err(MigrationError::Locked { .. })
        ));

        drop(lock);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path).is_ok());
    }
}
