//! Staged file changes
//!
//! A [`StagingArea`] collects the final content of every file a run changes.
//! Nothing touches the disk until [`StagingArea::commit`], which first checks
//! that no staged file changed since it was read and only then writes, one
//! file at a time, each through a temp file and a rename.

use crate::error::CommitError;
use genmig_hunk::ContentHash;
use indexmap::IndexMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Change to one project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedChange {
    /// Replace or create with this content
    Write(String),
    /// Remove the file
    Delete,
}

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Project-relative path
    pub relative: PathBuf,
    /// Hash of the bytes read; `None` if the file did not exist
    pub expected: Option<ContentHash>,
    pub change: StagedChange,
}

/// Ordered path → change map
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    files: IndexMap<PathBuf, StagedFile>,
}

impl StagingArea {
    /// Empty staging area for a project root
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: IndexMap::new(),
        }
    }

    /// Stage a change; a later change to the same path replaces the earlier one
    pub fn stage(&mut self, file: StagedFile) {
        self.files.insert(file.relative.clone(), file);
    }

    /// Number of staged files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if nothing is staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Staged files in staging order
    pub fn files(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.values()
    }

    /// Verify and write every staged file
    ///
    /// Returns the project-relative paths that were written or removed.
    ///
    /// # Errors
    /// Returns [`CommitError::Drift`] before writing anything if a file no
    /// longer matches its read-time hash, or an I/O error from the write.
    pub async fn commit(self) -> Result<Vec<PathBuf>, CommitError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || self.commit_blocking())
            .await
            .map_err(|e| CommitError::io(root, io::Error::other(e)))?
    }

    fn commit_blocking(self) -> Result<Vec<PathBuf>, CommitError> {
        for file in self.files.values() {
            self.verify(file)?;
        }

        let mut written = Vec::with_capacity(self.files.len());
        for (relative, file) in self.files {
            let path = self.root.join(&relative);
            match &file.change {
                StagedChange::Write(content) => {
                    write_atomic(&path, content.as_bytes()).map_err(|e| CommitError::io(&path, e))?;
                    tracing::debug!(path = %relative.display(), "file written");
                }
                StagedChange::Delete => {
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(CommitError::io(&path, e)),
                    }
                    tracing::debug!(path = %relative.display(), "file removed");
                }
            }
            written.push(relative);
        }
        Ok(written)
    }

    fn verify(&self, file: &StagedFile) -> Result<(), CommitError> {
        let path = self.root.join(&file.relative);
        let current = match std::fs::read(&path) {
            Ok(bytes) => Some(ContentHash::compute(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(CommitError::io(&path, e)),
        };
        if current == file.expected {
            Ok(())
        } else {
            Err(CommitError::Drift {
                path: file.relative.clone(),
            })
        }
    }
}

/// Replace `path` with `bytes` via a temp file in the same directory
///
/// Parent directories are created; an existing file's permissions carry over.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
