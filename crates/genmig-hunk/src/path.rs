//! Upstream → local path mapping
//!
//! Generator repositories keep templates under a directory such as
//! `generators/app/templates/`. A [`TemplatePrefix`] selects the upstream
//! files under that directory and maps them to project-relative paths.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};

/// Repository directory holding the templates
///
/// The empty prefix selects every upstream file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TemplatePrefix(Vec<String>);

impl TemplatePrefix {
    /// Parse a `/`-separated prefix
    ///
    /// # Errors
    /// Returns error if a segment is `..` or `.`
    pub fn new(prefix: &str) -> Result<Self, PathError> {
        let segments = prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| match seg {
                "." | ".." => Err(PathError::InvalidSegment(seg.to_string())),
                _ => Ok(seg.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }

    /// Prefix matching every file
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Check if prefix is empty
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Map an upstream path to a project-relative path
    ///
    /// Returns `Ok(None)` when the file lies outside the prefix.
    ///
    /// # Errors
    /// Returns error if the remaining path is absolute or escapes the
    /// project root
    pub fn to_local(&self, repo_path: &str) -> Result<Option<PathBuf>, PathError> {
        let segments: Vec<&str> = repo_path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() <= self.0.len()
            || self.0.iter().zip(&segments).any(|(p, s)| p != s)
        {
            return Ok(None);
        }

        let relative: PathBuf = segments[self.0.len()..].iter().collect();
        ensure_contained(&relative, repo_path)?;
        Ok(Some(relative))
    }
}

fn ensure_contained(relative: &Path, original: &str) -> Result<(), PathError> {
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Escapes(original.to_string()));
            }
        }
    }
    Ok(())
}

impl Display for TemplatePrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Errors related to template paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Prefix contains a relative segment
    #[error("invalid template prefix segment: '{0}'")]
    InvalidSegment(String),

    /// Upstream path would land outside the project
    #[error("upstream path escapes the project root: {0}")]
    Escapes(String),
}
