//! Offline diff source
//!
//! Reads a multi-file unified diff (for example `git diff v1.0.0 v1.1.0`
//! output saved to a file) instead of asking the source-control host.

use crate::config::GeneratorId;
use crate::error::FetchError;
use crate::source::DiffSource;
use async_trait::async_trait;
use genmig_hunk::{parse_unified_diff, DiffSet};
use std::path::{Path, PathBuf};

/// Diff source backed by a unified diff file
#[derive(Debug, Clone)]
pub struct DiffFileSource {
    path: PathBuf,
}

impl DiffFileSource {
    /// Source reading `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Diff file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiffSource for DiffFileSource {
    async fn fetch_diff(
        &self,
        generator: &GeneratorId,
        base: &str,
        head: &str,
    ) -> Result<DiffSet, FetchError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let files = parse_unified_diff(&text)?;
        tracing::debug!(
            %generator,
            path = %self.path.display(),
            files = files.len(),
            "loaded diff file"
        );
        Ok(DiffSet::new(base, head, files))
    }
}
