//! Version state store
//!
//! The tracked generator version lives in the scaffold record
//! (`.yo-rc.json`) under the generator's repository name:
//!
//! ```json
//! {
//!   "generator-widget": {
//!     "version": "1.0.0",
//!     "appName": "widget"
//!   }
//! }
//! ```
//!
//! Committing rewrites only that entry's `version`; every other key keeps its
//! value and position.

use crate::documents;
use crate::error::{CommitError, MigrationError};
use crate::staging::write_atomic;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Tracked version plus the version a run migrates to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionState {
    /// Entry key in the state file
    pub generator_key: String,
    /// Version the project was last migrated to
    pub old_version: String,
    /// Version being migrated to, once known
    pub new_version: Option<String>,
}

impl VersionState {
    /// Set the target version
    #[inline]
    #[must_use]
    pub fn with_new_version(mut self, version: impl Into<String>) -> Self {
        self.new_version = Some(version.into());
        self
    }

    /// Check if the target equals the tracked version
    #[inline]
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.new_version.as_deref() == Some(self.old_version.as_str())
    }
}

/// Reads and commits [`VersionState`]
#[derive(Debug, Clone)]
pub struct VersionStateStore {
    path: PathBuf,
}

impl VersionStateStore {
    /// Store backed by the given file
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracked version for `generator_key`
    ///
    /// # Errors
    /// Returns [`MigrationError::MissingSource`] if the file, the entry or its
    /// `version` string is missing
    pub async fn load(&self, generator_key: &str) -> Result<VersionState, MigrationError> {
        let document = documents::read_object(&self.path).await?;
        let entry = documents::entry(&document, generator_key)
            .map_err(|reason| MigrationError::missing_source(&self.path, reason))?;

        let version = entry
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MigrationError::missing_source(
                    &self.path,
                    format!("entry '{generator_key}' has no version string"),
                )
            })?;

        Ok(VersionState {
            generator_key: generator_key.to_string(),
            old_version: version.to_string(),
            new_version: None,
        })
    }

    /// Persist `state.new_version` as the tracked version
    ///
    /// Does nothing when no new version is set.
    ///
    /// # Errors
    /// Returns error if the file cannot be re-read, serialized or written
    pub async fn commit(&self, state: &VersionState) -> Result<(), CommitError> {
        let Some(new_version) = state.new_version.as_deref() else {
            return Ok(());
        };

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CommitError::io(&self.path, e))?;
        let mut document = documents::parse_object(&text).map_err(|reason| {
            CommitError::io(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, reason))
        })?;

        set_version(&mut document, &state.generator_key, new_version);

        let mut rendered = serde_json::to_string_pretty(&Value::Object(document)).map_err(|source| {
            CommitError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        if text.ends_with('\n') {
            rendered.push('\n');
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, rendered.as_bytes()))
            .await
            .map_err(|e| CommitError::io(&self.path, std::io::Error::other(e)))?
            .map_err(|e| CommitError::io(&self.path, e))?;

        tracing::info!(
            generator = %state.generator_key,
            from = %state.old_version,
            to = %new_version,
            "tracked version advanced"
        );
        Ok(())
    }
}

fn set_version(document: &mut Map<String, Value>, key: &str, version: &str) {
    let entry = document
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(map) = entry {
        map.insert("version".to_string(), Value::String(version.to_string()));
    }
}
