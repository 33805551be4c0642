//! Error types for genmig core
//!
//! Every variant of [`MigrationError`] is fatal and leaves local files and the
//! version state untouched. Per-hunk conflicts are not errors; they are
//! reported through [`genmig_apply::ConflictKind`].

use genmig_hunk::{DelimiterError, PatchParseError, PathError};
use std::path::PathBuf;

/// Fatal migration error
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Upstream version equals the tracked version
    #[error("{generator} is already up to date at version {version}")]
    AlreadyUpToDate { generator: String, version: String },

    /// Project descriptor or scaffold record could not be read or parsed
    #[error("missing source {}: {reason}", path.display())]
    MissingSource { path: PathBuf, reason: String },

    /// Remote metadata or diff retrieval failed
    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] FetchError),

    /// Another run holds the project lock
    #[error("project is locked by another run: {}", path.display())]
    Locked { path: PathBuf },

    /// Writing staged changes failed
    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrationError {
    /// Create missing source error
    #[inline]
    pub fn missing_source(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MissingSource {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the error is the "nothing to do" case
    #[inline]
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::AlreadyUpToDate { .. })
    }
}

/// Remote metadata / diff retrieval errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Response body did not have the expected shape
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// Upstream patch text could not be parsed
    #[error("invalid patch: {0}")]
    Patch(#[from] PatchParseError),

    /// Local diff file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Classify a reqwest error
    #[must_use]
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Create malformed response error
    #[inline]
    pub fn malformed(url: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors while writing staged changes
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// File changed on disk after it was read
    #[error("{} changed on disk during the run", path.display())]
    Drift { path: PathBuf },

    /// Filesystem failure
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file could not be serialized
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CommitError {
    /// Create I/O error
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No generator was configured
    #[error("no generator configured")]
    MissingGenerator,

    /// Generator id is not `owner/repo`
    #[error("invalid generator '{0}': expected owner/repo")]
    InvalidGenerator(String),

    /// Bad delimiter pair
    #[error(transparent)]
    Delimiters(#[from] DelimiterError),

    /// Bad template prefix
    #[error(transparent)]
    TemplatePrefix(#[from] PathError),

    /// Numeric setting out of range
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
