//! Remote collaborators
//!
//! A run needs two things from outside the project: the generator's latest
//! published version ([`MetadataSource`]) and the template diff between two
//! tags ([`DiffSource`]).

use crate::config::GeneratorId;
use crate::error::FetchError;
use async_trait::async_trait;
use genmig_hunk::DiffSet;
use serde::{Deserialize, Serialize};

/// Published generator metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorMetadata {
    pub version: String,
}

impl GeneratorMetadata {
    /// Metadata with the given version
    #[inline]
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// Source of the generator's current version
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    /// Latest published metadata
    async fn latest_version(&self, generator: &GeneratorId) -> Result<GeneratorMetadata, FetchError>;
}

/// Source of template diffs between tags
#[async_trait]
pub trait DiffSource: Send + Sync + std::fmt::Debug {
    /// Changed files between `base` and `head`, in upstream order
    async fn fetch_diff(
        &self,
        generator: &GeneratorId,
        base: &str,
        head: &str,
    ) -> Result<DiffSet, FetchError>;
}

/// Fixed target version (`--to-version`)
#[derive(Debug, Clone)]
pub struct StaticMetadata {
    version: String,
}

impl StaticMetadata {
    /// Always report `version`
    #[inline]
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn latest_version(&self, _generator: &GeneratorId) -> Result<GeneratorMetadata, FetchError> {
        Ok(GeneratorMetadata::new(self.version.clone()))
    }
}
