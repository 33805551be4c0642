//! Migration configuration
//!
//! [`MigrationConfig`] can be built in code with the `with_*` methods or loaded
//! from a TOML file; the CLI layers its flags on top.
//!
//! ```toml
//! generator = "acme/generator-widget"
//! template_prefix = "generators/app/templates"
//! conflict_policy = "append-markers"
//!
//! [delimiters]
//! open = "<%="
//! close = "%>"
//! ```

use crate::error::ConfigError;
use genmig_apply::ConflictPolicy;
use genmig_hunk::{DelimiterSpec, TemplatePrefix};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Generator repository on the source-control host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneratorId {
    owner: String,
    repo: String,
}

impl GeneratorId {
    /// Create from parts
    ///
    /// # Errors
    /// Returns error if either part is empty or contains `/`
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, ConfigError> {
        let owner = owner.into();
        let repo = repo.into();
        if owner.is_empty() || repo.is_empty() || owner.contains('/') || repo.contains('/') {
            return Err(ConfigError::InvalidGenerator(format!("{owner}/{repo}")));
        }
        Ok(Self { owner, repo })
    }

    /// Repository owner
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    #[inline]
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Key of the generator's entry in the state file
    #[inline]
    #[must_use]
    pub fn state_key(&self) -> &str {
        &self.repo
    }
}

impl FromStr for GeneratorId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, repo) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidGenerator(s.to_string()))?;
        Self::new(owner, repo)
    }
}

impl TryFrom<String> for GeneratorId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeneratorId> for String {
    fn from(id: GeneratorId) -> Self {
        id.to_string()
    }
}

impl Display for GeneratorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Access token for the source-control host; redacted in debug output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Migration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Generator repository (`owner/repo`)
    pub generator: Option<GeneratorId>,
    /// Placeholder markers used by the templates
    pub delimiters: DelimiterSpec,
    /// Repository directory holding the templates
    pub template_prefix: String,
    /// Root of the scaffolded project
    pub project_root: PathBuf,
    /// Access token for the source-control host
    #[serde(skip_serializing)]
    pub token: Option<AccessToken>,
    /// Prefix turning a version into a tag name
    pub tag_prefix: String,
    /// Branch whose `package.json` carries the latest version
    pub metadata_branch: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Files read and matched concurrently
    pub max_concurrency: usize,
    /// Advance the tracked version when some files conflicted
    pub advance_on_conflict: bool,
    /// Handling of conflicting files
    pub conflict_policy: ConflictPolicy,
    /// Project descriptor file name
    pub descriptor_file: String,
    /// Version state / scaffold record file name
    pub state_file: String,
    /// Run lock file name
    pub lock_file: String,
    /// Plan and report without writing anything
    pub dry_run: bool,
}

impl MigrationConfig {
    /// Configuration for a generator with all defaults
    #[inline]
    #[must_use]
    pub fn new(generator: GeneratorId) -> Self {
        Self {
            generator: Some(generator),
            ..Self::default()
        }
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid configuration
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// With generator
    #[inline]
    #[must_use]
    pub fn with_generator(mut self, generator: GeneratorId) -> Self {
        self.generator = Some(generator);
        self
    }

    /// With delimiters
    #[inline]
    #[must_use]
    pub fn with_delimiters(mut self, delimiters: DelimiterSpec) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// With template prefix
    #[inline]
    #[must_use]
    pub fn with_template_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.template_prefix = prefix.into();
        self
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// With access token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(AccessToken::new(token));
        self
    }

    /// With tag prefix
    #[inline]
    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// With metadata branch
    #[inline]
    #[must_use]
    pub fn with_metadata_branch(mut self, branch: impl Into<String>) -> Self {
        self.metadata_branch = branch.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With max concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// With advance-on-conflict policy
    #[inline]
    #[must_use]
    pub fn with_advance_on_conflict(mut self, advance: bool) -> Self {
        self.advance_on_conflict = advance;
        self
    }

    /// With conflict policy
    #[inline]
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Configured generator
    ///
    /// # Errors
    /// Returns error if no generator was set
    pub fn generator(&self) -> Result<&GeneratorId, ConfigError> {
        self.generator
            .as_ref()
            .ok_or(ConfigError::MissingGenerator)
    }

    /// Parsed template prefix
    ///
    /// # Errors
    /// Returns error if the prefix has relative segments
    pub fn template_prefix(&self) -> Result<TemplatePrefix, ConfigError> {
        Ok(TemplatePrefix::new(&self.template_prefix)?)
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Tag name for a version
    #[inline]
    #[must_use]
    pub fn tag_for(&self, version: &str) -> String {
        format!("{}{version}", self.tag_prefix)
    }

    /// Path of the project descriptor
    #[inline]
    #[must_use]
    pub fn descriptor_path(&self) -> PathBuf {
        self.project_root.join(&self.descriptor_file)
    }

    /// Path of the state file
    #[inline]
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.project_root.join(&self.state_file)
    }

    /// Path of the lock file
    #[inline]
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.project_root.join(&self.lock_file)
    }

    /// Check settings that have no valid default
    ///
    /// # Errors
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator()?;
        self.template_prefix()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "request_timeout_secs",
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "max_concurrency",
            });
        }
        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            generator: None,
            delimiters: DelimiterSpec::default(),
            template_prefix: String::new(),
            project_root: PathBuf::from("."),
            token: None,
            tag_prefix: "v".to_string(),
            metadata_branch: "master".to_string(),
            request_timeout_secs: 30,
            max_concurrency: 8,
            advance_on_conflict: true,
            conflict_policy: ConflictPolicy::default(),
            descriptor_file: "package.json".to_string(),
            state_file: ".yo-rc.json".to_string(),
            lock_file: ".genmig.lock".to_string(),
            dry_run: false,
        }
    }
}
