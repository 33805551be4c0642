//! GitHub-backed metadata and diff sources
//!
//! - latest version: `package.json` on the metadata branch, read from
//!   `raw.githubusercontent.com`
//! - diff: the compare API, one unified `patch` per changed file

use crate::config::{AccessToken, GeneratorId, MigrationConfig};
use crate::error::{ConfigError, FetchError};
use crate::source::{DiffSource, GeneratorMetadata, MetadataSource};
use async_trait::async_trait;
use genmig_hunk::{parse_patch, ChangeStatus, DiffSet, FileChange};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

/// Default REST API root
pub const API_BASE: &str = "https://api.github.com";

/// Default raw content root
pub const RAW_BASE: &str = "https://raw.githubusercontent.com";

/// The compare API lists at most this many files per response
const COMPARE_FILE_LIMIT: usize = 300;

/// Client for one GitHub host
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    branch: String,
}

impl GithubClient {
    /// Client configured from migration settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &MigrationConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("genmig/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(value) = config.token.as_ref().and_then(auth_header) {
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            http,
            api_base: API_BASE.to_string(),
            raw_base: RAW_BASE.to_string(),
            branch: config.metadata_branch.clone(),
        })
    }

    /// Point at different hosts (GitHub Enterprise, mirrors)
    #[must_use]
    pub fn with_base_urls(mut self, api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of the generator's `package.json` on the metadata branch
    #[must_use]
    pub fn metadata_url(&self, generator: &GeneratorId) -> String {
        format!(
            "{}/{}/{}/{}/package.json",
            self.raw_base,
            generator.owner(),
            generator.repo(),
            self.branch
        )
    }

    /// Compare API URL for two tags
    #[must_use]
    pub fn compare_url(&self, generator: &GeneratorId, base: &str, head: &str) -> String {
        format!(
            "{}/repos/{}/{}/compare/{base}...{head}",
            self.api_base,
            generator.owner(),
            generator.repo()
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        serde_json::from_str(&body).map_err(|e| FetchError::malformed(url, e))
    }
}

fn auth_header(token: &AccessToken) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose())).ok()?;
    value.set_sensitive(true);
    Some(value)
}

#[async_trait]
impl MetadataSource for GithubClient {
    async fn latest_version(&self, generator: &GeneratorId) -> Result<GeneratorMetadata, FetchError> {
        let url = self.metadata_url(generator);
        let descriptor: serde_json::Value = self.get_json(&url).await?;
        let version = descriptor
            .get("version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| FetchError::malformed(&url, "no version string in package.json"))?;
        tracing::debug!(%generator, version, "latest published version");
        Ok(GeneratorMetadata::new(version))
    }
}

#[async_trait]
impl DiffSource for GithubClient {
    async fn fetch_diff(
        &self,
        generator: &GeneratorId,
        base: &str,
        head: &str,
    ) -> Result<DiffSet, FetchError> {
        let url = self.compare_url(generator, base, head);
        let comparison: Comparison = self.get_json(&url).await?;
        if comparison.files.len() >= COMPARE_FILE_LIMIT {
            tracing::warn!(
                files = comparison.files.len(),
                "compare response may be truncated; some changed files can be missing"
            );
        }
        comparison.into_diff_set(base, head)
    }
}

/// Compare API response (only the fields used)
#[derive(Debug, Deserialize)]
pub(crate) struct Comparison {
    #[serde(default)]
    files: Vec<CompareFile>,
}

#[derive(Debug, Deserialize)]
struct CompareFile {
    filename: String,
    status: String,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    previous_filename: Option<String>,
}

impl Comparison {
    pub(crate) fn into_diff_set(self, base: &str, head: &str) -> Result<DiffSet, FetchError> {
        let mut files = Vec::with_capacity(self.files.len());
        for file in self.files {
            let status = match file.status.as_str() {
                "added" => ChangeStatus::Added,
                "removed" => ChangeStatus::Removed,
                "renamed" => ChangeStatus::Renamed,
                "unchanged" => continue,
                _ => ChangeStatus::Modified,
            };
            let hunks = match &file.patch {
                Some(patch) => parse_patch(&file.filename, patch)?,
                None => Vec::new(),
            };
            let mut change = FileChange::new(file.filename, status).with_hunks(hunks);
            if let Some(previous) = file.previous_filename {
                change = change.with_previous_path(previous);
            }
            files.push(change);
        }
        Ok(DiffSet::new(base, head, files))
    }
}
