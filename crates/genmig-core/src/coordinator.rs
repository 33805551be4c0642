//! Migration coordinator
//!
//! [`Migrator::run`] drives one migration end to end:
//!
//! 1. acquire the project lock
//! 2. load the tracked version
//! 3. fetch the latest published version; stop if unchanged
//! 4. resolve template properties
//! 5. fetch the diff between the two tags
//! 6. plan every file (read, render, match)
//! 7. commit staged files, then the new version
//!
//! Any failure before step 7 leaves the project untouched.

use crate::config::{GeneratorId, MigrationConfig};
use crate::engine::MigrationEngine;
use crate::error::{ConfigError, MigrationError};
use crate::github::GithubClient;
use crate::lock::RunLock;
use crate::report::MigrationReport;
use crate::resolver::PropertyResolver;
use crate::source::{DiffSource, MetadataSource};
use crate::state::{VersionState, VersionStateStore};
use chrono::{DateTime, Utc};
use genmig_apply::ApplyResult;
use genmig_hunk::PropertyMap;
use std::sync::Arc;
use tracing::Instrument;
use ulid::Ulid;

/// Values fixed for the duration of one run
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub id: Ulid,
    pub generator: GeneratorId,
    pub state: VersionState,
    pub properties: PropertyMap,
    pub started_at: DateTime<Utc>,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Changes were planned and, unless dry run, committed
    Migrated(MigrationReport),
    /// Nothing to do
    AlreadyUpToDate { generator: String, version: String },
    /// Fatal error; project untouched
    Aborted(MigrationError),
}

impl RunOutcome {
    /// Convert to a `Result`; "up to date" becomes [`MigrationError::AlreadyUpToDate`]
    ///
    /// # Errors
    /// Returns the abort error or the up-to-date error
    pub fn into_result(self) -> Result<MigrationReport, MigrationError> {
        match self {
            Self::Migrated(report) => Ok(report),
            Self::AlreadyUpToDate { generator, version } => {
                Err(MigrationError::AlreadyUpToDate { generator, version })
            }
            Self::Aborted(error) => Err(error),
        }
    }

    /// Report if the run migrated
    #[inline]
    #[must_use]
    pub fn report(&self) -> Option<&MigrationReport> {
        match self {
            Self::Migrated(report) => Some(report),
            _ => None,
        }
    }
}

/// Runs migrations for one configured project
#[derive(Debug, Clone)]
pub struct Migrator {
    config: Arc<MigrationConfig>,
    generator: GeneratorId,
    metadata: Arc<dyn MetadataSource>,
    diffs: Arc<dyn DiffSource>,
}

impl Migrator {
    /// Migrator with explicit sources
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(
        config: MigrationConfig,
        metadata: Arc<dyn MetadataSource>,
        diffs: Arc<dyn DiffSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = config.generator()?.clone();
        Ok(Self {
            config: Arc::new(config),
            generator,
            metadata,
            diffs,
        })
    }

    /// Migrator using GitHub for both metadata and diffs
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn github(config: MigrationConfig) -> Result<Self, ConfigError> {
        let client = Arc::new(GithubClient::from_config(&config)?);
        Self::new(config, client.clone(), client)
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run one migration
    pub async fn run(&self) -> RunOutcome {
        let run_id = Ulid::new();
        let span = tracing::info_span!("migration", %run_id, generator = %self.generator);

        match self.execute(run_id).instrument(span.clone()).await {
            Ok(report) => RunOutcome::Migrated(report),
            Err(MigrationError::AlreadyUpToDate { generator, version }) => {
                span.in_scope(|| tracing::info!(%version, "already up to date"));
                RunOutcome::AlreadyUpToDate { generator, version }
            }
            Err(error) => {
                span.in_scope(|| tracing::error!(%error, "migration aborted"));
                RunOutcome::Aborted(error)
            }
        }
    }

    async fn execute(&self, run_id: Ulid) -> Result<MigrationReport, MigrationError> {
        let config = &self.config;
        let _lock = RunLock::acquire(config.lock_path())?;

        let store = VersionStateStore::new(config.state_path());
        let state = store.load(self.generator.state_key()).await?;

        let latest = self.metadata.latest_version(&self.generator).await?;
        let state = state.with_new_version(latest.version);
        if state.is_up_to_date() {
            return Err(MigrationError::AlreadyUpToDate {
                generator: self.generator.to_string(),
                version: state.old_version,
            });
        }

        let properties = PropertyResolver::from_config(config, &self.generator)
            .resolve()
            .await?;
        let run = MigrationRun {
            id: run_id,
            generator: self.generator.clone(),
            state,
            properties,
            started_at: Utc::now(),
        };
        let to_version = run.state.new_version.clone().unwrap_or_default();
        tracing::info!(from = %run.state.old_version, to = %to_version, "migrating");

        let base = config.tag_for(&run.state.old_version);
        let head = config.tag_for(&to_version);
        let diff = self.diffs.fetch_diff(&run.generator, &base, &head).await?;
        tracing::info!(files = diff.files.len(), hunks = diff.hunk_count(), %base, %head, "diff fetched");

        let engine = MigrationEngine::from_config(config)?;
        let plans = engine.plan(&diff, &run.properties).await?;
        let files: Vec<_> = plans.iter().map(|p| p.report.clone()).collect();
        let partial = files.iter().any(|f| f.result == ApplyResult::Conflict);

        let mut version_advanced = false;
        if config.dry_run {
            tracing::info!(files = files.len(), "dry run; nothing written");
        } else {
            let written = engine.stage(&plans).commit().await?;
            tracing::info!(written = written.len(), "files committed");

            if !partial || config.advance_on_conflict {
                store.commit(&run.state).await?;
                version_advanced = true;
            } else {
                tracing::warn!("conflicts present; tracked version not advanced");
            }
        }

        let report = MigrationReport {
            run_id: run.id.to_string(),
            generator: run.generator.to_string(),
            from_version: run.state.old_version.clone(),
            to_version,
            started_at: run.started_at,
            finished_at: Utc::now(),
            dry_run: config.dry_run,
            version_advanced,
            files,
        };
        if report.is_partial() {
            tracing::warn!(
                conflicts = report.conflict_count(),
                paths = ?report.conflict_paths(),
                "migration finished with conflicts"
            );
        } else {
            tracing::info!(applied = report.applied_count(), skipped = report.skipped_count(), "migration finished");
        }
        Ok(report)
    }
}
