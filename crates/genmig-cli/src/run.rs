//! Source selection, the run itself and report output

use crate::cli::Invocation;
use anyhow::{Context, Result};
use genmig_core::{
    DiffFileSource, DiffSource, GithubClient, MetadataSource, MigrationConfig, Migrator,
    RunOutcome, StaticMetadata,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

/// How the process ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Migrated, possibly with conflicts
    Migrated,
    /// Tracked version already matches the latest release
    UpToDate,
}

impl Exit {
    /// Numeric process status
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Migrated => 0,
            Self::UpToDate => 2,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        Self::from(exit.code())
    }
}

/// Run one migration and print its report to `out`
///
/// # Errors
/// Returns error if the sources cannot be set up, the run aborts or the
/// report cannot be written
pub async fn execute(invocation: Invocation, out: &mut impl Write) -> Result<Exit> {
    let Invocation {
        config,
        diff_file,
        to_version,
        json,
        ..
    } = invocation;

    let mut client = None;
    let metadata: Arc<dyn MetadataSource> = match to_version {
        Some(version) => Arc::new(StaticMetadata::new(version)),
        None => shared_client(&config, &mut client)?,
    };
    let diffs: Arc<dyn DiffSource> = match diff_file {
        Some(path) => Arc::new(DiffFileSource::new(path)),
        None => shared_client(&config, &mut client)?,
    };

    let migrator = Migrator::new(config, metadata, diffs).context("invalid settings")?;
    match migrator.run().await {
        RunOutcome::Migrated(report) => {
            if json {
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{report}")?;
            }
            Ok(Exit::Migrated)
        }
        RunOutcome::AlreadyUpToDate { generator, version } => {
            if json {
                let status = serde_json::json!({
                    "generator": generator,
                    "version": version,
                    "up_to_date": true,
                });
                serde_json::to_writer_pretty(&mut *out, &status)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{generator} is already up to date at version {version}")?;
            }
            Ok(Exit::UpToDate)
        }
        RunOutcome::Aborted(error) => Err(error).context("migration aborted"),
    }
}

/// One GitHub client serves both metadata and diffs
fn shared_client(
    config: &MigrationConfig,
    slot: &mut Option<Arc<GithubClient>>,
) -> Result<Arc<GithubClient>> {
    if let Some(client) = slot {
        return Ok(client.clone());
    }
    let client = Arc::new(GithubClient::from_config(config).context("creating GitHub client")?);
    *slot = Some(client.clone());
    Ok(client)
}
