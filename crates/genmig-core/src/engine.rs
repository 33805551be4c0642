//! Per-file planning
//!
//! [`MigrationEngine::plan`] turns a [`DiffSet`] into one [`FilePlan`] per
//! upstream file inside the template prefix: read the local file, render the
//! hunks, apply them in memory. Files are planned concurrently up to the
//! configured limit; plans come back in upstream order. Nothing is written.

use crate::config::MigrationConfig;
use crate::error::{ConfigError, MigrationError};
use crate::report::FileReport;
use crate::staging::{StagedChange, StagedFile, StagingArea};
use futures::stream::{self, StreamExt, TryStreamExt};
use genmig_apply::{
    ApplyResult, ConflictKind, FileApplication, FileProposal, PatchApplicator,
};
use genmig_hunk::{
    ChangeStatus, ContentHash, DelimiterSpec, DiffSet, FileChange, NormalizedHunk, Normalizer,
    PropertyMap, TemplatePrefix,
};
use std::io;
use std::path::{Path, PathBuf};

/// Default number of files planned at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Decision for one upstream file
#[derive(Debug, Clone)]
pub struct FilePlan {
    pub report: FileReport,
    /// Changes to stage; empty when the file stays as is
    pub edits: Vec<StagedFile>,
}

/// Reads, renders and matches upstream changes against a project
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    root: PathBuf,
    delimiters: DelimiterSpec,
    prefix: TemplatePrefix,
    applicator: PatchApplicator,
    concurrency: usize,
}

impl MigrationEngine {
    /// Create engine for a project root
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        delimiters: DelimiterSpec,
        prefix: TemplatePrefix,
        applicator: PatchApplicator,
    ) -> Self {
        Self {
            root: root.into(),
            delimiters,
            prefix,
            applicator,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Engine configured from migration settings
    ///
    /// # Errors
    /// Returns error if the template prefix is invalid
    pub fn from_config(config: &MigrationConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.project_root.clone(),
            config.delimiters.clone(),
            config.template_prefix()?,
            PatchApplicator::new(config.conflict_policy),
        )
        .with_concurrency(config.max_concurrency))
    }

    /// With concurrency limit
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Project root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plan every file of the diff that lies inside the template prefix
    ///
    /// # Errors
    /// Returns error if a local file exists but cannot be read
    pub async fn plan(
        &self,
        diff: &DiffSet,
        properties: &PropertyMap,
    ) -> Result<Vec<FilePlan>, MigrationError> {
        let targets: Vec<(&FileChange, Option<PathBuf>)> = diff
            .files
            .iter()
            .filter_map(|change| match self.prefix.to_local(&change.path) {
                Ok(Some(local)) => Some((change, Some(local))),
                Ok(None) => {
                    tracing::debug!(path = %change.path, "outside template prefix; ignored");
                    None
                }
                Err(e) => {
                    tracing::warn!(path = %change.path, error = %e, "unsafe upstream path");
                    Some((change, None))
                }
            })
            .collect();

        stream::iter(targets)
            .map(|(change, local)| self.plan_file(change, local, properties))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn plan_file(
        &self,
        change: &FileChange,
        local: Option<PathBuf>,
        properties: &PropertyMap,
    ) -> Result<FilePlan, MigrationError> {
        let Some(local) = local else {
            return Ok(file_conflict(change, None, ConflictKind::UnsafePath));
        };

        let mut current = self.read_optional(&local).await?;
        let mut moved_from = None;
        if current.is_none() && change.status == ChangeStatus::Renamed {
            if let Some(previous) = self.previous_local(change) {
                current = self.read_optional(&previous).await?;
                if current.is_some() {
                    moved_from = Some(previous);
                }
            }
        }

        let expected = current.as_deref().map(ContentHash::compute);
        let text = match current.map(String::from_utf8) {
            Some(Ok(text)) => Some(text),
            Some(Err(_)) => {
                tracing::warn!(path = %local.display(), "local file is not UTF-8");
                return Ok(file_conflict(change, Some(local), ConflictKind::PatchUnavailable));
            }
            None => None,
        };

        let normalizer = Normalizer::new(&self.delimiters, properties);
        let hunks: Vec<NormalizedHunk> = change.hunks.iter().map(|h| normalizer.normalize(h)).collect();
        let FileApplication {
            result,
            hunks: hunk_reports,
            file_conflict: conflict,
            proposal,
        } = self.applicator.apply_file(text.as_deref(), change.status, &hunks);

        let edits = match moved_from {
            Some(previous) if result != ApplyResult::Conflict => {
                let content = match proposal {
                    FileProposal::Write(content) => content,
                    FileProposal::Delete | FileProposal::Unchanged => text.unwrap_or_default(),
                };
                vec![
                    staged(&local, None, StagedChange::Write(content)),
                    staged(&previous, expected, StagedChange::Delete),
                ]
            }
            target => {
                let target = target.as_ref().unwrap_or(&local);
                match proposal {
                    FileProposal::Write(content) => {
                        vec![staged(target, expected, StagedChange::Write(content))]
                    }
                    FileProposal::Delete => vec![staged(target, expected, StagedChange::Delete)],
                    FileProposal::Unchanged => Vec::new(),
                }
            }
        };

        let result = if result == ApplyResult::Skipped && !edits.is_empty() {
            ApplyResult::Applied
        } else {
            result
        };

        match result {
            ApplyResult::Conflict => {
                for hunk in hunk_reports.iter().filter(|h| h.outcome.is_conflict()) {
                    tracing::warn!(
                        path = %local.display(),
                        location = %hunk.location,
                        outcome = %hunk.outcome,
                        "hunk not applied"
                    );
                }
                if let Some(kind) = &conflict {
                    tracing::warn!(path = %local.display(), %kind, "file not migrated");
                }
            }
            ApplyResult::Applied | ApplyResult::Skipped => {
                tracing::debug!(path = %local.display(), %result, hunks = hunk_reports.len(), "file planned");
            }
        }

        Ok(FilePlan {
            report: FileReport {
                path: change.path.clone(),
                local_path: Some(local),
                status: change.status,
                result,
                conflict,
                hunks: hunk_reports,
                changed: !edits.is_empty(),
            },
            edits,
        })
    }

    /// Stage the edits of every plan, in plan order
    #[must_use]
    pub fn stage(&self, plans: &[FilePlan]) -> StagingArea {
        let mut staging = StagingArea::new(self.root.clone());
        for edit in plans.iter().flat_map(|p| p.edits.iter()) {
            staging.stage(edit.clone());
        }
        staging
    }

    fn previous_local(&self, change: &FileChange) -> Option<PathBuf> {
        let previous = change.previous_path.as_deref()?;
        self.prefix.to_local(previous).ok().flatten()
    }

    async fn read_optional(&self, relative: &Path) -> Result<Option<Vec<u8>>, MigrationError> {
        let path = self.root.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MigrationError::missing_source(path, e)),
        }
    }
}

fn staged(relative: &Path, expected: Option<ContentHash>, change: StagedChange) -> StagedFile {
    StagedFile {
        relative: relative.to_path_buf(),
        expected,
        change,
    }
}

fn file_conflict(change: &FileChange, local: Option<PathBuf>, kind: ConflictKind) -> FilePlan {
    FilePlan {
        report: FileReport {
            path: change.path.clone(),
            local_path: local,
            status: change.status,
            result: ApplyResult::Conflict,
            conflict: Some(kind),
            hunks: Vec::new(),
            changed: false,
        },
        edits: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmig_apply::{ConflictPolicy, HunkOutcome, SkipReason};
    use genmig_hunk::RawHunk;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn write(&self, relative: &str, text: &str) -> &Self {
            let path = self.dir.path().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, text).unwrap();
            self
        }

        fn read(&self, relative: &str) -> Option<String> {
            std::fs::read_to_string(self.dir.path().join(relative)).ok()
        }

        fn engine(&self, prefix: &str) -> MigrationEngine {
            MigrationEngine::new(
                self.dir.path(),
                DelimiterSpec::ejs(),
                TemplatePrefix::new(prefix).unwrap(),
                PatchApplicator::default(),
            )
        }
    }

    fn props() -> PropertyMap {
        PropertyMap::from_pairs([("appName", json!("widget"))])
    }

    fn welcome(path: &str) -> FileChange {
        FileChange::modified(
            path,
            vec![RawHunk::replacement(
                path,
                &["Welcome to <%= appName %>"],
                &["Welcome to <%= appName %>!"],
            )],
        )
    }

    #[tokio::test]
    async fn plan_and_commit_welcome_scenario() {
        let project = Project::new();
        project.write("index.html", "<h1>\nWelcome to widget\n</h1>\n");
        let engine = project.engine("templates");
        let diff = DiffSet::new("v1", "v2", vec![welcome("templates/index.html")]);

        let plans = engine.plan(&diff, &props()).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].report.result, ApplyResult::Applied);
        assert_eq!(plans[0].report.local_path, Some(PathBuf::from("index.html")));

        engine.stage(&plans).commit().await.unwrap();
        assert_eq!(
            project.read("index.html").as_deref(),
            Some("<h1>\nWelcome to widget!\n</h1>\n")
        );

        let rerun = engine.plan(&diff, &props()).await.unwrap();
        assert_eq!(rerun[0].report.result, ApplyResult::Skipped);
        assert_eq!(
            rerun[0].report.hunks[0].outcome,
            HunkOutcome::skipped(SkipReason::AlreadyApplied)
        );
        assert!(engine.stage(&rerun).is_empty());
    }

    #[tokio::test]
    async fn files_outside_prefix_are_ignored() {
        let project = Project::new();
        let diff = DiffSet::new(
            "v1",
            "v2",
            vec![welcome("generators/app/index.js"), welcome("README.md")],
        );

        let plans = project.engine("generators/app/templates").plan(&diff, &props()).await.unwrap();

        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn escaping_path_is_conflict_and_never_staged() {
        let project = Project::new();
        let diff = DiffSet::new("v1", "v2", vec![welcome("templates/../../outside.txt")]);

        let plans = project.engine("templates").plan(&diff, &props()).await.unwrap();

        assert_eq!(plans[0].report.result, ApplyResult::Conflict);
        assert_eq!(plans[0].report.conflict, Some(ConflictKind::UnsafePath));
        assert_eq!(plans[0].report.local_path, None);
        assert!(plans[0].edits.is_empty());
    }

    #[tokio::test]
    async fn plans_keep_upstream_order() {
        let project = Project::new();
        let mut files = Vec::new();
        for i in 0..20 {
            let name = format!("f{i:02}.txt");
            project.write(&name, "Welcome to widget\n");
            files.push(welcome(&name));
        }
        let diff = DiffSet::new("v1", "v2", files);

        let plans = project.engine("").with_concurrency(4).plan(&diff, &props()).await.unwrap();

        let paths: Vec<_> = plans.iter().map(|p| p.report.path.clone()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("f{i:02}.txt")).collect();
        assert_eq!(paths, expected);
        assert!(plans.iter().all(|p| p.report.result == ApplyResult::Applied));
    }

    #[tokio::test]
    async fn renamed_file_moves_with_its_edits() {
        let project = Project::new();
        project.write("GUIDE.md", "# Guide\nWelcome to widget\n");
        let change = FileChange::new("docs/GUIDE.md", ChangeStatus::Renamed)
            .with_previous_path("GUIDE.md")
            .with_hunks(vec![RawHunk::replacement(
                "docs/GUIDE.md",
                &["Welcome to <%= appName %>"],
                &["Welcome to <%= appName %>!"],
            )]);
        let engine = project.engine("");
        let diff = DiffSet::new("v1", "v2", vec![change]);

        let plans = engine.plan(&diff, &props()).await.unwrap();
        assert_eq!(plans[0].report.result, ApplyResult::Applied);
        assert_eq!(plans[0].edits.len(), 2);

        engine.stage(&plans).commit().await.unwrap();
        assert_eq!(project.read("GUIDE.md"), None);
        assert_eq!(
            project.read("docs/GUIDE.md").as_deref(),
            Some("# Guide\nWelcome to widget!\n")
        );
    }

    #[tokio::test]
    async fn non_utf8_file_conflicts() {
        let project = Project::new();
        std::fs::write(project.dir.path().join("logo.txt"), [0xff, 0xfe, 0x00]).unwrap();
        let diff = DiffSet::new("v1", "v2", vec![welcome("logo.txt")]);

        let plans = project.engine("").plan(&diff, &props()).await.unwrap();

        assert_eq!(plans[0].report.conflict, Some(ConflictKind::PatchUnavailable));
    }

    #[tokio::test]
    async fn conflict_markers_target_the_local_file() {
        let project = Project::new();
        project.write("index.html", "Welcome to widget\nWelcome to widget\n");
        let engine = MigrationEngine::new(
            project.dir.path(),
            DelimiterSpec::ejs(),
            TemplatePrefix::root(),
            PatchApplicator::new(ConflictPolicy::AppendMarkers),
        );
        let diff = DiffSet::new("v1", "v2", vec![welcome("index.html")]);

        let plans = engine.plan(&diff, &props()).await.unwrap();
        assert_eq!(plans[0].report.result, ApplyResult::Conflict);
        assert!(plans[0].report.changed);

        engine.stage(&plans).commit().await.unwrap();
        let text = project.read("index.html").unwrap();
        assert!(text.starts_with("Welcome to widget\nWelcome to widget\n<<<<<<< "));
    }
}
