//! Run reports

use chrono::{DateTime, Utc};
use genmig_apply::{ApplyResult, ConflictKind, HunkReport};
use genmig_hunk::ChangeStatus;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Result for one upstream file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Upstream repository path
    pub path: String,
    /// Project-relative path; `None` when the upstream path is unsafe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    pub status: ChangeStatus,
    pub result: ApplyResult,
    /// Conflict affecting the whole file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictKind>,
    pub hunks: Vec<HunkReport>,
    /// Whether the run writes, creates, moves or removes the local file
    pub changed: bool,
}

impl FileReport {
    /// Path to show to the user
    #[must_use]
    pub fn display_path(&self) -> String {
        self.local_path
            .as_ref()
            .map_or_else(|| self.path.clone(), |p| p.display().to_string())
    }

    /// Hunks that could not be applied
    pub fn conflicting_hunks(&self) -> impl Iterator<Item = &HunkReport> {
        self.hunks.iter().filter(|h| h.outcome.is_conflict())
    }
}

/// Summary of one migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: String,
    pub generator: String,
    pub from_version: String,
    pub to_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Whether the tracked version was committed
    pub version_advanced: bool,
    pub files: Vec<FileReport>,
}

impl MigrationReport {
    /// Files with the given result
    pub fn files_with(&self, result: ApplyResult) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(move |f| f.result == result)
    }

    /// Number of applied files
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.files_with(ApplyResult::Applied).count()
    }

    /// Number of skipped files
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.files_with(ApplyResult::Skipped).count()
    }

    /// Number of conflicting files
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.files_with(ApplyResult::Conflict).count()
    }

    /// Check if any file conflicted
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.conflict_count() > 0
    }

    /// Local paths of conflicting files
    #[must_use]
    pub fn conflict_paths(&self) -> Vec<String> {
        self.files_with(ApplyResult::Conflict)
            .map(FileReport::display_path)
            .collect()
    }
}

impl Display for MigrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} -> {}{}",
            self.generator,
            self.from_version,
            self.to_version,
            if self.dry_run { " (dry run)" } else { "" }
        )?;

        for file in &self.files {
            writeln!(f, "  {:<9} {}", file.result.to_string(), file.display_path())?;
            if let Some(kind) = &file.conflict {
                writeln!(f, "            {kind}")?;
            }
            for hunk in file.conflicting_hunks() {
                writeln!(f, "            {} {}", hunk.location, hunk.outcome)?;
                if !hunk.unresolved.is_empty() {
                    writeln!(f, "              unresolved: {}", hunk.unresolved.join(", "))?;
                }
            }
        }

        write!(
            f,
            "{} files: {} applied, {} skipped, {} conflicts; ",
            self.files.len(),
            self.applied_count(),
            self.skipped_count(),
            self.conflict_count()
        )?;
        if self.version_advanced {
            write!(f, "version advanced to {}", self.to_version)
        } else {
            write!(f, "version kept at {}", self.from_version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmig_apply::HunkOutcome;

    fn file(path: &str, result: ApplyResult, hunks: Vec<HunkReport>) -> FileReport {
        FileReport {
            path: format!("templates/{path}"),
            local_path: Some(PathBuf::from(path)),
            status: ChangeStatus::Modified,
            result,
            conflict: None,
            hunks,
            changed: result == ApplyResult::Applied,
        }
    }

    fn report() -> MigrationReport {
        let now = Utc::now();
        MigrationReport {
            run_id: "01HZZZZZZZZZZZZZZZZZZZZZZZ".to_string(),
            generator: "acme/generator-widget".to_string(),
            from_version: "1.0.0".to_string(),
            to_version: "1.1.0".to_string(),
            started_at: now,
            finished_at: now,
            dry_run: false,
            version_advanced: true,
            files: vec![
                file("index.html", ApplyResult::Applied, Vec::new()),
                file("README.md", ApplyResult::Skipped, Vec::new()),
                file(
                    "app.js",
                    ApplyResult::Conflict,
                    vec![HunkReport {
                        index: 0,
                        location: "@@ -1,1 +1,1 @@".to_string(),
                        outcome: HunkOutcome::conflict(ConflictKind::Ambiguous { matches: 2 }),
                        unresolved: vec!["author".to_string()],
                    }],
                ),
            ],
        }
    }

    #[test]
    fn counts_and_conflict_paths() {
        let report = report();
        assert_eq!(report.applied_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.conflict_count(), 1);
        assert!(report.is_partial());
        assert_eq!(report.conflict_paths(), vec!["app.js".to_string()]);
    }

    #[test]
    fn text_report_lists_conflict_locations() {
        let text = report().to_string();
        assert!(text.starts_with("acme/generator-widget 1.0.0 -> 1.1.0\n"));
        assert!(text.contains("  conflict  app.js\n"));
        assert!(text.contains("@@ -1,1 +1,1 @@ conflict (ambiguous: 2 matches)"));
        assert!(text.contains("unresolved: author"));
        assert!(text.ends_with("3 files: 1 applied, 1 skipped, 1 conflicts; version advanced to 1.1.0"));
    }

    #[test]
    fn json_report_is_structured() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["files"][2]["result"], "conflict");
        assert_eq!(value["files"][2]["hunks"][0]["outcome"]["outcome"], "conflict");
        assert_eq!(value["version_advanced"], true);
    }
}
