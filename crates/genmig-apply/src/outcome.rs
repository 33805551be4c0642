//! Per-hunk and per-file application outcomes

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Why a hunk was not applied and does not need to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Post-change text is already present
    AlreadyApplied,
    /// Hunk has identical pre- and post-change text once rendered
    NoChanges,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyApplied => write!(f, "already applied"),
            Self::NoChanges => write!(f, "no rendered changes"),
        }
    }
}

/// Why a hunk or file could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
    /// Pre-change text not found and post-change text absent
    ContextNotFound,
    /// Pre-change text found more than once
    Ambiguous { matches: usize },
    /// Change targets a file the project does not have
    MissingLocalFile,
    /// Upstream provided no textual patch (binary or oversized file)
    PatchUnavailable,
    /// Upstream path maps outside the project root
    UnsafePath,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNotFound => write!(f, "context not found"),
            Self::Ambiguous { matches } => write!(f, "ambiguous: {matches} matches"),
            Self::MissingLocalFile => write!(f, "local file missing"),
            Self::PatchUnavailable => write!(f, "no textual patch available"),
            Self::UnsafePath => write!(f, "path escapes the project root"),
        }
    }
}

/// Result of applying one hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HunkOutcome {
    /// Spliced in; `line` is the 1-based start in the updated buffer
    Applied { line: usize },
    Skipped { reason: SkipReason },
    Conflict { kind: ConflictKind },
}

impl HunkOutcome {
    /// Skip outcome
    #[inline]
    #[must_use]
    pub const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// Conflict outcome
    #[inline]
    #[must_use]
    pub const fn conflict(kind: ConflictKind) -> Self {
        Self::Conflict { kind }
    }

    /// Check if hunk changed the buffer
    #[inline]
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Check if hunk conflicted
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl Display for HunkOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { line } => write!(f, "applied at line {line}"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Conflict { kind } => write!(f, "conflict ({kind})"),
        }
    }
}

/// Report for one hunk of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkReport {
    /// 0-based position in the file's upstream hunk list
    pub index: usize,
    /// `@@ -a,b +c,d @@` header
    pub location: String,
    pub outcome: HunkOutcome,
    /// Placeholders left verbatim in this hunk
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

/// Aggregate result for one file
///
/// Any conflicting hunk makes the whole file a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyResult {
    Applied,
    Skipped,
    Conflict,
}

impl ApplyResult {
    /// Fold hunk outcomes into a file result
    #[must_use]
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a HunkOutcome>) -> Self {
        let mut result = Self::Skipped;
        for outcome in outcomes {
            match outcome {
                HunkOutcome::Conflict { .. } => return Self::Conflict,
                HunkOutcome::Applied { .. } => result = Self::Applied,
                HunkOutcome::Skipped { .. } => {}
            }
        }
        result
    }
}

impl Display for ApplyResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Skipped => write!(f, "skipped"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// What should happen to the local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileProposal {
    /// Leave file as is
    Unchanged,
    /// Write this content (creating the file if missing)
    Write(String),
    /// Remove the file
    Delete,
}

impl FileProposal {
    /// Check if the proposal touches the filesystem
    #[inline]
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Everything the applicator decided for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileApplication {
    pub result: ApplyResult,
    pub hunks: Vec<HunkReport>,
    /// Conflict affecting the file as a whole rather than a single hunk
    pub file_conflict: Option<ConflictKind>,
    pub proposal: FileProposal,
}

impl FileApplication {
    /// Whole-file conflict with no hunk reports
    #[must_use]
    pub fn file_conflict(kind: ConflictKind) -> Self {
        Self {
            result: ApplyResult::Conflict,
            hunks: Vec::new(),
            file_conflict: Some(kind),
            proposal: FileProposal::Unchanged,
        }
    }

    /// Count hunks with the given predicate
    #[must_use]
    pub fn count(&self, pred: impl Fn(&HunkOutcome) -> bool) -> usize {
        self.hunks.iter().filter(|h| pred(&h.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_result_folds_outcomes() {
        let applied = HunkOutcome::Applied { line: 3 };
        let skipped = HunkOutcome::skipped(SkipReason::AlreadyApplied);
        let conflict = HunkOutcome::conflict(ConflictKind::ContextNotFound);

        assert_eq!(ApplyResult::from_outcomes([]), ApplyResult::Skipped);
        assert_eq!(ApplyResult::from_outcomes([&skipped]), ApplyResult::Skipped);
        assert_eq!(ApplyResult::from_outcomes([&skipped, &applied]), ApplyResult::Applied);
        assert_eq!(
            ApplyResult::from_outcomes([&applied, &conflict, &skipped]),
            ApplyResult::Conflict
        );
    }

    #[test]
    fn outcome_serializes_tagged() {
        let value = serde_json::to_value(HunkOutcome::conflict(ConflictKind::Ambiguous { matches: 2 }))
            .unwrap();
        assert_eq!(
            value,
            json!({"outcome": "conflict", "kind": {"kind": "ambiguous", "matches": 2}})
        );
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(HunkOutcome::Applied { line: 4 }.to_string(), "applied at line 4");
        assert_eq!(
            HunkOutcome::skipped(SkipReason::NoChanges).to_string(),
            "skipped (no rendered changes)"
        );
        assert_eq!(
            HunkOutcome::conflict(ConflictKind::Ambiguous { matches: 3 }).to_string(),
            "conflict (ambiguous: 3 matches)"
        );
    }
}
