//! Exact-match hunk application
//!
//! A hunk's pre-change block (context plus removed lines) must occur exactly
//! once in the local file to be applied. Occurrences that sit inside an
//! occurrence of the post-change block are ignored, which makes applying the
//! same hunk twice a no-op.

use crate::buffer::TextBuffer;
use crate::markers;
use crate::outcome::{
    ApplyResult, ConflictKind, FileApplication, FileProposal, HunkOutcome, HunkReport, SkipReason,
};
use genmig_hunk::{ChangeStatus, HunkText, NormalizedHunk};
use serde::{Deserialize, Serialize};

/// What to do with a file that has a conflicting hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Leave the file byte-identical
    #[default]
    LeaveUntouched,
    /// Append a conflict block per failed hunk
    AppendMarkers,
}

/// Applies normalized hunks to local file content
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplicator {
    policy: ConflictPolicy,
}

impl PatchApplicator {
    /// Create applicator
    #[inline]
    #[must_use]
    pub const fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Conflict policy in use
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Apply one hunk to the buffer
    ///
    /// The buffer is modified only when the outcome is `Applied`.
    #[must_use]
    pub fn apply_hunk(&self, buffer: &mut TextBuffer, hunk: &NormalizedHunk) -> HunkOutcome {
        let removed = hunk.removed_block();
        let added = hunk.added_block();

        if removed == added {
            return HunkOutcome::skipped(SkipReason::NoChanges);
        }

        if removed.is_empty() {
            // pure insertion without context anchors only into an empty file
            if buffer.is_empty() {
                buffer.splice(0, 0, &added);
                return HunkOutcome::Applied { line: 1 };
            }
            return if buffer.contains_block(&added) {
                HunkOutcome::skipped(SkipReason::AlreadyApplied)
            } else {
                HunkOutcome::conflict(ConflictKind::ContextNotFound)
            };
        }

        // lines inside existing conflict blocks never match
        let fenced = markers::fenced_ranges(buffer);
        let unfenced = |pos: usize, len: usize| !fenced.iter().any(|r| pos < r.end && r.start < pos + len);
        let added_at: Vec<usize> = buffer
            .find_block(&added)
            .into_iter()
            .filter(|&pos| unfenced(pos, added.len()))
            .collect();
        let candidates: Vec<usize> = buffer
            .find_block(&removed)
            .into_iter()
            .filter(|&pos| unfenced(pos, removed.len()))
            .filter(|&pos| {
                !added_at
                    .iter()
                    .any(|&start| pos >= start && pos + removed.len() <= start + added.len())
            })
            .collect();

        match candidates.as_slice() {
            [at] => {
                buffer.splice(*at, removed.len(), &added);
                HunkOutcome::Applied { line: at + 1 }
            }
            // a pure deletion leaves nothing to find once it is done
            [] if !added_at.is_empty() || added.is_empty() => {
                HunkOutcome::skipped(SkipReason::AlreadyApplied)
            }
            [] => HunkOutcome::conflict(ConflictKind::ContextNotFound),
            many => HunkOutcome::conflict(ConflictKind::Ambiguous {
                matches: many.len(),
            }),
        }
    }

    /// Apply all hunks of one file, in upstream order
    ///
    /// `original` is the current local content, `None` if the file does not
    /// exist. Any conflict discards the file's applied hunks.
    #[must_use]
    pub fn apply_file(
        &self,
        original: Option<&str>,
        status: ChangeStatus,
        hunks: &[NormalizedHunk],
    ) -> FileApplication {
        if status == ChangeStatus::Binary {
            return FileApplication::file_conflict(ConflictKind::PatchUnavailable);
        }
        if hunks.is_empty() && matches!(status, ChangeStatus::Added | ChangeStatus::Modified) {
            return FileApplication::file_conflict(ConflictKind::PatchUnavailable);
        }

        let Some(text) = original else {
            return self.apply_missing(status, hunks);
        };

        let mut buffer = TextBuffer::from_text(text);
        let reports = self.apply_all(&mut buffer, hunks);
        let result = ApplyResult::from_outcomes(reports.iter().map(|r| &r.outcome));

        let proposal = match result {
            ApplyResult::Conflict => self.conflict_proposal(text, &buffer, hunks, &reports),
            ApplyResult::Applied if status == ChangeStatus::Removed && buffer.is_empty() => {
                FileProposal::Delete
            }
            ApplyResult::Applied => {
                let updated = buffer.to_text();
                if updated == text {
                    FileProposal::Unchanged
                } else {
                    FileProposal::Write(updated)
                }
            }
            ApplyResult::Skipped => FileProposal::Unchanged,
        };

        FileApplication {
            result,
            hunks: reports,
            file_conflict: None,
            proposal,
        }
    }

    fn apply_missing(&self, status: ChangeStatus, hunks: &[NormalizedHunk]) -> FileApplication {
        let creatable = status == ChangeStatus::Added
            || hunks.iter().all(|h| h.removed_block().is_empty());

        if status == ChangeStatus::Removed {
            let reports = report_all(hunks, |_| HunkOutcome::skipped(SkipReason::AlreadyApplied));
            return FileApplication {
                result: ApplyResult::Skipped,
                hunks: reports,
                file_conflict: None,
                proposal: FileProposal::Unchanged,
            };
        }

        if !creatable {
            let reports = report_all(hunks, |_| HunkOutcome::conflict(ConflictKind::MissingLocalFile));
            return FileApplication {
                result: ApplyResult::Conflict,
                hunks: reports,
                file_conflict: Some(ConflictKind::MissingLocalFile),
                proposal: FileProposal::Unchanged,
            };
        }

        let mut buffer = TextBuffer::new();
        let reports = self.apply_all(&mut buffer, hunks);
        let result = ApplyResult::from_outcomes(reports.iter().map(|r| &r.outcome));
        let proposal = match result {
            ApplyResult::Applied => FileProposal::Write(buffer.to_text()),
            ApplyResult::Skipped | ApplyResult::Conflict => FileProposal::Unchanged,
        };

        FileApplication {
            result,
            hunks: reports,
            file_conflict: None,
            proposal,
        }
    }

    fn apply_all(&self, buffer: &mut TextBuffer, hunks: &[NormalizedHunk]) -> Vec<HunkReport> {
        hunks
            .iter()
            .enumerate()
            .map(|(index, hunk)| {
                let outcome = self.apply_hunk(buffer, hunk);
                tracing::trace!(path = %hunk.path, index, %outcome, "hunk processed");
                report(index, hunk, outcome)
            })
            .collect()
    }

    fn conflict_proposal(
        &self,
        original: &str,
        buffer: &TextBuffer,
        hunks: &[NormalizedHunk],
        reports: &[HunkReport],
    ) -> FileProposal {
        match self.policy {
            ConflictPolicy::LeaveUntouched => FileProposal::Unchanged,
            ConflictPolicy::AppendMarkers => {
                let eol = buffer.default_ending().as_str();
                let blocks: Vec<String> = hunks
                    .iter()
                    .zip(reports)
                    .filter(|(_, report)| report.outcome.is_conflict())
                    .map(|(hunk, _)| markers::render_block(hunk, eol))
                    .collect();
                markers::append_blocks(original, &blocks, eol)
                    .map_or(FileProposal::Unchanged, FileProposal::Write)
            }
        }
    }
}

fn report(index: usize, hunk: &NormalizedHunk, outcome: HunkOutcome) -> HunkReport {
    HunkReport {
        index,
        location: hunk.location(),
        outcome,
        unresolved: hunk.unresolved.clone(),
    }
}

fn report_all(hunks: &[NormalizedHunk], outcome: impl Fn(&NormalizedHunk) -> HunkOutcome) -> Vec<HunkReport> {
    hunks
        .iter()
        .enumerate()
        .map(|(index, hunk)| report(index, hunk, outcome(hunk)))
        .collect()
}
