//! Upstream change hunks
//!
//! A [`RawHunk`] is one contiguous change block from the generator's template
//! diff. A [`NormalizedHunk`] is the same block with placeholders replaced by
//! resolved values. Both expose the pre-change ("removed") and post-change
//! ("added") line blocks through [`HunkText`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Role of a line inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Unchanged line present on both sides
    Context,
    /// Line only present before the change
    Removed,
    /// Line only present after the change
    Added,
}

/// One line of a hunk, without its terminator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
}

impl HunkLine {
    /// Create new line
    #[inline]
    #[must_use]
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Same kind, different text
    #[inline]
    #[must_use]
    pub fn with_text(&self, text: String) -> Self {
        Self {
            kind: self.kind,
            text,
        }
    }
}

/// 1-based line range as written in a unified diff header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub len: u32,
}

impl LineRange {
    /// Create new range
    #[inline]
    #[must_use]
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }
}

impl Display for LineRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.len)
    }
}

/// Access to the two sides of a hunk
pub trait HunkText {
    /// All lines in diff order
    fn lines(&self) -> &[HunkLine];

    /// Pre-change side: context and removed lines in order
    fn removed_block(&self) -> Vec<&str> {
        self.lines()
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Post-change side: context and added lines in order
    fn added_block(&self) -> Vec<&str> {
        self.lines()
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Check if the hunk adds or removes anything
    fn has_changes(&self) -> bool {
        self.lines().iter().any(|l| l.kind != LineKind::Context)
    }
}

/// One change block against the generator's template sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHunk {
    /// Repository path of the template file
    pub path: String,
    /// Pre-change line range
    pub old_range: LineRange,
    /// Post-change line range
    pub new_range: LineRange,
    /// Section heading that follows the `@@` header, if any
    pub section: Option<String>,
    /// Lines in diff order (template vocabulary)
    pub lines: Vec<HunkLine>,
}

impl RawHunk {
    /// Create hunk from parsed parts
    #[inline]
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        old_range: LineRange,
        new_range: LineRange,
        lines: Vec<HunkLine>,
    ) -> Self {
        Self {
            path: path.into(),
            old_range,
            new_range,
            section: None,
            lines,
        }
    }

    /// Set section heading
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Builder with line ranges derived from the lines added
    #[inline]
    #[must_use]
    pub fn builder(path: impl Into<String>) -> HunkBuilder {
        HunkBuilder::new(path)
    }

    /// Hunk that swaps `removed` for `added` with no context
    #[must_use]
    pub fn replacement(path: impl Into<String>, removed: &[&str], added: &[&str]) -> Self {
        let builder = removed
            .iter()
            .fold(Self::builder(path), |b, line| b.removed(*line));
        added.iter().fold(builder, |b, line| b.added(*line)).build()
    }

    /// `@@ -a,b +c,d @@` location string
    #[inline]
    #[must_use]
    pub fn location(&self) -> String {
        format_location(self.old_range, self.new_range)
    }
}

impl HunkText for RawHunk {
    fn lines(&self) -> &[HunkLine] {
        &self.lines
    }
}

/// A [`RawHunk`] rewritten into rendered vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedHunk {
    pub path: String,
    pub old_range: LineRange,
    pub new_range: LineRange,
    pub lines: Vec<HunkLine>,
    /// Placeholder identifiers left verbatim because no value was known
    pub unresolved: Vec<String>,
}

impl NormalizedHunk {
    /// `@@ -a,b +c,d @@` location string
    #[inline]
    #[must_use]
    pub fn location(&self) -> String {
        format_location(self.old_range, self.new_range)
    }

    /// Check if every placeholder was resolved
    #[inline]
    #[must_use]
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}

impl HunkText for NormalizedHunk {
    fn lines(&self) -> &[HunkLine] {
        &self.lines
    }
}

fn format_location(old: LineRange, new: LineRange) -> String {
    format!("@@ -{old} +{new} @@")
}

/// Builder for hand-written hunks
#[derive(Debug, Clone)]
pub struct HunkBuilder {
    path: String,
    old_start: u32,
    new_start: u32,
    section: Option<String>,
    lines: Vec<HunkLine>,
}

impl HunkBuilder {
    /// Create new builder starting at line 1 on both sides
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_start: 1,
            new_start: 1,
            section: None,
            lines: Vec::new(),
        }
    }

    /// Set start lines
    #[inline]
    #[must_use]
    pub fn at(mut self, old_start: u32, new_start: u32) -> Self {
        self.old_start = old_start;
        self.new_start = new_start;
        self
    }

    /// Set section heading
    #[inline]
    #[must_use]
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Append context line
    #[inline]
    #[must_use]
    pub fn context(self, text: impl Into<String>) -> Self {
        self.line(LineKind::Context, text)
    }

    /// Append removed line
    #[inline]
    #[must_use]
    pub fn removed(self, text: impl Into<String>) -> Self {
        self.line(LineKind::Removed, text)
    }

    /// Append added line
    #[inline]
    #[must_use]
    pub fn added(self, text: impl Into<String>) -> Self {
        self.line(LineKind::Added, text)
    }

    fn line(mut self, kind: LineKind, text: impl Into<String>) -> Self {
        self.lines.push(HunkLine::new(kind, text));
        self
    }

    /// Build hunk
    #[must_use]
    pub fn build(self) -> RawHunk {
        let old_len = self
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .count();
        let new_len = self
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .count();
        RawHunk {
            path: self.path,
            old_range: LineRange::new(self.old_start, saturating_u32(old_len)),
            new_range: LineRange::new(self.new_start, saturating_u32(new_len)),
            section: self.section,
            lines: self.lines,
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// How a file changed between the two upstream tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// File is new in the head tag
    Added,
    /// File exists in both tags
    Modified,
    /// File was deleted in the head tag
    Removed,
    /// File was moved (possibly with edits)
    Renamed,
    /// Content is not textual; no hunks are available
    Binary,
}

/// All hunks for one upstream file, in upstream order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository path in the head tag (base tag for removed files)
    pub path: String,
    /// Repository path in the base tag for renamed files
    pub previous_path: Option<String>,
    pub status: ChangeStatus,
    pub hunks: Vec<RawHunk>,
}

impl FileChange {
    /// Create change with no hunks
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            previous_path: None,
            status,
            hunks: Vec::new(),
        }
    }

    /// Modified file with the given hunks
    #[inline]
    #[must_use]
    pub fn modified(path: impl Into<String>, hunks: Vec<RawHunk>) -> Self {
        Self::new(path, ChangeStatus::Modified).with_hunks(hunks)
    }

    /// Set hunks
    #[inline]
    #[must_use]
    pub fn with_hunks(mut self, hunks: Vec<RawHunk>) -> Self {
        self.hunks = hunks;
        self
    }

    /// Set previous path
    #[inline]
    #[must_use]
    pub fn with_previous_path(mut self, path: impl Into<String>) -> Self {
        self.previous_path = Some(path.into());
        self
    }
}

/// Ordered set of file changes between two upstream tags
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSet {
    pub base: String,
    pub head: String,
    pub files: Vec<FileChange>,
}

impl DiffSet {
    /// Create diff set
    #[inline]
    #[must_use]
    pub fn new(base: impl Into<String>, head: impl Into<String>, files: Vec<FileChange>) -> Self {
        Self {
            base: base.into(),
            head: head.into(),
            files,
        }
    }

    /// Total hunks across all files
    #[inline]
    #[must_use]
    pub fn hunk_count(&self) -> usize {
        self.files.iter().map(|f| f.hunks.len()).sum()
    }

    /// Check if no file changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
