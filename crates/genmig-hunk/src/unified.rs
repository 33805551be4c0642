//! Unified diff parsing
//!
//! Two entry points:
//! - [`parse_patch`] reads the hunks of a single file's patch, as returned per
//!   file by source-control compare APIs.
//! - [`parse_unified_diff`] reads a multi-file diff (`git diff` output) into
//!   [`FileChange`]s.
//!
//! Hunk bodies are consumed by their header line counts, so text after a hunk
//! (the next file header) is never mistaken for hunk content.

use crate::hunk::{ChangeStatus, FileChange, HunkLine, LineKind, LineRange, RawHunk};
use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@ ?(.*)$")
        .unwrap_or_else(|e| unreachable!("static hunk header pattern is valid: {e}"))
});

const DEV_NULL: &str = "/dev/null";

/// Errors while parsing diff text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchParseError {
    /// `@@` line that does not follow the unified format
    #[error("malformed hunk header at line {line}: {text}")]
    MalformedHeader { line: usize, text: String },

    /// Hunk body ended before the header's line counts were satisfied
    #[error("hunk at line {line} is truncated: expected {expected_old} old / {expected_new} new lines")]
    Truncated {
        line: usize,
        expected_old: u32,
        expected_new: u32,
    },

    /// Line inside a hunk body with an unknown prefix
    #[error("unexpected line {line} inside hunk: {text}")]
    UnexpectedLine { line: usize, text: String },

    /// Hunk found before any file header
    #[error("hunk at line {line} has no file header")]
    MissingFileHeader { line: usize },
}

/// Parse the hunks of one file's patch
///
/// # Errors
/// Returns error on malformed or truncated hunks
pub fn parse_patch(path: &str, patch: &str) -> Result<Vec<RawHunk>, PatchParseError> {
    let lines: Vec<&str> = patch.lines().collect();
    let mut hunks = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        if lines[idx].starts_with("@@") {
            let (hunk, next) = parse_hunk(path, &lines, idx)?;
            hunks.push(hunk);
            idx = next;
        } else {
            idx += 1;
        }
    }
    Ok(hunks)
}

/// Parse a multi-file unified diff
///
/// # Errors
/// Returns error on malformed hunks or hunks without a file header
pub fn parse_unified_diff(text: &str) -> Result<Vec<FileChange>, PatchParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut files: Vec<FileChange> = Vec::new();
    let mut current: Option<FileHeader> = None;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];

        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush(&mut files, current.take());
            current = Some(FileHeader::from_git_line(rest));
        } else if let Some(rest) = line.strip_prefix("--- ") {
            let header = current.get_or_insert_with(FileHeader::default);
            header.old_path = Some(strip_side_prefix(rest, "a/"));
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let header = current.get_or_insert_with(FileHeader::default);
            header.new_path = Some(strip_side_prefix(rest, "b/"));
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            if let Some(header) = current.as_mut() {
                header.renamed_from = Some(rest.to_string());
            }
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            if let Some(header) = current.as_mut() {
                header.binary = true;
            }
        } else if line.starts_with("@@") {
            let header = current
                .as_mut()
                .ok_or(PatchParseError::MissingFileHeader { line: idx + 1 })?;
            let path = header.path();
            let (hunk, next) = parse_hunk(&path, &lines, idx)?;
            header.hunks.push(hunk);
            idx = next;
            continue;
        }
        idx += 1;
    }
    flush(&mut files, current.take());
    Ok(files)
}

fn flush(files: &mut Vec<FileChange>, header: Option<FileHeader>) {
    if let Some(header) = header {
        if let Some(change) = header.into_change() {
            files.push(change);
        }
    }
}

#[derive(Debug, Default)]
struct FileHeader {
    git_old: Option<String>,
    git_new: Option<String>,
    old_path: Option<String>,
    new_path: Option<String>,
    renamed_from: Option<String>,
    binary: bool,
    hunks: Vec<RawHunk>,
}

impl FileHeader {
    fn from_git_line(rest: &str) -> Self {
        // `a/<old> b/<new>`; paths with spaces are split on the last " b/"
        let (old, new) = match rest.rfind(" b/") {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, rest),
        };
        Self {
            git_old: Some(strip_side_prefix(old, "a/")),
            git_new: Some(strip_side_prefix(new, "b/")),
            ..Self::default()
        }
    }

    fn status(&self) -> ChangeStatus {
        if self.binary {
            ChangeStatus::Binary
        } else if self.old_path.as_deref() == Some(DEV_NULL) {
            ChangeStatus::Added
        } else if self.new_path.as_deref() == Some(DEV_NULL) {
            ChangeStatus::Removed
        } else if self.renamed_from.is_some() {
            ChangeStatus::Renamed
        } else {
            ChangeStatus::Modified
        }
    }

    fn path(&self) -> String {
        let pick = |p: &Option<String>| p.clone().filter(|p| p != DEV_NULL);
        pick(&self.new_path)
            .or_else(|| pick(&self.git_new))
            .or_else(|| pick(&self.old_path))
            .or_else(|| pick(&self.git_old))
            .unwrap_or_default()
    }

    fn into_change(self) -> Option<FileChange> {
        let path = self.path();
        if path.is_empty() {
            return None;
        }
        let status = self.status();
        let mut change = FileChange::new(path, status);
        if status == ChangeStatus::Renamed {
            if let Some(from) = self.renamed_from {
                change = change.with_previous_path(from);
            }
        }
        Some(change.with_hunks(self.hunks))
    }
}

fn strip_side_prefix(path: &str, prefix: &str) -> String {
    // `--- a/file\t2024-01-01 ...` may carry a timestamp after a tab
    let path = path.split('\t').next().unwrap_or(path).trim_end();
    if path == DEV_NULL {
        return path.to_string();
    }
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

fn parse_hunk(
    path: &str,
    lines: &[&str],
    header_idx: usize,
) -> Result<(RawHunk, usize), PatchParseError> {
    let header = lines[header_idx];
    let caps = HUNK_HEADER
        .captures(header)
        .ok_or_else(|| PatchParseError::MalformedHeader {
            line: header_idx + 1,
            text: header.to_string(),
        })?;

    let number = |i: usize, default: u32| -> Result<u32, PatchParseError> {
        caps.get(i).map_or(Ok(default), |m| {
            m.as_str()
                .parse()
                .map_err(|_| PatchParseError::MalformedHeader {
                    line: header_idx + 1,
                    text: header.to_string(),
                })
        })
    };
    let old_range = LineRange::new(number(1, 0)?, number(2, 1)?);
    let new_range = LineRange::new(number(3, 0)?, number(4, 1)?);
    let section = caps
        .get(5)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty());

    let mut old_left = old_range.len;
    let mut new_left = new_range.len;
    let mut body = Vec::new();
    let mut idx = header_idx + 1;

    while old_left > 0 || new_left > 0 {
        let Some(line) = lines.get(idx) else {
            return Err(PatchParseError::Truncated {
                line: header_idx + 1,
                expected_old: old_range.len,
                expected_new: new_range.len,
            });
        };
        let (kind, text) = match line.chars().next() {
            Some(' ') => (LineKind::Context, &line[1..]),
            // some tools strip the single space of blank context lines
            None => (LineKind::Context, ""),
            Some('-') => (LineKind::Removed, &line[1..]),
            Some('+') => (LineKind::Added, &line[1..]),
            Some('\\') => {
                idx += 1;
                continue;
            }
            Some(_) => {
                return Err(PatchParseError::UnexpectedLine {
                    line: idx + 1,
                    text: (*line).to_string(),
                })
            }
        };

        let exhausted = match kind {
            LineKind::Context => old_left == 0 || new_left == 0,
            LineKind::Removed => old_left == 0,
            LineKind::Added => new_left == 0,
        };
        if exhausted {
            return Err(PatchParseError::UnexpectedLine {
                line: idx + 1,
                text: (*line).to_string(),
            });
        }
        if kind != LineKind::Added {
            old_left -= 1;
        }
        if kind != LineKind::Removed {
            new_left -= 1;
        }
        body.push(HunkLine::new(kind, text));
        idx += 1;
    }

    // trailing "\ No newline at end of file"
    while lines.get(idx).is_some_and(|l| l.starts_with('\\')) {
        idx += 1;
    }

    let mut hunk = RawHunk::new(path, old_range, new_range, body);
    if let Some(section) = section {
        hunk = hunk.with_section(section);
    }
    Ok((hunk, idx))
}
