//! Git-style conflict blocks
//!
//! With [`ConflictPolicy::AppendMarkers`](crate::ConflictPolicy) a conflicting
//! file keeps its content and gets one block per failed hunk appended:
//!
//! ```text
//! <<<<<<< local (expected) @@ -1,1 +1,1 @@
//! Welcome to widget
//! =======
//! Welcome to widget!
//! >>>>>>> upstream
//! ```

use crate::buffer::TextBuffer;
use genmig_hunk::{HunkText, NormalizedHunk};
use std::ops::Range;

/// Opening marker prefix
pub const MARKER_OPEN: &str = "<<<<<<< local (expected)";
/// Separator between expected and upstream text
pub const MARKER_SEPARATOR: &str = "=======";
/// Closing marker
pub const MARKER_CLOSE: &str = ">>>>>>> upstream";

/// Render one conflict block, each line terminated by `eol`
///
/// The block depends only on the hunk, so re-rendering after the file
/// changed yields the same text.
#[must_use]
pub fn render_block(hunk: &NormalizedHunk, eol: &str) -> String {
    let mut out = format!("{MARKER_OPEN} {}{eol}", hunk.location());
    for line in hunk.removed_block() {
        out.push_str(line);
        out.push_str(eol);
    }
    out.push_str(MARKER_SEPARATOR);
    out.push_str(eol);
    for line in hunk.added_block() {
        out.push_str(line);
        out.push_str(eol);
    }
    out.push_str(MARKER_CLOSE);
    out.push_str(eol);
    out
}

/// Line ranges covered by conflict blocks already in the buffer
///
/// Hunk matching skips these lines, so the expected text quoted inside a
/// block is never mistaken for the real content.
#[must_use]
pub fn fenced_ranges(buffer: &TextBuffer) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open = None;
    for index in 0..buffer.len() {
        let Some(line) = buffer.line(index) else { break };
        if line.starts_with(MARKER_OPEN) {
            open = Some(index);
        } else if line == MARKER_CLOSE {
            if let Some(start) = open.take() {
                ranges.push(start..index + 1);
            }
        }
    }
    ranges
}

/// Append blocks to `original`
///
/// Returns `None` when every block is already present, so a re-run does not
/// stack duplicate markers.
#[must_use]
pub fn append_blocks(original: &str, blocks: &[String], eol: &str) -> Option<String> {
    let fresh: Vec<&String> = blocks.iter().filter(|b| !original.contains(b.as_str())).collect();
    if fresh.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(original.len() + fresh.iter().map(|b| b.len()).sum::<usize>());
    out.push_str(original);
    if !original.is_empty() && !original.ends_with('\n') {
        out.push_str(eol);
    }
    for block in fresh {
        out.push_str(block);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmig_hunk::{DelimiterSpec, Normalizer, PropertyMap, RawHunk};
    use pretty_assertions::assert_eq;

    fn hunk() -> NormalizedHunk {
        let raw = RawHunk::replacement("index.html", &["Welcome to widget"], &["Welcome to widget!"]);
        Normalizer::new(&DelimiterSpec::ejs(), &PropertyMap::new()).normalize(&raw)
    }

    #[test]
    fn block_layout() {
        let block = render_block(&hunk(), "\n");
        assert_eq!(
            block,
            "<<<<<<< local (expected) @@ -1,1 +1,1 @@\n\
             Welcome to widget\n\
             =======\n\
             Welcome to widget!\n\
             >>>>>>> upstream\n"
        );
    }

    #[test]
    fn append_adds_missing_newline_once() {
        let block = render_block(&hunk(), "\n");
        let blocks = vec![block.clone()];

        let first = append_blocks("text", &blocks, "\n").unwrap();
        assert_eq!(first, format!("text\n{block}"));

        assert_eq!(append_blocks(&first, &blocks, "\n"), None);
    }

    #[test]
    fn fenced_ranges_cover_closed_blocks_only() {
        let text = format!("a\n{}b\n<<<<<<< local (expected) dangling\nc\n", render_block(&hunk(), "\n"));
        let buffer = TextBuffer::from_text(&text);

        assert_eq!(fenced_ranges(&buffer), vec![1..6]);
    }
}
