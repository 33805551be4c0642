//! Line buffer for rendered files
//!
//! [`TextBuffer`] splits a file into lines while remembering each line's
//! terminator, so that text which is not touched by a splice is written back
//! byte for byte.

/// Terminator of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// Last line of a file without trailing newline
    None,
}

impl LineEnding {
    /// Terminator text
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    ending: LineEnding,
}

/// In-memory file content addressed by line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    lines: Vec<Line>,
    default_ending: LineEnding,
}

impl TextBuffer {
    /// Empty buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split text into lines
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if let Some(pos) = rest.find('\n') {
                let (body, ending) = match rest[..pos].strip_suffix('\r') {
                    Some(body) => (body, LineEnding::CrLf),
                    None => (&rest[..pos], LineEnding::Lf),
                };
                lines.push(Line {
                    text: body.to_string(),
                    ending,
                });
                rest = &rest[pos + 1..];
            } else {
                lines.push(Line {
                    text: rest.to_string(),
                    ending: LineEnding::None,
                });
                break;
            }
        }

        let crlf = lines.iter().filter(|l| l.ending == LineEnding::CrLf).count();
        let lf = lines.iter().filter(|l| l.ending == LineEnding::Lf).count();
        let default_ending = if crlf > lf {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        Self {
            lines,
            default_ending,
        }
    }

    /// Reassemble text with original terminators
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.text.len() + 2).sum());
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(line.ending.as_str());
        }
        out
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if buffer has no lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Terminator used for inserted lines
    #[inline]
    #[must_use]
    pub fn default_ending(&self) -> LineEnding {
        self.default_ending
    }

    /// Line text by 0-based index
    #[inline]
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.text.as_str())
    }

    /// Start indices of every exact occurrence of `block`
    ///
    /// An empty block has no occurrences.
    #[must_use]
    pub fn find_block(&self, block: &[&str]) -> Vec<usize> {
        if block.is_empty() || block.len() > self.lines.len() {
            return Vec::new();
        }
        (0..=self.lines.len() - block.len())
            .filter(|&start| {
                self.lines[start..start + block.len()]
                    .iter()
                    .zip(block)
                    .all(|(line, expected)| line.text == *expected)
            })
            .collect()
    }

    /// Check if `block` occurs at least once
    #[inline]
    #[must_use]
    pub fn contains_block(&self, block: &[&str]) -> bool {
        !self.find_block(block).is_empty()
    }

    /// Replace `remove` lines starting at `at` with `replacement`
    ///
    /// Inserted lines take the buffer's dominant terminator. When the splice
    /// touches the end of the buffer, the presence or absence of a final
    /// newline is preserved.
    ///
    /// # Panics
    /// Panics if `at + remove` is past the end of the buffer
    pub fn splice(&mut self, at: usize, remove: usize, replacement: &[&str]) {
        let end = at + remove;
        assert!(end <= self.lines.len(), "splice range out of bounds");

        let reaches_end = end == self.lines.len();
        let final_ending = if reaches_end && remove > 0 {
            self.lines.last().map(|l| l.ending)
        } else {
            None
        };

        let mut inserted: Vec<Line> = replacement
            .iter()
            .map(|text| Line {
                text: (*text).to_string(),
                ending: self.default_ending,
            })
            .collect();

        if reaches_end {
            if let Some(ending) = final_ending {
                // removed tail carried the file's final terminator
                match inserted.last_mut() {
                    Some(last) => last.ending = ending,
                    None if at > 0 => self.lines[at - 1].ending = ending,
                    None => {}
                }
            } else if at > 0 && !inserted.is_empty() && self.lines[at - 1].ending == LineEnding::None {
                // appending after a line without newline
                self.lines[at - 1].ending = self.default_ending;
                if let Some(last) = inserted.last_mut() {
                    last.ending = LineEnding::None;
                }
            }
        }

        self.lines.splice(at..end, inserted);
    }
}
