//! Template diff normalization
//!
//! Rewrites a [`RawHunk`] written against template sources into a
//! [`NormalizedHunk`] expressed in the vocabulary of rendered files.
//!
//! # Rules
//! - A span `open identifier close` whose trimmed identifier resolves in the
//!   [`PropertyMap`] is replaced, markers included, by the value.
//! - An unknown identifier leaves the span verbatim and is recorded as
//!   unresolved.
//! - An open marker with no close marker later on the same line makes the
//!   rest of the line literal.
//!
//! Normalization is pure: the same inputs always give the same output.

use crate::delimiter::DelimiterSpec;
use crate::hunk::{NormalizedHunk, RawHunk};
use crate::property::PropertyMap;

/// Placeholder substitution for hunks
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    delimiters: &'a DelimiterSpec,
    properties: &'a PropertyMap,
}

/// Result of normalizing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub text: String,
    pub unresolved: Vec<String>,
}

impl<'a> Normalizer<'a> {
    /// Create normalizer
    #[inline]
    #[must_use]
    pub fn new(delimiters: &'a DelimiterSpec, properties: &'a PropertyMap) -> Self {
        Self {
            delimiters,
            properties,
        }
    }

    /// Substitute placeholders in a single line
    #[must_use]
    pub fn normalize_line(&self, line: &str) -> NormalizedLine {
        let open = self.delimiters.open();
        let close = self.delimiters.close();

        let mut text = String::with_capacity(line.len());
        let mut unresolved = Vec::new();
        let mut rest = line;

        while let Some(start) = rest.find(open) {
            let after_open = &rest[start + open.len()..];
            let Some(end) = after_open.find(close) else {
                // dangling open marker: keep the remainder literally
                break;
            };

            text.push_str(&rest[..start]);
            let identifier = after_open[..end].trim();
            match self.properties.resolve(identifier) {
                Some(value) => text.push_str(&value),
                None => {
                    text.push_str(&rest[start..start + open.len() + end + close.len()]);
                    unresolved.push(identifier.to_string());
                }
            }
            rest = &after_open[end + close.len()..];
        }
        text.push_str(rest);

        NormalizedLine { text, unresolved }
    }

    /// Normalize every line of a hunk
    #[must_use]
    pub fn normalize(&self, hunk: &RawHunk) -> NormalizedHunk {
        let mut unresolved: Vec<String> = Vec::new();
        let lines = hunk
            .lines
            .iter()
            .map(|line| {
                let normalized = self.normalize_line(&line.text);
                for id in normalized.unresolved {
                    if !unresolved.contains(&id) {
                        unresolved.push(id);
                    }
                }
                line.with_text(normalized.text)
            })
            .collect();

        NormalizedHunk {
            path: hunk.path.clone(),
            old_range: hunk.old_range,
            new_range: hunk.new_range,
            lines,
            unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunk::HunkText;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn widget() -> PropertyMap {
        PropertyMap::from_pairs([("appName", json!("widget")), ("port", json!(3000))])
    }

    #[test]
    fn welcome_scenario() {
        let delimiters = DelimiterSpec::ejs();
        let props = widget();
        let hunk = RawHunk::replacement(
            "templates/index.html",
            &["Welcome to <%= appName %>"],
            &["Welcome to <%= appName %>!"],
        );

        let normalized = Normalizer::new(&delimiters, &props).normalize(&hunk);

        assert_eq!(normalized.removed_block(), vec!["Welcome to widget"]);
        assert_eq!(normalized.added_block(), vec!["Welcome to widget!"]);
        assert!(normalized.is_fully_resolved());
        assert_eq!(normalized.path, "templates/index.html");
    }

    #[test]
    fn multiple_placeholders_and_whitespace() {
        let delimiters = DelimiterSpec::ejs();
        let props = widget();
        let normalizer = Normalizer::new(&delimiters, &props);

        let line = normalizer.normalize_line("<%=appName%> listens on <%=   port %>.");
        assert_eq!(line.text, "widget listens on 3000.");
        assert!(line.unresolved.is_empty());
    }

    #[test]
    fn unresolved_span_stays_verbatim() {
        let delimiters = DelimiterSpec::ejs();
        let props = widget();
        let normalizer = Normalizer::new(&delimiters, &props);

        let line = normalizer.normalize_line("<%= appName %> by <%= author %>");
        assert_eq!(line.text, "widget by <%= author %>");
        assert_eq!(line.unresolved, vec!["author".to_string()]);
    }

    #[test]
    fn dangling_open_marker_is_literal() {
        let delimiters = DelimiterSpec::ejs();
        let props = widget();
        let normalizer = Normalizer::new(&delimiters, &props);

        let line = normalizer.normalize_line("<%= appName %> then <%= appName");
        assert_eq!(line.text, "widget then <%= appName");
        assert!(line.unresolved.is_empty());
    }

    #[test]
    fn nested_open_marker_is_not_resolved() {
        let delimiters = DelimiterSpec::ejs();
        let props = widget();
        let normalizer = Normalizer::new(&delimiters, &props);

        let line = normalizer.normalize_line("<%= a <%= appName %> %>");
        assert_eq!(line.text, "<%= a <%= appName %> %>");
        assert_eq!(line.unresolved, vec!["a <%= appName".to_string()]);
    }

    #[test]
    fn custom_delimiters() {
        let delimiters = DelimiterSpec::new("{{", "}}").unwrap();
        let props = widget();
        let normalizer = Normalizer::new(&delimiters, &props);

        let line = normalizer.normalize_line("name: {{ appName }} <%= appName %>");
        assert_eq!(line.text, "name: widget <%= appName %>");
    }

    #[test]
    fn unresolved_ids_are_deduplicated_per_hunk() {
        let delimiters = DelimiterSpec::ejs();
        let props = PropertyMap::new();
        let hunk = RawHunk::replacement("a", &["<%= x %>"], &["<%= x %> <%= y %>"]);

        let normalized = Normalizer::new(&delimiters, &props).normalize(&hunk);
        assert_eq!(normalized.unresolved, vec!["x".to_string(), "y".to_string()]);
    }

    proptest! {
        #[test]
        fn identity_without_placeholders(lines in prop::collection::vec("[a-zA-Z0-9 .{}%=>-]{0,40}", 0..8)) {
            let delimiters = DelimiterSpec::ejs();
            let props = widget();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let hunk = RawHunk::replacement("f", &refs, &refs);
            prop_assume!(!lines.iter().any(|l| l.contains("<%=")));

            let normalized = Normalizer::new(&delimiters, &props).normalize(&hunk);
            prop_assert_eq!(normalized.lines, hunk.lines);
        }

        #[test]
        fn normalization_is_repeatable(line in "[a-z <%=>]{0,60}") {
            let delimiters = DelimiterSpec::ejs();
            let props = widget();
            let normalizer = Normalizer::new(&delimiters, &props);
            let hunk = RawHunk::replacement("f", &[line.as_str()], &[]);

            prop_assert_eq!(normalizer.normalize(&hunk), normalizer.normalize(&hunk));
        }
    }
}
