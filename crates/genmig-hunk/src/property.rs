//! Resolved placeholder values
//!
//! A [`PropertyMap`] maps placeholder identifiers to the values that were used
//! when the user's files were rendered. Values come from several layered
//! sources; precedence is fixed by [`PropertySource`] and does not depend on
//! the order in which layers are added.

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Where a property value came from
///
/// Variants are declared from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertySource {
    /// Nested `promptValues` of the generator's scaffold record
    PromptValues,
    /// Top-level keys of the generator's scaffold record
    ScaffoldRecord,
    /// Local project descriptor (`package.json`)
    ProjectDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
struct PropertyEntry {
    value: Value,
    source: PropertySource,
}

/// Immutable placeholder → value mapping for one migration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: BTreeMap<String, PropertyEntry>,
}

impl PropertyMap {
    /// Empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a layered builder
    #[inline]
    #[must_use]
    pub fn builder() -> PropertyMapBuilder {
        PropertyMapBuilder::default()
    }

    /// Build from plain pairs, all attributed to the project descriptor
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .fold(Self::builder(), |b, (k, v)| {
                b.insert(PropertySource::ProjectDescriptor, k, v.into())
            })
            .build()
    }

    /// Raw value for an exact key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Source that supplied an exact key
    #[inline]
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<PropertySource> {
        self.entries.get(key).map(|e| e.source)
    }

    /// Resolve a placeholder identifier to its rendered text
    ///
    /// Exact keys win. Otherwise a dotted identifier (`author.name`) walks
    /// into structured values, using numeric segments as array indices.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> Option<Cow<'_, str>> {
        if let Some(value) = self.get(identifier) {
            return Some(stringify(value));
        }

        let mut segments = identifier.split('.');
        let mut current = self.get(segments.next()?)?;
        let mut walked = false;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
            walked = true;
        }
        walked.then(|| stringify(current))
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if map has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Render a value the way a template engine prints it
#[must_use]
pub fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

/// Layered construction of a [`PropertyMap`]
#[derive(Debug, Clone, Default)]
pub struct PropertyMapBuilder {
    entries: BTreeMap<String, PropertyEntry>,
}

impl PropertyMapBuilder {
    /// Insert one key; an existing key is replaced only by an equal or higher
    /// precedence source
    #[must_use]
    pub fn insert(mut self, source: PropertySource, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        match self.entries.get(&key) {
            Some(existing) if existing.source > source => {}
            _ => {
                self.entries.insert(key, PropertyEntry { value, source });
            }
        }
        self
    }

    /// Insert every key of a JSON object
    #[must_use]
    pub fn layer(self, source: PropertySource, values: &Map<String, Value>) -> Self {
        values
            .iter()
            .fold(self, |b, (k, v)| b.insert(source, k.clone(), v.clone()))
    }

    /// Finish the map
    #[inline]
    #[must_use]
    pub fn build(self) -> PropertyMap {
        PropertyMap {
            entries: self.entries,
        }
    }
}
