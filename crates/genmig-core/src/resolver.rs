//! Property resolution
//!
//! Placeholder values come from the files a scaffolded project already has.
//! Layers, lowest precedence first:
//!
//! 1. `promptValues` inside the generator's scaffold record (`.yo-rc.json`)
//! 2. top-level keys of the scaffold record, except `version`
//! 3. top-level keys of the project descriptor (`package.json`)

use crate::config::{GeneratorId, MigrationConfig};
use crate::documents;
use crate::error::MigrationError;
use genmig_hunk::{PropertyMap, PropertySource};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Key of the answers object inside a scaffold record
const PROMPT_VALUES_KEY: &str = "promptValues";

/// Key of the tracked version inside a scaffold record
const VERSION_KEY: &str = "version";

/// Builds the [`PropertyMap`] for a run
#[derive(Debug, Clone)]
pub struct PropertyResolver {
    descriptor_path: PathBuf,
    record_path: PathBuf,
    generator_key: String,
}

impl PropertyResolver {
    /// Create resolver over explicit paths
    #[inline]
    #[must_use]
    pub fn new(
        descriptor_path: impl Into<PathBuf>,
        record_path: impl Into<PathBuf>,
        generator_key: impl Into<String>,
    ) -> Self {
        Self {
            descriptor_path: descriptor_path.into(),
            record_path: record_path.into(),
            generator_key: generator_key.into(),
        }
    }

    /// Resolver for the configured project
    #[inline]
    #[must_use]
    pub fn from_config(config: &MigrationConfig, generator: &GeneratorId) -> Self {
        Self::new(
            config.descriptor_path(),
            config.state_path(),
            generator.state_key(),
        )
    }

    /// Read both documents and merge them
    ///
    /// # Errors
    /// Returns [`MigrationError::MissingSource`] if either document is
    /// missing, unparsable, or has no entry for the generator
    pub async fn resolve(&self) -> Result<PropertyMap, MigrationError> {
        let descriptor = documents::read_object(&self.descriptor_path).await?;
        let record_doc = documents::read_object(&self.record_path).await?;
        let record = documents::entry(&record_doc, &self.generator_key)
            .map_err(|reason| MigrationError::missing_source(&self.record_path, reason))?;

        let properties = merge(&descriptor, record);
        tracing::debug!(
            count = properties.len(),
            descriptor = %self.descriptor_path.display(),
            "resolved template properties"
        );
        Ok(properties)
    }
}

/// Merge descriptor and scaffold record into one map
#[must_use]
pub fn merge(descriptor: &Map<String, Value>, record: &Map<String, Value>) -> PropertyMap {
    let mut builder = PropertyMap::builder();

    if let Some(Value::Object(prompts)) = record.get(PROMPT_VALUES_KEY) {
        builder = builder.layer(PropertySource::PromptValues, prompts);
    }

    for (key, value) in record {
        if key != VERSION_KEY {
            builder = builder.insert(PropertySource::ScaffoldRecord, key.clone(), value.clone());
        }
    }

    builder.layer(PropertySource::ProjectDescriptor, descriptor).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn descriptor_overrides_record_overrides_prompts() {
        let descriptor = obj(json!({"name": "from-package", "license": "MIT"}));
        let record = obj(json!({
            "version": "1.0.0",
            "name": "from-record",
            "appName": "widget",
            "promptValues": {"appName": "from-prompt", "author": "Ada", "name": "p"}
        }));

        let props = merge(&descriptor, &record);

        assert_eq!(props.resolve("name").as_deref(), Some("from-package"));
        assert_eq!(props.source_of("name"), Some(PropertySource::ProjectDescriptor));
        assert_eq!(props.resolve("appName").as_deref(), Some("widget"));
        assert_eq!(props.source_of("appName"), Some(PropertySource::ScaffoldRecord));
        assert_eq!(props.resolve("author").as_deref(), Some("Ada"));
        assert_eq!(props.source_of("author"), Some(PropertySource::PromptValues));
        assert_eq!(props.resolve("license").as_deref(), Some("MIT"));
    }

    #[test]
    fn record_version_is_not_a_property() {
        let props = merge(&Map::new(), &obj(json!({"version": "1.0.0"})));
        assert!(props.get("version").is_none());
    }

    #[test]
    fn descriptor_version_is_a_property() {
        let props = merge(&obj(json!({"version": "0.3.0"})), &obj(json!({"version": "1.0.0"})));
        assert_eq!(props.resolve("version").as_deref(), Some("0.3.0"));
    }

    #[tokio::test]
    async fn missing_descriptor_is_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(".yo-rc.json"), r#"{"g": {"version": "1"}}"#)
            .await
            .unwrap();

        let resolver = PropertyResolver::new(
            dir.path().join("package.json"),
            dir.path().join(".yo-rc.json"),
            "g",
        );
        let err = resolver.resolve().await.unwrap_err();

        assert!(matches!(err, MigrationError::MissingSource { ref path, .. } if path.ends_with("package.json")));
    }

    #[tokio::test]
    async fn missing_generator_entry_is_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("package.json"), r#"{"name": "widget"}"#)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(".yo-rc.json"), r#"{"other": {}}"#)
            .await
            .unwrap();

        let resolver = PropertyResolver::new(
            dir.path().join("package.json"),
            dir.path().join(".yo-rc.json"),
            "generator-widget",
        );
        let err = resolver.resolve().await.unwrap_err();

        assert!(err.to_string().contains("no entry for generator 'generator-widget'"));
    }
}
