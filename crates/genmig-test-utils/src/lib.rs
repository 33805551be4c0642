//! Testing utilities for the genmig workspace
//!
//! Project fixtures on a temp directory and in-memory fakes for the remote
//! sources.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use genmig_core::{
    DiffSource, FetchError, GeneratorId, GeneratorMetadata, MetadataSource, MigrationConfig,
};
use genmig_hunk::{DiffSet, FileChange, RawHunk};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Generator used by the fixtures
pub const GENERATOR: &str = "acme/generator-widget";

/// State file key for [`GENERATOR`]
pub const GENERATOR_KEY: &str = "generator-widget";

pub fn generator() -> GeneratorId {
    GENERATOR.parse().unwrap()
}

/// Scaffolded project on a temp directory
#[derive(Debug)]
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Empty project
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Project with `package.json` naming the app and a scaffold record at
    /// `version`
    pub fn scaffolded(app_name: &str, version: &str) -> Self {
        let fixture = Self::new();
        fixture
            .with_package_json(&json!({"name": app_name, "version": "0.1.0"}))
            .with_yo_rc(version, &json!({"appName": app_name}));
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, text: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
        self
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(relative)).ok()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }

    pub fn with_package_json(&self, descriptor: &Value) -> &Self {
        self.write("package.json", &serde_json::to_string_pretty(descriptor).unwrap())
    }

    /// Write `.yo-rc.json` with the generator entry at `version` plus `extra` keys
    pub fn with_yo_rc(&self, version: &str, extra: &Value) -> &Self {
        let mut entry = Map::new();
        entry.insert("version".to_string(), json!(version));
        if let Value::Object(extra) = extra {
            entry.extend(extra.clone());
        }
        let record = json!({ GENERATOR_KEY: entry });
        self.write(".yo-rc.json", &serde_json::to_string_pretty(&record).unwrap())
    }

    /// Version currently tracked in `.yo-rc.json`
    pub fn tracked_version(&self) -> Option<String> {
        let record: Value = serde_json::from_str(&self.read(".yo-rc.json")?).ok()?;
        record[GENERATOR_KEY]["version"].as_str().map(str::to_string)
    }

    /// Configuration rooted at this project
    pub fn config(&self) -> MigrationConfig {
        MigrationConfig::new(generator()).with_project_root(self.dir.path())
    }

    /// Every file under the project with its bytes
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.dir.path(), self.dir.path(), &mut files);
        files
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            files.insert(relative, std::fs::read(&path).unwrap());
        }
    }
}

/// Modified file with one `removed → added` replacement hunk
pub fn replacement(path: &str, removed: &[&str], added: &[&str]) -> FileChange {
    FileChange::modified(path, vec![RawHunk::replacement(path, removed, added)])
}

/// The `Welcome to <%= appName %>` → `Welcome to <%= appName %>!` change
pub fn welcome_change(path: &str) -> FileChange {
    replacement(path, &["Welcome to <%= appName %>"], &["Welcome to <%= appName %>!"])
}

/// Metadata source with a fixed version that counts calls
#[derive(Debug)]
pub struct FakeMetadata {
    version: String,
    calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn latest_version(&self, _generator: &GeneratorId) -> Result<GeneratorMetadata, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratorMetadata::new(self.version.clone()))
    }
}

/// Diff source returning fixed file changes; records calls and tags
#[derive(Debug)]
pub struct FakeDiffSource {
    files: Vec<FileChange>,
    calls: AtomicUsize,
    tags: Mutex<Vec<(String, String)>>,
}

impl FakeDiffSource {
    pub fn new(files: Vec<FileChange>) -> Self {
        Self {
            files,
            calls: AtomicUsize::new(0),
            tags: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(base, head)` of every call, in order
    pub fn requested_tags(&self) -> Vec<(String, String)> {
        self.tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiffSource for FakeDiffSource {
    async fn fetch_diff(
        &self,
        _generator: &GeneratorId,
        base: &str,
        head: &str,
    ) -> Result<DiffSet, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tags
            .lock()
            .unwrap()
            .push((base.to_string(), head.to_string()));
        Ok(DiffSet::new(base, head, self.files.clone()))
    }
}

/// Source whose every call fails with an HTTP status
#[derive(Debug)]
pub struct FailingSource {
    status: u16,
}

impl FailingSource {
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    fn error(&self) -> FetchError {
        FetchError::Status {
            url: "https://example.invalid/".to_string(),
            status: self.status,
        }
    }
}

#[async_trait]
impl MetadataSource for FailingSource {
    async fn latest_version(&self, _generator: &GeneratorId) -> Result<GeneratorMetadata, FetchError> {
        Err(self.error())
    }
}

#[async_trait]
impl DiffSource for FailingSource {
    async fn fetch_diff(&self, _: &GeneratorId, _: &str, _: &str) -> Result<DiffSet, FetchError> {
        Err(self.error())
    }
}
