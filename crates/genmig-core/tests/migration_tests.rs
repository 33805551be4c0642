//! End-to-end migration runs against a temp project with fake sources

use genmig_apply::{ApplyResult, ConflictKind, ConflictPolicy, HunkOutcome, SkipReason};
use genmig_core::{
    DiffFileSource, DiffSource, MetadataSource, MigrationConfig, MigrationError, Migrator,
    RunLock, RunOutcome, StaticMetadata,
};
use genmig_hunk::{ChangeStatus, FileChange, RawHunk};
use genmig_test_utils::{
    replacement, welcome_change, FailingSource, FakeDiffSource, FakeMetadata, ProjectFixture,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn migrator(
    config: MigrationConfig,
    metadata: Arc<dyn MetadataSource>,
    diffs: Arc<dyn DiffSource>,
) -> Migrator {
    Migrator::new(config, metadata, diffs).unwrap()
}

#[tokio::test]
async fn up_to_date_project_fetches_no_diff_and_writes_nothing() {
    let project = ProjectFixture::scaffolded("widget", "1.2.0");
    project.write("index.html", "Welcome to widget\n");
    let before = project.snapshot();
    let metadata = Arc::new(FakeMetadata::new("1.2.0"));
    let diffs = Arc::new(FakeDiffSource::new(vec![welcome_change("index.html")]));

    let outcome = migrator(project.config(), metadata.clone(), diffs.clone()).run().await;

    assert!(matches!(
        outcome,
        RunOutcome::AlreadyUpToDate { ref version, .. } if version == "1.2.0"
    ));
    assert_eq!(metadata.calls(), 1);
    assert_eq!(diffs.calls(), 0);
    assert_eq!(project.snapshot(), before);
}

#[tokio::test]
async fn welcome_hunk_is_rendered_and_applied() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("app/index.html", "<h1>\nWelcome to widget\n</h1>\n");
    let config = project.config().with_template_prefix("generators/app/templates");
    let diffs = Arc::new(FakeDiffSource::new(vec![welcome_change(
        "generators/app/templates/app/index.html",
    )]));

    let report = migrator(config, Arc::new(FakeMetadata::new("1.1.0")), diffs.clone())
        .run()
        .await
        .into_result()
        .unwrap();

    assert_eq!(
        diffs.requested_tags(),
        vec![("v1.0.0".to_string(), "v1.1.0".to_string())]
    );
    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.files[0].hunks[0].outcome, HunkOutcome::Applied { line: 2 });
    assert!(!report.is_partial());
    assert!(report.version_advanced);
    assert_eq!(
        project.read("app/index.html").as_deref(),
        Some("<h1>\nWelcome to widget!\n</h1>\n")
    );
    assert_eq!(project.tracked_version().as_deref(), Some("1.1.0"));
    assert!(report.to_string().contains("version advanced to 1.1.0"));
}

#[tokio::test]
async fn already_applied_change_is_skipped_and_file_untouched() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget!\n");

    let report = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![welcome_change("index.html")])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(report.files[0].result, ApplyResult::Skipped);
    assert_eq!(
        report.files[0].hunks[0].outcome,
        HunkOutcome::skipped(SkipReason::AlreadyApplied)
    );
    assert!(!report.files[0].changed);
    assert_eq!(project.read("index.html").as_deref(), Some("Welcome to widget!\n"));
    assert_eq!(project.tracked_version().as_deref(), Some("1.1.0"));
}

#[tokio::test]
async fn ambiguous_match_conflicts_and_leaves_file_untouched() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget\n<p/>\nWelcome to widget\n");
    project.write("README.md", "# widget\nWelcome to widget\n");

    let report = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![
            welcome_change("index.html"),
            welcome_change("README.md"),
        ])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert!(report.is_partial());
    assert_eq!(report.conflict_paths(), vec!["index.html".to_string()]);
    assert_eq!(
        report.files[0].hunks[0].outcome,
        HunkOutcome::conflict(ConflictKind::Ambiguous { matches: 2 })
    );
    assert_eq!(
        project.read("index.html").as_deref(),
        Some("Welcome to widget\n<p/>\nWelcome to widget\n")
    );
    assert_eq!(
        project.read("README.md").as_deref(),
        Some("# widget\nWelcome to widget!\n")
    );
    assert!(report.version_advanced);
    assert_eq!(project.tracked_version().as_deref(), Some("1.1.0"));
}

#[tokio::test]
async fn conflicts_keep_version_when_advance_disabled() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "nothing to see\n");

    let report = migrator(
        project.config().with_advance_on_conflict(false),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![welcome_change("index.html")])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(
        report.files[0].hunks[0].outcome,
        HunkOutcome::conflict(ConflictKind::ContextNotFound)
    );
    assert!(!report.version_advanced);
    assert_eq!(project.tracked_version().as_deref(), Some("1.0.0"));
    assert!(report.to_string().contains("version kept at 1.0.0"));
}

#[tokio::test]
async fn fetch_failure_aborts_without_writes() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget\n");
    let before = project.snapshot();

    let outcome = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FailingSource::new(503)),
    )
    .run()
    .await;

    assert!(matches!(
        outcome,
        RunOutcome::Aborted(MigrationError::RemoteFetch(_))
    ));
    assert_eq!(project.snapshot(), before);
}

#[tokio::test]
async fn metadata_failure_aborts_before_diff() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    let diffs = Arc::new(FakeDiffSource::new(Vec::new()));

    let outcome = migrator(project.config(), Arc::new(FailingSource::new(404)), diffs.clone())
        .run()
        .await;

    assert!(matches!(outcome, RunOutcome::Aborted(MigrationError::RemoteFetch(_))));
    assert_eq!(diffs.calls(), 0);
    assert_eq!(project.tracked_version().as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn missing_scaffold_record_is_missing_source() {
    let project = ProjectFixture::new();
    project.with_package_json(&json!({"name": "widget"}));
    let metadata = Arc::new(FakeMetadata::new("1.1.0"));

    let outcome = migrator(
        project.config(),
        metadata.clone(),
        Arc::new(FakeDiffSource::new(Vec::new())),
    )
    .run()
    .await;

    assert!(matches!(
        outcome,
        RunOutcome::Aborted(MigrationError::MissingSource { .. })
    ));
    assert_eq!(metadata.calls(), 0);
}

#[tokio::test]
async fn second_run_from_same_base_skips_every_hunk() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget\n");
    let diff = vec![
        welcome_change("index.html"),
        FileChange::new("NOTES.md", ChangeStatus::Added)
            .with_hunks(vec![RawHunk::replacement("NOTES.md", &[], &["# <%= appName %> notes"])]),
    ];

    let first = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(diff.clone())),
    )
    .run()
    .await
    .into_result()
    .unwrap();
    assert_eq!(first.applied_count(), 2);
    let migrated = project.snapshot();

    project.with_yo_rc("1.0.0", &json!({"appName": "widget"}));
    let second = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(diff)),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(second.skipped_count(), 2);
    assert_eq!(second.applied_count(), 0);
    assert_eq!(project.snapshot(), migrated);
    assert_eq!(project.read("NOTES.md").as_deref(), Some("# widget notes\n"));
}

#[tokio::test]
async fn descriptor_values_override_scaffold_record() {
    let project = ProjectFixture::new();
    project
        .with_package_json(&json!({"name": "gadget", "appName": "gadget"}))
        .with_yo_rc(
            "1.0.0",
            &json!({"appName": "widget", "promptValues": {"appName": "prompt", "author": "Ada"}}),
        )
        .write("index.html", "Welcome to gadget\n")
        .write("AUTHORS", "Ada\n");

    let report = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![
            welcome_change("index.html"),
            replacement("AUTHORS", &["<%= author %>"], &["<%= author %> (maintainer)"]),
        ])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(report.applied_count(), 2);
    assert_eq!(project.read("index.html").as_deref(), Some("Welcome to gadget!\n"));
    assert_eq!(project.read("AUTHORS").as_deref(), Some("Ada (maintainer)\n"));
}

#[tokio::test]
async fn held_lock_rejects_second_run() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    let config = project.config();
    let _held = RunLock::acquire(config.lock_path()).unwrap();
    let metadata = Arc::new(FakeMetadata::new("1.1.0"));

    let outcome = migrator(config, metadata.clone(), Arc::new(FakeDiffSource::new(Vec::new())))
        .run()
        .await;

    assert!(matches!(outcome, RunOutcome::Aborted(MigrationError::Locked { .. })));
    assert_eq!(metadata.calls(), 0);
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget\n");
    let before = project.snapshot();

    let report = migrator(
        project.config().with_dry_run(true),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![welcome_change("index.html")])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.applied_count(), 1);
    assert!(!report.version_advanced);
    assert_eq!(project.snapshot(), before);
}

#[tokio::test]
async fn append_markers_policy_is_stable_across_runs() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Hello\n");
    let config = project
        .config()
        .with_conflict_policy(ConflictPolicy::AppendMarkers)
        .with_advance_on_conflict(false);
    let run = || {
        migrator(
            config.clone(),
            Arc::new(FakeMetadata::new("1.1.0")),
            Arc::new(FakeDiffSource::new(vec![welcome_change("index.html")])),
        )
    };

    let first = run().run().await.into_result().unwrap();
    let marked = project.read("index.html").unwrap();
    let second = run().run().await.into_result().unwrap();

    assert_eq!(first.conflict_count(), 1);
    assert!(first.files[0].changed);
    assert!(marked.starts_with("Hello\n<<<<<<< "));
    assert!(marked.contains("Welcome to widget!\n"));
    assert_eq!(second.conflict_count(), 1);
    assert!(!second.files[0].changed);
    assert_eq!(project.read("index.html").unwrap(), marked);
}

#[tokio::test]
async fn diff_file_source_drives_full_run() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("index.html", "Welcome to widget\r\n<footer/>\r\n");
    project.write(
        "upgrade.diff",
        "\
diff --git a/templates/index.html b/templates/index.html
--- a/templates/index.html
+++ b/templates/index.html
@@ -1,2 +1,2 @@
-Welcome to <%= appName %>
+Welcome to <%= appName %>!
 <footer/>
diff --git a/templates/CHANGELOG.md b/templates/CHANGELOG.md
new file mode 100644
--- /dev/null
+++ b/templates/CHANGELOG.md
@@ -0,0 +1 @@
+# <%= appName %> changelog
",
    );

    let report = migrator(
        project.config().with_template_prefix("templates"),
        Arc::new(StaticMetadata::new("1.1.0")),
        Arc::new(DiffFileSource::new(project.path().join("upgrade.diff"))),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(report.applied_count(), 2);
    assert_eq!(
        project.read("index.html").as_deref(),
        Some("Welcome to widget!\r\n<footer/>\r\n")
    );
    assert_eq!(
        project.read("CHANGELOG.md").as_deref(),
        Some("# widget changelog\n")
    );
}

#[tokio::test]
async fn unresolved_placeholder_conflicts_without_touching_file() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("config.txt", "v = widget\n");

    let report = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![replacement(
            "config.txt",
            &["v = <%= missing %>"],
            &["v = <%= missing %>;"],
        )])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    let file = &report.files[0];
    assert_eq!(file.result, ApplyResult::Conflict);
    assert_eq!(file.hunks[0].outcome, HunkOutcome::conflict(ConflictKind::ContextNotFound));
    assert_eq!(file.hunks[0].unresolved, vec!["missing".to_string()]);
    assert_eq!(project.read("config.txt").as_deref(), Some("v = widget\n"));
    assert!(report.to_string().contains("unresolved: missing"));
}

#[tokio::test]
async fn removed_upstream_file_with_local_edits_is_skipped_on_rerun() {
    let project = ProjectFixture::scaffolded("widget", "1.0.0");
    project.write("legacy.js", "a\nb\nmine\n");
    let removal = FileChange::new("legacy.js", ChangeStatus::Removed)
        .with_hunks(vec![RawHunk::builder("legacy.js").removed("a").removed("b").build()]);

    let first = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![removal.clone()])),
    )
    .run()
    .await
    .into_result()
    .unwrap();
    assert_eq!(first.applied_count(), 1);
    assert_eq!(project.read("legacy.js").as_deref(), Some("mine\n"));

    project.with_yo_rc("1.0.0", &json!({"appName": "widget"}));
    let second = migrator(
        project.config(),
        Arc::new(FakeMetadata::new("1.1.0")),
        Arc::new(FakeDiffSource::new(vec![removal])),
    )
    .run()
    .await
    .into_result()
    .unwrap();

    assert_eq!(second.skipped_count(), 1);
    assert_eq!(second.conflict_count(), 0);
    assert_eq!(
        second.files[0].hunks[0].outcome,
        HunkOutcome::skipped(SkipReason::AlreadyApplied)
    );
    assert_eq!(project.read("legacy.js").as_deref(), Some("mine\n"));
}
