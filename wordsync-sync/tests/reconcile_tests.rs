mod common;

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use wordsync_core::{ContentStore, TermId};
use wordsync_sync::{
    resources::sync_resources,
    taxonomy::{sync_terms, sync_terms_at},
    ContentPhase, NoContent, ResourceChange, SyncError, SyncOptions, TermChange, TermMap,
};

use common::{definitions, site, Call, MemoryStore};

const EVENTS: &str = r#"{
    "category": [
        {"name": "Events", "slug": "events", "children": [
            {"name": "Meetups", "slug": "meetups"},
            {"name": "Conferences", "slug": "conferences"}
        ]}
    ]
}"#;

fn position(calls: &[Call], wanted: impl Fn(&Call) -> bool) -> usize {
    calls.iter().position(wanted).expect("call present")
}

// ---------------------------------------------------------------------------
// Taxonomy phase
// ---------------------------------------------------------------------------

#[test]
fn creates_parents_before_children_with_parent_ids() {
    let store = MemoryStore::new(&["category"]);
    let result = sync_terms(&store, &definitions(EVENTS), false).expect("sync");

    let events = result.term_map.get("category", "events").expect("events id").clone();
    let creates: Vec<_> = store
        .mutations()
        .into_iter()
        .map(|call| match call {
            Call::NewTerm { slug, parent, .. } => (slug, parent),
            other => panic!("unexpected mutation {other:?}"),
        })
        .collect();
    assert_eq!(
        creates,
        vec![
            ("events".to_string(), None),
            ("meetups".to_string(), Some(events.0.clone())),
            ("conferences".to_string(), Some(events.0.clone())),
        ]
    );
    assert_eq!(result.term_map.len(), 3);
    assert!(result.term_map.get("category", "events/meetups").is_some());
}

#[test]
fn second_run_is_idempotent() {
    let store = MemoryStore::new(&["category"]);
    let defs = definitions(EVENTS);

    let first = sync_terms(&store, &defs, false).expect("first");
    store.clear_calls();
    let second = sync_terms(&store, &defs, false).expect("second");

    assert!(store.mutations().is_empty(), "got {:?}", store.mutations());
    assert_eq!(first.term_map, second.term_map);
    assert!(second
        .changes
        .iter()
        .all(|c| matches!(c, TermChange::Unchanged { .. })));
}

#[test]
fn renamed_term_keeps_its_remote_id() {
    let store = MemoryStore::new(&["category"]).with_term("category", "7", "Events", "events", "0");
    let defs = definitions(r#"{"category": [{"name": "Happenings", "slug": "events"}]}"#);

    let result = sync_terms(&store, &defs, false).expect("sync");

    assert_eq!(
        store.mutations(),
        vec![Call::EditTerm {
            id: "7".to_string(),
            slug: "events".to_string()
        }]
    );
    assert_eq!(result.term_map.get("category", "events"), Some(&TermId::from("7")));
    assert_eq!(store.terms("category")[0].name, "Happenings");
}

#[test]
fn moved_term_is_a_new_identity() {
    let store = MemoryStore::new(&["category"])
        .with_term("category", "5", "Meetups", "meetups", "0");
    let defs = definitions(
        r#"{"category": [{"name": "Events", "slug": "events", "children": [
            {"name": "Meetups", "slug": "meetups"}
        ]}]}"#,
    );

    sync_terms(&store, &defs, false).expect("sync");

    let calls = store.mutations();
    assert_eq!(calls.len(), 3, "got {calls:?}");
    assert!(matches!(&calls[0], Call::NewTerm { slug, .. } if slug == "events"));
    assert!(matches!(&calls[1], Call::NewTerm { slug, parent: Some(_), .. } if slug == "meetups"));
    assert_eq!(
        calls[2],
        Call::DeleteTerm {
            taxonomy: "category".to_string(),
            id: "5".to_string()
        }
    );
}

#[test]
fn deletes_wait_for_every_create_in_every_taxonomy() {
    let store = MemoryStore::new(&["category", "post_tag"])
        .with_term("category", "3", "Stale", "stale", "0");
    let defs = definitions(
        r#"{
            "category": [{"name": "Events", "slug": "events"}],
            "post_tag": [{"name": "Rust", "slug": "rust"}]
        }"#,
    );

    sync_terms(&store, &defs, false).expect("sync");

    let calls = store.calls();
    let delete = position(&calls, |c| matches!(c, Call::DeleteTerm { .. }));
    let last_create = calls
        .iter()
        .rposition(|c| matches!(c, Call::NewTerm { .. }))
        .expect("creates");
    assert!(delete > last_create, "calls: {calls:?}");
}

#[test]
fn unmatched_children_are_deleted_before_parents() {
    let store = MemoryStore::new(&["category"])
        .with_term("category", "1", "Events", "events", "0")
        .with_term("category", "2", "Meetups", "meetups", "1")
        .with_term("category", "3", "Berlin", "berlin", "2");

    let result = sync_terms(&store, &definitions(r#"{"category": []}"#), false).expect("sync");

    let deleted: Vec<_> = store
        .mutations()
        .into_iter()
        .map(|c| match c {
            Call::DeleteTerm { id, .. } => id,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(deleted, vec!["3", "2", "1"]);
    assert!(store.terms("category").is_empty());
    assert!(result.term_map.is_empty());
}

#[test]
fn unknown_taxonomy_fails_before_any_term_call() {
    let store = MemoryStore::new(&["tag"]);
    let defs = definitions(r#"{"widgets": [{"name": "Foo", "slug": "foo"}]}"#);

    let err = sync_terms(&store, &defs, false).unwrap_err();

    assert!(matches!(&err, SyncError::UnknownTaxonomy { taxonomy } if taxonomy == "widgets"));
    assert!(err.to_string().contains("widgets"));
    assert_eq!(store.calls(), vec![Call::GetTaxonomies]);
}

#[test]
fn dry_run_plans_without_mutating() {
    let store = MemoryStore::new(&["category"])
        .with_term("category", "7", "Events", "events", "0")
        .with_term("category", "8", "Old", "old", "0");
    let defs = definitions(
        r#"{"category": [
            {"name": "Happenings", "slug": "events"},
            {"name": "News", "slug": "news", "children": [{"name": "Local", "slug": "local"}]}
        ]}"#,
    );

    let result = sync_terms(&store, &defs, true).expect("dry run");

    assert!(store.mutations().is_empty());
    let actions: Vec<_> = result
        .changes
        .iter()
        .map(|c| format!("{} {}", c.action(), c.path()))
        .collect();
    assert_eq!(
        actions,
        vec![
            "would update events",
            "would create news",
            "would create news/local",
            "would delete old",
        ]
    );
    // Would-create terms have no id yet.
    assert_eq!(result.term_map.get("category", "news"), None);
    assert_eq!(result.term_map.get("category", "events"), Some(&TermId::from("7")));
}

#[test]
fn failed_create_aborts_before_deletes() {
    let store = MemoryStore::new(&["category"])
        .with_term("category", "9", "Stale", "stale", "0")
        .failing_on("wp.newTerm");

    let err = sync_terms(&store, &definitions(EVENTS), false).unwrap_err();

    assert!(err.to_string().contains("creating category events"), "got: {err}");
    assert!(err.to_string().contains("not allowed"), "got: {err}");
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DeleteTerm { .. })));
}

#[test]
fn missing_definitions_file_makes_no_remote_call() {
    let tmp = TempDir::new().expect("tmp");
    let store = MemoryStore::new(&["category"]).with_term("category", "1", "Keep", "keep", "0");

    let result = sync_terms_at(&store, &tmp.path().join("taxonomies.json"), false).expect("sync");

    assert!(result.changes.is_empty());
    assert!(store.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Resource phase
// ---------------------------------------------------------------------------

fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, bytes).expect("write");
}

#[test]
fn publishes_changed_skips_equal_and_deletes_last() {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "logo.png", b"logo-v2");
    write(tmp.path(), "css/site.css", b"body{}");
    let store = MemoryStore::new(&[])
        .with_resource("logo.png", b"logo-v1")
        .with_resource("css/site.css", b"body{}")
        .with_resource("old.js", b"old");

    let changes = sync_resources(&store, tmp.path(), false).expect("sync");

    assert_eq!(
        store.mutations(),
        vec![
            Call::AddResource("logo.png".to_string()),
            Call::DeleteResource("old.js".to_string()),
        ]
    );
    assert!(changes.contains(&ResourceChange::Unchanged("css/site.css".to_string())));
    assert_eq!(store.resources().len(), 2);

    store.clear_calls();
    sync_resources(&store, tmp.path(), false).expect("rerun");
    assert!(store.mutations().is_empty());
}

#[test]
fn resource_dry_run_and_missing_root() {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "new.txt", b"hi");
    let store = MemoryStore::new(&[]).with_resource("gone.txt", b"x");

    let changes = sync_resources(&store, tmp.path(), true).expect("dry run");
    assert_eq!(
        changes,
        vec![
            ResourceChange::WouldPublish("new.txt".to_string()),
            ResourceChange::WouldDelete("gone.txt".to_string()),
        ]
    );
    assert!(store.mutations().is_empty());

    store.clear_calls();
    let none = sync_resources(&store, &tmp.path().join("missing"), false).expect("missing");
    assert!(none.is_empty());
    assert!(store.calls().is_empty());
}

#[test]
fn failed_publish_stops_before_any_delete() {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "a.css", b"a");
    write(tmp.path(), "b.css", b"b");
    let store = MemoryStore::new(&[])
        .with_resource("old.js", b"old")
        .failing_on("gw.addResource");

    let err = sync_resources(&store, tmp.path(), false).unwrap_err();

    assert!(err.to_string().contains("publishing a.css"), "got: {err}");
    let calls = store.calls();
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::AddResource(_))).count(),
        1,
        "calls: {calls:?}"
    );
    assert!(!calls.iter().any(|c| matches!(c, Call::DeleteResource(_))));
    assert!(store.resources().contains_key("old.js"));
}

#[test]
fn every_publish_precedes_the_first_delete() {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "a.js", b"a-v2");
    write(tmp.path(), "b.js", b"b-v2");
    write(tmp.path(), "css/c.css", b"c-v2");
    let store = MemoryStore::new(&[])
        .with_resource("a.js", b"a-v1")
        .with_resource("css/c.css", b"c-v1")
        .with_resource("m.js", b"stale")
        .with_resource("css/old.css", b"stale")
        .with_resource("z.js", b"stale");

    sync_resources(&store, tmp.path(), false).expect("sync");

    let calls = store.mutations();
    let adds = calls.iter().filter(|c| matches!(c, Call::AddResource(_))).count();
    let deletes = calls.iter().filter(|c| matches!(c, Call::DeleteResource(_))).count();
    assert_eq!((adds, deletes), (3, 3), "calls: {calls:?}");

    let last_add = calls
        .iter()
        .rposition(|c| matches!(c, Call::AddResource(_)))
        .expect("adds");
    let first_delete = position(&calls, |c| matches!(c, Call::DeleteResource(_)));
    assert!(last_add < first_delete, "calls: {calls:?}");
}

#[cfg(unix)]
#[test]
fn symlinked_resource_with_matching_fingerprint_is_kept() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().expect("tmp");
    let assets = TempDir::new().expect("assets");
    write(assets.path(), "logo.png", b"logo-v1");
    symlink(assets.path().join("logo.png"), tmp.path().join("logo.png")).expect("symlink");
    let store = MemoryStore::new(&[]).with_resource("logo.png", b"logo-v1");

    let changes = sync_resources(&store, tmp.path(), false).expect("sync");

    assert!(store.mutations().is_empty(), "got {:?}", store.mutations());
    assert_eq!(changes, vec![ResourceChange::Unchanged("logo.png".to_string())]);
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct RecordingContent<'a> {
    store: &'a MemoryStore,
    calls_before: Option<usize>,
    term_map: Option<TermMap>,
    fail: bool,
}

impl ContentPhase for RecordingContent<'_> {
    fn validate(&mut self, _posts_dir: &Path) -> Result<usize, SyncError> {
        Ok(0)
    }

    fn sync(
        &mut self,
        _store: &dyn ContentStore,
        _posts_dir: &Path,
        term_map: &TermMap,
        _dry_run: bool,
    ) -> Result<(), SyncError> {
        self.calls_before = Some(self.store.calls().len());
        self.term_map = Some(term_map.clone());
        if self.fail {
            return Err(SyncError::Content("post renderer failed".into()));
        }
        Ok(())
    }
}

fn content_tree() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "taxonomies.json", EVENTS.as_bytes());
    write(tmp.path(), "resources/app.js", b"console.log(1)");
    tmp
}

#[test]
fn run_sync_sequences_terms_content_resources() {
    let tmp = content_tree();
    let store = MemoryStore::new(&["category"]);
    let mut content = RecordingContent {
        store: &store,
        calls_before: None,
        term_map: None,
        fail: false,
    };

    let report = wordsync_sync::run_sync(&store, &site(tmp.path()), &mut content, SyncOptions::default())
        .expect("sync");

    let calls = store.calls();
    let at_content = content.calls_before.expect("content phase ran");
    let last_term = calls
        .iter()
        .rposition(|c| matches!(c, Call::NewTerm { .. }))
        .expect("term creates");
    let resources = position(&calls, |c| *c == Call::GetResources);
    assert!(last_term < at_content && at_content <= resources, "calls: {calls:?}");

    let seen = content.term_map.expect("term map");
    assert_eq!(seen, report.term_map);
    assert!(seen.get("category", "events/conferences").is_some());
    assert_eq!(report.resources, vec![ResourceChange::Published("app.js".to_string())]);
    assert_eq!(report.mutations(), 4);
    assert!(report.finished_at >= report.started_at);
}

#[test]
fn failing_phase_stops_the_run() {
    let tmp = content_tree();
    let store = MemoryStore::new(&["category"]);
    let mut content = RecordingContent {
        store: &store,
        calls_before: None,
        term_map: None,
        fail: true,
    };

    let err = wordsync_sync::run_sync(&store, &site(tmp.path()), &mut content, SyncOptions::default())
        .unwrap_err();

    assert!(matches!(err, SyncError::Content(_)));
    assert!(!store.calls().contains(&Call::GetResources));
}

#[test]
fn connection_refused_is_flagged() {
    let tmp = content_tree();
    let store = MemoryStore::new(&["category"]).refusing();

    let err = wordsync_sync::run_sync(&store, &site(tmp.path()), &mut NoContent, SyncOptions::default())
        .unwrap_err();

    assert!(err.is_connection_refused(), "got: {err}");
    assert_eq!(store.calls(), vec![Call::GetTaxonomies]);
}

#[test]
fn dry_run_report_counts_planned_changes() {
    let tmp = content_tree();
    let store = MemoryStore::new(&["category"]);

    let report = wordsync_sync::run_sync(
        &store,
        &site(tmp.path()),
        &mut NoContent,
        SyncOptions { dry_run: true },
    )
    .expect("dry run");

    assert!(report.dry_run);
    assert_eq!(report.mutations(), 4);
    assert!(store.mutations().is_empty());
}
