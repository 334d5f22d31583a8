use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use super::*;

const PAGE_SIZE: usize = 2;

/// In-memory store that pages its index and records every call.
#[derive(Default)]
struct FakeStore {
    notes: Mutex<BTreeMap<String, Note>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
    created: Mutex<u64>,
}

impl FakeStore {
    fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let store = Self::default();
        for note in notes {
            store.put(note);
        }
        store
    }

    fn put(&self, note: Note) {
        self.notes.lock().unwrap().insert(note.key.clone(), note);
    }

    fn get(&self, key: &str) -> Note {
        self.notes.lock().unwrap()[key].clone()
    }

    fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("upsert:") || call.starts_with("trash:"))
            .collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteStore for FakeStore {
    async fn fetch_index_page(&self, mark: Option<&str>) -> Result<Index> {
        self.log(format!("index:{}", mark.unwrap_or("")));
        let notes = self.notes.lock().unwrap();
        let start = mark.and_then(|mark| mark.parse::<usize>().ok()).unwrap_or(0);
        let data: Vec<Note> = notes
            .values()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|note| Note {
                content: String::new(),
                ..note.clone()
            })
            .collect();
        let end = start + data.len();
        Ok(Index {
            count: data.len() as u64,
            data,
            time: "1000.000000".to_string(),
            mark: if end < notes.len() {
                end.to_string()
            } else {
                String::new()
            },
        })
    }

    async fn fetch_note(&self, key: &str, _version: Option<u64>) -> Result<Note> {
        self.log(format!("fetch:{key}"));
        if self.failing.lock().unwrap().contains(key) {
            return Err(Error::Remote {
                operation: "fetch_note",
                key: Some(key.to_string()),
                status: 500,
                message: "internal error".to_string(),
            });
        }
        self.notes
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn upsert_note(&self, note: &Note) -> Result<Note> {
        let mut saved = note.clone();
        if saved.key.is_empty() {
            let mut created = self.created.lock().unwrap();
            *created += 1;
            saved.key = format!("new-{created}");
        }
        self.log(format!("upsert:{}", saved.key));

        let mut notes = self.notes.lock().unwrap();
        saved.version = notes.get(&saved.key).map_or(0, |existing| existing.version) + 1;
        notes.insert(saved.key.clone(), saved.clone());
        Ok(saved)
    }

    async fn trash_note(&self, note: &Note) -> Result<Note> {
        self.log(format!("trash:{}", note.key));
        let mut notes = self.notes.lock().unwrap();
        let stored = notes
            .get_mut(&note.key)
            .ok_or_else(|| Error::NotFound(note.key.clone()))?;
        stored.deleted = 1;
        Ok(stored.clone())
    }
}

fn note(key: &str, content: &str, modify_date: &str) -> Note {
    Note {
        key: key.to_string(),
        content: content.to_string(),
        tags: vec!["work".to_string()],
        modify_date: modify_date.to_string(),
        version: 1,
        ..Note::default()
    }
}

fn at(seconds: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(seconds)
}

fn engine(tmp: &TempDir, store: FakeStore) -> SyncEngine<FakeStore> {
    let mirror = Mirror::open(tmp.path().join("notes")).unwrap();
    SyncEngine::new(
        mirror,
        store,
        EngineConfig::new().with_index_cooldown(Duration::ZERO),
    )
}

/// Engine whose mirror already holds note `a` synced at t=100.
async fn synced_engine(tmp: &TempDir) -> SyncEngine<FakeStore> {
    let mut engine = engine(tmp, FakeStore::with_notes([note("a", "alpha", "100.000000")]));
    engine.sync_all(false).await.unwrap();
    engine.remote().clear_calls();
    engine
}

#[tokio::test]
async fn sync_all_materializes_new_remote_notes() {
    let tmp = tempdir().unwrap();
    let store = FakeStore::with_notes([
        note("a", "alpha", "100.000000"),
        note("b", "bravo", "101.000000"),
        note("c", "charlie", "102.500000"),
    ]);
    let mut engine = engine(&tmp, store);

    let report = engine.sync_all(false).await.unwrap();

    assert_eq!(report.materialized, vec!["a", "b", "c"]);
    assert!(report.is_clean());
    let record = engine.mirror().read("c").unwrap();
    assert_eq!(record.content, "charlie");
    assert_eq!(record.modify_date, "102.500000");
    assert_eq!(record.content_mod_time, UNIX_EPOCH + Duration::from_millis(102_500));
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn tombstoned_remote_note_is_never_materialized() {
    let tmp = tempdir().unwrap();
    let mut trashed = note("gone", "bye", "100.000000");
    trashed.deleted = 1;
    let mut engine = engine(&tmp, FakeStore::with_notes([trashed]));

    let report = engine.sync_all(false).await.unwrap();

    assert_eq!(report.skipped, 1);
    assert!(!engine.mirror().contains("gone"));
    assert_eq!(engine.remote().calls(), vec!["index:"]);
}

#[tokio::test]
async fn tombstone_removes_local_entry_despite_pending_edit() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "edited offline", at(500));

    let mut trashed = note("a", "alpha", "150.000000");
    trashed.deleted = 1;
    engine.remote().put(trashed);

    let report = engine.sync_all(true).await.unwrap();

    assert_eq!(report.removed, vec!["a"]);
    assert!(!engine.mirror().contains("a"));
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn second_sync_all_after_push_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "edited locally", at(300));

    let first = engine.sync_all(false).await.unwrap();
    assert_eq!(first.pushed, vec!["a"]);
    assert_eq!(engine.remote().get("a").content, "edited locally");

    engine.remote().clear_calls();
    let second = engine.sync_all(false).await.unwrap();

    assert!(second.is_quiet());
    assert_eq!(second.unchanged, 1);
    assert_eq!(engine.remote().calls(), vec!["index:"]);
}

#[tokio::test]
async fn agreeing_clocks_skip_the_note_fetch() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;

    let report = engine.sync_all(false).await.unwrap();

    assert_eq!(report.unchanged, 1);
    assert_eq!(engine.remote().calls(), vec!["index:"]);
}

#[tokio::test]
async fn sync_note_pulls_newer_remote_when_nothing_local_changed() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.remote().put(note("a", "remote edit", "200.500000"));

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Pulled);
    let record = engine.mirror().read("a").unwrap();
    assert_eq!(record.content, "remote edit");
    assert_eq!(record.content_mod_time, UNIX_EPOCH + Duration::from_millis(200_500));
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn prefer_local_pushes_even_when_remote_is_newer() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "local wins", at(200));
    engine.remote().put(note("a", "remote edit", "300.000000"));

    let outcome = engine.sync_note("a", true).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Pushed);
    assert_eq!(engine.remote().get("a").content, "local wins");
    let record = engine.mirror().read("a").unwrap();
    assert_eq!(record.content, "local wins");
    assert_eq!(record.modify_date, "200.000000");
    assert!(!record.is_locally_edited().unwrap());
}

#[tokio::test]
async fn newer_local_edit_is_pushed_without_prefer_local() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.remote().put(note("a", "remote edit", "200.000000"));
    engine.mirror().edit_content("a", "later local edit", at(300));

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Pushed);
    assert_eq!(engine.remote().get("a").content, "later local edit");
    assert_eq!(engine.remote().mutations(), vec!["upsert:a"]);
}

#[tokio::test]
async fn newer_remote_edit_wins_without_prefer_local() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "local edit", at(200));
    engine.remote().put(note("a", "later remote edit", "300.000000"));

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Pulled);
    let record = engine.mirror().read("a").unwrap();
    assert_eq!(record.content, "later remote edit");
    assert_eq!(record.content_mod_time, at(300));
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn tag_change_alone_is_pushed() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    let dir = engine.mirror().note_dir("a").unwrap();
    fs::write(dir.join(crate::mirror::TAGS_FILE), "work\nurgent\n").unwrap();
    engine.mirror().edit_content("a", "alpha", at(200));

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Pushed);
    assert_eq!(
        engine.remote().get("a").tags,
        vec!["work".to_string(), "urgent".to_string()]
    );
}

#[tokio::test]
async fn touched_but_identical_note_is_only_restamped() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "alpha", at(200));

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Restamped);
    assert!(engine.remote().mutations().is_empty());
    let record = engine.mirror().read("a").unwrap();
    assert_eq!(record.modify_date, "200.000000");
    assert!(!record.is_locally_edited().unwrap());
}

#[tokio::test]
async fn touched_note_is_pushed_when_remote_clock_moved() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "alpha", at(200));
    engine.remote().put(note("a", "alpha", "300.000000"));

    let first = engine.sync_all(true).await.unwrap();

    assert_eq!(first.pushed, vec!["a"]);
    assert!(first.restamped.is_empty());
    assert_eq!(engine.remote().get("a").modify_date, "200.000000");

    engine.remote().clear_calls();
    let second = engine.sync_all(true).await.unwrap();

    assert!(second.is_quiet());
    assert_eq!(engine.remote().calls(), vec!["index:"]);
}

#[tokio::test]
async fn second_sync_all_after_prefer_local_push_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "local wins", at(200));
    engine.remote().put(note("a", "remote edit", "300.000000"));

    let first = engine.sync_all(true).await.unwrap();
    assert_eq!(first.pushed, vec!["a"]);

    engine.remote().clear_calls();
    let second = engine.sync_all(true).await.unwrap();

    assert!(second.is_quiet());
    assert_eq!(second.unchanged, 1);
    assert_eq!(engine.mirror().read("a").unwrap().content, "local wins");
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn second_sync_all_after_pull_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.remote().put(note("a", "remote edit", "250.000000"));

    let first = engine.sync_all(false).await.unwrap();
    assert_eq!(first.pulled, vec!["a"]);

    engine.remote().clear_calls();
    let second = engine.sync_all(false).await.unwrap();

    assert!(second.is_quiet());
    assert_eq!(second.unchanged, 1);
    assert_eq!(engine.remote().calls(), vec!["index:"]);
}

#[tokio::test]
async fn second_sync_all_after_restamp_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "alpha", at(200));

    let first = engine.sync_all(false).await.unwrap();
    assert_eq!(first.restamped, vec!["a"]);

    engine.remote().clear_calls();
    let second = engine.sync_all(false).await.unwrap();

    assert!(second.is_quiet());
    assert_eq!(second.unchanged, 1);
    assert!(engine.remote().mutations().is_empty());
}

#[tokio::test]
async fn sync_note_leaves_agreeing_sides_alone() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;

    let outcome = engine.sync_note("a", false).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Unchanged);
    assert_eq!(engine.remote().calls(), vec!["fetch:a"]);
}

#[tokio::test]
async fn sync_note_removes_entry_trashed_remotely() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    let mut trashed = note("a", "alpha", "100.000000");
    trashed.deleted = 1;
    engine.remote().put(trashed);

    let outcome = engine.sync_note("a", true).await.unwrap();

    assert_eq!(outcome, NoteOutcome::Removed);
    assert!(!engine.mirror().contains("a"));
}

#[tokio::test]
async fn sync_note_requires_a_mirror_entry() {
    let tmp = tempdir().unwrap();
    let mut engine = engine(&tmp, FakeStore::with_notes([note("a", "alpha", "1.000000")]));

    let error = engine.sync_note("a", false).await.unwrap_err();

    assert!(error.is_not_found());
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn failing_note_is_reported_and_the_pass_continues() {
    let tmp = tempdir().unwrap();
    let store = FakeStore::with_notes([
        note("a", "alpha", "100.000000"),
        note("b", "bravo", "100.000000"),
        note("c", "charlie", "100.000000"),
    ]);
    store.fail_on("b");
    let mut engine = engine(&tmp, store);

    let report = engine.sync_all(false).await.unwrap();

    assert_eq!(report.materialized, vec!["a", "c"]);
    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "b");
    assert!(report.failures[0].error.is_remote());
    assert!(!engine.mirror().contains("b"));
}

#[tokio::test]
async fn local_only_entries_are_not_pushed() {
    let tmp = tempdir().unwrap();
    let mut engine = engine(&tmp, FakeStore::default());
    engine
        .mirror()
        .write(&note("offline", "written offline", "100.000000"), true)
        .unwrap();
    engine.mirror().edit_content("offline", "still offline", at(200));

    let report = engine.sync_all(true).await.unwrap();

    assert!(report.is_quiet());
    assert!(engine.remote().mutations().is_empty());
    assert_eq!(engine.mirror().read("offline").unwrap().content, "still offline");
}

#[tokio::test]
async fn incomplete_entry_is_materialized_again() {
    let tmp = tempdir().unwrap();
    let mut engine = engine(&tmp, FakeStore::with_notes([note("a", "alpha", "100.000000")]));
    fs::create_dir(engine.mirror().note_dir("a").unwrap()).unwrap();

    let report = engine.sync_all(false).await.unwrap();

    assert_eq!(report.materialized, vec!["a"]);
    assert_eq!(engine.mirror().read("a").unwrap().content, "alpha");
}

#[tokio::test]
async fn clone_all_writes_every_live_note() {
    let tmp = tempdir().unwrap();
    let mut trashed = note("b", "bravo", "100.000000");
    trashed.deleted = 1;
    let store = FakeStore::with_notes([
        note("a", "alpha", "100.000000"),
        trashed,
        note("c", "charlie", "100.000000"),
    ]);
    let mut engine = engine(&tmp, store);

    let report = engine.clone_all(false).await.unwrap();

    assert_eq!(report.materialized, vec!["a", "c"]);
    assert_eq!(report.skipped, 1);
    assert_eq!(engine.mirror().list().unwrap(), vec!["a", "c"]);
}

#[tokio::test]
async fn clone_all_keeps_newer_local_edit_unless_overwriting() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;
    engine.mirror().edit_content("a", "local edit", at(200));

    let report = engine.clone_all(false).await.unwrap();
    assert!(report.failures[0].error.is_conflict());
    assert_eq!(engine.mirror().read("a").unwrap().content, "local edit");

    let report = engine.clone_all(true).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(engine.mirror().read("a").unwrap().content, "alpha");
}

#[tokio::test]
async fn push_new_creates_remote_note_and_mirror_entry() {
    let tmp = tempdir().unwrap();
    let mut engine = engine(&tmp, FakeStore::default());

    let saved = engine
        .push_new("Hello\nworld", vec!["inbox".to_string()])
        .await
        .unwrap();

    assert_eq!(saved.key, "new-1");
    assert_eq!(engine.remote().get("new-1").content, "Hello\nworld");
    let record = engine.mirror().read("new-1").unwrap();
    assert_eq!(record.content, "Hello\nworld");
    assert_eq!(record.tags, vec!["inbox".to_string()]);
    assert_eq!(record.modify_date, saved.modify_date);
    assert!(!record.is_locally_edited().unwrap());
}

#[tokio::test]
async fn trash_marks_remote_and_removes_entry() {
    let tmp = tempdir().unwrap();
    let mut engine = synced_engine(&tmp).await;

    let trashed = engine.trash("a").await.unwrap();

    assert!(trashed.is_deleted());
    assert!(engine.remote().get("a").is_deleted());
    assert!(!engine.mirror().contains("a"));
    assert_eq!(engine.remote().calls(), vec!["fetch:a", "trash:a"]);
}

#[tokio::test]
async fn index_listing_waits_out_cooldown_after_a_write() {
    let tmp = tempdir().unwrap();
    let cooldown = Duration::from_millis(200);
    let mut engine = SyncEngine::new(
        Mirror::open(tmp.path()).unwrap(),
        FakeStore::default(),
        EngineConfig::new().with_index_cooldown(cooldown),
    );

    let started = Instant::now();
    engine.push_new("fresh", Vec::new()).await.unwrap();
    engine.sync_all(false).await.unwrap();

    assert!(started.elapsed() >= cooldown);
}
