//! Integration tests for the file-backed task store

use std::sync::Arc;
use taskvault::{
    ErrorKind, FileTaskStore, PatchInput, StoreConfig, Task, TaskInput, TaskPriority,
    TaskRepository, TaskStatus,
};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig::new(dir.path()).durable_writes(false)
}

async fn open(dir: &TempDir) -> FileTaskStore {
    FileTaskStore::open(&config(dir)).await.unwrap()
}

#[tokio::test]
async fn test_open_creates_directories_and_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("var").join("tasks");
    let store = FileTaskStore::open(&StoreConfig::new(&nested).durable_writes(false))
        .await
        .unwrap();

    assert!(nested.is_dir());
    assert!(nested.join("backups").is_dir());
    assert!(!store.data_file().exists());
    assert!(assert_ok!(store.load().await).is_empty());
}

#[tokio::test]
async fn test_create_applies_defaults_and_trims() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let task = assert_ok!(store.create(TaskInput::new("  Write docs  ")).await);
    assert_eq!(task.title, "Write docs");
    assert_eq!(task.description, "");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.due_date, None);
    assert_eq!(task.created_at, task.updated_at);

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded, vec![task]);
}

#[tokio::test]
async fn test_create_rejects_invalid_input_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let err = assert_err!(store.create(TaskInput::new("   ")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = assert_err!(store.create(TaskInput::new("ok").status("done")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = assert_err!(store.create(TaskInput::new("ok").due_date("next week")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(!store.data_file().exists());
}

#[tokio::test]
async fn test_update_replaces_fields_and_advances_updated_at() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let created = store
        .create(
            TaskInput::new("Draft")
                .description("first pass")
                .priority("high")
                .due_date("2025-07-20"),
        )
        .await
        .unwrap();

    let updated = assert_ok!(
        store
            .update(&created.id, TaskInput::new("Final").status("completed"))
            .await
    );

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.description, "");
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.due_date, created.due_date);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    assert_eq!(store.get(&created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_patch_changes_only_named_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let created = store
        .create(TaskInput::new("Review").description("PR 42").due_date("2025-07-18"))
        .await
        .unwrap();

    let patched = assert_ok!(
        store
            .patch(
                &created.id,
                PatchInput::new().set("status", "in-progress").set("dueDate", serde_json::Value::Null),
            )
            .await
    );

    assert_eq!(patched.title, "Review");
    assert_eq!(patched.description, "PR 42");
    assert_eq!(patched.status, TaskStatus::InProgress);
    assert_eq!(patched.due_date, None);
    assert!(patched.updated_at >= created.updated_at);
}

#[tokio::test]
async fn test_patch_with_unknown_field_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let created = store.create(TaskInput::new("Keep me")).await.unwrap();
    let before = std::fs::read(store.data_file()).unwrap();
    let backups_before = store.list_backups().await.unwrap().len();

    let err = assert_err!(
        store
            .patch(
                &created.id,
                PatchInput::new().set("title", "Changed").set("createdAt", "2020-01-01"),
            )
            .await
    );
    assert_eq!(err.kind(), ErrorKind::InvalidFieldSet);
    assert!(err.to_string().contains("createdAt"));

    assert_eq!(std::fs::read(store.data_file()).unwrap(), before);
    assert_eq!(store.list_backups().await.unwrap().len(), backups_before);
    assert_eq!(store.get(&created.id).await.unwrap().title, "Keep me");
}

#[tokio::test]
async fn test_delete_returns_removed_task() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let a = store.create(TaskInput::new("a")).await.unwrap();
    let b = store.create(TaskInput::new("b")).await.unwrap();

    let removed = assert_ok!(store.delete(&a.id).await);
    assert_eq!(removed, a);
    assert_eq!(store.load().await.unwrap(), vec![b]);

    let err = assert_err!(store.get(&a.id).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_unknown_id_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    store.create(TaskInput::new("only")).await.unwrap();
    let before = std::fs::read(store.data_file()).unwrap();
    let modified_before = std::fs::metadata(store.data_file()).unwrap().modified().unwrap();
    let backups_before = store.list_backups().await.unwrap();

    let err = assert_err!(store.delete("no-such-id").await);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(std::fs::read(store.data_file()).unwrap(), before);
    assert_eq!(
        std::fs::metadata(store.data_file()).unwrap().modified().unwrap(),
        modified_before
    );
    assert_eq!(store.list_backups().await.unwrap(), backups_before);
}

#[tokio::test]
async fn test_patch_unknown_id_reports_not_found_before_field_set() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;
    store.create(TaskInput::new("present")).await.unwrap();

    let err = assert_err!(
        store
            .patch("missing", PatchInput::new().set("owner", "someone"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cache_tracks_writes_and_idle_loads() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;
    assert_eq!(store.cached().await, None);

    let first = store.create(TaskInput::new("first")).await.unwrap();
    assert_eq!(store.cached().await, Some(vec![first.clone()]));

    let second = store.create(TaskInput::new("second")).await.unwrap();
    assert_eq!(store.cached().await, Some(vec![first.clone(), second.clone()]));

    // an idle store refreshes the cache on load
    std::fs::write(store.data_file(), b"[]").unwrap();
    assert!(store.load().await.unwrap().is_empty());
    assert_eq!(store.cached().await, Some(Vec::new()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_loads_never_leave_a_stale_cache() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(open(&temp_dir).await);

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..200 {
                assert_ok!(store.load().await);
            }
        })
    };
    for i in 0..50 {
        store.create(TaskInput::new(&format!("task {}", i))).await.unwrap();
    }
    reader.await.unwrap();

    // compare against the file itself, without another load
    let live: Vec<Task> =
        serde_json::from_slice(&std::fs::read(store.data_file()).unwrap()).unwrap();
    assert_eq!(live.len(), 50);
    assert_eq!(store.cached().await, Some(live));
}

#[tokio::test]
async fn test_update_and_patch_unknown_id_are_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let err = assert_err!(store.update("missing", TaskInput::new("x")).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = assert_err!(store.patch("missing", PatchInput::new().set("title", "x")).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_decode_failure_keeps_cached_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    let task = store.create(TaskInput::new("cached")).await.unwrap();
    assert_eq!(store.cached().await, Some(vec![task.clone()]));

    std::fs::write(store.data_file(), b"{ not json").unwrap();

    let err = assert_err!(store.load().await);
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(store.cached().await, Some(vec![task]));
}

#[tokio::test]
async fn test_empty_live_file_loads_as_empty_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    std::fs::write(store.data_file(), b"  \n").unwrap();
    assert!(assert_ok!(store.load().await).is_empty());
}

#[tokio::test]
async fn test_live_file_is_pretty_json_array() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    store
        .create(TaskInput::new("Format").status("in-progress").due_date("2025-07-20"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(store.data_file()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &value.as_array().unwrap()[0];
    assert_eq!(record["status"], "in-progress");
    assert_eq!(record["priority"], "medium");
    assert_eq!(record["dueDate"], "2025-07-20");
    assert!(record["createdAt"].is_string());
    assert!(raw.contains('\n'));
    assert!(!temp_dir.path().join("tasks.tmp").exists());
}

#[tokio::test]
async fn test_seed_sample_data_only_into_fresh_store() {
    let temp_dir = TempDir::new().unwrap();
    let seeded = config(&temp_dir).seed_sample_data(true);

    let store = FileTaskStore::open(&seeded).await.unwrap();
    let tasks = store.load().await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().any(|t| t.title == "Code review" && t.status == TaskStatus::InProgress));

    store.create(TaskInput::new("third")).await.unwrap();
    drop(store);

    let reopened = FileTaskStore::open(&seeded).await.unwrap();
    assert_eq!(reopened.load().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_bulk_create_saves_valid_inputs_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;
    store.create(TaskInput::new("existing")).await.unwrap();

    let outcome = assert_ok!(
        store
            .create_many(vec![
                TaskInput::new("one"),
                TaskInput::default(),
                TaskInput::new("bad").priority("urgent"),
                TaskInput::new("two").priority("low"),
            ])
            .await
    );

    assert_eq!(outcome.created.len(), 2);
    let rejected: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
    assert_eq!(rejected, vec![1, 2]);
    assert_eq!(store.load().await.unwrap().len(), 3);
    // one snapshot for the single bulk save
    assert_eq!(store.list_backups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_lose_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(open(&temp_dir).await);
    let num_tasks = 20;

    let mut handles = vec![];
    for i in 0..num_tasks {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create(TaskInput::new(&format!("task {}", i))).await
        }));
    }

    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let tasks = store.load().await.unwrap();
    assert_eq!(tasks.len(), num_tasks);
    for i in 0..num_tasks {
        let title = format!("task {}", i);
        assert!(tasks.iter().any(|t| t.title == title), "missing {}", title);
    }
    assert!(store.list_backups().await.unwrap().len() <= 10);
}

#[tokio::test]
async fn test_file_stats() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir).await;

    assert_eq!(store.file_stats().await.unwrap(), None);

    store.create(TaskInput::new("stat me")).await.unwrap();
    let stats = store.file_stats().await.unwrap().unwrap();
    assert_eq!(stats.size, std::fs::metadata(store.data_file()).unwrap().len());
    assert!(stats.modified.is_some());
}
