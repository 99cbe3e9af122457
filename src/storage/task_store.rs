//! File-backed task store.
//!
//! Every operation re-reads the live file so it observes the latest durable
//! state. Writes run a load-mutate-save cycle inside one write section per
//! store instance, so concurrent writers never lose each other's updates.
//! The live file is replaced through a temp file + rename, which keeps
//! readers (who do not take the section) from ever seeing a partial file.

use crate::config::StoreConfig;
use crate::core::{
    PatchInput, Result, StoreError, Task, TaskInput, TaskPriority, TaskStatus, new_task_id,
};
use crate::query;
use crate::storage::backup::{BackupInfo, BackupManager};
use crate::storage::codec;
use crate::validation::{ValidatedInput, validate_input, validate_patch};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

// ============================================================================
// Repository seam
// ============================================================================

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<Task>>;
    async fn save(&self, tasks: Vec<Task>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Task>;
    async fn create(&self, input: TaskInput) -> Result<Task>;
    async fn create_many(&self, inputs: Vec<TaskInput>) -> Result<BulkOutcome>;
    async fn update(&self, id: &str, input: TaskInput) -> Result<Task>;
    async fn patch(&self, id: &str, input: PatchInput) -> Result<Task>;
    async fn delete(&self, id: &str) -> Result<Task>;
    async fn list_backups(&self) -> Result<Vec<BackupInfo>>;
    async fn restore_from(&self, snapshot_id: &str) -> Result<usize>;
    async fn file_stats(&self) -> Result<Option<FileStats>>;
    fn data_file(&self) -> &Path;
}

/// Size and times of the live data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

/// Result of a bulk create: what was stored, and which inputs were refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub created: Vec<Task>,
    pub errors: Vec<BulkError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkError {
    pub index: usize,
    pub error: String,
}

// ============================================================================
// FileTaskStore
// ============================================================================

pub struct FileTaskStore {
    data_file: PathBuf,
    backups: BackupManager,
    durable: bool,
    /// Held across every load-mutate-save cycle.
    write_section: Mutex<()>,
    /// Last collection known to match the live file. Only written while the
    /// write section is held.
    cache: RwLock<Option<Vec<Task>>>,
}

impl FileTaskStore {
    /// Open a store, creating the data and backup directories.
    ///
    /// Failing to create the directories is the one unrecoverable error.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir).await.map_err(|err| {
            StoreError::storage(format!(
                "create data directory '{}': {}",
                config.data_dir.display(),
                err
            ))
        })?;

        let backups = BackupManager::new(config.backup_dir_path(), config.backup_retention)
            .durable(config.durable_writes);
        backups.ensure_dir().await?;

        let store = Self {
            data_file: config.data_file_path(),
            backups,
            durable: config.durable_writes,
            write_section: Mutex::new(()),
            cache: RwLock::new(None),
        };

        if config.seed_sample_data && !fs::try_exists(&store.data_file).await? {
            let samples = sample_tasks(Utc::now());
            info!(count = samples.len(), "seeding sample tasks");
            store.save(samples).await?;
        }

        info!(path = %store.data_file.display(), "task store opened");
        Ok(store)
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Collection from the last successful load or save, if any.
    pub async fn cached(&self) -> Option<Vec<Task>> {
        self.cache.read().await.clone()
    }

    async fn read_file(&self) -> Result<Vec<Task>> {
        let bytes = match fs::read(&self.data_file).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(StoreError::storage(format!(
                    "read '{}': {}",
                    self.data_file.display(),
                    err
                )));
            }
        };
        codec::decode(&bytes)
    }

    /// Read the live file and refresh the cache. The guard proves no writer
    /// can replace the file between the read and the cache update.
    async fn read_in_section(&self, _section: &MutexGuard<'_, ()>) -> Result<Vec<Task>> {
        let tasks = self.read_file().await?;
        *self.cache.write().await = Some(tasks.clone());
        Ok(tasks)
    }

    /// Snapshot, overwrite, prune. Callers must hold the write section.
    async fn persist(&self, tasks: Vec<Task>) -> Result<()> {
        self.backups.snapshot(&self.data_file).await.map_err(|err| {
            StoreError::storage(format!("backup before save failed, live file untouched: {}", err))
        })?;

        let bytes = codec::encode(&tasks)?;
        self.write_atomically(&bytes).await?;
        *self.cache.write().await = Some(tasks);

        self.backups.prune_default().await;
        Ok(())
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        let tmp_path = self.data_file.with_extension("tmp");
        let write = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            if self.durable {
                file.sync_all().await?;
            }
            drop(file);
            fs::rename(&tmp_path, &self.data_file).await
        };

        if let Err(err) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::storage(format!(
                "write '{}': {}",
                self.data_file.display(),
                err
            )));
        }
        Ok(())
    }

    fn position(tasks: &[Task], id: &str) -> Result<usize> {
        tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| StoreError::not_found(format!("Task not found: {}", id)))
    }

    fn unique_id(tasks: &[Task]) -> String {
        loop {
            let id = new_task_id();
            if !tasks.iter().any(|task| task.id == id) {
                return id;
            }
        }
    }

    fn build_task(tasks: &[Task], input: ValidatedInput, now: DateTime<Utc>) -> Task {
        Task {
            id: Self::unique_id(tasks),
            title: input.title.trim().to_string(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date.flatten(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    /// Read and decode the live file. On a decode failure the cached
    /// collection is left as it was.
    ///
    /// Never waits for a writer: the cache is refreshed only when the write
    /// section happens to be free.
    async fn load(&self) -> Result<Vec<Task>> {
        match self.write_section.try_lock() {
            Ok(section) => self.read_in_section(&section).await,
            Err(_) => self.read_file().await,
        }
    }

    async fn save(&self, tasks: Vec<Task>) -> Result<()> {
        let _section = self.write_section.lock().await;
        self.persist(tasks).await
    }

    async fn get(&self, id: &str) -> Result<Task> {
        let tasks = self.read_file().await?;
        query::find(&tasks, id).cloned()
    }

    async fn create(&self, input: TaskInput) -> Result<Task> {
        let validated = validate_input(&input)?;

        let section = self.write_section.lock().await;
        let mut tasks = self.read_in_section(&section).await?;
        let task = Self::build_task(&tasks, validated, Utc::now());
        tasks.push(task.clone());
        self.persist(tasks).await?;

        debug!(id = %task.id, "created task");
        Ok(task)
    }

    async fn create_many(&self, inputs: Vec<TaskInput>) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        let mut accepted = Vec::new();
        for (index, input) in inputs.iter().enumerate() {
            match validate_input(input) {
                Ok(validated) => accepted.push(validated),
                Err(err) => outcome.errors.push(BulkError {
                    index,
                    error: err.to_string(),
                }),
            }
        }
        if accepted.is_empty() {
            return Ok(outcome);
        }

        let section = self.write_section.lock().await;
        let mut tasks = self.read_in_section(&section).await?;
        let now = Utc::now();
        for validated in accepted {
            let task = Self::build_task(&tasks, validated, now);
            tasks.push(task.clone());
            outcome.created.push(task);
        }
        self.persist(tasks).await?;

        debug!(
            created = outcome.created.len(),
            rejected = outcome.errors.len(),
            "bulk created tasks"
        );
        Ok(outcome)
    }

    /// Replace the mutable fields of an existing task.
    ///
    /// Title and description are always replaced; status, priority and due
    /// date keep their current value when the input leaves them out.
    async fn update(&self, id: &str, input: TaskInput) -> Result<Task> {
        let validated = validate_input(&input)?;

        let section = self.write_section.lock().await;
        let mut tasks = self.read_in_section(&section).await?;
        let index = Self::position(&tasks, id)?;

        let task = &mut tasks[index];
        task.title = validated.title.trim().to_string();
        task.description = validated
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if let Some(status) = validated.status {
            task.status = status;
        }
        if let Some(priority) = validated.priority {
            task.priority = priority;
        }
        if let Some(due_date) = validated.due_date {
            task.due_date = due_date;
        }
        task.touch(Utc::now());

        let updated = task.clone();
        self.persist(tasks).await?;
        debug!(id = %updated.id, "replaced task");
        Ok(updated)
    }

    /// A missing id is reported before the field set is checked.
    async fn patch(&self, id: &str, input: PatchInput) -> Result<Task> {
        let section = self.write_section.lock().await;
        let mut tasks = self.read_in_section(&section).await?;
        let index = Self::position(&tasks, id)?;
        let patch = validate_patch(&input)?;

        let task = &mut tasks[index];
        patch.apply(task);
        task.touch(Utc::now());

        let updated = task.clone();
        self.persist(tasks).await?;
        debug!(id = %updated.id, "patched task");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<Task> {
        let section = self.write_section.lock().await;
        let mut tasks = self.read_in_section(&section).await?;
        let index = Self::position(&tasks, id)?;
        let removed = tasks.remove(index);
        self.persist(tasks).await?;

        debug!(id = %removed.id, "deleted task");
        Ok(removed)
    }

    async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        self.backups.list().await
    }

    /// Replace the live collection with a snapshot's content.
    ///
    /// The pre-restore state is itself snapshotted first, so a restore can be
    /// undone by restoring that newer snapshot.
    async fn restore_from(&self, snapshot_id: &str) -> Result<usize> {
        let _section = self.write_section.lock().await;
        let tasks = self.backups.restore(snapshot_id).await?;
        let count = tasks.len();
        self.persist(tasks).await?;

        info!(snapshot = %snapshot_id, tasks = count, "restored backup");
        Ok(count)
    }

    async fn file_stats(&self) -> Result<Option<FileStats>> {
        let meta = match fs::metadata(&self.data_file).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(FileStats {
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            created: meta.created().ok().map(DateTime::<Utc>::from),
        }))
    }

    fn data_file(&self) -> &Path {
        &self.data_file
    }
}

fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    vec![
        Task {
            id: new_task_id(),
            title: "Complete project documentation".to_string(),
            description: "Write comprehensive documentation for the task manager API".to_string(),
            status: TaskStatus::Pending,
            priority: TaskPriority::High,
            due_date: NaiveDate::from_ymd_opt(2025, 7, 20),
            created_at: now,
            updated_at: now,
        },
        Task {
            id: new_task_id(),
            title: "Code review".to_string(),
            description: "Review pull requests from team members".to_string(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::Medium,
            due_date: NaiveDate::from_ymd_opt(2025, 7, 18),
            created_at: now,
            updated_at: now,
        },
    ]
}
