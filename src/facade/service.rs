// ============================================================================
// src/facade/service.rs - Boundary operations over a task repository
// ============================================================================

use crate::config::StoreConfig;
use crate::core::{PatchInput, Result, Task, TaskInput};
use crate::facade::stats::TaskStats;
use crate::query::{self, TaskPage, TaskQuery};
use crate::storage::{BackupInfo, BulkOutcome, FileStats, FileTaskStore, TaskRepository};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Result of restoring a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub tasks_count: usize,
}

/// Liveness report with the live file's metadata, if the file exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub checked_at: DateTime<Utc>,
    pub data_file: PathBuf,
    pub file: Option<FileStats>,
}

/// Entry point for callers of the store.
///
/// Cheap to clone; clones share the same repository and therefore the same
/// write section.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// Open a file-backed store and wrap it.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let store = FileTaskStore::open(config).await?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repo
    }

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage> {
        let tasks = self.repo.load().await?;
        let page = query::execute(&tasks, query);
        debug!(
            returned = page.tasks.len(),
            total = page.pagination.total_items,
            "listed tasks"
        );
        Ok(page)
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        self.repo.get(id).await
    }

    pub async fn create_task(&self, input: TaskInput) -> Result<Task> {
        self.repo.create(input).await
    }

    pub async fn replace_task(&self, id: &str, input: TaskInput) -> Result<Task> {
        self.repo.update(id, input).await
    }

    pub async fn patch_task(&self, id: &str, input: PatchInput) -> Result<Task> {
        self.repo.patch(id, input).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<Task> {
        self.repo.delete(id).await
    }

    /// Validate each input on its own and store all valid ones in one save.
    pub async fn bulk_create(&self, inputs: Vec<TaskInput>) -> Result<BulkOutcome> {
        self.repo.create_many(inputs).await
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        self.repo.list_backups().await
    }

    pub async fn restore_backup(&self, snapshot_id: &str) -> Result<RestoreSummary> {
        let tasks_count = self.repo.restore_from(snapshot_id).await?;
        Ok(RestoreSummary { tasks_count })
    }

    pub async fn health_stats(&self) -> Result<HealthReport> {
        Ok(HealthReport {
            status: "OK",
            checked_at: Utc::now(),
            data_file: self.repo.data_file().to_path_buf(),
            file: self.repo.file_stats().await?,
        })
    }

    pub async fn stats(&self) -> Result<TaskStats> {
        let tasks = self.repo.load().await?;
        Ok(TaskStats::collect(&tasks, Utc::now().date_naive()))
    }
}
