// ============================================================================
// TaskVault Library
// ============================================================================
//
// A single-file task record store. Every mutation snapshots the previous live
// file into a bounded backup set before the file is rewritten, and any
// snapshot can be restored later.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod facade;
pub mod query;
pub mod storage;
pub mod validation;

// Re-export main types for convenience
pub use config::StoreConfig;
pub use core::{
    ErrorKind, PatchField, PatchInput, Result, StoreError, Task, TaskInput, TaskPriority,
    TaskStatus,
};
pub use facade::{HealthReport, RestoreSummary, TaskService, TaskStats};
pub use query::{Pagination, SortField, SortOrder, TaskPage, TaskQuery};
pub use storage::{
    BackupInfo, BackupManager, BulkError, BulkOutcome, FileStats, FileTaskStore, SnapshotId,
    TaskRepository,
};
pub use validation::{validate_input, validate_patch};
