pub mod backup;
pub mod codec;
pub mod retention;
pub mod task_store;

pub use backup::{BackupInfo, BackupManager, SnapshotId};
pub use retention::RetentionSet;
pub use task_store::{BulkError, BulkOutcome, FileStats, FileTaskStore, TaskRepository};
