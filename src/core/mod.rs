pub mod error;
pub mod input;
pub mod types;

pub use error::{ErrorKind, Result, StoreError};
pub use input::{PatchField, PatchInput, TaskInput, TaskPatch};
pub use types::{Task, TaskPriority, TaskStatus, new_task_id, parse_due_date};
