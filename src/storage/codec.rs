//! Record codec: the whole task collection as one JSON document.

use crate::core::{Result, StoreError, Task};
use std::collections::HashSet;

/// Decode a full collection. An empty (or whitespace-only) blob is an empty
/// collection; anything else that is not a valid task array is a `Decode` error.
/// A collection with a repeated id, or a record updated before it was created,
/// is rejected as well.
pub fn decode(blob: &[u8]) -> Result<Vec<Task>> {
    if blob.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let tasks = serde_json::from_slice::<Vec<Task>>(blob)
        .map_err(|err| StoreError::decode(format!("parse task collection: {}", err)))?;
    check_records(&tasks)?;
    Ok(tasks)
}

fn check_records(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(StoreError::decode(format!("duplicate task id '{}'", task.id)));
        }
        if task.updated_at < task.created_at {
            return Err(StoreError::decode(format!(
                "task '{}' updated before it was created",
                task.id
            )));
        }
    }
    Ok(())
}

/// Encode a full collection, preserving record order.
pub fn encode(tasks: &[Task]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(tasks)
        .map_err(|err| StoreError::storage(format!("serialize task collection: {}", err)))
}
