//! Caller-supplied payloads for writes.
//!
//! Payloads carry raw strings so the validation layer can reject values
//! outside the enumerated sets before anything is admitted to the store.

use crate::core::{Result, StoreError, Task, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Full task payload used by create, replace and bulk create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// `None` = not supplied, `Some(None)` = explicitly cleared.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub due_date: Option<Option<String>>,
}

impl TaskInput {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn priority(mut self, priority: &str) -> Self {
        self.priority = Some(priority.to_string());
        self
    }

    pub fn due_date(mut self, due_date: &str) -> Self {
        self.due_date = Some(Some(due_date.to_string()));
        self
    }

    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ============================================================================
// Partial updates
// ============================================================================

/// The only fields a partial update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchField {
    Title,
    Description,
    Status,
    Priority,
    DueDate,
}

impl PatchField {
    pub const ALL: [PatchField; 5] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::DueDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DueDate => "dueDate",
        }
    }
}

impl fmt::Display for PatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| StoreError::InvalidFieldSet(vec![s.to_string()]))
    }
}

/// Raw partial update as received from a caller: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchInput(Map<String, Value>);

impl PatchInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PatchInput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A validated partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Merge onto `task`, trimming text fields. Timestamps are left to the caller.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.trim().to_string();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_input_distinguishes_null_and_missing_due_date() {
        let missing: TaskInput = serde_json::from_str(r#"{"title":"a"}"#).unwrap();
        assert_eq!(missing.due_date, None);

        let cleared: TaskInput = serde_json::from_str(r#"{"title":"a","dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: TaskInput =
            serde_json::from_str(r#"{"title":"a","dueDate":"2025-07-20"}"#).unwrap();
        assert_eq!(set.due_date, Some(Some("2025-07-20".to_string())));
    }

    #[test]
    fn test_patch_field_names() {
        assert_eq!("dueDate".parse::<PatchField>().unwrap(), PatchField::DueDate);
        let err = "createdAt".parse::<PatchField>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidFieldSet(names) if names == ["createdAt"]));
    }

    #[test]
    fn test_patch_input_is_transparent_map() {
        let patch: PatchInput = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(patch, PatchInput::new().set("status", "completed"));
    }
}
