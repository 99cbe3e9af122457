// ============================================================================
// src/query/sort.rs - Task ordering
// ============================================================================
//
// Timestamp fields compare chronologically, every other field compares as
// its persisted text. Sorting is stable: equal keys keep collection order in
// both directions.
//
// ============================================================================

use crate::core::{Result, StoreError, Task};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 8] = [
        Self::Id,
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::DueDate,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DueDate => "dueDate",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    fn text_key<'a>(&self, task: &'a Task) -> Cow<'a, str> {
        match self {
            Self::Id => Cow::Borrowed(task.id.as_str()),
            Self::Title => Cow::Borrowed(task.title.as_str()),
            Self::Description => Cow::Borrowed(task.description.as_str()),
            Self::Status => Cow::Borrowed(task.status.as_str()),
            Self::Priority => Cow::Borrowed(task.priority.as_str()),
            Self::DueDate => match task.due_date {
                Some(date) => Cow::Owned(date.format("%Y-%m-%d").to_string()),
                None => Cow::Borrowed(""),
            },
            Self::CreatedAt => Cow::Owned(task.created_at.to_rfc3339()),
            Self::UpdatedAt => Cow::Owned(task.updated_at.to_rfc3339()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| StoreError::validation(format!("Cannot sort by '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Lenient parse used for query parameters: only `asc` means ascending.
    pub fn from_param(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(StoreError::validation("Sort order must be asc or desc")),
        }
    }
}

/// Comparator over tasks for a single sort key
pub struct TaskComparator {
    field: SortField,
    order: SortOrder,
}

impl TaskComparator {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            field => field.text_key(a).cmp(&field.text_key(b)),
        };

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Stable in-place sort.
    pub fn sort(&self, tasks: &mut [&Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}
