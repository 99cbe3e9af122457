// ============================================================================
// src/query/mod.rs - Filter, sort and paginate a task collection
// ============================================================================
//
// Pure functions over a borrowed collection. Nothing here touches the store,
// and the input slice is never reordered.
//
// ============================================================================

pub mod sort;

pub use sort::{SortField, SortOrder, TaskComparator};

use crate::core::{Result, StoreError, Task, TaskPriority, TaskStatus};
use serde::Serialize;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Parameters of a task listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            search: None,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Blank search text is treated as no search; anything else is matched
    /// as given, surrounding whitespace included.
    pub fn search(mut self, text: &str) -> Self {
        self.search = (!text.trim().is_empty()).then(|| text.to_string());
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    /// Page 0 is read as page 1, page size 0 as the default size.
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page.max(1);
        self.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        self
    }

    /// Build a query from string parameters as a request layer receives them.
    ///
    /// Recognised keys: `status`, `priority`, `search`, `sort`, `order`,
    /// `page`, `limit`. Unknown keys are ignored. Unparseable `page`/`limit`
    /// fall back to their defaults; an unknown status, priority or sort field
    /// is a validation error.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        let mut page = DEFAULT_PAGE;
        let mut page_size = DEFAULT_PAGE_SIZE;

        for (key, value) in params {
            match key {
                "status" if !value.is_empty() => query.status = Some(value.parse()?),
                "priority" if !value.is_empty() => query.priority = Some(value.parse()?),
                "search" => query = query.search(value),
                "sort" if !value.is_empty() => query.sort_field = value.parse()?,
                "order" => query.sort_order = SortOrder::from_param(value),
                "page" => page = value.trim().parse().unwrap_or(DEFAULT_PAGE),
                "limit" => page_size = value.trim().parse().unwrap_or(DEFAULT_PAGE_SIZE),
                _ => {}
            }
        }

        Ok(query.page(page, page_size))
    }

    fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

/// One page of a listing plus counts over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

/// Run a query over a collection.
///
/// Out-of-range pages come back empty with the real totals.
pub fn execute(tasks: &[Task], query: &TaskQuery) -> TaskPage {
    let mut matched: Vec<&Task> = tasks.iter().filter(|task| query.matches(task)).collect();
    TaskComparator::new(query.sort_field, query.sort_order).sort(&mut matched);

    let page_size = query.page_size.max(1);
    let page = query.page.max(1);
    let total_items = matched.len();
    let total_pages = total_items.div_ceil(page_size);
    let offset = (page - 1).saturating_mul(page_size);

    let tasks = matched
        .into_iter()
        .skip(offset)
        .take(page_size)
        .cloned()
        .collect();

    TaskPage {
        tasks,
        pagination: Pagination {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: page_size,
        },
    }
}

/// Look up a single task by id.
pub fn find<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|task| task.id == id)
        .ok_or_else(|| StoreError::not_found(format!("Task not found: {}", id)))
}
