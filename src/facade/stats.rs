use crate::core::{Task, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ByPriority {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Counts over the whole collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Due strictly before `today` and not completed
    pub overdue: usize,
    pub by_priority: ByPriority,
}

impl TaskStats {
    pub fn collect(tasks: &[Task], today: NaiveDate) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            match task.priority {
                TaskPriority::Low => stats.by_priority.low += 1,
                TaskPriority::Medium => stats.by_priority.medium += 1,
                TaskPriority::High => stats.by_priority.high += 1,
            }
            if task.is_overdue(today) {
                stats.overdue += 1;
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(status: TaskStatus, priority: TaskPriority, due: Option<NaiveDate>) -> Task {
        let now = Utc::now();
        Task {
            id: crate::core::new_task_id(),
            title: "t".to_string(),
            description: String::new(),
            status,
            priority,
            due_date: due,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_collect_counts() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 19).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 7, 18);
        let tasks = vec![
            task(TaskStatus::Pending, TaskPriority::High, yesterday),
            task(TaskStatus::Completed, TaskPriority::High, yesterday),
            task(TaskStatus::InProgress, TaskPriority::Low, Some(today)),
            task(TaskStatus::Pending, TaskPriority::Medium, None),
        ];

        let stats = TaskStats::collect(&tasks, today);
        assert_eq!(stats.total, 4);
        assert_eq!((stats.pending, stats.in_progress, stats.completed), (2, 1, 1));
        assert_eq!(stats.overdue, 1);
        assert_eq!(
            stats.by_priority,
            ByPriority { low: 1, medium: 1, high: 2 }
        );
    }

    #[test]
    fn test_empty_collection() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(TaskStats::collect(&[], today), TaskStats::default());
    }
}
