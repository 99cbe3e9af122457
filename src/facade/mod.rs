pub mod service;
pub mod stats;

pub use service::{HealthReport, RestoreSummary, TaskService};
pub use stats::{ByPriority, TaskStats};
