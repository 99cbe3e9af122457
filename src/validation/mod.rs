//! Task input validation
//!
//! Checks record field constraints before anything is admitted to the store.
//! Full payloads run through a chain of rules; partial updates are first
//! checked against the allowed field set and then validated field by field.
//! Validation never mutates its input: trimming and defaulting happen in the
//! store once validation has passed.

use crate::core::{
    PatchField, PatchInput, Result, StoreError, TaskInput, TaskPatch, TaskPriority, TaskStatus,
    parse_due_date,
};
use chrono::NaiveDate;
use serde_json::Value;

/// A single check over a full task payload (Chain of Responsibility).
pub trait ValidationRule: Send + Sync {
    fn validate(&self, input: &TaskInput) -> Result<()>;
}

/// Title must be present and non-empty after trimming.
#[derive(Debug, Clone, Default)]
pub struct TitleRequiredRule;

impl ValidationRule for TitleRequiredRule {
    fn validate(&self, input: &TaskInput) -> Result<()> {
        check_title(input.title.as_deref())
    }
}

/// Status, if present, must be one of the enumerated values.
#[derive(Debug, Clone, Default)]
pub struct StatusRule;

impl ValidationRule for StatusRule {
    fn validate(&self, input: &TaskInput) -> Result<()> {
        match &input.status {
            Some(raw) => raw.parse::<TaskStatus>().map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Priority, if present, must be one of the enumerated values.
#[derive(Debug, Clone, Default)]
pub struct PriorityRule;

impl ValidationRule for PriorityRule {
    fn validate(&self, input: &TaskInput) -> Result<()> {
        match &input.priority {
            Some(raw) => raw.parse::<TaskPriority>().map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Due date, if present, must parse as a calendar date.
#[derive(Debug, Clone, Default)]
pub struct DueDateRule;

impl ValidationRule for DueDateRule {
    fn validate(&self, input: &TaskInput) -> Result<()> {
        match &input.due_date {
            Some(Some(raw)) => check_due_date(raw).map(|_| ()),
            _ => Ok(()),
        }
    }
}

/// Runs every registered rule in order, stopping at the first failure.
pub struct TaskValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl TaskValidator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, input: &TaskInput) -> Result<()> {
        for rule in &self.rules {
            rule.validate(input)?;
        }
        Ok(())
    }
}

impl Default for TaskValidator {
    fn default() -> Self {
        Self::new()
            .with_rule(Box::new(TitleRequiredRule))
            .with_rule(Box::new(StatusRule))
            .with_rule(Box::new(PriorityRule))
            .with_rule(Box::new(DueDateRule))
    }
}

/// Typed view of a full payload that passed validation. Text is untrimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Validate a full payload with the default rule chain.
pub fn validate_input(input: &TaskInput) -> Result<ValidatedInput> {
    TaskValidator::default().validate(input)?;

    let due_date = match &input.due_date {
        Some(Some(raw)) => Some(check_due_date(raw)?),
        Some(None) => Some(None),
        None => None,
    };

    Ok(ValidatedInput {
        title: input.title.clone().unwrap_or_default(),
        description: input.description.clone(),
        status: input.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        priority: input.priority.as_deref().map(str::parse::<TaskPriority>).transpose()?,
        due_date,
    })
}

/// Validate a partial update.
///
/// Any field name outside [`PatchField::ALL`] fails the whole patch with
/// `InvalidFieldSet` before values are looked at. Only supplied fields are
/// validated.
pub fn validate_patch(input: &PatchInput) -> Result<TaskPatch> {
    let mut rejected = Vec::new();
    let mut fields = Vec::new();
    for (name, value) in input.fields() {
        match name.parse::<PatchField>() {
            Ok(field) => fields.push((field, value)),
            Err(_) => rejected.push(name.clone()),
        }
    }
    if !rejected.is_empty() {
        return Err(StoreError::InvalidFieldSet(rejected));
    }

    let mut patch = TaskPatch::default();
    for (field, value) in fields {
        match field {
            PatchField::Title => {
                let title = value.as_str();
                check_title(title)?;
                patch.title = title.map(str::to_string);
            }
            PatchField::Description => {
                patch.description = Some(match value {
                    Value::Null => String::new(),
                    Value::String(text) => text.clone(),
                    _ => return Err(StoreError::validation("Description must be text")),
                });
            }
            PatchField::Status => {
                let raw = value.as_str().ok_or_else(|| {
                    StoreError::validation("Status must be pending, in-progress, or completed")
                })?;
                patch.status = Some(raw.parse()?);
            }
            PatchField::Priority => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| StoreError::validation("Priority must be low, medium, or high"))?;
                patch.priority = Some(raw.parse()?);
            }
            PatchField::DueDate => {
                patch.due_date = Some(match value {
                    Value::Null => None,
                    Value::String(raw) => check_due_date(raw)?,
                    _ => return Err(StoreError::validation("Due date must be a valid date")),
                });
            }
        }
    }
    Ok(patch)
}

fn check_title(title: Option<&str>) -> Result<()> {
    match title {
        Some(title) if !title.trim().is_empty() => Ok(()),
        _ => Err(StoreError::validation("Title is required")),
    }
}

// An empty string clears the due date rather than failing.
fn check_due_date(raw: &str) -> Result<Option<NaiveDate>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_due_date(raw)
        .map(Some)
        .ok_or_else(|| StoreError::validation("Due date must be a valid date"))
}
