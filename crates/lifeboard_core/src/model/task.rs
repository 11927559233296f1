//! Task domain model.
//!
//! # Responsibility
//! - Define the task node and hierarchy edge records read from the store snapshot.
//! - Provide validation helpers for data-quality diagnostics.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `recurrence_pattern` is present iff `task_type != TaskType::OneTime`.
//! - `recurring_completions` holds at most one record per calendar date.
//! - `importance`/`urgency` are stored on the logarithmic 0..=10 scale.
//!
//! # See also
//! - crate::priority::scale for the linear/log conversion.

use crate::model::recurrence::{RecurrenceSpec, RecurringCompletion};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a task node as issued by the external store.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = String;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Pending,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Completed,
}

impl TaskStatus {
    /// Stable wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Parses one status from its wire string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in-progress" | "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling category of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Done once, no recurrence.
    #[default]
    OneTime,
    /// Repeats on a pattern; no streak tracking.
    Recurring,
    /// Repeats on a pattern and tracks streaks.
    Habit,
}

/// Completion rule a parent applies to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubtaskLogic {
    /// Every required child must be completed.
    #[default]
    #[serde(rename = "AND")]
    And,
    /// Any required child being completed is enough.
    #[serde(rename = "OR")]
    Or,
}

impl SubtaskLogic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// One task as read from the store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    /// Stable store id.
    pub id: TaskId,
    /// User-facing label.
    #[serde(default)]
    pub label: String,
    /// Log-scale importance (0..=10), `None` when never scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    /// Log-scale urgency (0..=10), `None` when never scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<f64>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub task_type: TaskType,
    /// Raw pattern as stored. Parsed lazily so a bad pattern stays inert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrenceSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurring_completions: Vec<RecurringCompletion>,
    /// Cached streak value, habit-only.
    #[serde(default)]
    pub current_streak: u32,
    /// Cached streak value, habit-only.
    #[serde(default)]
    pub longest_streak: u32,
    /// Excluded from parent completion requirements.
    #[serde(default)]
    pub is_optional: bool,
    /// Hint that completing this child should complete its parent (OR logic).
    #[serde(default)]
    pub auto_complete_parent: bool,
    /// Rule applied to this node's children. `None` means not chosen explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_logic: Option<SubtaskLogic>,
    /// Creation instant, used as recurrence epoch fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskNode {
    /// Creates a one-time pending task with a generated stable ID.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), label)
    }

    /// Creates a one-time pending task with a caller-provided ID.
    ///
    /// Used by snapshot import paths where identity already exists in the store.
    pub fn with_id(id: impl Into<TaskId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            importance: None,
            urgency: None,
            status: TaskStatus::Pending,
            task_type: TaskType::OneTime,
            recurrence_pattern: None,
            recurring_completions: Vec::new(),
            current_streak: 0,
            longest_streak: 0,
            is_optional: false,
            auto_complete_parent: false,
            subtask_logic: None,
            created_at: None,
        }
    }

    /// Returns whether this task is completed.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Returns whether this task repeats (`recurring` or `habit`).
    pub fn is_recurring(&self) -> bool {
        matches!(self.task_type, TaskType::Recurring | TaskType::Habit)
    }

    /// Returns whether a completion record exists for `date`.
    pub fn has_completion_on(&self, date: NaiveDate) -> bool {
        self.recurring_completions
            .iter()
            .any(|completion| completion.date == date)
    }

    /// Validates task invariants.
    ///
    /// # Errors
    /// - Returns the first violated invariant, checked in declaration order.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::BlankId);
        }
        for (field, value) in [("importance", self.importance), ("urgency", self.urgency)] {
            if let Some(value) = value {
                if !value.is_finite() || !(0.0..=10.0).contains(&value) {
                    return Err(TaskValidationError::PriorityOutOfRange { field, value });
                }
            }
        }
        match (self.task_type, self.recurrence_pattern.is_some()) {
            (TaskType::OneTime, true) => return Err(TaskValidationError::UnexpectedPattern),
            (TaskType::Recurring | TaskType::Habit, false) => {
                return Err(TaskValidationError::MissingPattern)
            }
            _ => {}
        }
        if self.task_type == TaskType::OneTime && !self.recurring_completions.is_empty() {
            return Err(TaskValidationError::UnexpectedCompletions);
        }
        let mut seen = HashSet::new();
        for completion in &self.recurring_completions {
            if !seen.insert(completion.date) {
                return Err(TaskValidationError::DuplicateCompletion(completion.date));
            }
        }
        Ok(())
    }
}

/// Directed hierarchy relation `parent -> child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEdge {
    pub parent_id: TaskId,
    pub child_id: TaskId,
}

impl TaskEdge {
    pub fn new(parent_id: impl Into<TaskId>, child_id: impl Into<TaskId>) -> Self {
        Self {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
        }
    }
}

/// Data-quality violations detected by [`TaskNode::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValidationError {
    /// Task id is empty after trim.
    BlankId,
    /// Priority value is non-finite or outside `0..=10`.
    PriorityOutOfRange { field: &'static str, value: f64 },
    /// One-time task carries a recurrence pattern.
    UnexpectedPattern,
    /// Recurring/habit task has no recurrence pattern.
    MissingPattern,
    /// One-time task carries recurring completion records.
    UnexpectedCompletions,
    /// More than one completion record for the same date.
    DuplicateCompletion(NaiveDate),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "task id must not be blank"),
            Self::PriorityOutOfRange { field, value } => {
                write!(f, "{field} ({value}) must be a finite value within 0..=10")
            }
            Self::UnexpectedPattern => write!(f, "one-time task must not carry a recurrence pattern"),
            Self::MissingPattern => write!(f, "recurring task requires a recurrence pattern"),
            Self::UnexpectedCompletions => {
                write!(f, "one-time task must not carry recurring completions")
            }
            Self::DuplicateCompletion(date) => {
                write!(f, "more than one completion record for {date}")
            }
        }
    }
}

impl Error for TaskValidationError {}
