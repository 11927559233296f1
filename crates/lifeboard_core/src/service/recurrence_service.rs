//! Recurring task expansion and streak use-cases.
//!
//! # Responsibility
//! - Expand recurring/habit definitions into dated instances for one day.
//! - Map instance ids back to their original task and date.
//! - Compute current and longest streaks from completion history.
//! - Build the completion write-back for the original task.
//!
//! # Invariants
//! - Instance id is `"{original_id}-{YYYY-MM-DD}"` and never equals the original id.
//! - A malformed pattern makes its task never due; it never fails the batch.
//! - Completion history is read as a set of dates; duplicates collapse.
//! - Streaks only count due dates; completions on other dates are ignored.

use crate::model::recurrence::RecurringCompletion;
use crate::model::schedule::RecurrenceSchedule;
use crate::model::task::{TaskId, TaskNode, TaskStatus, TaskType};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Calendar day format used by target dates and instance ids.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static INSTANCE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<original>.+)-(?P<date>\d{4}-\d{2}-\d{2})$").expect("valid instance id regex")
});

/// Result type used by recurrence use-cases.
pub type RecurrenceResult<T> = Result<T, RecurrenceError>;

/// Errors from recurrence use-cases.
///
/// These indicate caller bugs, not data-quality issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// Date string is not a valid `YYYY-MM-DD` calendar day.
    InvalidDate(String),
    /// Instance id has no trailing `-YYYY-MM-DD` segment.
    InvalidInstanceId(String),
    /// Original task is not present in the snapshot.
    TaskNotFound(TaskId),
    /// Original task is a one-time task.
    NotRecurring(TaskId),
    /// Original task has no occurrence on that date.
    NotDue { task_id: TaskId, date: NaiveDate },
}

impl Display for RecurrenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(value) => {
                write!(f, "invalid date `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidInstanceId(value) => write!(f, "invalid instance id `{value}`"),
            Self::TaskNotFound(id) => write!(f, "task not found in snapshot: {id}"),
            Self::NotRecurring(id) => write!(f, "task is not recurring: {id}"),
            Self::NotDue { task_id, date } => {
                write!(f, "task {task_id} has no occurrence on {date}")
            }
        }
    }
}

impl Error for RecurrenceError {}

/// One dated occurrence of a recurring task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstance {
    pub instance_id: String,
    pub original_node_id: TaskId,
    pub label: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub status: TaskStatus,
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<f64>,
    /// Habit-only: streak as of `date`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<u32>,
    /// Habit-only: best run over the whole history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_streak: Option<u32>,
}

/// Original task and date an instance id points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub original_id: TaskId,
    pub date: NaiveDate,
}

/// New completion state to persist on the original task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceWriteBack {
    pub original_id: TaskId,
    /// Full replacement list, one record per date, sorted by date.
    pub recurring_completions: Vec<RecurringCompletion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_streak: Option<u32>,
}

/// Parses a `YYYY-MM-DD` calendar day.
///
/// # Errors
/// - `InvalidDate` when the value is not a real calendar day in that format.
pub fn parse_date(value: &str) -> RecurrenceResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| RecurrenceError::InvalidDate(value.to_string()))
}

/// Synthesizes the instance id of `original_id` on `date`.
pub fn instance_id_for(original_id: &str, date: NaiveDate) -> String {
    format!("{original_id}-{}", date.format(DATE_FORMAT))
}

/// Strips the trailing date segments of an instance id.
///
/// Returns `None` when the id has no valid trailing calendar day.
pub fn resolve_instance_id(instance_id: &str) -> Option<InstanceRef> {
    let captures = INSTANCE_ID_RE.captures(instance_id)?;
    let date = NaiveDate::parse_from_str(&captures["date"], DATE_FORMAT).ok()?;
    Some(InstanceRef {
        original_id: captures["original"].to_string(),
        date,
    })
}

/// Expands recurring tasks due on `target_date` (`YYYY-MM-DD`).
///
/// # Errors
/// - `InvalidDate` when `target_date` cannot be parsed.
pub fn generate_recurring_task_instances(
    nodes: &[TaskNode],
    target_date: &str,
) -> RecurrenceResult<Vec<TaskInstance>> {
    let date = parse_date(target_date)?;
    Ok(generate_instances_on(nodes, date))
}

/// Expands recurring tasks due on `date`, in snapshot order.
pub fn generate_instances_on(nodes: &[TaskNode], date: NaiveDate) -> Vec<TaskInstance> {
    let mut instances = Vec::new();
    let mut malformed = 0usize;
    for node in nodes.iter().filter(|node| node.is_recurring()) {
        let Some(schedule) = schedule_or_warn(node) else {
            malformed += 1;
            continue;
        };
        if !schedule.is_due(date) {
            continue;
        }

        let completed = node.has_completion_on(date);
        let (current_streak, longest_streak) = if node.task_type == TaskType::Habit {
            let dates = completion_dates(&node.recurring_completions);
            (
                Some(current_streak_from(&dates, &schedule, date)),
                Some(longest_streak_from(&dates, &schedule)),
            )
        } else {
            (None, None)
        };

        instances.push(TaskInstance {
            instance_id: instance_id_for(&node.id, date),
            original_node_id: node.id.clone(),
            label: node.label.clone(),
            date,
            completed,
            status: if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            },
            task_type: node.task_type,
            importance: node.importance,
            urgency: node.urgency,
            current_streak,
            longest_streak,
        });
    }

    info!(
        "event=recurrence_expanded module=recurrence status=ok date={} instances={} malformed={}",
        date,
        instances.len(),
        malformed
    );
    instances
}

/// Returns whether `node` has an occurrence on `date`.
///
/// One-time tasks and malformed patterns are never due.
pub fn is_task_due_on(node: &TaskNode, date: NaiveDate) -> bool {
    node.is_recurring()
        && RecurrenceSchedule::for_task(node).is_ok_and(|schedule| schedule.is_due(date))
}

/// Next occurrence of `node` strictly after `after`, within `horizon_days`.
pub fn next_due_date(node: &TaskNode, after: NaiveDate, horizon_days: u64) -> Option<NaiveDate> {
    if !node.is_recurring() {
        return None;
    }
    RecurrenceSchedule::for_task(node)
        .ok()?
        .next_due(after, horizon_days)
}

/// Consecutive completed due dates ending at the most recent due date `<= as_of`.
///
/// When `as_of` is due but not completed yet, counting starts at the previous
/// due date, since that day is still open.
pub fn calculate_current_streak(
    completions: &[RecurringCompletion],
    schedule: &RecurrenceSchedule,
    as_of: NaiveDate,
) -> u32 {
    current_streak_from(&completion_dates(completions), schedule, as_of)
}

/// Longest run of consecutive completed due dates over the whole history.
pub fn calculate_longest_streak(
    completions: &[RecurringCompletion],
    schedule: &RecurrenceSchedule,
) -> u32 {
    longest_streak_from(&completion_dates(completions), schedule)
}

/// Records (`completed = true`) or clears one instance's completion.
///
/// Returns the replacement completion list for the original task. Existing
/// records are kept as-is; a second record for the same date is never added.
/// Clearing works on any date so stray records can be removed.
///
/// # Errors
/// - `InvalidInstanceId` when `instance_id` has no trailing date.
/// - `TaskNotFound` when the original task is not in `nodes`.
/// - `NotRecurring` when the original task is a one-time task.
/// - `NotDue` when completing a date the schedule never produces, including
///   any date of a task whose pattern is malformed.
pub fn apply_instance_completion(
    nodes: &[TaskNode],
    instance_id: &str,
    completed: bool,
    completed_at: DateTime<Utc>,
) -> RecurrenceResult<InstanceWriteBack> {
    let instance = resolve_instance_id(instance_id)
        .ok_or_else(|| RecurrenceError::InvalidInstanceId(instance_id.to_string()))?;
    let node = nodes
        .iter()
        .find(|node| node.id == instance.original_id)
        .ok_or_else(|| RecurrenceError::TaskNotFound(instance.original_id.clone()))?;
    if !node.is_recurring() {
        return Err(RecurrenceError::NotRecurring(node.id.clone()));
    }
    let schedule = schedule_or_warn(node);
    if completed && !schedule.as_ref().is_some_and(|schedule| schedule.is_due(instance.date)) {
        warn!(
            "event=instance_write_back module=recurrence status=reject task={} date={} reason=not_due",
            node.id, instance.date
        );
        return Err(RecurrenceError::NotDue {
            task_id: node.id.clone(),
            date: instance.date,
        });
    }

    let mut by_date: BTreeMap<NaiveDate, RecurringCompletion> = BTreeMap::new();
    for completion in &node.recurring_completions {
        by_date
            .entry(completion.date)
            .or_insert_with(|| completion.clone());
    }
    if completed {
        by_date
            .entry(instance.date)
            .or_insert_with(|| RecurringCompletion::new(instance.date, completed_at));
    } else {
        by_date.remove(&instance.date);
    }

    let dates: BTreeSet<NaiveDate> = by_date.keys().copied().collect();
    let (current_streak, longest_streak) = if node.task_type == TaskType::Habit {
        let as_of = completed_at.date_naive().max(instance.date);
        match &schedule {
            Some(schedule) => (
                Some(current_streak_from(&dates, schedule, as_of)),
                Some(longest_streak_from(&dates, schedule)),
            ),
            None => (Some(0), Some(0)),
        }
    } else {
        (None, None)
    };

    debug!(
        "event=instance_write_back module=recurrence status=ok task={} date={} completed={}",
        node.id, instance.date, completed
    );
    Ok(InstanceWriteBack {
        original_id: node.id.clone(),
        recurring_completions: by_date.into_values().collect(),
        current_streak,
        longest_streak,
    })
}

fn schedule_or_warn(node: &TaskNode) -> Option<RecurrenceSchedule> {
    match RecurrenceSchedule::for_task(node) {
        Ok(schedule) => Some(schedule),
        Err(err) => {
            warn!(
                "event=recurrence_pattern_invalid module=recurrence status=skip task={} error={}",
                node.id, err
            );
            None
        }
    }
}

fn completion_dates(completions: &[RecurringCompletion]) -> BTreeSet<NaiveDate> {
    completions.iter().map(|completion| completion.date).collect()
}

fn current_streak_from(
    dates: &BTreeSet<NaiveDate>,
    schedule: &RecurrenceSchedule,
    as_of: NaiveDate,
) -> u32 {
    let Some(earliest) = dates.first().copied() else {
        return 0;
    };
    let mut cursor = if schedule.is_due(as_of) && dates.contains(&as_of) {
        Some(as_of)
    } else {
        schedule.previous_due(as_of)
    };

    let mut streak = 0;
    while let Some(day) = cursor {
        if day < earliest || !dates.contains(&day) {
            break;
        }
        streak += 1;
        cursor = schedule.previous_due(day);
    }
    streak
}

fn longest_streak_from(dates: &BTreeSet<NaiveDate>, schedule: &RecurrenceSchedule) -> u32 {
    let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
        return 0;
    };

    let mut best = 0;
    let mut run = 0;
    let mut cursor = Some(first);
    while let Some(day) = cursor.filter(|day| *day <= last) {
        if schedule.is_due(day) {
            if dates.contains(&day) {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        cursor = day.succ_opt();
    }
    best
}
