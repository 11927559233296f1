//! Task engine for Lifeboard.
//! This crate is the single source of truth for completion, recurrence and
//! priority invariants. It reads store snapshots and returns recommendations.

pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod priority;
pub mod service;

pub use hierarchy::graph::TaskGraph;
pub use hierarchy::index::{HierarchyIndex, SkipReason, SkippedEdge};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use model::recurrence::{
    MalformedField, PatternError, RecurrencePattern, RecurrenceRule, RecurrenceSpec,
    RecurrenceUnit, RecurringCompletion, WeekdaySpec,
};
pub use model::schedule::RecurrenceSchedule;
pub use model::task::{
    SubtaskLogic, TaskEdge, TaskId, TaskNode, TaskStatus, TaskType, TaskValidationError,
};
pub use priority::quadrant::{
    get_quadrant, get_quadrant_info, group_by_quadrant, quadrant_for_stored, quadrant_for_task, Quadrant,
    QuadrantBoard, QuadrantInfo, QUADRANT_THRESHOLD,
};
pub use priority::scale::{linear_to_log, log_to_linear};
pub use service::completion_service::{
    evaluate_task_completion, subtask_progress, CompletionError, CompletionOutcome,
    CompletionResult, CompletionService, StatusChange, SubtaskProgress,
};
pub use service::recurrence_service::{
    apply_instance_completion, calculate_current_streak, calculate_longest_streak,
    generate_instances_on, generate_recurring_task_instances, instance_id_for, is_task_due_on,
    next_due_date, parse_date, resolve_instance_id, InstanceRef, InstanceWriteBack,
    RecurrenceError, RecurrenceResult, TaskInstance,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
