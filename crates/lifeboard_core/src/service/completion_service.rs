//! Task completion cascade use-cases.
//!
//! # Responsibility
//! - Compute which ancestors change state when one task is checked or unchecked.
//! - Report subtask progress for parent tasks.
//!
//! # Invariants
//! - Evaluation is a pure read of the snapshot; inputs are never mutated.
//! - Optional children never count toward, and never block, parent completion.
//! - A parent with no required children is never completed by cascade.
//! - Only upward propagation happens; `cascades_to_children` is always `false`.
//! - The trigger task is always the first recorded change.

use crate::hierarchy::graph::TaskGraph;
use crate::model::task::{SubtaskLogic, TaskEdge, TaskId, TaskNode, TaskStatus};
use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by completion use-cases.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Errors from completion use-cases.
///
/// These indicate caller bugs, not data-quality issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Task id is not present in the snapshot.
    TaskNotFound(TaskId),
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found in snapshot: {id}"),
        }
    }
}

impl Error for CompletionError {}

/// One recommended state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub node_id: TaskId,
    pub recommended_status: TaskStatus,
}

/// Side effects of one task status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Trigger task first, then changed ancestors nearest first.
    pub changes: Vec<StatusChange>,
    /// Whether at least one ancestor changed.
    pub cascades_to_parents: bool,
    /// Reserved for downward propagation.
    pub cascades_to_children: bool,
    /// Human-readable summary for UI toasts.
    pub message: String,
}

impl CompletionOutcome {
    /// Ids of every node in `changes`, in order.
    pub fn affected_ids(&self) -> Vec<&str> {
        self.changes
            .iter()
            .map(|change| change.node_id.as_str())
            .collect()
    }

    /// Recommended status of `id`, if it is part of the outcome.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.changes
            .iter()
            .find(|change| change.node_id == id)
            .map(|change| change.recommended_status)
    }
}

/// Completion counts for one parent's direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskProgress {
    pub task_id: TaskId,
    /// Rule in effect after applying the `autoCompleteParent` hint.
    pub logic: SubtaskLogic,
    pub required_total: usize,
    pub required_completed: usize,
    pub optional_total: usize,
    pub optional_completed: usize,
    /// Whether the children alone justify completing the parent.
    pub is_satisfied: bool,
}

/// Completion evaluator over one snapshot view.
pub struct CompletionService<'g, 'a> {
    graph: &'g TaskGraph<'a>,
}

impl<'g, 'a> CompletionService<'g, 'a> {
    /// Creates the evaluator for a snapshot view.
    pub fn new(graph: &'g TaskGraph<'a>) -> Self {
        Self { graph }
    }

    /// Computes the cascade caused by setting `task_id` to `new_status`.
    ///
    /// # Contract
    /// - `Completed`: ancestors are completed while their rule is satisfied.
    /// - Any other status: completed ancestors are reopened (`Pending`) while
    ///   their rule no longer holds.
    ///
    /// # Errors
    /// - `TaskNotFound` when `task_id` is not in the snapshot.
    pub fn evaluate(
        &self,
        task_id: &str,
        new_status: TaskStatus,
    ) -> CompletionResult<CompletionOutcome> {
        let task = self
            .graph
            .node(task_id)
            .ok_or_else(|| CompletionError::TaskNotFound(task_id.to_string()))?;

        let mut overlay: HashMap<&str, TaskStatus> = HashMap::new();
        overlay.insert(task.id.as_str(), new_status);
        let mut cascaded: Vec<&TaskNode> = Vec::new();

        if new_status == TaskStatus::Completed {
            let mut child = task;
            while let Some(parent) = self.graph.parent(&child.id) {
                if status_in(&overlay, parent) == TaskStatus::Completed {
                    break;
                }
                if !self.progress_with(parent, &overlay).is_satisfied {
                    break;
                }
                overlay.insert(parent.id.as_str(), TaskStatus::Completed);
                cascaded.push(parent);
                child = parent;
            }
        } else {
            let mut child = task;
            while let Some(parent) = self.graph.parent(&child.id) {
                if child.is_optional || status_in(&overlay, parent) != TaskStatus::Completed {
                    break;
                }
                let progress = self.progress_with(parent, &overlay);
                let still_held = match progress.logic {
                    SubtaskLogic::And => false,
                    SubtaskLogic::Or => progress.required_completed > 0,
                };
                if still_held {
                    break;
                }
                overlay.insert(parent.id.as_str(), TaskStatus::Pending);
                cascaded.push(parent);
                child = parent;
            }
        }

        let cascade_status = if new_status == TaskStatus::Completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        };
        let mut changes = Vec::with_capacity(cascaded.len() + 1);
        changes.push(StatusChange {
            node_id: task.id.clone(),
            recommended_status: new_status,
        });
        changes.extend(cascaded.iter().map(|node| StatusChange {
            node_id: node.id.clone(),
            recommended_status: cascade_status,
        }));

        let message = summarize(task, new_status, &cascaded);
        if cascaded.is_empty() {
            debug!(
                "event=completion_evaluated module=completion status=ok task={} new_status={} cascaded=0",
                task.id, new_status
            );
        } else {
            info!(
                "event=completion_evaluated module=completion status=ok task={} new_status={} cascaded={}",
                task.id,
                new_status,
                cascaded.len()
            );
        }

        Ok(CompletionOutcome {
            changes,
            cascades_to_parents: !cascaded.is_empty(),
            cascades_to_children: false,
            message,
        })
    }

    /// Reports direct-children progress of `task_id` as stored in the snapshot.
    ///
    /// # Errors
    /// - `TaskNotFound` when `task_id` is not in the snapshot.
    pub fn subtask_progress(&self, task_id: &str) -> CompletionResult<SubtaskProgress> {
        let task = self
            .graph
            .node(task_id)
            .ok_or_else(|| CompletionError::TaskNotFound(task_id.to_string()))?;
        Ok(self.progress_with(task, &HashMap::new()))
    }

    fn progress_with(
        &self,
        parent: &TaskNode,
        overlay: &HashMap<&str, TaskStatus>,
    ) -> SubtaskProgress {
        let children = self.graph.children(&parent.id);
        let logic = effective_logic(parent, &children);

        let mut progress = SubtaskProgress {
            task_id: parent.id.clone(),
            logic,
            required_total: 0,
            required_completed: 0,
            optional_total: 0,
            optional_completed: 0,
            is_satisfied: false,
        };
        for child in children {
            let done = status_in(overlay, child) == TaskStatus::Completed;
            if child.is_optional {
                progress.optional_total += 1;
                progress.optional_completed += usize::from(done);
            } else {
                progress.required_total += 1;
                progress.required_completed += usize::from(done);
            }
        }
        progress.is_satisfied = progress.required_total > 0
            && match logic {
                SubtaskLogic::And => progress.required_completed == progress.required_total,
                SubtaskLogic::Or => progress.required_completed > 0,
            };
        progress
    }
}

/// Computes the cascade of one status transition over a raw snapshot.
///
/// Builds the hierarchy maps from `edges` and delegates to [`CompletionService::evaluate`].
pub fn evaluate_task_completion(
    task_id: &str,
    new_status: TaskStatus,
    nodes: &[TaskNode],
    edges: &[TaskEdge],
) -> CompletionResult<CompletionOutcome> {
    let graph = TaskGraph::new(nodes, edges);
    CompletionService::new(&graph).evaluate(task_id, new_status)
}

/// Reports direct-children progress of `task_id` over a raw snapshot.
pub fn subtask_progress(
    task_id: &str,
    nodes: &[TaskNode],
    edges: &[TaskEdge],
) -> CompletionResult<SubtaskProgress> {
    let graph = TaskGraph::new(nodes, edges);
    CompletionService::new(&graph).subtask_progress(task_id)
}

/// Explicit parent logic wins; otherwise any required child hinting
/// `auto_complete_parent` switches the parent to OR.
fn effective_logic(parent: &TaskNode, children: &[&TaskNode]) -> SubtaskLogic {
    parent.subtask_logic.unwrap_or_else(|| {
        let hinted = children
            .iter()
            .any(|child| !child.is_optional && child.auto_complete_parent);
        if hinted {
            SubtaskLogic::Or
        } else {
            SubtaskLogic::And
        }
    })
}

fn status_in(overlay: &HashMap<&str, TaskStatus>, node: &TaskNode) -> TaskStatus {
    overlay
        .get(node.id.as_str())
        .copied()
        .unwrap_or(node.status)
}

fn display_name(node: &TaskNode) -> &str {
    let label = node.label.trim();
    if label.is_empty() {
        node.id.as_str()
    } else {
        label
    }
}

fn summarize(task: &TaskNode, new_status: TaskStatus, cascaded: &[&TaskNode]) -> String {
    let head = format!("Marked \"{}\" as {}", display_name(task), new_status);
    if cascaded.is_empty() {
        return format!("{head}.");
    }
    let verb = if new_status == TaskStatus::Completed {
        "also completed"
    } else {
        "also reopened"
    };
    let names = cascaded
        .iter()
        .map(|node| format!("\"{}\"", display_name(node)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{head}; {verb} {names}.")
}
