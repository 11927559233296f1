//! Eisenhower quadrant classification.
//!
//! # Responsibility
//! - Classify linear-scale (importance, urgency) pairs into quadrants.
//! - Provide display metadata and board grouping for task lists.
//!
//! # Invariants
//! - Classification uses linear-scale values; stored log values are converted first.
//! - A value `>= QUADRANT_THRESHOLD` is "high".
//! - Missing or non-finite importance or urgency yields `None` (unscored), never a guess.

use crate::model::task::{TaskId, TaskNode};
use crate::priority::scale::log_to_linear;
use serde::{Deserialize, Serialize};

/// Linear-scale midpoint separating low from high.
pub const QUADRANT_THRESHOLD: f64 = 5.0;

/// Converted values are rounded to this many steps per unit so that
/// round-trip noise cannot push a stored `5.0` below the threshold.
const LINEAR_STEPS_PER_UNIT: f64 = 1e6;

/// Eisenhower priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quadrant {
    /// Important and urgent.
    DoFirst,
    /// Important, not urgent.
    Schedule,
    /// Urgent, not important.
    Delegate,
    /// Neither important nor urgent.
    Eliminate,
}

impl Quadrant {
    /// All quadrants in board order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::DoFirst,
        Quadrant::Schedule,
        Quadrant::Delegate,
        Quadrant::Eliminate,
    ];

    /// Stable wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoFirst => "do-first",
            Self::Schedule => "schedule",
            Self::Delegate => "delegate",
            Self::Eliminate => "eliminate",
        }
    }
}

/// Display metadata for one quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantInfo {
    pub icon: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// Classifies linear-scale values.
///
/// Returns `None` when either value is missing, NaN or infinite.
pub fn get_quadrant(importance: Option<f64>, urgency: Option<f64>) -> Option<Quadrant> {
    let important = finite(importance)? >= QUADRANT_THRESHOLD;
    let urgent = finite(urgency)? >= QUADRANT_THRESHOLD;
    Some(match (important, urgent) {
        (true, true) => Quadrant::DoFirst,
        (true, false) => Quadrant::Schedule,
        (false, true) => Quadrant::Delegate,
        (false, false) => Quadrant::Eliminate,
    })
}

/// Classifies a task from its stored log-scale values.
pub fn quadrant_for_task(node: &TaskNode) -> Option<Quadrant> {
    quadrant_for_stored(node.importance, node.urgency)
}

/// Classifies stored log-scale values.
pub fn quadrant_for_stored(importance: Option<f64>, urgency: Option<f64>) -> Option<Quadrant> {
    get_quadrant(
        finite(importance).map(stored_to_linear),
        finite(urgency).map(stored_to_linear),
    )
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite())
}

fn stored_to_linear(value: f64) -> f64 {
    (log_to_linear(value) * LINEAR_STEPS_PER_UNIT).round() / LINEAR_STEPS_PER_UNIT
}

/// Returns icon, label and description for `quadrant`.
pub fn get_quadrant_info(quadrant: Quadrant) -> QuadrantInfo {
    match quadrant {
        Quadrant::DoFirst => QuadrantInfo {
            icon: "🔥",
            label: "Do First",
            description: "Important and urgent. Handle these now.",
        },
        Quadrant::Schedule => QuadrantInfo {
            icon: "📅",
            label: "Schedule",
            description: "Important but not urgent. Plan a time for these.",
        },
        Quadrant::Delegate => QuadrantInfo {
            icon: "🤝",
            label: "Delegate",
            description: "Urgent but not important. Hand these off if you can.",
        },
        Quadrant::Eliminate => QuadrantInfo {
            icon: "🗑️",
            label: "Eliminate",
            description: "Neither important nor urgent. Consider dropping these.",
        },
    }
}

/// Task ids grouped for the priority matrix board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadrantBoard {
    pub do_first: Vec<TaskId>,
    pub schedule: Vec<TaskId>,
    pub delegate: Vec<TaskId>,
    pub eliminate: Vec<TaskId>,
    /// Tasks missing importance or urgency.
    pub unscored: Vec<TaskId>,
}

impl QuadrantBoard {
    /// Task ids in one quadrant bucket.
    pub fn bucket(&self, quadrant: Quadrant) -> &[TaskId] {
        match quadrant {
            Quadrant::DoFirst => &self.do_first,
            Quadrant::Schedule => &self.schedule,
            Quadrant::Delegate => &self.delegate,
            Quadrant::Eliminate => &self.eliminate,
        }
    }

    fn bucket_mut(&mut self, quadrant: Quadrant) -> &mut Vec<TaskId> {
        match quadrant {
            Quadrant::DoFirst => &mut self.do_first,
            Quadrant::Schedule => &mut self.schedule,
            Quadrant::Delegate => &mut self.delegate,
            Quadrant::Eliminate => &mut self.eliminate,
        }
    }
}

/// Groups open tasks by quadrant, keeping snapshot order inside each bucket.
///
/// Completed tasks are left off the board.
pub fn group_by_quadrant(nodes: &[TaskNode]) -> QuadrantBoard {
    let mut board = QuadrantBoard::default();
    for node in nodes.iter().filter(|node| !node.is_completed()) {
        match quadrant_for_task(node) {
            Some(quadrant) => board.bucket_mut(quadrant).push(node.id.clone()),
            None => board.unscored.push(node.id.clone()),
        }
    }
    board
}

#[cfg(test)]
mod tests {
    use super::{get_quadrant, get_quadrant_info, quadrant_for_task, Quadrant};
    use crate::model::task::TaskNode;
    use crate::priority::scale::linear_to_log;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(get_quadrant(Some(5.0), Some(5.0)), Some(Quadrant::DoFirst));
        assert_eq!(
            get_quadrant(Some(4.999), Some(4.999)),
            Some(Quadrant::Eliminate)
        );
    }

    #[test]
    fn mixed_axes_map_to_schedule_and_delegate() {
        assert_eq!(get_quadrant(Some(8.0), Some(2.0)), Some(Quadrant::Schedule));
        assert_eq!(get_quadrant(Some(2.0), Some(8.0)), Some(Quadrant::Delegate));
    }

    #[test]
    fn missing_value_is_unscored() {
        assert_eq!(get_quadrant(None, Some(8.0)), None);
        assert_eq!(get_quadrant(Some(8.0), None), None);
    }

    #[test]
    fn non_finite_value_is_unscored() {
        assert_eq!(get_quadrant(Some(f64::NAN), Some(8.0)), None);
        assert_eq!(get_quadrant(Some(8.0), Some(f64::INFINITY)), None);

        let mut task = TaskNode::with_id("t", "x");
        task.importance = Some(f64::NAN);
        task.urgency = Some(2.0);
        assert_eq!(quadrant_for_task(&task), None);
    }

    #[test]
    fn task_values_are_converted_from_log_scale() {
        let mut task = TaskNode::with_id("t", "x");
        // Linear 4 stores as ~6.7 on the log scale; it must still read as low.
        task.importance = Some(linear_to_log(4.0));
        task.urgency = Some(linear_to_log(6.0));
        assert!(task.importance.unwrap() > 5.0);
        assert_eq!(quadrant_for_task(&task), Some(Quadrant::Delegate));
    }

    #[test]
    fn every_quadrant_has_display_metadata() {
        for quadrant in Quadrant::ALL {
            let info = get_quadrant_info(quadrant);
            assert!(!info.icon.is_empty());
            assert!(!info.label.is_empty());
            assert!(!info.description.is_empty());
        }
    }
}
