//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the task engine to Dart via FRB as sync, snapshot-in calls.
//! - Translate engine errors into envelope messages.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Snapshot JSON shape is `{ "nodes": [...], "edges": [...] }`; both keys optional.
//! - Engine outputs are recommendations; Dart persists accepted changes.

use chrono::{TimeZone, Utc};
use lifeboard_core::{
    apply_instance_completion, core_version as core_version_inner, default_log_level,
    evaluate_task_completion, generate_recurring_task_instances, get_quadrant, get_quadrant_info,
    group_by_quadrant, init_logging as init_logging_inner, linear_to_log as linear_to_log_inner,
    log_to_linear as log_to_linear_inner, ping as ping_inner, quadrant_for_stored, TaskEdge,
    TaskInstance, TaskNode, TaskStatus,
};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

const LOG_LEVEL_ENV: &str = "LIFEBOARD_LOG_LEVEL";

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes engine logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive). Blank
///   falls back to `LIFEBOARD_LOG_LEVEL`, then to the build default.
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = resolve_log_level(level);
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One recommended status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDelta {
    pub node_id: String,
    /// `pending|in-progress|completed`.
    pub status: String,
}

/// Response envelope for completion evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub ok: bool,
    /// Trigger task first, then changed ancestors nearest first.
    pub changes: Vec<StatusDelta>,
    pub cascades_to_parents: bool,
    pub cascades_to_children: bool,
    /// Human-readable summary or failure reason.
    pub message: String,
}

impl CompletionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changes: Vec::new(),
            cascades_to_parents: false,
            cascades_to_children: false,
            message: message.into(),
        }
    }
}

/// Computes the cascade of setting `task_id` to `new_status`.
///
/// # FFI contract
/// - Sync call, pure computation over the given snapshot.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn evaluate_completion(
    snapshot_json: String,
    task_id: String,
    new_status: String,
) -> CompletionResponse {
    let Some(status) = TaskStatus::parse(&new_status) else {
        return CompletionResponse::failure(format!(
            "evaluate_completion failed: unsupported status `{new_status}`"
        ));
    };
    let snapshot = match decode_snapshot(&snapshot_json) {
        Ok(snapshot) => snapshot,
        Err(err) => return CompletionResponse::failure(format!("evaluate_completion failed: {err}")),
    };

    match evaluate_task_completion(task_id.trim(), status, &snapshot.nodes, &snapshot.edges) {
        Ok(outcome) => CompletionResponse {
            ok: true,
            changes: outcome
                .changes
                .into_iter()
                .map(|change| StatusDelta {
                    node_id: change.node_id,
                    status: change.recommended_status.as_str().to_string(),
                })
                .collect(),
            cascades_to_parents: outcome.cascades_to_parents,
            cascades_to_children: outcome.cascades_to_children,
            message: outcome.message,
        },
        Err(err) => CompletionResponse::failure(format!("evaluate_completion failed: {err}")),
    }
}

/// One dated occurrence for the day view.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceItem {
    pub instance_id: String,
    pub original_node_id: String,
    pub label: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub completed: bool,
    /// Linear-scale quadrant, when both priority values are set.
    pub quadrant: Option<String>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
}

/// Response envelope for recurring task expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancesResponse {
    pub ok: bool,
    pub items: Vec<InstanceItem>,
    pub message: String,
}

/// Lists recurring task occurrences due on `target_date` (`YYYY-MM-DD`).
///
/// # FFI contract
/// - Sync call, pure computation over the given snapshot.
/// - Malformed patterns are skipped, not reported as failure.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn recurring_instances(snapshot_json: String, target_date: String) -> InstancesResponse {
    let result = decode_snapshot(&snapshot_json).and_then(|snapshot| {
        generate_recurring_task_instances(&snapshot.nodes, &target_date)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(instances) => {
            let items = instances
                .into_iter()
                .map(to_instance_item)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "Nothing recurring today.".to_string()
            } else {
                format!("{} recurring task(s) due.", items.len())
            };
            InstancesResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => InstancesResponse {
            ok: false,
            items: Vec::new(),
            message: format!("recurring_instances failed: {err}"),
        },
    }
}

/// Response envelope for instance completion write-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBackResponse {
    pub ok: bool,
    /// Task whose `recurringCompletions` must be replaced.
    pub original_id: Option<String>,
    /// JSON array replacing the original task's `recurringCompletions`.
    pub completions_json: String,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub message: String,
}

impl WriteBackResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            original_id: None,
            completions_json: String::new(),
            current_streak: None,
            longest_streak: None,
            message: message.into(),
        }
    }
}

/// Checks (`completed = true`) or unchecks one recurring instance.
///
/// # FFI contract
/// - Sync call, pure computation over the given snapshot.
/// - `completed_at_ms` is the action time in Unix epoch milliseconds.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn complete_instance(
    snapshot_json: String,
    instance_id: String,
    completed: bool,
    completed_at_ms: i64,
) -> WriteBackResponse {
    let Some(completed_at) = Utc.timestamp_millis_opt(completed_at_ms).single() else {
        return WriteBackResponse::failure(format!(
            "complete_instance failed: invalid timestamp {completed_at_ms}"
        ));
    };
    let snapshot = match decode_snapshot(&snapshot_json) {
        Ok(snapshot) => snapshot,
        Err(err) => return WriteBackResponse::failure(format!("complete_instance failed: {err}")),
    };

    let write_back = match apply_instance_completion(
        &snapshot.nodes,
        instance_id.trim(),
        completed,
        completed_at,
    ) {
        Ok(write_back) => write_back,
        Err(err) => return WriteBackResponse::failure(format!("complete_instance failed: {err}")),
    };
    let completions_json = match serde_json::to_string(&write_back.recurring_completions) {
        Ok(json) => json,
        Err(err) => return WriteBackResponse::failure(format!("complete_instance failed: {err}")),
    };

    WriteBackResponse {
        ok: true,
        message: if completed {
            "Instance completed.".to_string()
        } else {
            "Instance reopened.".to_string()
        },
        original_id: Some(write_back.original_id),
        completions_json,
        current_streak: write_back.current_streak,
        longest_streak: write_back.longest_streak,
    }
}

/// Converts a linear slider value (0..=10) to the stored log scale.
#[flutter_rust_bridge::frb(sync)]
pub fn linear_to_log(value: f64) -> f64 {
    linear_to_log_inner(value)
}

/// Converts a stored log-scale value back to the linear slider scale.
#[flutter_rust_bridge::frb(sync)]
pub fn log_to_linear(value: f64) -> f64 {
    log_to_linear_inner(value)
}

/// Quadrant classification with display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadrantResponse {
    /// `None` when importance or urgency is missing.
    pub quadrant: Option<String>,
    pub icon: String,
    pub label: String,
    pub description: String,
}

/// Classifies linear-scale importance/urgency for the slider preview.
#[flutter_rust_bridge::frb(sync)]
pub fn classify_priority(importance: Option<f64>, urgency: Option<f64>) -> QuadrantResponse {
    match get_quadrant(importance, urgency) {
        Some(quadrant) => {
            let info = get_quadrant_info(quadrant);
            QuadrantResponse {
                quadrant: Some(quadrant.as_str().to_string()),
                icon: info.icon.to_string(),
                label: info.label.to_string(),
                description: info.description.to_string(),
            }
        }
        None => QuadrantResponse {
            quadrant: None,
            icon: String::new(),
            label: "Unscored".to_string(),
            description: "Set importance and urgency to place this task.".to_string(),
        },
    }
}

/// Task ids per quadrant for the priority board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardResponse {
    pub ok: bool,
    pub do_first: Vec<String>,
    pub schedule: Vec<String>,
    pub delegate: Vec<String>,
    pub eliminate: Vec<String>,
    pub unscored: Vec<String>,
    pub message: String,
}

/// Groups open tasks of the snapshot by quadrant.
///
/// # FFI contract
/// - Sync call, pure computation over the given snapshot.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn priority_board(snapshot_json: String) -> BoardResponse {
    match decode_snapshot(&snapshot_json) {
        Ok(snapshot) => {
            let board = group_by_quadrant(&snapshot.nodes);
            BoardResponse {
                ok: true,
                message: format!("{} unscored task(s).", board.unscored.len()),
                do_first: board.do_first,
                schedule: board.schedule,
                delegate: board.delegate,
                eliminate: board.eliminate,
                unscored: board.unscored,
            }
        }
        Err(err) => BoardResponse {
            ok: false,
            do_first: Vec::new(),
            schedule: Vec::new(),
            delegate: Vec::new(),
            eliminate: Vec::new(),
            unscored: Vec::new(),
            message: format!("priority_board failed: {err}"),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotPayload {
    #[serde(default)]
    nodes: Vec<Value>,
    #[serde(default)]
    edges: Vec<Value>,
}

/// Snapshot entities that decoded cleanly.
#[derive(Debug, Default)]
struct Snapshot {
    nodes: Vec<TaskNode>,
    edges: Vec<TaskEdge>,
}

/// Decodes a snapshot entity by entity.
///
/// Only the envelope must be valid JSON; a node or edge that does not decode
/// is logged and left out so the rest of the snapshot stays usable.
fn decode_snapshot(snapshot_json: &str) -> Result<Snapshot, String> {
    let payload: SnapshotPayload = serde_json::from_str(snapshot_json)
        .map_err(|err| format!("invalid snapshot json: {err}"))?;
    let nodes: Vec<TaskNode> = decode_entities(payload.nodes, "node");
    let edges: Vec<TaskEdge> = decode_entities(payload.edges, "edge");
    for node in &nodes {
        if let Err(err) = node.validate() {
            warn!(
                "event=snapshot_node_invalid module=ffi status=warn id={} error={}",
                node.id, err
            );
        }
    }
    Ok(Snapshot { nodes, edges })
}

fn decode_entities<T: DeserializeOwned>(raw: Vec<Value>, kind: &str) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value(value) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(
                    "event=snapshot_entity_dropped module=ffi status=skip kind={} position={} error={}",
                    kind, position, err
                );
                None
            }
        })
        .collect()
}

fn resolve_log_level(level: String) -> String {
    if !level.trim().is_empty() {
        return level;
    }
    match std::env::var(LOG_LEVEL_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => default_log_level().to_string(),
    }
}

fn to_instance_item(instance: TaskInstance) -> InstanceItem {
    let quadrant = quadrant_for_stored(instance.importance, instance.urgency)
        .map(|quadrant| quadrant.as_str().to_string());

    InstanceItem {
        date: instance.date.format("%Y-%m-%d").to_string(),
        instance_id: instance.instance_id,
        original_node_id: instance.original_node_id,
        label: instance.label,
        completed: instance.completed,
        quadrant,
        current_streak: instance.current_streak,
        longest_streak: instance.longest_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify_priority, complete_instance, core_version, evaluate_completion, init_logging,
        linear_to_log, log_to_linear, ping, priority_board, recurring_instances,
    };

    const BODY_SNAPSHOT: &str = r#"{
        "nodes": [
            { "id": "body", "label": "Body", "subtaskLogic": "OR" },
            { "id": "rollerblade", "label": "Rollerblade", "autoCompleteParent": true },
            { "id": "tennis", "label": "Tennis", "autoCompleteParent": true }
        ],
        "edges": [
            { "parentId": "body", "childId": "rollerblade" },
            { "parentId": "body", "childId": "tennis" }
        ]
    }"#;

    const HABIT_SNAPSHOT: &str = r#"{
        "nodes": [
            {
                "id": "stretch",
                "label": "Stretch",
                "taskType": "habit",
                "importance": 10,
                "urgency": 0,
                "recurrencePattern": { "frequency": "daily" },
                "recurringCompletions": [
                    { "date": "2024-01-01", "completedAt": "2024-01-01T07:00:00Z" }
                ]
            }
        ]
    }"#;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_log_dir() {
        let error = init_logging("info".to_string(), "tmp/logs".to_string());
        assert!(error.contains("absolute"));
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/lifeboard-logs".to_string());
        assert!(error.contains("unsupported log level"));
    }

    #[test]
    fn evaluate_completion_returns_parent_cascade() {
        let response = evaluate_completion(
            BODY_SNAPSHOT.to_string(),
            "rollerblade".to_string(),
            "completed".to_string(),
        );
        assert!(response.ok, "{}", response.message);
        let pairs = response
            .changes
            .iter()
            .map(|change| (change.node_id.as_str(), change.status.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![("rollerblade", "completed"), ("body", "completed")]
        );
        assert!(response.cascades_to_parents);
        assert!(!response.cascades_to_children);
    }

    #[test]
    fn evaluate_completion_reports_bad_inputs() {
        let bad_status = evaluate_completion(
            BODY_SNAPSHOT.to_string(),
            "rollerblade".to_string(),
            "done".to_string(),
        );
        assert!(!bad_status.ok);
        assert!(bad_status.message.contains("unsupported status"));

        let bad_json =
            evaluate_completion("{".to_string(), "x".to_string(), "completed".to_string());
        assert!(!bad_json.ok);
        assert!(bad_json.message.contains("invalid snapshot json"));

        let unknown = evaluate_completion(
            BODY_SNAPSHOT.to_string(),
            "ghost".to_string(),
            "pending".to_string(),
        );
        assert!(!unknown.ok);
        assert!(unknown.message.contains("ghost"));
    }

    #[test]
    fn recurring_instances_lists_due_habit_with_quadrant() {
        let response = recurring_instances(HABIT_SNAPSHOT.to_string(), "2024-01-02".to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.items.len(), 1);
        let item = &response.items[0];
        assert_eq!(item.instance_id, "stretch-2024-01-02");
        assert_eq!(item.date, "2024-01-02");
        assert!(!item.completed);
        assert_eq!(item.quadrant.as_deref(), Some("schedule"));
        assert_eq!(item.current_streak, Some(1));
    }

    #[test]
    fn recurring_instances_rejects_invalid_date() {
        let response = recurring_instances(HABIT_SNAPSHOT.to_string(), "tomorrow".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("tomorrow"));
    }

    #[test]
    fn complete_instance_returns_replacement_completions() {
        // 2024-01-02T12:00:00Z
        let response = complete_instance(
            HABIT_SNAPSHOT.to_string(),
            "stretch-2024-01-02".to_string(),
            true,
            1_704_196_800_000,
        );
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.original_id.as_deref(), Some("stretch"));
        let completions: serde_json::Value =
            serde_json::from_str(&response.completions_json).unwrap();
        assert_eq!(completions.as_array().map(Vec::len), Some(2));
        assert_eq!(response.current_streak, Some(2));
    }

    #[test]
    fn priority_helpers_round_trip_and_classify() {
        assert!((log_to_linear(linear_to_log(5.0)) - 5.0).abs() < 1e-9);
        let scored = classify_priority(Some(8.0), Some(8.0));
        assert_eq!(scored.quadrant.as_deref(), Some("do-first"));
        let unscored = classify_priority(None, Some(8.0));
        assert_eq!(unscored.quadrant, None);
        assert_eq!(unscored.label, "Unscored");
    }

    const MIXED_SNAPSHOT: &str = r#"{
        "nodes": [
            { "id": "trip", "label": "Trip", "subtaskLogic": "AND" },
            { "id": "tickets", "label": "Tickets" },
            {
                "id": "water",
                "label": "Water plants",
                "taskType": "recurring",
                "recurrencePattern": { "frequency": "daily" }
            },
            {
                "id": "review",
                "label": "Review",
                "taskType": "recurring",
                "recurrencePattern": { "frequency": "custom", "interval": { "n": 2 }, "unit": "day" }
            },
            {
                "id": "journal",
                "label": "Journal",
                "taskType": "habit",
                "recurrencePattern": { "frequency": "daily", "endDate": "2024-03-01T00:00:00.000Z" }
            },
            { "id": "broken", "label": "Broken", "status": "done" }
        ],
        "edges": [
            { "parentId": "trip", "childId": "tickets" },
            { "parentId": "broken", "childId": "water" }
        ]
    }"#;

    #[test]
    fn unreadable_task_does_not_block_rest_of_snapshot() {
        let completion = evaluate_completion(
            MIXED_SNAPSHOT.to_string(),
            "tickets".to_string(),
            "completed".to_string(),
        );
        assert!(completion.ok, "{}", completion.message);
        assert!(completion.cascades_to_parents);
        assert_eq!(completion.changes[1].node_id, "trip");

        let instances = recurring_instances(MIXED_SNAPSHOT.to_string(), "2024-02-01".to_string());
        assert!(instances.ok, "{}", instances.message);
        let ids = instances
            .items
            .iter()
            .map(|item| item.original_node_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["water", "journal"]);

        let dropped = evaluate_completion(
            MIXED_SNAPSHOT.to_string(),
            "broken".to_string(),
            "completed".to_string(),
        );
        assert!(!dropped.ok);
    }

    #[test]
    fn priority_board_groups_snapshot_nodes() {
        let response = priority_board(HABIT_SNAPSHOT.to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.schedule, vec!["stretch".to_string()]);
        assert!(response.unscored.is_empty());
    }
}
