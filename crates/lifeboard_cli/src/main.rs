//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lifeboard_core` linkage.
//! - Run one canned cascade so engine wiring can be checked without Flutter.
//! - Keep output deterministic for quick local sanity checks.

use lifeboard_core::{evaluate_task_completion, SubtaskLogic, TaskEdge, TaskNode, TaskStatus};

fn main() {
    println!("lifeboard_core ping={}", lifeboard_core::ping());
    println!("lifeboard_core version={}", lifeboard_core::core_version());

    let mut body = TaskNode::with_id("body", "Body");
    body.subtask_logic = Some(SubtaskLogic::Or);
    let nodes = vec![
        body,
        TaskNode::with_id("rollerblade", "Rollerblade"),
        TaskNode::with_id("tennis", "Tennis"),
    ];
    let edges = vec![
        TaskEdge::new("body", "rollerblade"),
        TaskEdge::new("body", "tennis"),
    ];

    match evaluate_task_completion("rollerblade", TaskStatus::Completed, &nodes, &edges) {
        Ok(outcome) => {
            for change in &outcome.changes {
                println!(
                    "lifeboard_core cascade id={} status={}",
                    change.node_id, change.recommended_status
                );
            }
            println!("lifeboard_core message={}", outcome.message);
        }
        Err(err) => {
            eprintln!("lifeboard_core cascade failed: {err}");
            std::process::exit(1);
        }
    }
}
