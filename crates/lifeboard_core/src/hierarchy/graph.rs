//! Snapshot view pairing node lookup with the hierarchy index.

use crate::hierarchy::index::HierarchyIndex;
use crate::model::task::{TaskEdge, TaskNode};
use log::warn;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Read-only snapshot of nodes and their admitted hierarchy.
#[derive(Debug, Clone)]
pub struct TaskGraph<'a> {
    nodes: HashMap<&'a str, &'a TaskNode>,
    index: HierarchyIndex,
}

impl<'a> TaskGraph<'a> {
    /// Builds the view. Duplicate node ids keep the first occurrence.
    pub fn new(nodes: &'a [TaskNode], edges: &[TaskEdge]) -> Self {
        let mut lookup = HashMap::with_capacity(nodes.len());
        for node in nodes {
            match lookup.entry(node.id.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(node);
                }
                Entry::Occupied(_) => warn!(
                    "event=snapshot_duplicate_node module=hierarchy status=skip id={}",
                    node.id
                ),
            }
        }
        Self {
            nodes: lookup,
            index: HierarchyIndex::from_snapshot(nodes, edges),
        }
    }

    pub fn node(&self, id: &str) -> Option<&'a TaskNode> {
        self.nodes.get(id).copied()
    }

    /// Parent node of `id`, if the admitted hierarchy has one.
    pub fn parent(&self, id: &str) -> Option<&'a TaskNode> {
        self.index
            .parent_of(id)
            .and_then(|parent_id| self.node(parent_id))
    }

    /// Child nodes of `id` in edge order.
    pub fn children(&self, id: &str) -> Vec<&'a TaskNode> {
        self.index
            .children_of(id)
            .iter()
            .filter_map(|child_id| self.node(child_id))
            .collect()
    }
}
