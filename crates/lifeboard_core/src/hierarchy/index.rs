//! Parent/child lookup maps built from a flat edge list.
//!
//! # Responsibility
//! - Build `parent_of` and `children_of` adjacency maps keyed by task id.
//! - Answer transitive descendant/ancestor queries.
//! - Keep the admitted edge set a forest.
//!
//! # Invariants
//! - Every child has at most one parent; the first admitted edge wins.
//! - The admitted edge set is acyclic; self-loops and back-edges are skipped.
//! - Child order follows edge input order; duplicate edges collapse.
//! - Every skipped edge is recorded with its reason.

use crate::model::task::{TaskEdge, TaskId, TaskNode};
use log::warn;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Display, Formatter};

/// Why an edge was left out of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `parent_id == child_id`.
    SelfLoop,
    /// Child already has a different parent.
    SecondParent,
    /// Child is already an ancestor of the parent.
    Cycle,
    /// Parent or child id is not present in the node snapshot.
    Dangling,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfLoop => "self_loop",
            Self::SecondParent => "second_parent",
            Self::Cycle => "cycle",
            Self::Dangling => "dangling",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge left out of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEdge {
    pub edge: TaskEdge,
    pub reason: SkipReason,
}

/// Forest view over a task edge list.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    parent_of: HashMap<TaskId, TaskId>,
    children_of: HashMap<TaskId, Vec<TaskId>>,
    /// Every id seen on an admitted edge, in first-seen order.
    members: Vec<TaskId>,
    skipped: Vec<SkippedEdge>,
}

impl HierarchyIndex {
    /// Builds the index from edges alone.
    pub fn from_edges(edges: &[TaskEdge]) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.admit(edge);
        }
        index
    }

    /// Builds the index, skipping edges whose endpoints are not in `nodes`.
    pub fn from_snapshot(nodes: &[TaskNode], edges: &[TaskEdge]) -> Self {
        let known: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let mut index = Self::default();
        for edge in edges {
            if !known.contains(edge.parent_id.as_str()) || !known.contains(edge.child_id.as_str())
            {
                index.skip(edge, SkipReason::Dangling);
                continue;
            }
            index.admit(edge);
        }
        index
    }

    /// Parent of `id`, if any.
    pub fn parent_of(&self, id: &str) -> Option<&TaskId> {
        self.parent_of.get(id)
    }

    /// Direct children of `id` in edge order.
    pub fn children_of(&self, id: &str) -> &[TaskId] {
        self.children_of
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns whether `id` appears on any admitted edge.
    pub fn contains(&self, id: &str) -> bool {
        self.parent_of.contains_key(id) || self.children_of.contains_key(id)
    }

    /// Ids that have children but no parent, in first-seen order.
    pub fn roots(&self) -> Vec<TaskId> {
        self.members
            .iter()
            .filter(|id| !self.parent_of.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<TaskId> {
        let mut ancestors = Vec::new();
        let mut cursor = self.parent_of(id);
        while let Some(parent) = cursor {
            ancestors.push(parent.clone());
            cursor = self.parent_of(parent);
        }
        ancestors
    }

    /// Transitive descendants of `id` in breadth-first order, excluding `id`.
    pub fn descendants(&self, id: &str) -> Vec<TaskId> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut descendants = Vec::new();
        seen.insert(id);
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(current) {
                if seen.insert(child.as_str()) {
                    descendants.push(child.clone());
                    queue.push_back(child.as_str());
                }
            }
        }
        descendants
    }

    /// Edges left out of the index, in input order.
    pub fn skipped_edges(&self) -> &[SkippedEdge] {
        &self.skipped
    }

    fn admit(&mut self, edge: &TaskEdge) {
        if edge.parent_id == edge.child_id {
            self.skip(edge, SkipReason::SelfLoop);
            return;
        }
        if let Some(existing) = self.parent_of.get(&edge.child_id) {
            if *existing != edge.parent_id {
                self.skip(edge, SkipReason::SecondParent);
            }
            return;
        }
        if self.is_ancestor_or_self(&edge.child_id, &edge.parent_id) {
            self.skip(edge, SkipReason::Cycle);
            return;
        }

        self.track(&edge.parent_id);
        self.track(&edge.child_id);
        self.parent_of
            .insert(edge.child_id.clone(), edge.parent_id.clone());
        self.children_of
            .entry(edge.parent_id.clone())
            .or_default()
            .push(edge.child_id.clone());
    }

    /// Returns whether `candidate` is `id` or one of its ancestors.
    fn is_ancestor_or_self(&self, candidate: &str, id: &str) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.parent_of.get(current).map(String::as_str);
        }
        false
    }

    fn track(&mut self, id: &TaskId) {
        if !self.contains(id) {
            self.members.push(id.clone());
        }
    }

    fn skip(&mut self, edge: &TaskEdge, reason: SkipReason) {
        warn!(
            "event=hierarchy_edge_skipped module=hierarchy status=skip reason={} parent={} child={}",
            reason, edge.parent_id, edge.child_id
        );
        self.skipped.push(SkippedEdge {
            edge: edge.clone(),
            reason,
        });
    }
}
