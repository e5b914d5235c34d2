//! Visible-view diffs for incremental render updates

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::state::VisualizationState;

/// The visible id sets and hyperedges of a state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub generation: u64,
    pub nodes: BTreeSet<NodeId>,
    pub containers: BTreeSet<NodeId>,
    pub collapsed: BTreeSet<NodeId>,
    pub edges: BTreeSet<EdgeId>,
    /// Hyperedge id -> number of original edges it aggregates.
    pub hyperedges: BTreeMap<EdgeId, usize>,
}

impl ViewSnapshot {
    pub fn capture(state: &VisualizationState) -> Self {
        let cache = state.cache();
        ViewSnapshot {
            generation: state.generation(),
            nodes: cache.visible_nodes().clone(),
            containers: cache.visible_containers().clone(),
            collapsed: cache
                .visible_containers()
                .difference(cache.expanded_containers())
                .cloned()
                .collect(),
            edges: cache.visible_edges().clone(),
            hyperedges: state
                .all_hyperedges()
                .map(|h| (h.id.clone(), h.count()))
                .collect(),
        }
    }
}

/// A change to the visible view that should be pushed to a renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    pub shown_nodes: Vec<NodeId>,
    pub concealed_nodes: Vec<NodeId>,
    pub shown_containers: Vec<NodeId>,
    pub concealed_containers: Vec<NodeId>,
    /// Containers that stayed visible but flipped between collapsed and expanded.
    pub toggled_containers: Vec<NodeId>,
    pub shown_edges: Vec<EdgeId>,
    pub concealed_edges: Vec<EdgeId>,
    pub added_hyperedges: Vec<EdgeId>,
    pub removed_hyperedges: Vec<EdgeId>,
    /// Hyperedges present on both sides whose aggregate count changed.
    pub resized_hyperedges: Vec<EdgeId>,
}

impl ViewDiff {
    pub fn new(sequence: u64) -> Self {
        ViewDiff {
            sequence,
            ..Default::default()
        }
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.shown_nodes.is_empty()
            && self.concealed_nodes.is_empty()
            && self.shown_containers.is_empty()
            && self.concealed_containers.is_empty()
            && self.toggled_containers.is_empty()
            && self.shown_edges.is_empty()
            && self.concealed_edges.is_empty()
            && self.added_hyperedges.is_empty()
            && self.removed_hyperedges.is_empty()
            && self.resized_hyperedges.is_empty()
    }
}

fn added<T: Ord + Clone>(old: &BTreeSet<T>, new: &BTreeSet<T>) -> Vec<T> {
    new.difference(old).cloned().collect()
}

/// Diff state for incremental updates.
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Compute the difference between two snapshots.
    /// Returns a ViewDiff with the sequence number incremented.
    pub fn compute_diff(&mut self, old: &ViewSnapshot, new: &ViewSnapshot) -> ViewDiff {
        self.sequence += 1;
        let mut diff = ViewDiff::new(self.sequence);

        diff.shown_nodes = added(&old.nodes, &new.nodes);
        diff.concealed_nodes = added(&new.nodes, &old.nodes);
        diff.shown_containers = added(&old.containers, &new.containers);
        diff.concealed_containers = added(&new.containers, &old.containers);
        diff.toggled_containers = old
            .containers
            .intersection(&new.containers)
            .filter(|c| old.collapsed.contains(*c) != new.collapsed.contains(*c))
            .cloned()
            .collect();
        diff.shown_edges = added(&old.edges, &new.edges);
        diff.concealed_edges = added(&new.edges, &old.edges);

        for (id, count) in &new.hyperedges {
            match old.hyperedges.get(id) {
                None => diff.added_hyperedges.push(id.clone()),
                Some(previous) if previous != count => diff.resized_hyperedges.push(id.clone()),
                Some(_) => {}
            }
        }
        diff.removed_hyperedges = old
            .hyperedges
            .keys()
            .filter(|id| !new.hyperedges.contains_key(*id))
            .cloned()
            .collect();

        diff
    }

    /// Get current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}
