//! Visibility cache and the end-to-end invariant checker

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::aggregation::{self, Placement};
use crate::error::{Result, VisError};
use crate::hierarchy::HierarchyIndex;
use crate::model::{EdgeId, NodeId};
use crate::store::EntityStore;

/// The currently visible view, maintained incrementally. Holds ids only.
///
/// A node or container is visible iff its direct hidden flag is false and no
/// strict ancestor is collapsed. An edge is visible iff both endpoints are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityCache {
    nodes: BTreeSet<NodeId>,
    containers: BTreeSet<NodeId>,
    expanded: BTreeSet<NodeId>,
    edges: BTreeSet<EdgeId>,
}

impl VisibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn visible_containers(&self) -> &BTreeSet<NodeId> {
        &self.containers
    }

    /// Visible containers that are not collapsed.
    pub fn expanded_containers(&self) -> &BTreeSet<NodeId> {
        &self.expanded
    }

    pub fn visible_edges(&self) -> &BTreeSet<EdgeId> {
        &self.edges
    }

    /// Whether a node or container is visible.
    pub fn is_visible(&self, id: &NodeId) -> bool {
        self.nodes.contains(id) || self.containers.contains(id)
    }

    pub fn is_edge_visible(&self, id: &EdgeId) -> bool {
        self.edges.contains(id)
    }

    pub(crate) fn forget_vertex(&mut self, id: &NodeId) {
        self.nodes.remove(id);
        self.containers.remove(id);
        self.expanded.remove(id);
    }

    pub(crate) fn forget_edge(&mut self, id: &EdgeId) {
        self.edges.remove(id);
    }

    fn record_vertex(&mut self, store: &EntityStore, id: &NodeId, visible: bool) {
        if let Some(container) = store.container(id) {
            set_membership(&mut self.containers, id, visible);
            set_membership(&mut self.expanded, id, visible && !container.collapsed);
        } else {
            set_membership(&mut self.nodes, id, visible);
        }
    }
}

fn set_membership<K: Ord + Clone>(set: &mut BTreeSet<K>, key: &K, present: bool) {
    if present {
        if !set.contains(key) {
            set.insert(key.clone());
        }
    } else {
        set.remove(key);
    }
}

/// Whether some strict ancestor of `id` is collapsed.
pub(crate) fn has_collapsed_ancestor(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    id: &NodeId,
) -> bool {
    hierarchy.ancestors(id).any(|a| store.is_collapsed(a))
}

/// Recompute visibility for `root` and every descendant. Pushes each vertex
/// visited into `touched` so the caller can follow up on adjacent edges.
pub(crate) fn refresh_subtree(
    cache: &mut VisibilityCache,
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    root: &NodeId,
    touched: &mut BTreeSet<NodeId>,
) {
    if !store.contains_vertex(root) {
        cache.forget_vertex(root);
        return;
    }
    let mut stack = vec![(root.clone(), has_collapsed_ancestor(store, hierarchy, root))];
    while let Some((id, concealed)) = stack.pop() {
        let visible = !concealed && !store.is_directly_hidden(&id);
        cache.record_vertex(store, &id, visible);
        let conceals_children = concealed || store.is_collapsed(&id);
        for child in store.children_of(&id) {
            stack.push((child.clone(), conceals_children));
        }
        touched.insert(id);
    }
}

/// Recompute visibility of the given edges from the vertex sets, and write the
/// derived `hidden` flag back onto each edge record.
pub(crate) fn refresh_edges(
    cache: &mut VisibilityCache,
    store: &mut EntityStore,
    edges: &BTreeSet<EdgeId>,
) {
    for id in edges {
        let visible = match store.edge(id) {
            Some(edge) => cache.is_visible(&edge.source) && cache.is_visible(&edge.target),
            None => {
                cache.forget_edge(id);
                continue;
            }
        };
        set_membership(&mut cache.edges, id, visible);
        if let Some(edge) = store.edges.get_mut(id) {
            edge.hidden = !visible;
        }
    }
}

/// Check every invariant from scratch against the incrementally maintained
/// state. Returns the first violation found.
pub fn validate(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
) -> Result<()> {
    check_tree(store, hierarchy)?;
    check_vertex_visibility(store, hierarchy, cache)?;
    check_edge_visibility(store, cache)?;
    check_adjacency(store)?;
    check_hyperedges(store, hierarchy, cache)?;
    Ok(())
}

fn violation(message: String) -> VisError {
    tracing::error!("Invariant violation: {}", message);
    VisError::InvariantViolation(message)
}

/// The children sets form a forest that the hierarchy index mirrors exactly.
fn check_tree(store: &EntityStore, hierarchy: &HierarchyIndex) -> Result<()> {
    let mut parents: HashMap<&NodeId, &NodeId> = HashMap::new();
    for container in store.containers.values() {
        for child in &container.children {
            if !store.contains_vertex(child) {
                return Err(violation(format!(
                    "container {} lists unknown child {}",
                    container.id, child
                )));
            }
            if let Some(previous) = parents.insert(child, &container.id) {
                return Err(violation(format!(
                    "{} is a child of both {} and {}",
                    child, previous, container.id
                )));
            }
        }
    }

    for &start in parents.keys() {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(&parent) = parents.get(current) {
            if !seen.insert(parent) {
                return Err(violation(format!("cycle in container tree through {}", parent)));
            }
            current = parent;
        }
    }

    if parents.len() != hierarchy.len() {
        return Err(violation(format!(
            "hierarchy index has {} parent links, children sets have {}",
            hierarchy.len(),
            parents.len()
        )));
    }
    for (child, parent) in hierarchy.iter() {
        if parents.get(child) != Some(&parent) {
            return Err(violation(format!(
                "hierarchy index says {} is under {}, children sets disagree",
                child, parent
            )));
        }
    }
    Ok(())
}

fn check_vertex_visibility(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
) -> Result<()> {
    let vertices = store.nodes.keys().chain(store.containers.keys());
    for id in vertices {
        let expected =
            !store.is_directly_hidden(id) && !has_collapsed_ancestor(store, hierarchy, id);
        if cache.is_visible(id) != expected {
            return Err(violation(format!(
                "{} should be {} but the cache disagrees",
                id,
                if expected { "visible" } else { "hidden" }
            )));
        }
        if let Some(container) = store.container(id) {
            let expanded = expected && !container.collapsed;
            if cache.expanded.contains(id) != expanded {
                return Err(violation(format!("expanded set is stale for {}", id)));
            }
        }
    }
    let stale = cache
        .nodes
        .iter()
        .find(|id| !store.nodes.contains_key(*id))
        .or_else(|| cache.containers.iter().find(|id| !store.containers.contains_key(*id)));
    if let Some(id) = stale {
        return Err(violation(format!("cache lists removed entity {}", id)));
    }
    Ok(())
}

fn check_edge_visibility(store: &EntityStore, cache: &VisibilityCache) -> Result<()> {
    for edge in store.edges.values() {
        let expected = cache.is_visible(&edge.source) && cache.is_visible(&edge.target);
        if cache.edges.contains(&edge.id) != expected || edge.hidden == expected {
            return Err(violation(format!("visibility of edge {} is stale", edge.id)));
        }
    }
    if let Some(id) = cache.edges.iter().find(|id| !store.edges.contains_key(*id)) {
        return Err(violation(format!("cache lists removed edge {}", id)));
    }
    Ok(())
}

fn check_adjacency(store: &EntityStore) -> Result<()> {
    let mut expected: HashMap<NodeId, BTreeSet<EdgeId>> = HashMap::new();
    for edge in store.edges.values() {
        if !store.contains_vertex(&edge.source) || !store.contains_vertex(&edge.target) {
            return Err(violation(format!("edge {} has a dangling endpoint", edge.id)));
        }
        for end in [&edge.source, &edge.target] {
            expected.entry(end.clone()).or_default().insert(edge.id.clone());
        }
    }
    if expected != store.adjacency {
        return Err(violation("edge adjacency index does not match the edge set".to_string()));
    }
    Ok(())
}

fn check_hyperedges(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
) -> Result<()> {
    let mut hyper_adjacency: HashMap<NodeId, BTreeSet<EdgeId>> = HashMap::new();
    for (key, hyper) in &store.hyperedges {
        if key != &hyper.id || hyper.id != EdgeId::hyper(&hyper.source, &hyper.target) {
            return Err(violation(format!(
                "hyperedge keyed {} does not match its endpoints {} -> {}",
                key, hyper.source, hyper.target
            )));
        }
        for end in [&hyper.source, &hyper.target] {
            if !cache.is_visible(end) {
                return Err(violation(format!(
                    "hyperedge {} touches hidden entity {}",
                    hyper.id, end
                )));
            }
            if cache.expanded.contains(end) {
                return Err(violation(format!(
                    "hyperedge {} touches expanded container {}",
                    hyper.id, end
                )));
            }
            hyper_adjacency.entry(end.clone()).or_default().insert(hyper.id.clone());
        }
        if hyper.aggregated_edges.is_empty() {
            return Err(violation(format!("hyperedge {} aggregates nothing", hyper.id)));
        }
        for edge in &hyper.aggregated_edges {
            if store.edge_to_hyper.get(edge) != Some(&hyper.id) {
                return Err(violation(format!(
                    "edge {} is listed by {} but not indexed to it",
                    edge, hyper.id
                )));
            }
        }
    }
    if hyper_adjacency != store.hyper_adjacency {
        return Err(violation("hyperedge adjacency index is stale".to_string()));
    }

    // Every original edge sits exactly where a from-scratch resolution puts it.
    for edge in store.edges.values() {
        let placement = aggregation::placement(store, hierarchy, cache, edge);
        let actual = store.hyperedge_of(&edge.id);
        let consistent = match (&placement, actual) {
            (Placement::Boundary { source, target }, Some(hyper)) => {
                &hyper.source == source && &hyper.target == target
            }
            (Placement::Boundary { .. }, None) => false,
            (_, Some(_)) => false,
            (_, None) => true,
        };
        if !consistent {
            return Err(violation(format!(
                "edge {} should be {:?} but is aggregated by {:?}",
                edge.id,
                placement,
                actual.map(|h| &h.id)
            )));
        }
    }
    if store.edge_to_hyper.len() != store.hyperedges.values().map(|h| h.count()).sum::<usize>() {
        return Err(violation("edge-to-hyperedge index has stale entries".to_string()));
    }
    Ok(())
}
