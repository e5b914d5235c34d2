//! Entity store: the canonical records, keyed by id

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::error::{EntityKind, Result, VisError};
use crate::model::*;

/// Owns every node, edge, container and hyperedge. Relationships between
/// records are ids only.
///
/// Besides the records it keeps three adjacency indices, all maintained by the
/// insert/remove methods here and nowhere else:
/// - `adjacency`: vertex -> original edges touching it
/// - `hyper_adjacency`: vertex -> hyperedges touching it
/// - `edge_to_hyper`: original edge -> the hyperedge aggregating it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    pub(crate) nodes: HashMap<NodeId, GraphNode>,
    pub(crate) containers: HashMap<NodeId, Container>,
    pub(crate) edges: HashMap<EdgeId, GraphEdge>,
    pub(crate) hyperedges: BTreeMap<EdgeId, HyperEdge>,
    pub(crate) adjacency: HashMap<NodeId, BTreeSet<EdgeId>>,
    pub(crate) hyper_adjacency: HashMap<NodeId, BTreeSet<EdgeId>>,
    pub(crate) edge_to_hyper: HashMap<EdgeId, EdgeId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node<Q>(&self, id: &Q) -> Option<&GraphNode>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.nodes.get(id)
    }

    pub fn container<Q>(&self, id: &Q) -> Option<&Container>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.containers.get(id)
    }

    pub fn edge<Q>(&self, id: &Q) -> Option<&GraphEdge>
    where
        EdgeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.edges.get(id)
    }

    pub fn hyperedge<Q>(&self, id: &Q) -> Option<&HyperEdge>
    where
        EdgeId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.hyperedges.get(id)
    }

    /// Whether `id` names a node or a container.
    pub fn contains_vertex(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id) || self.containers.contains_key(id)
    }

    pub(crate) fn require_vertex(&self, id: &NodeId) -> Result<()> {
        if self.contains_vertex(id) {
            Ok(())
        } else {
            Err(VisError::vertex_not_found(id))
        }
    }

    pub(crate) fn require_container<Q>(&self, id: &Q) -> Result<&Container>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.containers
            .get(id)
            .ok_or_else(|| VisError::container_not_found(id))
    }

    /// Direct hidden flag of a node or container.
    pub fn is_directly_hidden(&self, id: &NodeId) -> bool {
        if let Some(node) = self.nodes.get(id) {
            node.hidden
        } else {
            self.containers.get(id).is_some_and(|c| c.hidden)
        }
    }

    pub fn is_collapsed(&self, id: &NodeId) -> bool {
        self.containers.get(id).is_some_and(|c| c.collapsed)
    }

    /// Children of a container; empty for nodes and unknown ids.
    pub fn children_of<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a NodeId> + use<'a> {
        self.containers
            .get(id)
            .into_iter()
            .flat_map(|c| c.children.iter())
    }

    /// Original edges with `id` as an endpoint.
    pub fn edges_touching<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a EdgeId> + use<'a> {
        self.adjacency.get(id).into_iter().flat_map(|set| set.iter())
    }

    /// Hyperedges with `id` as an endpoint.
    pub fn hyperedges_touching<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a EdgeId> + use<'a> {
        self.hyper_adjacency
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// The hyperedge currently aggregating an original edge.
    pub fn hyperedge_of(&self, edge: &EdgeId) -> Option<&HyperEdge> {
        self.edge_to_hyper
            .get(edge)
            .and_then(|h| self.hyperedges.get(h))
    }

    /// Reject an id already taken by the other vertex table.
    pub(crate) fn check_vertex_id(&self, id: &NodeId, as_kind: EntityKind) -> Result<()> {
        let clash = match as_kind {
            EntityKind::Node if self.containers.contains_key(id) => Some(EntityKind::Container),
            EntityKind::Container if self.nodes.contains_key(id) => Some(EntityKind::Node),
            _ => None,
        };
        match clash {
            Some(existing) => Err(VisError::IdConflict {
                id: id.to_string(),
                existing,
            }),
            None => Ok(()),
        }
    }

    /// Insert or replace an original edge, keeping `adjacency` in step. The
    /// caller clears any hyperedge membership first.
    pub(crate) fn put_edge(&mut self, edge: GraphEdge) {
        if let Some(old) = self.edges.get(&edge.id) {
            let (source, target, id) = (old.source.clone(), old.target.clone(), old.id.clone());
            self.unlink(&source, &id);
            self.unlink(&target, &id);
        }
        for end in [&edge.source, &edge.target] {
            self.adjacency
                .entry(end.clone())
                .or_default()
                .insert(edge.id.clone());
        }
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Remove an original edge, its adjacency entries and its hyperedge
    /// membership.
    pub(crate) fn take_edge(&mut self, id: &EdgeId) -> Option<GraphEdge> {
        self.release_from_hyperedge(id);
        let edge = self.edges.remove(id)?;
        self.unlink(&edge.source, id);
        self.unlink(&edge.target, id);
        Some(edge)
    }

    fn unlink(&mut self, end: &NodeId, edge: &EdgeId) {
        if let Some(set) = self.adjacency.get_mut(end) {
            set.remove(edge);
            if set.is_empty() {
                self.adjacency.remove(end);
            }
        }
    }

    /// Fold an original edge into the hyperedge between `source` and `target`,
    /// creating it if needed. Returns the hyperedge id.
    pub(crate) fn aggregate_into(&mut self, edge: &EdgeId, source: &NodeId, target: &NodeId) -> EdgeId {
        let hyper_id = EdgeId::hyper(source, target);
        if !self.hyperedges.contains_key(&hyper_id) {
            let hyper = HyperEdge::new(source.clone(), target.clone());
            for end in [source, target] {
                self.hyper_adjacency
                    .entry(end.clone())
                    .or_default()
                    .insert(hyper_id.clone());
            }
            self.hyperedges.insert(hyper_id.clone(), hyper);
        }
        if let Some(hyper) = self.hyperedges.get_mut(&hyper_id) {
            hyper.aggregated_edges.insert(edge.clone());
        }
        self.edge_to_hyper.insert(edge.clone(), hyper_id.clone());
        hyper_id
    }

    /// Take an original edge out of its hyperedge, dropping the hyperedge once
    /// it aggregates nothing. Returns the hyperedge id it left.
    pub(crate) fn release_from_hyperedge(&mut self, edge: &EdgeId) -> Option<EdgeId> {
        let hyper_id = self.edge_to_hyper.remove(edge)?;
        let emptied = match self.hyperedges.get_mut(&hyper_id) {
            Some(hyper) => {
                hyper.aggregated_edges.remove(edge);
                hyper.aggregated_edges.is_empty()
            }
            None => false,
        };
        if emptied {
            if let Some(hyper) = self.hyperedges.remove(&hyper_id) {
                for end in [&hyper.source, &hyper.target] {
                    if let Some(set) = self.hyper_adjacency.get_mut(end) {
                        set.remove(&hyper_id);
                        if set.is_empty() {
                            self.hyper_adjacency.remove(end);
                        }
                    }
                }
            }
        }
        Some(hyper_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn hyperedge_count(&self) -> usize {
        self.hyperedges.len()
    }
}
