//! The visualization state: entity store, hierarchy, visibility and the
//! collapse/expand engine behind one mutation API

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::aggregation::{self, RegroupStats};
use crate::config::EngineConfig;
use crate::error::{EntityKind, Result, VisError};
use crate::hierarchy::HierarchyIndex;
use crate::model::*;
use crate::store::EntityStore;
use crate::visibility::{self, VisibilityCache};

/// A graph of nodes, edges and nested containers together with its derived
/// visible view.
///
/// Every public method runs to completion before returning, and the
/// invariants hold between calls. Mutating methods return `&mut Self` so they
/// chain:
///
/// ```
/// # use arbor_core::{VisualizationState, NodeProps, EdgeProps, ContainerProps};
/// # fn main() -> arbor_core::Result<()> {
/// let mut state = VisualizationState::new();
/// state
///     .set_graph_node("a", NodeProps::new("a"))?
///     .set_graph_node("b", NodeProps::new("b"))?
///     .set_graph_node("x", NodeProps::new("x"))?
///     .set_container("group", ContainerProps::new(["a", "b"]))?
///     .set_graph_edge("e1", EdgeProps::new("a", "x"))?
///     .collapse_container("group")?;
/// assert_eq!(state.all_hyperedges().count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VisualizationState {
    pub(crate) store: EntityStore,
    pub(crate) hierarchy: HierarchyIndex,
    pub(crate) cache: VisibilityCache,
    config: EngineConfig,
    generation: u64,
}

/// Two states are equal when every entity, every hyperedge and the derived
/// view match. Configuration and the generation counter are not compared.
impl PartialEq for VisualizationState {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store && self.hierarchy == other.hierarchy && self.cache == other.cache
    }
}

impl Default for VisualizationState {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualizationState {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        VisualizationState {
            store: EntityStore::new(),
            hierarchy: HierarchyIndex::new(),
            cache: VisibilityCache::new(),
            config,
            generation: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bumped by every call that changed the view. Layout write-back does not
    /// count. A layout computed at an older generation is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Lookups ─────────────────────────────────────────────

    pub fn graph_node(&self, id: &str) -> Option<&GraphNode> {
        self.store.node(id)
    }

    pub fn graph_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.store.edge(id)
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.store.container(id)
    }

    pub fn hyperedge(&self, id: &str) -> Option<&HyperEdge> {
        self.store.hyperedge(id)
    }

    /// The hyperedge drawn from `source` to `target`, if any.
    pub fn hyperedge_between(&self, source: &str, target: &str) -> Option<&HyperEdge> {
        let id = EdgeId::hyper(&NodeId::from(source), &NodeId::from(target));
        self.store.hyperedge(&id)
    }

    /// The hyperedge currently standing in for an original edge.
    pub fn hyperedge_of(&self, edge: &str) -> Option<&HyperEdge> {
        let hyper = self.store.edge_to_hyper.get(edge)?;
        self.store.hyperedge(hyper)
    }

    pub fn graph_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.store.nodes.values()
    }

    pub fn graph_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.store.edges.values()
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.store.containers.values()
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    pub fn container_count(&self) -> usize {
        self.store.container_count()
    }

    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    /// The derived view, for bridges that want the sets directly.
    pub fn cache(&self) -> &VisibilityCache {
        &self.cache
    }

    // ── Visible view ────────────────────────────────────────

    pub fn visible_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.cache
            .visible_nodes()
            .iter()
            .filter_map(move |id| self.store.node(id))
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.cache
            .visible_edges()
            .iter()
            .filter_map(move |id| self.store.edge(id))
    }

    pub fn visible_containers(&self) -> impl Iterator<Item = &Container> {
        self.cache
            .visible_containers()
            .iter()
            .filter_map(move |id| self.store.container(id))
    }

    /// Visible containers that are not collapsed.
    pub fn expanded_containers(&self) -> impl Iterator<Item = &Container> {
        self.cache
            .expanded_containers()
            .iter()
            .filter_map(move |id| self.store.container(id))
    }

    pub fn all_hyperedges(&self) -> impl Iterator<Item = &HyperEdge> {
        self.store.hyperedges.values()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.cache.visible_nodes().contains(id) || self.cache.visible_containers().contains(id)
    }

    pub fn is_edge_visible(&self, id: &str) -> bool {
        self.cache.visible_edges().contains(id)
    }

    // ── Hierarchy ───────────────────────────────────────────

    /// The container directly holding `id`.
    pub fn parent_of(&self, id: &str) -> Option<&NodeId> {
        self.hierarchy.parent_of(id)
    }

    pub fn children_of(&self, container: &str) -> Option<&BTreeSet<NodeId>> {
        self.store.container(container).map(|c| c.children())
    }

    /// Every entity below `container`, depth first.
    pub fn descendants(&self, container: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = match self.store.container(container) {
            Some(c) => c.children.iter().rev().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            if let Some(c) = self.store.container(id) {
                stack.extend(c.children.iter().rev());
            }
        }
        out
    }

    // ── Nodes ───────────────────────────────────────────────

    /// Create or update a node.
    pub fn set_graph_node(&mut self, id: impl Into<NodeId>, props: NodeProps) -> Result<&mut Self> {
        let id = id.into();
        self.store.check_vertex_id(&id, EntityKind::Node)?;

        let refresh = match self.store.nodes.get_mut(&id) {
            Some(node) => {
                let hidden_changed = node.hidden != props.hidden;
                node.label = props.label;
                node.style = props.style;
                node.hidden = props.hidden;
                hidden_changed
            }
            None => {
                self.store.nodes.insert(
                    id.clone(),
                    GraphNode {
                        id: id.clone(),
                        label: props.label,
                        style: props.style,
                        hidden: props.hidden,
                        layout: LayoutInfo::default(),
                    },
                );
                true
            }
        };
        if refresh {
            self.refresh(&[id], BTreeSet::new());
        }
        self.finish()
    }

    /// Remove a node, every edge touching it, and its slot in its parent.
    pub fn remove_graph_node(&mut self, id: &str) -> Result<&mut Self> {
        let id = match self.store.node(id) {
            Some(node) => node.id.clone(),
            None => return Err(VisError::node_not_found(id)),
        };
        let removed = self.drop_edges_touching(&id);
        self.detach_from_parent(&id);
        self.store.nodes.remove(&id);
        self.cache.forget_vertex(&id);
        debug!("Removed node {} and {} edges", id, removed);
        self.finish()
    }

    pub fn set_node_hidden(&mut self, id: &str, hidden: bool) -> Result<&mut Self> {
        let node = self
            .store
            .nodes
            .get_mut(id)
            .ok_or_else(|| VisError::node_not_found(id))?;
        if node.hidden == hidden {
            return Ok(self);
        }
        node.hidden = hidden;
        let id = node.id.clone();
        self.refresh(&[id], BTreeSet::new());
        self.finish()
    }

    /// Record where the layout bridge placed a node.
    /// Record layout for a node. Layout is not part of the view, so the
    /// generation stays put and a `LayoutView` being written back stays fresh.
    pub fn set_node_layout(&mut self, id: &str, layout: LayoutInfo) -> Result<&mut Self> {
        let node = self
            .store
            .nodes
            .get_mut(id)
            .ok_or_else(|| VisError::node_not_found(id))?;
        node.layout = layout;
        Ok(self)
    }

    // ── Edges ───────────────────────────────────────────────

    /// Create or update an edge. Both endpoints must already exist, and the
    /// id must stay clear of the hyperedge namespace.
    pub fn set_graph_edge(&mut self, id: impl Into<EdgeId>, props: EdgeProps) -> Result<&mut Self> {
        let id = id.into();
        if id.is_hyper() {
            return Err(VisError::ReservedId { id: id.0 });
        }
        self.store.require_vertex(&props.source)?;
        self.store.require_vertex(&props.target)?;

        self.store.release_from_hyperedge(&id);
        self.store.put_edge(GraphEdge {
            id: id.clone(),
            source: props.source,
            target: props.target,
            style: props.style,
            hidden: true,
        });
        let edges = BTreeSet::from([id]);
        self.settle_edges(&edges);
        self.finish()
    }

    pub fn remove_graph_edge(&mut self, id: &str) -> Result<&mut Self> {
        let edge = match self.store.edge(id) {
            Some(edge) => edge.id.clone(),
            None => return Err(VisError::edge_not_found(id)),
        };
        self.store.take_edge(&edge);
        self.cache.forget_edge(&edge);
        self.finish()
    }

    // ── Containers ──────────────────────────────────────────

    /// Create or update a container. `props.children` replaces the current
    /// children; each child must exist and must not already sit in another
    /// container. A change of `props.collapsed` collapses or expands.
    pub fn set_container(&mut self, id: impl Into<NodeId>, props: ContainerProps) -> Result<&mut Self> {
        let id = id.into();
        self.store.check_vertex_id(&id, EntityKind::Container)?;
        for child in &props.children {
            self.store.require_vertex(child)?;
            self.hierarchy.check_attach(&id, child)?;
        }

        let children: BTreeSet<NodeId> = props.children.into_iter().collect();
        let (previous, label, layout) = match self.store.containers.remove(&id) {
            Some(old) => (old.children, props.label.unwrap_or(old.label), old.layout),
            None => (BTreeSet::new(), props.label.unwrap_or_else(|| id.to_string()), LayoutInfo::default()),
        };
        let released: Vec<NodeId> = previous.difference(&children).cloned().collect();
        for child in &released {
            self.hierarchy.detach(child);
        }
        for child in children.difference(&previous) {
            self.hierarchy.attach(&id, child);
        }
        self.store.containers.insert(
            id.clone(),
            Container {
                id: id.clone(),
                label,
                children,
                collapsed: props.collapsed,
                hidden: props.hidden,
                layout,
            },
        );

        let mut roots = vec![id];
        roots.extend(released);
        self.refresh(&roots, BTreeSet::new());
        self.finish()
    }

    /// Remove a container. Its children move up to its parent, or to the
    /// root when it has none. Edges touching the container itself go too.
    pub fn remove_container(&mut self, id: &str) -> Result<&mut Self> {
        let container = match self.store.container(id) {
            Some(c) => c.clone(),
            None => return Err(VisError::container_not_found(id)),
        };
        let id = container.id;
        let parent = self.hierarchy.parent_of(&id).cloned();

        let mut stranded = BTreeSet::new();
        for hyper in self.store.hyperedges_touching(&id) {
            if let Some(hyper) = self.store.hyperedge(hyper) {
                stranded.extend(hyper.aggregated_edges.iter().cloned());
            }
        }
        let removed = self.drop_edges_touching(&id);
        self.detach_from_parent(&id);
        self.store.containers.remove(&id);
        self.cache.forget_vertex(&id);

        for child in &container.children {
            self.hierarchy.detach(child);
            if let Some(parent) = &parent {
                self.hierarchy.attach(parent, child);
                if let Some(p) = self.store.containers.get_mut(parent) {
                    p.children.insert(child.clone());
                }
            }
        }
        let roots: Vec<NodeId> = container.children.into_iter().collect();
        self.refresh(&roots, stranded);
        debug!(
            "Removed container {}: {} edges dropped, {} children moved to {}",
            id,
            removed,
            roots.len(),
            parent.as_ref().map_or("root", |p| p.as_str())
        );
        self.finish()
    }

    /// Place `child` inside `parent`. A child already inside another container
    /// has to be detached with [`remove_child`](Self::remove_child) first.
    pub fn add_child(&mut self, parent: &str, child: &str) -> Result<&mut Self> {
        let parent = self.store.require_container(parent)?.id.clone();
        let child = NodeId::from(child);
        self.store.require_vertex(&child)?;
        self.hierarchy.check_attach(&parent, &child)?;
        if self.hierarchy.parent_of(&child) == Some(&parent) {
            return Ok(self);
        }
        if let Some(container) = self.store.containers.get_mut(&parent) {
            container.children.insert(child.clone());
        }
        self.hierarchy.attach(&parent, &child);
        self.refresh(&[child], BTreeSet::new());
        self.finish()
    }

    /// Take `child` out of `parent`; it becomes root-level.
    pub fn remove_child(&mut self, parent: &str, child: &str) -> Result<&mut Self> {
        let container = self.store.require_container(parent)?;
        let Some(child) = container.children.get(child).cloned() else {
            return Err(VisError::NotFound {
                kind: EntityKind::Vertex,
                id: format!("{} in {}", child, parent),
            });
        };
        let parent = container.id.clone();
        if let Some(container) = self.store.containers.get_mut(&parent) {
            container.children.remove(&child);
        }
        self.hierarchy.detach(&child);
        self.refresh(&[child], BTreeSet::new());
        self.finish()
    }

    pub fn set_container_hidden(&mut self, id: &str, hidden: bool) -> Result<&mut Self> {
        let container = self
            .store
            .containers
            .get_mut(id)
            .ok_or_else(|| VisError::container_not_found(id))?;
        if container.hidden == hidden {
            return Ok(self);
        }
        container.hidden = hidden;
        let id = container.id.clone();
        self.refresh(&[id], BTreeSet::new());
        self.finish()
    }

    /// Record where the layout bridge placed a container.
    /// Record layout for a container. Like [`set_node_layout`](Self::set_node_layout),
    /// this leaves the generation alone.
    pub fn set_container_layout(&mut self, id: &str, layout: LayoutInfo) -> Result<&mut Self> {
        let container = self
            .store
            .containers
            .get_mut(id)
            .ok_or_else(|| VisError::container_not_found(id))?;
        container.layout = layout;
        Ok(self)
    }

    // ── Collapse / expand ───────────────────────────────────

    /// Collapse a container: hide its descendants and lift every edge that
    /// now crosses its boundary into a hyperedge. Nested containers keep
    /// their own collapsed flag. No-op when already collapsed.
    pub fn collapse_container(&mut self, id: &str) -> Result<&mut Self> {
        let container = self
            .store
            .containers
            .get_mut(id)
            .ok_or_else(|| VisError::container_not_found(id))?;
        if container.collapsed {
            return Ok(self);
        }
        container.collapsed = true;
        let id = container.id.clone();
        let stats = self.refresh(&[id.clone()], BTreeSet::new());
        debug!(
            "Collapsed {}: {} lifted, {} rerooted, {} internal",
            id, stats.lifted, stats.rerooted, stats.internal
        );
        self.finish()
    }

    /// Expand a container: reveal its direct children and ground the edges
    /// its hyperedges stood in for. Edges still behind another collapsed
    /// container are lifted again there. Collapsed children stay collapsed.
    /// No-op when already expanded.
    pub fn expand_container(&mut self, id: &str) -> Result<&mut Self> {
        let container = self
            .store
            .containers
            .get_mut(id)
            .ok_or_else(|| VisError::container_not_found(id))?;
        if !container.collapsed {
            return Ok(self);
        }
        container.collapsed = false;
        let id = container.id.clone();
        let stats = self.refresh(&[id.clone()], BTreeSet::new());
        debug!(
            "Expanded {}: {} grounded, {} rerooted, {} lifted",
            id, stats.grounded, stats.rerooted, stats.lifted
        );
        self.finish()
    }

    pub fn toggle_container(&mut self, id: &str) -> Result<&mut Self> {
        let collapsed = self
            .store
            .container(id)
            .ok_or_else(|| VisError::container_not_found(id))?
            .collapsed;
        if collapsed {
            self.expand_container(id)
        } else {
            self.collapse_container(id)
        }
    }

    /// Collapse every container, innermost first.
    pub fn collapse_all(&mut self) -> Result<&mut Self> {
        let mut order = self.containers_by_depth();
        order.reverse();
        for id in order {
            self.collapse_container(id.as_str())?;
        }
        info!("Collapsed all {} containers", self.container_count());
        Ok(self)
    }

    /// Expand every container, outermost first.
    pub fn expand_all(&mut self) -> Result<&mut Self> {
        for id in self.containers_by_depth() {
            self.expand_container(id.as_str())?;
        }
        info!("Expanded all {} containers", self.container_count());
        Ok(self)
    }

    /// Containers ordered outermost first, ties by id.
    fn containers_by_depth(&self) -> Vec<NodeId> {
        let mut order: Vec<(usize, NodeId)> = self
            .store
            .containers
            .keys()
            .map(|id| (self.hierarchy.depth(id), id.clone()))
            .collect();
        order.sort();
        order.into_iter().map(|(_, id)| id).collect()
    }

    // ── Validation ──────────────────────────────────────────

    /// Re-check all invariants from scratch.
    pub fn validate(&self) -> Result<()> {
        visibility::validate(&self.store, &self.hierarchy, &self.cache)
    }

    // ── Internals ───────────────────────────────────────────

    /// Recompute visibility under each root, then move every edge touching
    /// the recomputed region (plus `extra`) to its placement.
    fn refresh(&mut self, roots: &[NodeId], extra: BTreeSet<EdgeId>) -> RegroupStats {
        let mut touched = BTreeSet::new();
        for root in roots {
            visibility::refresh_subtree(&mut self.cache, &self.store, &self.hierarchy, root, &mut touched);
        }
        let mut edges = aggregation::affected_edges(&self.store, &touched);
        edges.extend(extra);
        self.settle_edges(&edges)
    }

    fn settle_edges(&mut self, edges: &BTreeSet<EdgeId>) -> RegroupStats {
        visibility::refresh_edges(&mut self.cache, &mut self.store, edges);
        aggregation::regroup(&mut self.store, &self.hierarchy, &self.cache, edges)
    }

    fn drop_edges_touching(&mut self, id: &NodeId) -> usize {
        let edges: HashSet<EdgeId> = self.store.edges_touching(id).cloned().collect();
        for edge in &edges {
            self.store.take_edge(edge);
            self.cache.forget_edge(edge);
        }
        edges.len()
    }

    fn detach_from_parent(&mut self, id: &NodeId) {
        if let Some(parent) = self.hierarchy.detach(id) {
            if let Some(container) = self.store.containers.get_mut(&parent) {
                container.children.remove(id);
            }
        }
    }

    fn finish(&mut self) -> Result<&mut Self> {
        self.generation += 1;
        if self.config.validate_invariants {
            self.validate()?;
        }
        Ok(self)
    }
}
