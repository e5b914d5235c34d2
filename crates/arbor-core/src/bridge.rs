//! Layout and render bridges over the visible view
//!
//! Neither bridge ever sees a hidden entity. The layout bridge treats a
//! collapsed container exactly like a plain node and does not distinguish
//! hyperedges from edges; the render bridge keeps both distinctions.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;

use crate::error::{Result, VisError};
use crate::model::*;
use crate::state::VisualizationState;

/// A leaf of the layout: a visible node or a visible collapsed container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub id: NodeId,
    pub label: String,
    /// Nearest visible ancestor, always an expanded container.
    pub parent: Option<NodeId>,
}

/// A visible expanded container, laid out around its visible children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutContainer {
    pub id: NodeId,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A visible edge or a hyperedge. `weight` counts the original edges drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: usize,
}

/// What a layout engine gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutView {
    /// Generation of the state this view was taken from. Results computed
    /// for an older generation are stale.
    pub generation: u64,
    pub nodes: Vec<LayoutNode>,
    pub containers: Vec<LayoutContainer>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutView {
    pub fn capture(state: &VisualizationState) -> Self {
        let mut nodes: Vec<LayoutNode> = state
            .visible_nodes()
            .map(|n| LayoutNode {
                id: n.id.clone(),
                label: n.label.clone(),
                parent: visible_parent(state, &n.id),
            })
            .collect();
        let mut containers = Vec::new();
        for container in state.visible_containers() {
            let parent = visible_parent(state, &container.id);
            if container.is_collapsed() {
                nodes.push(LayoutNode {
                    id: container.id.clone(),
                    label: container.label.clone(),
                    parent,
                });
            } else {
                containers.push(LayoutContainer {
                    id: container.id.clone(),
                    label: container.label.clone(),
                    parent,
                    children: visible_children(state, container),
                });
            }
        }
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let edges = state
            .visible_edges()
            .map(|e| LayoutEdge {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                weight: 1,
            })
            .chain(state.all_hyperedges().map(|h| LayoutEdge {
                id: h.id.clone(),
                source: h.source.clone(),
                target: h.target.clone(),
                weight: h.count(),
            }))
            .collect();

        LayoutView {
            generation: state.generation(),
            nodes,
            containers,
            edges,
        }
    }

    /// Whether `state` has changed since this view was captured.
    pub fn is_stale(&self, state: &VisualizationState) -> bool {
        self.generation != state.generation()
    }

    /// The visible graph as a petgraph, with leaves and expanded containers
    /// as vertices.
    pub fn to_graph(&self) -> LayoutGraph {
        let mut graph = LayoutGraph::new();
        for node in &self.nodes {
            graph.add_vertex(node.id.clone());
        }
        for container in &self.containers {
            graph.add_vertex(container.id.clone());
        }
        for edge in &self.edges {
            graph.add_edge(edge.clone());
        }
        graph
    }
}

fn visible_parent(state: &VisualizationState, id: &NodeId) -> Option<NodeId> {
    state
        .hierarchy()
        .ancestors(id)
        .find(|a| state.is_visible(a.as_str()))
        .cloned()
}

fn visible_children(state: &VisualizationState, container: &Container) -> Vec<NodeId> {
    container
        .children()
        .iter()
        .filter(|c| state.is_visible(c.as_str()))
        .cloned()
        .collect()
}

/// Directed multigraph of the visible view, with stable indices.
pub struct LayoutGraph {
    inner: StableDiGraph<NodeId, LayoutEdge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for LayoutGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl LayoutGraph {
    pub fn new() -> Self {
        LayoutGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    fn add_vertex(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id, idx);
        idx
    }

    fn add_edge(&mut self, edge: LayoutEdge) {
        let source = self.add_vertex(edge.source.clone());
        let target = self.add_vertex(edge.target.clone());
        self.inner.add_edge(source, target, edge);
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Outgoing edges of a vertex.
    pub fn edges_from(&self, source: &str) -> impl Iterator<Item = &LayoutEdge> {
        self.directed(source, Direction::Outgoing)
    }

    /// Incoming edges of a vertex.
    pub fn edges_to(&self, target: &str) -> impl Iterator<Item = &LayoutEdge> {
        self.directed(target, Direction::Incoming)
    }

    fn directed(&self, id: &str, direction: Direction) -> impl Iterator<Item = &LayoutEdge> {
        self.index
            .get(id)
            .into_iter()
            .flat_map(move |&idx| self.inner.edges_directed(idx, direction))
            .map(|edge_ref| edge_ref.weight())
    }

    /// Sum of edge weights from `source` to `target`.
    pub fn weight_between(&self, source: &str, target: &str) -> usize {
        self.edges_from(source)
            .filter(|e| e.target.as_str() == target)
            .map(|e| e.weight)
            .sum()
    }

    /// The underlying petgraph, for running layout algorithms directly.
    pub fn as_petgraph(&self) -> &StableDiGraph<NodeId, LayoutEdge> {
        &self.inner
    }
}

impl Default for LayoutGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Write layout results back. Ids may name nodes or containers; unknown ids
/// are rejected before anything is written. Returns how many were applied.
pub fn apply_layout<I>(state: &mut VisualizationState, results: I) -> Result<usize>
where
    I: IntoIterator<Item = (NodeId, LayoutInfo)>,
{
    let results: Vec<(NodeId, LayoutInfo)> = results.into_iter().collect();
    if let Some((id, _)) = results
        .iter()
        .find(|(id, _)| state.graph_node(id.as_str()).is_none() && state.container(id.as_str()).is_none())
    {
        return Err(VisError::vertex_not_found(id));
    }
    for (id, layout) in &results {
        if state.graph_node(id.as_str()).is_some() {
            state.set_node_layout(id.as_str(), *layout)?;
        } else {
            state.set_container_layout(id.as_str(), *layout)?;
        }
    }
    Ok(results.len())
}

// ── Render bridge ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub label: String,
    pub style: NodeStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(skip_serializing_if = "LayoutInfo::is_empty")]
    pub layout: LayoutInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderContainer {
    pub id: NodeId,
    pub label: String,
    pub collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    #[serde(skip_serializing_if = "LayoutInfo::is_empty")]
    pub layout: LayoutInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub style: EdgeStyle,
    /// Number of original edges, set for hyperedges only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<usize>,
}

/// Everything a renderer needs, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderView {
    pub generation: u64,
    pub nodes: Vec<RenderNode>,
    pub containers: Vec<RenderContainer>,
    pub edges: Vec<RenderEdge>,
}

impl RenderView {
    pub fn capture(state: &VisualizationState) -> Self {
        let nodes = state
            .visible_nodes()
            .map(|n| RenderNode {
                id: n.id.clone(),
                label: n.label.clone(),
                style: n.style,
                parent: visible_parent(state, &n.id),
                layout: *n.layout(),
            })
            .collect();
        let containers = state
            .visible_containers()
            .map(|c| RenderContainer {
                id: c.id.clone(),
                label: c.label.clone(),
                collapsed: c.is_collapsed(),
                parent: visible_parent(state, &c.id),
                children: visible_children(state, c),
                layout: *c.layout(),
            })
            .collect();
        let edges = state
            .visible_edges()
            .map(|e| RenderEdge {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                style: e.style,
                aggregates: None,
            })
            .chain(state.all_hyperedges().map(|h| RenderEdge {
                id: h.id.clone(),
                source: h.source.clone(),
                target: h.target.clone(),
                style: h.style,
                aggregates: Some(h.count()),
            }))
            .collect();
        RenderView {
            generation: state.generation(),
            nodes,
            containers,
            edges,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
