//! JSON graph description and the loader that replays it into a state

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::*;
use crate::state::VisualizationState;

/// A whole graph as it arrives from an import step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDocument {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub containers: Vec<ContainerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: NodeStyle,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub hidden: bool,
}

/// Parse a graph document from JSON text.
pub fn parse_document(source: &str) -> anyhow::Result<GraphDocument> {
    let document: GraphDocument =
        serde_json::from_str(source).context("parsing graph document")?;
    Ok(document)
}

/// Read and parse a graph document from disk.
pub fn read_document(path: &Path) -> anyhow::Result<GraphDocument> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading graph document {}", path.display()))?;
    let document = parse_document(&source)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!(
        "Read {}: {} nodes, {} edges, {} containers",
        path.display(),
        document.nodes.len(),
        document.edges.len(),
        document.containers.len()
    );
    Ok(document)
}

impl GraphDocument {
    /// Describe the current state of `state` as a document. Loading it back
    /// yields an equal state.
    pub fn from_state(state: &VisualizationState) -> Self {
        let mut nodes: Vec<NodeRecord> = state
            .graph_nodes()
            .map(|n| NodeRecord {
                id: n.id.clone(),
                label: (n.label != n.id.as_str()).then(|| n.label.clone()),
                style: n.style,
                hidden: n.hidden,
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<EdgeRecord> = state
            .graph_edges()
            .map(|e| EdgeRecord {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                style: e.style,
            })
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let mut containers: Vec<ContainerRecord> = state
            .containers()
            .map(|c| ContainerRecord {
                id: c.id.clone(),
                label: (c.label != c.id.as_str()).then(|| c.label.clone()),
                children: c.children().iter().cloned().collect(),
                collapsed: c.is_collapsed(),
                hidden: c.hidden,
            })
            .collect();
        containers.sort_by(|a, b| a.id.cmp(&b.id));

        GraphDocument {
            nodes,
            edges,
            containers,
        }
    }
}

impl VisualizationState {
    /// Build a state from a document.
    ///
    /// Nodes come first, then every container empty and expanded, then the
    /// hierarchy, then edges. Collapsed flags are applied last, innermost
    /// first, so hyperedges come out exactly as if a user had collapsed each
    /// container by hand.
    pub fn from_document(document: &GraphDocument, config: EngineConfig) -> Result<Self> {
        let mut state = VisualizationState::with_config(config);

        for node in &document.nodes {
            let props = NodeProps::new(node.label.clone().unwrap_or_else(|| node.id.to_string()))
                .style(node.style)
                .hidden(node.hidden);
            state.set_graph_node(&node.id, props)?;
        }
        for container in &document.containers {
            state.set_container(&container.id, container_props(container, Vec::new()))?;
        }
        for container in &document.containers {
            let props = container_props(container, container.children.clone());
            state.set_container(&container.id, props)?;
        }
        for edge in &document.edges {
            let props = EdgeProps::new(&edge.source, &edge.target).style(edge.style);
            state.set_graph_edge(&edge.id, props)?;
        }

        let mut collapsed: Vec<(usize, &NodeId)> = document
            .containers
            .iter()
            .filter(|c| c.collapsed)
            .map(|c| (state.hierarchy().depth(&c.id), &c.id))
            .collect();
        collapsed.sort_by(|a, b| b.cmp(a));
        for (_, id) in collapsed {
            state.collapse_container(id.as_str())?;
        }

        tracing::info!(
            "Loaded graph: {} nodes, {} edges, {} containers, {} hyperedges",
            state.node_count(),
            state.edge_count(),
            state.container_count(),
            state.all_hyperedges().count()
        );
        Ok(state)
    }
}

fn container_props(record: &ContainerRecord, children: Vec<NodeId>) -> ContainerProps {
    let mut props = ContainerProps::new(children).hidden(record.hidden);
    if let Some(label) = &record.label {
        props = props.label(label.clone());
    }
    props
}
