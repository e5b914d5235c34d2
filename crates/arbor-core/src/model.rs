//! Core data structures for the visibility engine

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node or a container. Both live in one id space, so an edge
/// endpoint can name either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

/// Identifier of an edge or a hyperedge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }

    /// Prefix reserved for derived hyperedge ids.
    pub const HYPER_PREFIX: &'static str = "hyper:";

    /// The id of the hyperedge between two boundaries. Derived from the
    /// endpoints so that a hyperedge torn down and rebuilt comes back equal.
    /// Endpoints are escaped (`\` and `>`), so `->` inside an id can never
    /// be read as the separator and distinct pairs get distinct ids.
    pub fn hyper(source: &NodeId, target: &NodeId) -> Self {
        let mut id = String::with_capacity(Self::HYPER_PREFIX.len() + source.0.len() + target.0.len() + 2);
        id.push_str(Self::HYPER_PREFIX);
        escape_endpoint(&mut id, source.as_str());
        id.push_str("->");
        escape_endpoint(&mut id, target.as_str());
        EdgeId(id)
    }

    /// Whether the id lies in the namespace of derived hyperedge ids.
    pub fn is_hyper(&self) -> bool {
        self.0.starts_with(Self::HYPER_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape_endpoint(out: &mut String, id: &str) {
    for ch in id.chars() {
        if ch == '\\' || ch == '>' {
            out.push('\\');
        }
        out.push(ch);
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EdgeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EdgeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        EdgeId(id.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        EdgeId(id)
    }
}

impl From<&EdgeId> for EdgeId {
    fn from(id: &EdgeId) -> Self {
        id.clone()
    }
}

/// Visual style of a node or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStyle {
    #[default]
    Default,
    Highlighted,
    Selected,
    Warning,
    Error,
}

/// Visual style of an edge or hyperedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    #[default]
    Default,
    Highlighted,
    Dashed,
    Thick,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Layout payload written back by the layout bridge. The engine never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LayoutInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl LayoutInfo {
    pub fn at(x: f64, y: f64) -> Self {
        LayoutInfo {
            position: Some(Position { x, y }),
            dimensions: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.dimensions = Some(Dimensions { width, height });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.dimensions.is_none()
    }
}

/// A leaf vertex of the diagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub style: NodeStyle,
    /// Direct hidden flag, set by the user or the import. Containment never
    /// writes it.
    pub hidden: bool,
    pub(crate) layout: LayoutInfo,
}

impl GraphNode {
    pub fn layout(&self) -> &LayoutInfo {
        &self.layout
    }
}

/// A directed edge between two nodes and/or containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub style: EdgeStyle,
    /// Derived: true whenever either endpoint is not visible.
    pub hidden: bool,
}

impl GraphEdge {
    /// The endpoint opposite `end`, if `end` is an endpoint at all.
    pub fn other_end(&self, end: &NodeId) -> Option<&NodeId> {
        if &self.source == end {
            Some(&self.target)
        } else if &self.target == end {
            Some(&self.source)
        } else {
            None
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A collapsible group of nodes and other containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub id: NodeId,
    pub label: String,
    pub(crate) children: BTreeSet<NodeId>,
    pub(crate) collapsed: bool,
    /// Direct hidden flag, analogous to [`GraphNode::hidden`].
    pub hidden: bool,
    pub(crate) layout: LayoutInfo,
}

impl Container {
    /// The children set. This is the only record of parent/child structure;
    /// the hierarchy index is derived from it.
    pub fn children(&self) -> &BTreeSet<NodeId> {
        &self.children
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn layout(&self) -> &LayoutInfo {
        &self.layout
    }
}

/// A synthetic edge standing in for hidden edges that cross the boundary of
/// one or more collapsed containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HyperEdge {
    pub id: EdgeId,
    /// A visible node or a visible, collapsed container.
    pub source: NodeId,
    /// A visible node or a visible, collapsed container.
    pub target: NodeId,
    pub style: EdgeStyle,
    /// The original edges this hyperedge currently stands in for. Kept ordered
    /// so that rebuilding a hyperedge yields an identical record.
    pub aggregated_edges: BTreeSet<EdgeId>,
}

impl HyperEdge {
    pub(crate) fn new(source: NodeId, target: NodeId) -> Self {
        HyperEdge {
            id: EdgeId::hyper(&source, &target),
            source,
            target,
            style: EdgeStyle::Default,
            aggregated_edges: BTreeSet::new(),
        }
    }

    /// How many original edges this represents.
    pub fn count(&self) -> usize {
        self.aggregated_edges.len()
    }

    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// Properties accepted by `set_graph_node`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeProps {
    pub label: String,
    pub style: NodeStyle,
    pub hidden: bool,
}

impl NodeProps {
    pub fn new(label: impl Into<String>) -> Self {
        NodeProps {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn style(mut self, style: NodeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Properties accepted by `set_graph_edge`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeProps {
    pub source: NodeId,
    pub target: NodeId,
    pub style: EdgeStyle,
}

impl EdgeProps {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        EdgeProps {
            source: source.into(),
            target: target.into(),
            style: EdgeStyle::Default,
        }
    }

    pub fn style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }
}

/// Properties accepted by `set_container`. The children list replaces the
/// container's current children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerProps {
    pub label: Option<String>,
    pub children: Vec<NodeId>,
    pub collapsed: bool,
    pub hidden: bool,
}

impl ContainerProps {
    pub fn new<I, T>(children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        ContainerProps {
            children: children.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}
