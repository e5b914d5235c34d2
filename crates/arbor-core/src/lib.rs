//! Arbor Core — hierarchical visibility and hyperedge lifting for graph diagrams

pub mod model;
pub mod error;
pub mod config;
pub mod hierarchy;
pub mod store;
pub mod visibility;
pub mod aggregation;
pub mod state;
pub mod import;
pub mod bridge;
pub mod diff;


#[cfg(test)]
pub mod test_utils;

pub use model::{
    Container, ContainerProps, Dimensions, EdgeId, EdgeProps, EdgeStyle, GraphEdge, GraphNode, HyperEdge,
    LayoutInfo, NodeId, NodeProps, NodeStyle, Position,
};
pub use error::{EntityKind, Result, VisError};
pub use config::EngineConfig;
pub use hierarchy::HierarchyIndex;
pub use visibility::VisibilityCache;
pub use aggregation::{CrossingResolution, Placement, RegroupStats};
pub use state::VisualizationState;
pub use import::{GraphDocument, read_document, parse_document};
pub use bridge::{LayoutGraph, LayoutView, RenderView, apply_layout};
pub use diff::{DiffEngine, ViewDiff, ViewSnapshot};
