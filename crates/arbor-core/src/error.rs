//! Error type shared by every engine operation

use std::fmt;

use thiserror::Error;

use crate::model::NodeId;

/// Which entity table a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Edge,
    Container,
    HyperEdge,
    /// A node or a container.
    Vertex,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
            EntityKind::Container => "container",
            EntityKind::HyperEdge => "hyperedge",
            EntityKind::Vertex => "node or container",
        };
        f.write_str(name)
    }
}

/// Failure of a public engine call. Every variant except
/// `InvariantViolation` is raised before any write, so a failed call leaves
/// the state exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("cannot place {child} under {parent}: {child} is {parent} or one of its ancestors")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("cannot place {child} under {parent}: it already belongs to {existing}")]
    AlreadyParented {
        child: NodeId,
        parent: NodeId,
        existing: NodeId,
    },

    #[error("id {id} is already used by a {existing}")]
    IdConflict { id: String, existing: EntityKind },

    #[error("edge id {id} uses the prefix reserved for hyperedges")]
    ReservedId { id: String },

    /// The engine broke one of its own invariants. This is a defect, never a
    /// usage error.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl VisError {
    pub fn node_not_found(id: impl fmt::Display) -> Self {
        VisError::NotFound {
            kind: EntityKind::Node,
            id: id.to_string(),
        }
    }

    pub fn container_not_found(id: impl fmt::Display) -> Self {
        VisError::NotFound {
            kind: EntityKind::Container,
            id: id.to_string(),
        }
    }

    pub fn vertex_not_found(id: impl fmt::Display) -> Self {
        VisError::NotFound {
            kind: EntityKind::Vertex,
            id: id.to_string(),
        }
    }

    pub fn edge_not_found(id: impl fmt::Display) -> Self {
        VisError::NotFound {
            kind: EntityKind::Edge,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VisError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, VisError>;
