//! Edge aggregation for collapsed containers
//!
//! Every original edge is in one of four places: drawn as itself, hidden
//! inside a single collapsed boundary, hidden with nothing to stand in for it,
//! or folded into the hyperedge between two boundaries. Collapse and expand
//! change the boundaries; [`regroup`] then moves each affected edge from where
//! it is to where it belongs, one [`CrossingResolution`] per edge.

use std::collections::BTreeSet;

use crate::hierarchy::HierarchyIndex;
use crate::model::{EdgeId, GraphEdge, HyperEdge, NodeId};
use crate::store::EntityStore;
use crate::visibility::VisibilityCache;

/// Where an original edge belongs under the current visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Both endpoints are visible; the edge is drawn as itself.
    Visible,
    /// Both endpoints sit behind the same collapsed container.
    Internal,
    /// An endpoint is hidden with no drawable stand-in, or the stand-in is a
    /// visible expanded container.
    Suppressed,
    /// Drawn as part of the hyperedge between these two boundaries.
    Boundary { source: NodeId, target: NodeId },
}

/// The transition one edge takes to get from its current hyperedge
/// membership to its [`Placement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossingResolution {
    /// Already where it belongs.
    Settled,
    /// Hidden with no hyperedge. `from` is the hyperedge it leaves, if any.
    Internal { from: Option<EdgeId> },
    /// Both endpoints visible again: leave the hyperedge and draw the edge.
    Ground { from: EdgeId },
    /// A plain edge starts crossing a boundary: fold it into a hyperedge.
    Lift { source: NodeId, target: NodeId },
    /// An aggregated edge whose boundary moved, e.g. its inner container was
    /// just nested inside a newly collapsed one.
    Reroot {
        from: EdgeId,
        source: NodeId,
        target: NodeId,
    },
}

/// Tally of the resolutions applied by one [`regroup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegroupStats {
    pub lifted: usize,
    pub rerooted: usize,
    pub grounded: usize,
    pub internal: usize,
    pub settled: usize,
}

impl RegroupStats {
    fn record(&mut self, resolution: &CrossingResolution) {
        match resolution {
            CrossingResolution::Settled => self.settled += 1,
            CrossingResolution::Internal { .. } => self.internal += 1,
            CrossingResolution::Ground { .. } => self.grounded += 1,
            CrossingResolution::Lift { .. } => self.lifted += 1,
            CrossingResolution::Reroot { .. } => self.rerooted += 1,
        }
    }

    /// Number of edges that changed hyperedge membership.
    pub fn moved(&self) -> usize {
        self.lifted + self.rerooted + self.grounded
    }
}

/// The visible entity that stands in for `id`: the entity itself when
/// visible, otherwise its outermost collapsed ancestor when that one is
/// visible. Directly hidden entities have no stand-in.
pub fn boundary_of(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
    id: &NodeId,
) -> Option<NodeId> {
    if cache.is_visible(id) {
        return Some(id.clone());
    }
    if store.is_directly_hidden(id) {
        return None;
    }
    let outermost = hierarchy
        .ancestors(id)
        .filter(|a| store.is_collapsed(a))
        .last()?;
    cache.is_visible(outermost).then(|| outermost.clone())
}

/// Resolve where `edge` belongs, from scratch.
pub fn placement(
    store: &EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
    edge: &GraphEdge,
) -> Placement {
    if cache.is_visible(&edge.source) && cache.is_visible(&edge.target) {
        return Placement::Visible;
    }
    let source = boundary_of(store, hierarchy, cache, &edge.source);
    let target = boundary_of(store, hierarchy, cache, &edge.target);
    let (Some(source), Some(target)) = (source, target) else {
        return Placement::Suppressed;
    };
    if source == target {
        return Placement::Internal;
    }
    // Hyperedges never touch a visible container that is still open.
    let expanded = cache.expanded_containers();
    if expanded.contains(&source) || expanded.contains(&target) {
        return Placement::Suppressed;
    }
    Placement::Boundary { source, target }
}

/// Compare an edge's current hyperedge with its placement.
pub fn classify(current: Option<&HyperEdge>, placement: Placement) -> CrossingResolution {
    match (current, placement) {
        (Some(hyper), Placement::Boundary { source, target })
            if hyper.source == source && hyper.target == target =>
        {
            CrossingResolution::Settled
        }
        (Some(hyper), Placement::Boundary { source, target }) => CrossingResolution::Reroot {
            from: hyper.id.clone(),
            source,
            target,
        },
        (None, Placement::Boundary { source, target }) => {
            CrossingResolution::Lift { source, target }
        }
        (Some(hyper), Placement::Visible) => CrossingResolution::Ground {
            from: hyper.id.clone(),
        },
        (None, Placement::Visible) => CrossingResolution::Settled,
        (current, Placement::Internal | Placement::Suppressed) => CrossingResolution::Internal {
            from: current.map(|h| h.id.clone()),
        },
    }
}

fn apply(store: &mut EntityStore, edge: &EdgeId, resolution: &CrossingResolution) {
    match resolution {
        CrossingResolution::Settled => {}
        CrossingResolution::Internal { from } => {
            if from.is_some() {
                store.release_from_hyperedge(edge);
            }
        }
        CrossingResolution::Ground { .. } => {
            store.release_from_hyperedge(edge);
        }
        CrossingResolution::Lift { source, target } => {
            store.aggregate_into(edge, source, target);
        }
        CrossingResolution::Reroot { source, target, .. } => {
            store.release_from_hyperedge(edge);
            store.aggregate_into(edge, source, target);
        }
    }
}

/// Original edges touching any of `vertices`, plus everything aggregated by
/// hyperedges rooted at them.
pub fn affected_edges(store: &EntityStore, vertices: &BTreeSet<NodeId>) -> BTreeSet<EdgeId> {
    let mut edges = BTreeSet::new();
    for vertex in vertices {
        edges.extend(store.edges_touching(vertex).cloned());
        for hyper in store.hyperedges_touching(vertex) {
            if let Some(hyper) = store.hyperedge(hyper) {
                edges.extend(hyper.aggregated_edges.iter().cloned());
            }
        }
    }
    edges
}

/// Move every edge in `edges` to its placement. Vertex visibility in `cache`
/// must already be current.
pub fn regroup(
    store: &mut EntityStore,
    hierarchy: &HierarchyIndex,
    cache: &VisibilityCache,
    edges: &BTreeSet<EdgeId>,
) -> RegroupStats {
    let mut stats = RegroupStats::default();
    for id in edges {
        let Some(edge) = store.edge(id) else {
            continue;
        };
        let placement = placement(store, hierarchy, cache, edge);
        let resolution = classify(store.hyperedge_of(id), placement);
        apply(store, id, &resolution);
        stats.record(&resolution);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyper(source: &str, target: &str) -> HyperEdge {
        HyperEdge::new(NodeId::from(source), NodeId::from(target))
    }

    fn boundary(source: &str, target: &str) -> Placement {
        Placement::Boundary {
            source: NodeId::from(source),
            target: NodeId::from(target),
        }
    }

    #[test]
    fn classify_covers_each_transition() {
        let d_to_x = hyper("d", "x");

        assert_eq!(
            classify(None, boundary("c", "x")),
            CrossingResolution::Lift {
                source: NodeId::from("c"),
                target: NodeId::from("x"),
            }
        );
        assert_eq!(
            classify(Some(&d_to_x), boundary("d", "x")),
            CrossingResolution::Settled
        );
        assert_eq!(
            classify(Some(&d_to_x), boundary("c", "x")),
            CrossingResolution::Reroot {
                from: d_to_x.id.clone(),
                source: NodeId::from("c"),
                target: NodeId::from("x"),
            }
        );
        assert_eq!(
            classify(Some(&d_to_x), Placement::Visible),
            CrossingResolution::Ground {
                from: d_to_x.id.clone()
            }
        );
        assert_eq!(classify(None, Placement::Visible), CrossingResolution::Settled);
        assert_eq!(
            classify(Some(&d_to_x), Placement::Internal),
            CrossingResolution::Internal {
                from: Some(d_to_x.id.clone())
            }
        );
        assert_eq!(
            classify(None, Placement::Suppressed),
            CrossingResolution::Internal { from: None }
        );
    }

    #[test]
    fn direction_matters_for_boundary_pairs() {
        let c_to_x = hyper("c", "x");
        assert!(matches!(
            classify(Some(&c_to_x), boundary("x", "c")),
            CrossingResolution::Reroot { .. }
        ));
    }

    #[test]
    fn stats_count_moves() {
        let mut stats = RegroupStats::default();
        stats.record(&CrossingResolution::Settled);
        stats.record(&CrossingResolution::Lift {
            source: NodeId::from("c"),
            target: NodeId::from("x"),
        });
        stats.record(&CrossingResolution::Ground {
            from: EdgeId::from("h"),
        });
        assert_eq!(stats.moved(), 2);
        assert_eq!(stats.settled, 1);
    }
}
