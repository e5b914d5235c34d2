//! Test fixtures for Arbor

use crate::config::EngineConfig;
use crate::model::*;
use crate::state::VisualizationState;

/// Build a state with invariant checking forced on, so every fixture call
/// is validated end-to-end.
pub fn checked_state() -> VisualizationState {
    VisualizationState::with_config(EngineConfig::checked())
}

/// Add plain nodes with their id as label.
pub fn add_nodes(state: &mut VisualizationState, ids: &[&str]) {
    for id in ids {
        state.set_graph_node(*id, NodeProps::new(*id)).unwrap();
    }
}

/// Add edges given as `(id, source, target)`.
pub fn add_edges(state: &mut VisualizationState, edges: &[(&str, &str, &str)]) {
    for (id, source, target) in edges {
        state
            .set_graph_edge(*id, EdgeProps::new(*source, *target))
            .unwrap();
    }
}

/// Two sibling clusters with edges inside and across:
///
/// ```text
/// c1 { n1, n2 }   c2 { n3, n4 }
/// e1: n1 -> n2   e2: n1 -> n3   e3: n3 -> n4   e4: n2 -> n4
/// ```
pub fn two_cluster_state() -> VisualizationState {
    let mut state = checked_state();
    add_nodes(&mut state, &["n1", "n2", "n3", "n4"]);
    add_edges(
        &mut state,
        &[
            ("e1", "n1", "n2"),
            ("e2", "n1", "n3"),
            ("e3", "n3", "n4"),
            ("e4", "n2", "n4"),
        ],
    );
    state
        .set_container("c1", ContainerProps::new(["n1", "n2"]).label("Cluster 1"))
        .unwrap();
    state
        .set_container("c2", ContainerProps::new(["n3", "n4"]).label("Cluster 2"))
        .unwrap();
    state
}

/// A two-level tree with an outside node on each side:
///
/// ```text
/// outer { inner { a, b }, c }     x     y
/// e_ax: a -> x   e_bc: b -> c   e_cx: c -> x
/// e_ab: a -> b   e_yb: y -> b
/// ```
pub fn nested_state() -> VisualizationState {
    let mut state = checked_state();
    add_nodes(&mut state, &["a", "b", "c", "x", "y"]);
    add_edges(
        &mut state,
        &[
            ("e_ax", "a", "x"),
            ("e_bc", "b", "c"),
            ("e_cx", "c", "x"),
            ("e_ab", "a", "b"),
            ("e_yb", "y", "b"),
        ],
    );
    state
        .set_container("inner", ContainerProps::new(["a", "b"]))
        .unwrap();
    state
        .set_container("outer", ContainerProps::new(["inner", "c"]))
        .unwrap();
    state
}

/// Sorted ids of the visible nodes.
pub fn visible_node_ids(state: &VisualizationState) -> Vec<&str> {
    state.visible_nodes().map(|n| n.id.as_str()).collect()
}

/// Hyperedges as `(source, target, aggregated edge ids)`.
pub fn hyperedge_summary(state: &VisualizationState) -> Vec<(String, String, Vec<String>)> {
    state
        .all_hyperedges()
        .map(|h| {
            (
                h.source.to_string(),
                h.target.to_string(),
                h.aggregated_edges.iter().map(|e| e.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_start_fully_expanded() {
        let state = two_cluster_state();
        assert_eq!(visible_node_ids(&state), vec!["n1", "n2", "n3", "n4"]);
        assert_eq!(state.visible_edges().count(), 4);
        assert!(hyperedge_summary(&state).is_empty());

        let state = nested_state();
        assert_eq!(state.parent_of("inner").map(|p| p.as_str()), Some("outer"));
        assert_eq!(state.hierarchy().depth(&NodeId::from("a")), 2);
        assert!(state.validate().is_ok());
    }
}
