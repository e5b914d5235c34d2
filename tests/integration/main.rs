//! Integration tests for Arbor
//!
//! These tests load graph documents from disk and drive both the library and
//! the `arbor` binary end to end.

use std::path::{Path, PathBuf};
use std::process::Command;

use arbor_core::{
    DiffEngine, EngineConfig, GraphDocument, LayoutView, RenderView, ViewSnapshot, VisualizationState,
    apply_layout, read_document,
};
use tempfile::TempDir;

const SERVICES: &str = r#"{
    "nodes": [
        { "id": "api" }, { "id": "auth" }, { "id": "db" },
        { "id": "cache" }, { "id": "worker" }, { "id": "client", "style": "highlighted" }
    ],
    "containers": [
        { "id": "backend", "label": "Backend", "children": ["core", "worker"] },
        { "id": "core", "children": ["api", "auth"] },
        { "id": "storage", "children": ["db", "cache"], "collapsed": true }
    ],
    "edges": [
        { "id": "client-api", "source": "client", "target": "api" },
        { "id": "api-auth", "source": "api", "target": "auth" },
        { "id": "api-db", "source": "api", "target": "db" },
        { "id": "auth-db", "source": "auth", "target": "db" },
        { "id": "worker-cache", "source": "worker", "target": "cache" },
        { "id": "worker-api", "source": "worker", "target": "api", "style": "dashed" }
    ]
}"#;

fn write_graph(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("graph.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn load(path: &Path) -> VisualizationState {
    let document = read_document(path).unwrap();
    VisualizationState::from_document(&document, EngineConfig::checked()).unwrap()
}

fn arbor(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(args)
        .output()
        .expect("Failed to execute arbor")
}

/// Loading applies the document's collapsed flags.
#[test]
fn test_load_from_disk() {
    let dir = TempDir::new().unwrap();
    let state = load(&write_graph(&dir, SERVICES));

    assert_eq!(state.node_count(), 6);
    assert_eq!(state.container_count(), 3);
    assert!(state.is_visible("storage"));
    assert!(!state.is_visible("db"));

    let to_storage = state.hyperedge_between("core", "storage");
    assert!(to_storage.is_none(), "core is expanded, its children keep their own hyperedges");
    let api = state.hyperedge_between("api", "storage").unwrap();
    assert_eq!(api.count(), 1);
    assert_eq!(state.hyperedge_between("auth", "storage").unwrap().count(), 1);
    assert_eq!(state.hyperedge_between("worker", "storage").unwrap().count(), 1);
}

/// Collapsing the whole backend folds six edges into two hyperedges and the
/// exact prior state comes back on expand.
#[test]
fn test_collapse_backend_and_restore() {
    let dir = TempDir::new().unwrap();
    let mut state = load(&write_graph(&dir, SERVICES));
    let before = state.clone();

    state.collapse_container("backend").unwrap();
    let ids: Vec<&str> = state.all_hyperedges().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["hyper:backend->storage", "hyper:client->backend"]);
    assert_eq!(state.hyperedge_between("backend", "storage").unwrap().count(), 3);
    assert_eq!(state.visible_edges().count(), 0);

    state.expand_container("backend").unwrap();
    assert_eq!(state, before);
}

/// The layout bridge round trip: capture, lay out, write back, detect staleness.
#[test]
fn test_layout_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut state = load(&write_graph(&dir, SERVICES));
    state.collapse_container("core").unwrap();

    let view = LayoutView::capture(&state);
    let graph = view.to_graph();
    assert!(graph.contains("core"));
    assert!(graph.contains("storage"));
    assert!(!graph.contains("api"));
    assert_eq!(graph.weight_between("core", "storage"), 2);

    let positions = view
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), arbor_core::LayoutInfo::at(i as f64 * 100.0, 0.0)));
    let applied = apply_layout(&mut state, positions).unwrap();
    assert_eq!(applied, view.nodes.len());
    assert!(!view.is_stale(&state));

    let render = RenderView::capture(&state);
    assert!(render.nodes.iter().all(|n| n.layout.position.is_some()));
    assert!(render.containers.iter().any(|c| c.id.as_str() == "core" && c.collapsed));

    state.expand_container("core").unwrap();
    assert!(view.is_stale(&state));
}

/// Diffs across a scripted session add up to the final view.
#[test]
fn test_diff_sequence() {
    let dir = TempDir::new().unwrap();
    let mut state = load(&write_graph(&dir, SERVICES));
    let mut engine = DiffEngine::new();
    let mut previous = ViewSnapshot::capture(&state);

    let mut diffs = Vec::new();
    for id in ["storage", "core", "backend"] {
        state.toggle_container(id).unwrap();
        let current = ViewSnapshot::capture(&state);
        diffs.push(engine.compute_diff(&previous, &current));
        previous = current;
    }

    assert_eq!(diffs.iter().map(|d| d.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    let shown: Vec<&str> = diffs[0].shown_nodes.iter().map(|n| n.as_str()).collect();
    assert_eq!(shown, vec!["cache", "db"]);
    assert!(diffs[1].concealed_nodes.iter().any(|n| n.as_str() == "api"));
    assert!(diffs[2].concealed_containers.iter().any(|c| c.as_str() == "core"));
}

/// Exporting a modified state and loading it back gives the same state.
#[test]
fn test_document_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut state = load(&write_graph(&dir, SERVICES));
    state.collapse_container("core").unwrap();
    state.set_node_hidden("worker", true).unwrap();

    let exported = serde_json::to_string_pretty(&GraphDocument::from_state(&state)).unwrap();
    let path = dir.path().join("exported.json");
    std::fs::write(&path, exported).unwrap();
    assert_eq!(load(&path), state);
}

#[test]
fn test_cli_help() {
    let output = arbor(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Collapse, expand and inspect hierarchical graph diagrams"));
}

#[test]
fn test_cli_view_prints_render_view() {
    let dir = TempDir::new().unwrap();
    let graph = write_graph(&dir, SERVICES);
    let output = arbor(&["view", graph.to_str().unwrap(), "--collapse", "backend", "--expand", "storage"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let nodes: Vec<&str> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(nodes, vec!["cache", "client", "db"]);
    let hyper = json["edges"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == "hyper:backend->db")
        .unwrap();
    assert_eq!(hyper["aggregates"], 2);
}

#[test]
fn test_cli_script_prints_one_diff_per_step() {
    let dir = TempDir::new().unwrap();
    let graph = write_graph(&dir, SERVICES);
    let output = arbor(&["script", graph.to_str().unwrap(), "expand:storage", "collapse:core", "toggle:core"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let diffs: Vec<serde_json::Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(diffs.len(), 3);
    assert_eq!(diffs[2]["sequence"], 3);
    assert_eq!(diffs[1]["toggled_containers"][0], "core");
}

#[test]
fn test_cli_reports_errors() {
    let dir = TempDir::new().unwrap();
    let graph = write_graph(&dir, SERVICES);

    let output = arbor(&["view", graph.to_str().unwrap(), "--collapse", "nowhere"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("container not found: nowhere"));

    let output = arbor(&["script", graph.to_str().unwrap(), "fold:core"]);
    assert!(!output.status.success());

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ \"nodes\": [ { \"id\": \"a\" } ], \"edges\": [ { \"id\": \"e\", \"source\": \"a\", \"target\": \"b\" } ] }").unwrap();
    let output = arbor(&["check", broken.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_check_with_config() {
    let dir = TempDir::new().unwrap();
    let graph = write_graph(&dir, SERVICES);
    let config = dir.path().join("arbor.toml");
    std::fs::write(&config, "validate_invariants = true\n").unwrap();

    let output = arbor(&["check", graph.to_str().unwrap(), "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("containers:  3"));
    assert!(stdout.trim_end().ends_with("ok"));
}
