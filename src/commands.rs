//! CLI command implementations

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use arbor_core::{
    DiffEngine, EngineConfig, RenderView, ViewSnapshot, VisualizationState, read_document,
};

/// One step of `arbor script`, written `collapse:ID`, `expand:ID` or `toggle:ID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    Collapse(String),
    Expand(String),
    Toggle(String),
}

impl FromStr for ScriptOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <verb>:<container id>, got {:?}", s))?;
        if id.is_empty() {
            return Err(format!("missing container id in {:?}", s));
        }
        match verb {
            "collapse" => Ok(ScriptOp::Collapse(id.to_string())),
            "expand" => Ok(ScriptOp::Expand(id.to_string())),
            "toggle" => Ok(ScriptOp::Toggle(id.to_string())),
            other => Err(format!("unknown verb {:?} (use collapse, expand or toggle)", other)),
        }
    }
}

impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptOp::Collapse(id) => write!(f, "collapse:{}", id),
            ScriptOp::Expand(id) => write!(f, "expand:{}", id),
            ScriptOp::Toggle(id) => write!(f, "toggle:{}", id),
        }
    }
}

impl ScriptOp {
    fn apply(&self, state: &mut VisualizationState) -> arbor_core::Result<()> {
        match self {
            ScriptOp::Collapse(id) => state.collapse_container(id)?,
            ScriptOp::Expand(id) => state.expand_container(id)?,
            ScriptOp::Toggle(id) => state.toggle_container(id)?,
        };
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn load_state(graph: &Path, config: EngineConfig) -> anyhow::Result<VisualizationState> {
    let document = read_document(graph)?;
    let state = VisualizationState::from_document(&document, config)
        .with_context(|| format!("building view of {}", graph.display()))?;
    Ok(state)
}

pub fn view(graph: &Path, collapse: &[String], expand: &[String], config: EngineConfig) -> anyhow::Result<()> {
    let mut state = load_state(graph, config)?;
    for id in collapse {
        state
            .collapse_container(id)
            .with_context(|| format!("collapsing {}", id))?;
    }
    for id in expand {
        state
            .expand_container(id)
            .with_context(|| format!("expanding {}", id))?;
    }
    tracing::info!(
        "{} visible nodes, {} visible edges, {} hyperedges",
        state.visible_nodes().count(),
        state.visible_edges().count(),
        state.all_hyperedges().count()
    );

    let view = RenderView::capture(&state);
    println!("{}", view.to_json_pretty()?);
    Ok(())
}

pub fn script(graph: &Path, ops: &[ScriptOp], config: EngineConfig) -> anyhow::Result<()> {
    let mut state = load_state(graph, config)?;
    let mut engine = DiffEngine::new();
    let mut previous = ViewSnapshot::capture(&state);

    for op in ops {
        op.apply(&mut state).with_context(|| format!("step {}", op))?;
        let current = ViewSnapshot::capture(&state);
        let diff = engine.compute_diff(&previous, &current);
        if diff.is_empty() {
            tracing::debug!("Step {} changed nothing", op);
        }
        println!("{}", serde_json::to_string(&diff)?);
        previous = current;
    }

    tracing::info!("Applied {} steps", engine.sequence());
    Ok(())
}

pub fn check(graph: &Path, config: EngineConfig) -> anyhow::Result<()> {
    let state = load_state(graph, config)?;
    state
        .validate()
        .with_context(|| format!("invariants of {}", graph.display()))?;

    println!("nodes:       {}", state.node_count());
    println!("edges:       {}", state.edge_count());
    println!("containers:  {}", state.container_count());
    println!("hyperedges:  {}", state.all_hyperedges().count());
    println!("visible:     {} nodes, {} edges", state.visible_nodes().count(), state.visible_edges().count());
    println!("ok");
    Ok(())
}
