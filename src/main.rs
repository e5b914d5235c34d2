//! Arbor CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::ScriptOp;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Collapse, expand and inspect hierarchical graph diagrams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a graph, apply collapses then expands, and print the render view
    View {
        /// Graph document (JSON)
        graph: PathBuf,

        /// Container to collapse (repeatable)
        #[arg(long)]
        collapse: Vec<String>,

        /// Container to expand (repeatable)
        #[arg(long)]
        expand: Vec<String>,
    },
    /// Replay collapse:ID / expand:ID / toggle:ID steps and print a diff per step
    Script {
        /// Graph document (JSON)
        graph: PathBuf,

        /// Steps to apply in order
        #[arg(required = true)]
        ops: Vec<ScriptOp>,
    },
    /// Load a graph, validate every invariant and print counts
    Check {
        /// Graph document (JSON)
        graph: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries the JSON output.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("arbor={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::View {
            graph,
            collapse,
            expand,
        } => commands::view(&graph, &collapse, &expand, config),
        Commands::Script { graph, ops } => commands::script(&graph, &ops, config),
        Commands::Check { graph } => commands::check(&graph, config),
        Commands::Version => {
            println!("Arbor v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
