//! generator: randomly recolors a graph and publishes conflict sets.
//!
//! Each iteration assigns every vertex a random color, collects the edges
//! whose endpoints share a color, and, if there are few enough of them,
//! publishes them into the supervisor's ring. Stops when the supervisor
//! raises its stop flag or on SIGINT/SIGTERM, and only detaches on exit.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use tricolor_core::config::load_dotenv;
use tricolor_core::{EdgeToken, Graph};
use tricolor_ipc::{ShutdownToken, SolutionChannel};
use tricolor_search::bootstrap::{init_tracing, load_config};
use tricolor_search::{Generator, GeneratorExit, GeneratorOptions};

// ── CLI ─────────────────────────────────────────────────────────────

/// Generator of candidate edge-removal sets for the 3-coloring search.
#[derive(Parser, Debug)]
#[command(
    name = "generator",
    version,
    about,
    after_help = "EXAMPLE:\n    generator 0-1 0-2 0-3 1-2 1-3 2-3"
)]
struct Cli {
    /// Path to a tricolor.toml config file.
    #[arg(long, env = "TRICOLOR_CONFIG")]
    config: Option<PathBuf>,

    /// RNG seed; drawn at random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many iterations.
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Edges as `<int>-<int>`, e.g. `0-1`.
    #[arg(required = true, value_name = "EDGE")]
    edges: Vec<EdgeToken>,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    // Input is fully validated before any shared resource is touched.
    let graph = Graph::from_tokens(&cli.edges).context("invalid edge list")?;

    let (config, config_err) =
        load_config(cli.config.as_deref()).context("invalid configuration")?;
    init_tracing(&config.log.filter);
    if let Some(e) = config_err {
        warn!(error = %e, "failed to load config file, using defaults");
    }

    let options = GeneratorOptions {
        seed: cli
            .seed
            .or(config.generator.seed)
            .unwrap_or_else(rand::random),
        max_iterations: cli.max_iterations.or(config.generator.max_iterations),
    };

    let token = ShutdownToken::with_os_signals().context("installing signal handlers")?;
    let channel =
        SolutionChannel::attach(&config.ipc.names()).context("attaching to supervisor")?;

    info!(
        pid = std::process::id(),
        seed = options.seed,
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "generator started"
    );

    let mut generator = Generator::new(graph, options, token.clone());
    let report = generator.run(&channel).context("publishing solutions")?;

    match report.exit {
        GeneratorExit::SupervisorStopped => info!("terminated by order of the supervisor"),
        GeneratorExit::Signalled => info!(signal = token.received_signal(), "stopped by signal"),
        GeneratorExit::IterationLimit => info!("iteration limit reached"),
    }

    drop(channel);
    info!(
        iterations = report.iterations,
        published = report.published,
        discarded = report.discarded,
        "cleaned up all resources"
    );
    Ok(())
}
