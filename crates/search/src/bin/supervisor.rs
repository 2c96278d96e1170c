//! supervisor: owns the shared ring and keeps the best solution seen.
//!
//! Creates the segment and the `free`/`used`/`write` semaphores, drains
//! candidate solutions published by generators, and prints every strict
//! improvement. Stops when a generator reports a conflict-free coloring or
//! on SIGINT/SIGTERM, then tells generators to stop and unlinks everything.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use tricolor_core::config::load_dotenv;
use tricolor_ipc::{ShutdownToken, SolutionChannel};
use tricolor_search::bootstrap::{init_tracing, load_config};
use tricolor_search::{ConsoleReporter, Reporter, Supervisor};

// ── CLI ─────────────────────────────────────────────────────────────

/// Supervisor of the 3-coloring search. Takes no positional arguments.
#[derive(Parser, Debug)]
#[command(name = "supervisor", version, about)]
struct Cli {
    /// Path to a tricolor.toml config file.
    #[arg(long, env = "TRICOLOR_CONFIG")]
    config: Option<PathBuf>,

    /// Print reports without ANSI colors.
    #[arg(long)]
    no_color: bool,

    /// Unlink segment and semaphores left behind by a crashed supervisor.
    #[arg(long)]
    reclaim: bool,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    let (config, config_err) =
        load_config(cli.config.as_deref()).context("invalid configuration")?;
    init_tracing(&config.log.filter);
    if let Some(e) = config_err {
        warn!(error = %e, "failed to load config file, using defaults");
    }
    config.log_summary();

    let token = ShutdownToken::with_os_signals().context("installing signal handlers")?;
    let channel = SolutionChannel::create(&config.ipc.names(), config.ipc.mode, cli.reclaim)
        .context("creating shared resources")?;

    let pid = std::process::id();
    let mut reporter = ConsoleReporter::stdout(config.supervisor.color && !cli.no_color);
    if let Err(e) = reporter.started(pid) {
        warn!(error = %e, "failed to write report");
    }
    info!(pid, "supervisor started");

    let mut supervisor = Supervisor::new(token, reporter);
    let report = supervisor.serve(channel).context("supervising generators")?;

    info!(
        exit = ?report.exit,
        received = report.received,
        improvements = report.improvements,
        best = report.best.as_ref().map(|s| s.len()),
        "supervisor exited cleanly"
    );
    Ok(())
}
