//! Runs the coach end to end with toy collaborators.
//!
//! ```text
//! RUST_LOG=info cargo run -p selfplay-demo -- --iterations 2 --workers 4
//! ```

mod arena;
mod game;
mod network;

use std::path::PathBuf;
use clap::Parser;
use coach::{CoachConfig, IterationController};
use coach::communication::SlotId;
use tracing::info;
use tracing_subscriber::EnvFilter;
use crate::arena::CoinFlipArena;
use crate::game::ToyAgent;
use crate::network::UniformNetwork;

#[derive(Debug, Parser)]
#[command(about = "Self-play training loop over a toy board game")]
struct Cli {
    /// TOML file merged over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    iterations: Option<u32>,

    #[arg(long)]
    workers: Option<usize>,

    /// Games per iteration.
    #[arg(long)]
    games: Option<usize>,

    #[arg(long, default_value_t = 7)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut figment = match &cli.config {
        Some(path) => CoachConfig::figment_with_file(path),
        None => CoachConfig::figment(),
    };
    if let Some(iterations) = cli.iterations {
        figment = figment.merge(("iterations", iterations));
    }
    if let Some(workers) = cli.workers {
        figment = figment.merge(("workers", workers));
    }
    if let Some(games) = cli.games {
        figment = figment.merge(("games_per_iteration", games));
    }
    let config = CoachConfig::extract_from(figment)?;

    let seed = cli.seed;
    let factory = move |slot: SlotId| ToyAgent::new(slot, seed);
    let mut controller = IterationController::new(
        config,
        UniformNetwork::default(),
        UniformNetwork::default(),
        factory,
        CoinFlipArena::new(seed),
    )?;

    let reports = controller.learn().await?;
    for report in &reports {
        info!(
            iteration = report.iteration,
            samples = report.generation.records_persisted,
            loss = report.losses.total(),
            promoted = report.evaluation.decision.is_promoted(),
            "iteration summary"
        );
    }
    info!(generation = controller.network().generation(), "training finished");
    Ok(())
}
