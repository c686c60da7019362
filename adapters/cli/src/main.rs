#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a seeded tilebot swarm simulation.

mod config;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{config::RunConfig, simulation::Simulation};

/// Command-line arguments. Flags override values read from `--config`.
#[derive(Debug, Parser)]
#[command(name = "tilebot", about = "Runs a seeded swarm of scouts over a generated map")]
struct Args {
    /// TOML file with `[navigation]`, `[exploration]` and `[simulation]` tables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for map generation.
    #[arg(long)]
    seed: Option<u64>,
    /// Rounds to simulate.
    #[arg(long)]
    rounds: Option<u32>,
    /// Map width in tiles.
    #[arg(long)]
    width: Option<u32>,
    /// Map height in tiles.
    #[arg(long)]
    height: Option<u32>,
    /// Scouts spawned next to the allied hub.
    #[arg(long)]
    scouts: Option<u32>,
    /// Neutral hubs scattered over the map.
    #[arg(long)]
    neutral_bases: Option<u32>,
    /// Enemy enforcers scattered over the map.
    #[arg(long)]
    enemies: Option<u32>,
    /// Slowest terrain generated, in (0, 1].
    #[arg(long)]
    min_passability: Option<f64>,
}

impl Args {
    fn apply_overrides(&self, config: &mut RunConfig) {
        let simulation = &mut config.simulation;
        if let Some(seed) = self.seed {
            simulation.seed = seed;
        }
        if let Some(rounds) = self.rounds {
            simulation.rounds = rounds;
        }
        if let Some(width) = self.width {
            simulation.width = width;
        }
        if let Some(height) = self.height {
            simulation.height = height;
        }
        if let Some(scouts) = self.scouts {
            simulation.scouts = scouts;
        }
        if let Some(neutral_bases) = self.neutral_bases {
            simulation.neutral_bases = neutral_bases;
        }
        if let Some(enemies) = self.enemies {
            simulation.enemies = enemies;
        }
        if let Some(min_passability) = self.min_passability {
            simulation.min_passability = min_passability;
        }
    }
}

/// Entry point for the tilebot command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tilebot_cli=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = RunConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let simulation = Simulation::new(
        &config.simulation,
        config.navigation.into(),
        config.exploration.into(),
    )?;
    println!("{}", simulation.banner());

    let summary = simulation.run();
    info!(rounds = summary.rounds, "simulation finished");
    println!("rounds played:          {}", summary.rounds);
    println!("moves made:             {}", summary.moves);
    println!("moves rejected:         {}", summary.rejected_moves);
    println!("flags sent:             {}", summary.flags_sent);
    println!("malformed flags:        {}", summary.malformed_flags);
    println!("neutral bases reported: {}", summary.neutral_bases_reported);
    println!("cells visited:          {}", summary.cells_visited);
    println!("scouts parked:          {}", summary.scouts_parked);
    Ok(())
}
