//! Token lock simulator CLI
//!
//! Runs a seeded simulation for a number of rounds and prints one line per
//! round (handler order and outcomes) followed by the final state digest.
//!
//! ## Usage
//!
//! ```text
//! token-lock-sim --seed 42 --rounds 30
//! token-lock-sim --config sim.json --rounds 365 --json
//! RUST_LOG=token_lock_sim_core=debug token-lock-sim --rounds 3
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use token_lock_sim_core::orchestrator::{validate_snapshot, ActionOutcome, RoundReport};
use token_lock_sim_core::{RandomWalkOracle, SimulationConfig, SimulationManager, BASE};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "token-lock-sim", version, about = "Deterministic token-lock economy simulator")]
struct Args {
    /// RNG seed (overrides the config file's seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of rounds to run
    #[arg(long, default_value_t = 30)]
    rounds: u64,

    /// JSON simulation config; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of generated identities when no config file is given
    #[arg(long, default_value_t = 10)]
    identities: usize,

    /// Maximum per-round price move, in basis points
    #[arg(long, default_value_t = 300)]
    volatility_bps: u64,

    /// Print round reports as JSON lines
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SimulationConfig::from_json(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimulationConfig::new(0, SimulationConfig::generated_identities(args.identities)),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn report_json(report: &RoundReport) -> serde_json::Value {
    let outcomes: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .map(|(handler, outcome)| match outcome {
            ActionOutcome::Applied(detail) => {
                serde_json::json!({ "handler": handler, "applied": detail })
            }
            ActionOutcome::Skipped(reason) => {
                serde_json::json!({ "handler": handler, "skipped": reason })
            }
        })
        .collect();
    serde_json::json!({
        "round": report.round,
        "timestamp": report.timestamp,
        "prices": report.prices.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        "handler_order": report.handler_order,
        "outcomes": outcomes,
    })
}

fn print_report(report: &RoundReport) {
    let applied = report
        .outcomes
        .iter()
        .filter(|(_, o)| matches!(o, ActionOutcome::Applied(_)))
        .count();
    println!(
        "round {:>4} t={} applied {}/{} order [{}]",
        report.round,
        report.timestamp,
        applied,
        report.outcomes.len(),
        report.handler_order.join(", ")
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let oracle = RandomWalkOracle::new(
        config.assets.clone(),
        vec![BASE; config.assets.len()],
        args.volatility_bps,
        config.seed,
    );

    info!(seed = config.seed, rounds = args.rounds, "starting simulation");
    let mut sim = SimulationManager::new(config, Box::new(oracle))?;
    sim.init()?;

    for _ in 0..args.rounds {
        let report = sim.run_round()?;
        if args.json {
            println!("{}", report_json(&report));
        } else {
            print_report(&report);
        }
    }

    let snapshot = sim.snapshot()?;
    validate_snapshot(&snapshot)?;
    println!(
        "final: supply={} derivative_supply={} locks={} reserved={}",
        snapshot.base.total_supply(),
        snapshot.locks.derivative().total_supply(),
        snapshot.locks.locks().len(),
        snapshot.locks.inflation_info().reserved_amount
    );
    println!("digest: {}", sim.state_digest()?);
    Ok(())
}
