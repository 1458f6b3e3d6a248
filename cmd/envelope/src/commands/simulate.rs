//! Simulate command implementation.

use anyhow::{Context, Result};
use envelope_profile::StrategyKind;
use envelope_vopr::{SimConfig, Simulation};
use tracing::{error, info};

/// Runs the simulate command.
pub fn run(seed: u64, iterations: usize, strategy: &str) -> Result<()> {
    let strategy: StrategyKind = strategy
        .parse()
        .with_context(|| format!("Invalid strategy: {strategy}"))?;

    info!(
        "Simulating {} iterations with seed {} ({} strategy)",
        iterations, seed, strategy
    );

    let config = SimConfig::default()
        .with_seed(seed)
        .with_iterations(iterations)
        .with_strategy(strategy);
    let summary = Simulation::new(config).run_campaign();

    for failure in summary.failures() {
        error!("{}", failure);
    }
    print!("{summary}");

    if !summary.all_passed() {
        anyhow::bail!(
            "Simulation failed with {} failing scenario(s); replay with --seed {seed}",
            summary.failed
        );
    }

    info!("Simulation passed!");
    Ok(())
}
