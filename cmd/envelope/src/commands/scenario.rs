//! Scenario command implementation.

use crate::output::{render, Format};
use anyhow::{Context, Result};
use envelope_profile::{DetectorKind, ProfileConfig, ResourceEvent, StrategyKind};
use envelope_vopr::workloads;
use std::fs;
use tracing::{info, warn};

/// Runs the scenario command.
pub fn run(
    name: &str,
    strategy: &str,
    detector: &str,
    format: &str,
    config_path: Option<&str>,
) -> Result<()> {
    let strategy: StrategyKind = strategy
        .parse()
        .with_context(|| format!("Invalid strategy: {strategy}"))?;
    let detector: DetectorKind = detector
        .parse()
        .with_context(|| format!("Invalid detector: {detector}"))?;
    let format: Format = format.parse()?;

    let Some(mut workload) = workloads::find(name) else {
        anyhow::bail!("Unknown workload: {name}. Run 'envelope scenarios' for the list.");
    };

    if let Some(path) = config_path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {path}"))?;
        workload.config = ProfileConfig::from_json(&text)
            .with_context(|| format!("Failed to load configuration: {path}"))?;
        info!("Using configuration from: {}", path);
    }

    info!(
        "Evaluating '{}' with {} transactions ({} strategy, {} detector)",
        workload.name,
        workload.transactions.len(),
        strategy,
        detector
    );

    let evaluation = workload
        .evaluate(strategy, detector)
        .with_context(|| format!("Failed to evaluate workload: {name}"))?;

    let violations = evaluation
        .events
        .iter()
        .filter(|event| matches!(event, ResourceEvent::Violation { .. }))
        .count();
    if violations > 0 {
        warn!("{} violation(s) found", violations);
    }

    print!("{}", render(&evaluation, format)?);
    Ok(())
}
