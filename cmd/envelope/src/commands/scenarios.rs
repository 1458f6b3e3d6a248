//! Scenarios command implementation.

use anyhow::Result;
use envelope_vopr::workloads;

/// Runs the scenarios command.
#[allow(clippy::unnecessary_wraps)]
pub fn run() -> Result<()> {
    let workloads = workloads::all();
    let width = workloads.iter().map(|w| w.name.len()).max().unwrap_or(0);
    for workload in &workloads {
        println!("{:width$}  {}", workload.name, workload.description);
    }
    Ok(())
}
