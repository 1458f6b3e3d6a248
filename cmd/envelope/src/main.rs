//! Envelope CLI - resource level envelopes for flexible plans.
//!
//! Commands:
//! - `envelope scenario` - Evaluate a reference workload
//! - `envelope scenarios` - List reference workloads
//! - `envelope simulate` - Run a seeded simulation campaign

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "envelope")]
#[command(about = "Resource level envelopes with flaw and violation detection")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a reference workload and print its envelope
    Scenario {
        /// Workload name (see `envelope scenarios`)
        name: String,

        /// Level bound algorithm (flow, timetable or grounded)
        #[arg(short, long, default_value = "flow")]
        strategy: String,

        /// Detector (closed_world, open_world or grounded)
        #[arg(short, long, default_value = "closed_world")]
        detector: String,

        /// Output format (table, json, yaml or csv)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// JSON profile configuration replacing the workload's limits
        #[arg(short, long)]
        config: Option<String>,
    },

    /// List reference workloads
    Scenarios,

    /// Run a seeded simulation campaign
    Simulate {
        /// Master seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of random iterations
        #[arg(short, long, default_value_t = 100)]
        iterations: usize,

        /// Level bound algorithm under test
        #[arg(short, long, default_value = "flow")]
        strategy: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scenario {
            name,
            strategy,
            detector,
            format,
            config,
        } => commands::scenario::run(&name, &strategy, &detector, &format, config.as_deref()),
        Commands::Scenarios => commands::scenarios::run(),
        Commands::Simulate {
            seed,
            iterations,
            strategy,
        } => commands::simulate::run(seed, iterations, &strategy),
    }
}
