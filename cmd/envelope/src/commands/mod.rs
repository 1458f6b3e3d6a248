//! Subcommand implementations.

pub mod scenario;
pub mod scenarios;
pub mod simulate;
