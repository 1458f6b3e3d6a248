//! Deterministic simulation testing for the resource envelope engine.
//!
//! This crate provides:
//! - Named reference workloads with hand-checked envelopes
//! - Seeded random plans and edit sequences
//! - A harness that checks the engine's properties against them
//! - Proptest generators for the same inputs
//!
//! # Properties checked
//!
//! 1. **Incremental equivalence**: edits and a fresh rebuild agree, also
//!    after a sweep stopped at a violation resumes and under ordering
//!    constraints
//! 2. **Idempotence**: a second recompute changes nothing
//! 3. **Bound ordering**: lower never exceeds upper without a violation
//! 4. **Order atomicity**: concurrent partners commit together
//! 5. **Determinism**: the same seed yields the same envelopes
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_vopr::{SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default().with_seed(42));
//! let summary = sim.run_campaign();
//! assert!(summary.all_passed());
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod generators;
pub mod harness;
pub mod simulation;
pub mod workloads;

pub use harness::{SimConfig, Simulation};
pub use simulation::{Scenario, SimResult, SimSummary};
pub use workloads::{EnvelopeRow, Evaluation, Workload};
