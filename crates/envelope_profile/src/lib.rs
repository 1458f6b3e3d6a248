//! Incremental resource level envelopes.
//!
//! A [`Profile`] tracks the transactions on one resource and keeps, for every
//! instant where some transaction may start or end, the tightest bounds on the
//! level any schedule could reach there. Bounds come from a pluggable
//! [`EnvelopeStrategy`]:
//! - [`FlowProfile`]: exact bounds from a maximum flow over the transactions
//!   still in flight, respecting temporal precedences
//! - [`TimetableProfile`]: cheap bounds from time windows alone
//! - [`GroundedProfile`]: timetable bounds plus earliest-time levels
//!
//! After each instant is computed an [`FvDetector`] compares it with the
//! capacity limits, reports flaws and violations to a [`ResourceListener`],
//! and may stop the sweep early.
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_model::Transaction;
//! use envelope_profile::{Profile, ProfileConfig};
//!
//! let mut profile = Profile::new(ProfileConfig::default().with_limits(0.0, 10.0))?;
//! profile.add_transaction(Transaction::producer((0, 10), (2.0, 4.0))?);
//! profile.add_transaction(Transaction::consumer((5, 15), (1.0, 3.0))?);
//! println!("{}", profile.level_at(12));
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod constraint;
pub mod cursor;
pub mod detector;
pub mod error;
pub mod flow_graph;
pub mod limits;
pub mod listener;
pub mod oracle;
pub mod order;
pub mod profile;
pub mod strategy;

pub use config::{DetectorKind, LimitStep, ProfileConfig, StrategyKind};
pub use constraint::{ConstraintEvent, ConstraintId, ConstraintPairing};
pub use cursor::ProfileCursor;
pub use detector::{DetectorStats, FvDetector};
pub use error::{Error, Result};
pub use flow_graph::{FlowProfileGraph, Level};
pub use limits::{ConstantLimits, LimitProfile, RateLimits, StepLimits};
pub use listener::{NullListener, RecordingListener, ResourceEvent, ResourceListener};
pub use oracle::{BoundsOracle, PrecedenceOracle, Relation, TemporalOracle, Timepoint};
pub use order::{OrderCache, TemporalOrder};
pub use profile::Profile;
pub use strategy::{EnvelopeStrategy, FlowProfile, GroundedProfile, TimetableProfile};
