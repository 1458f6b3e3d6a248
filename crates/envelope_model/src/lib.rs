//! Data model for the resource envelope engine.
//!
//! This crate holds the values every other crate talks about:
//! - [`Interval`] bounds over discrete time and quantity
//! - [`Transaction`]s: flexible production or consumption events
//! - [`Instant`]s: timeline breakpoints and their computed [`Levels`]
//! - [`ResourceProblem`] flaw and violation records
//! - [`DomainChange`] tags describing how a domain moved
//! - the generational [`Arena`] that owns transactions and instants
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_model::Transaction;
//!
//! let charge = Transaction::producer((0, 10), (5.0, 8.0))?;
//! assert!(!charge.is_time_singleton());
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod arena;
pub mod change;
pub mod error;
pub mod instant;
pub mod interval;
pub mod problem;
pub mod transaction;

pub use arena::{Arena, Handle};
pub use change::DomainChange;
pub use error::{Error, Result};
pub use instant::{Instant, InstantId, Levels};
pub use interval::{
    format_time, Interval, QuantityInterval, Time, TimeInterval, MINUS_INFINITY, PLUS_INFINITY,
};
pub use problem::{ProblemKind, ResourceProblem};
pub use transaction::{Owner, Role, TimepointRole, TokenRef, Transaction, TransactionId};
