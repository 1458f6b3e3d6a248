//! Error types for building transactions and intervals.

use thiserror::Error;

/// Errors raised while constructing model values.
#[derive(Debug, Error)]
pub enum Error {
    /// The lower bound of an interval exceeds its upper bound.
    #[error("invalid interval: lower bound {lb} exceeds upper bound {ub}")]
    InvalidInterval {
        /// Rendered lower bound.
        lb: String,
        /// Rendered upper bound.
        ub: String,
    },

    /// A quantity bound is negative, infinite or NaN.
    #[error("invalid quantity [{lb}, {ub}]: bounds must be finite and non-negative")]
    InvalidQuantity {
        /// Offending lower bound.
        lb: f64,
        /// Offending upper bound.
        ub: f64,
    },
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;
