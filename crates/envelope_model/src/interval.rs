//! Closed intervals over time and quantity.
//!
//! Time is discrete and uses the extreme `i64` values as stand-ins for the
//! unbounded ends of a domain. Arithmetic on times treats those values as
//! absorbing so that a distance involving an unbounded end stays unbounded.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete time.
pub type Time = i64;

/// Unbounded earliest time.
pub const MINUS_INFINITY: Time = Time::MIN;

/// Unbounded latest time.
pub const PLUS_INFINITY: Time = Time::MAX;

/// A closed interval `[lb, ub]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval<T> {
    /// Lower bound.
    pub lb: T,
    /// Upper bound.
    pub ub: T,
}

/// Interval of times.
pub type TimeInterval = Interval<Time>;

/// Interval of quantities.
pub type QuantityInterval = Interval<f64>;

impl<T: Copy + PartialOrd + fmt::Display> Interval<T> {
    /// Creates an interval without checking the bounds.
    ///
    /// Use [`Interval::try_new`] for values coming from outside the engine.
    #[must_use]
    pub const fn new(lb: T, ub: T) -> Self {
        Self { lb, ub }
    }

    /// Creates an interval, rejecting inverted or unordered bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInterval`] if `lb > ub` or the bounds cannot be
    /// compared (NaN).
    pub fn try_new(lb: T, ub: T) -> Result<Self> {
        match lb.partial_cmp(&ub) {
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal) => Ok(Self { lb, ub }),
            _ => Err(Error::InvalidInterval {
                lb: lb.to_string(),
                ub: ub.to_string(),
            }),
        }
    }

    /// Creates the interval holding a single value.
    #[must_use]
    pub const fn singleton(value: T) -> Self {
        Self {
            lb: value,
            ub: value,
        }
    }

    /// Returns true if both bounds are equal.
    pub fn is_singleton(&self) -> bool {
        self.lb == self.ub
    }

    /// Returns true if `value` lies within the bounds.
    pub fn contains(&self, value: T) -> bool {
        self.lb <= value && value <= self.ub
    }

    /// Returns true if `other` lies entirely within `self`.
    pub fn encloses(&self, other: &Self) -> bool {
        self.lb <= other.lb && other.ub <= self.ub
    }

    /// Returns the overlap of two intervals, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let lb = if other.lb > self.lb { other.lb } else { self.lb };
        let ub = if other.ub < self.ub { other.ub } else { self.ub };
        if lb <= ub {
            Some(Self { lb, ub })
        } else {
            None
        }
    }
}

impl Interval<f64> {
    /// Creates a quantity interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuantity`] if a bound is negative or not finite,
    /// and [`Error::InvalidInterval`] if the bounds are inverted.
    pub fn try_quantity(lb: f64, ub: f64) -> Result<Self> {
        if !lb.is_finite() || !ub.is_finite() || lb < 0.0 || ub < 0.0 {
            return Err(Error::InvalidQuantity { lb, ub });
        }
        Self::try_new(lb, ub)
    }
}

impl Interval<Time> {
    /// The unbounded time interval.
    pub const EVERYWHERE: Self = Self {
        lb: MINUS_INFINITY,
        ub: PLUS_INFINITY,
    };

    /// Returns the range of `to - self` implied by the two domains alone.
    #[must_use]
    pub const fn distance_to(&self, to: &Self) -> Self {
        let lb = if to.lb == MINUS_INFINITY || self.ub == PLUS_INFINITY {
            MINUS_INFINITY
        } else {
            to.lb.saturating_sub(self.ub)
        };
        let ub = if to.ub == PLUS_INFINITY || self.lb == MINUS_INFINITY {
            PLUS_INFINITY
        } else {
            to.ub.saturating_sub(self.lb)
        };
        Self { lb, ub }
    }
}

impl<T> From<(T, T)> for Interval<T> {
    fn from((lb, ub): (T, T)) -> Self {
        Self { lb, ub }
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lb, self.ub)
    }
}

/// Renders a time, spelling out the unbounded ends.
pub fn format_time(time: Time) -> String {
    match time {
        MINUS_INFINITY => "-inf".to_string(),
        PLUS_INFINITY => "+inf".to_string(),
        t => t.to_string(),
    }
}
