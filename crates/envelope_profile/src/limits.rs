//! Capacity limits over time.

use envelope_model::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Source of the lower and upper capacity limit at a given time.
pub trait LimitProfile: fmt::Debug {
    /// Lowest level the resource may reach at `time`.
    fn lower_limit(&self, time: Time) -> f64;

    /// Highest level the resource may reach at `time`.
    fn upper_limit(&self, time: Time) -> f64;
}

/// The same limits everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantLimits {
    /// Lower limit.
    pub lower: f64,
    /// Upper limit.
    pub upper: f64,
}

impl ConstantLimits {
    /// Creates constant limits.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Limits that never bind.
    pub const fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }
}

impl Default for ConstantLimits {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl LimitProfile for ConstantLimits {
    fn lower_limit(&self, _time: Time) -> f64 {
        self.lower
    }

    fn upper_limit(&self, _time: Time) -> f64 {
        self.upper
    }
}

/// Piecewise-constant limits. Each step holds from its time until the next
/// step; before the first step the base limits apply.
#[derive(Debug, Clone, PartialEq)]
pub struct StepLimits {
    base: ConstantLimits,
    steps: BTreeMap<Time, ConstantLimits>,
}

impl StepLimits {
    /// Starts from `base` with no steps.
    pub const fn new(base: ConstantLimits) -> Self {
        Self {
            base,
            steps: BTreeMap::new(),
        }
    }

    /// Adds a step, replacing any step at the same time.
    #[must_use]
    pub fn with_step(mut self, from: Time, limits: ConstantLimits) -> Self {
        self.steps.insert(from, limits);
        self
    }

    fn at(&self, time: Time) -> ConstantLimits {
        self.steps
            .range(..=time)
            .next_back()
            .map_or(self.base, |(_, limits)| *limits)
    }
}

impl LimitProfile for StepLimits {
    fn lower_limit(&self, time: Time) -> f64 {
        self.at(time).lower
    }

    fn upper_limit(&self, time: Time) -> f64 {
        self.at(time).upper
    }
}

/// Rate and sum maxima checked by the detectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimits {
    /// Most production allowed at one instant.
    pub max_instant_production: f64,
    /// Most consumption allowed at one instant.
    pub max_instant_consumption: f64,
    /// Most production allowed over the horizon.
    pub max_production: f64,
    /// Most consumption allowed over the horizon.
    pub max_consumption: f64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            max_instant_production: f64::INFINITY,
            max_instant_consumption: f64::INFINITY,
            max_production: f64::INFINITY,
            max_consumption: f64::INFINITY,
        }
    }
}
