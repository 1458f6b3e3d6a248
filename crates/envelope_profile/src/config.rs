//! Profile configuration.
//!
//! Unbounded limits and maxima are written as absent values so that the
//! configuration round-trips through JSON, which has no infinity.

use crate::error::{Error, Result};
use crate::limits::{ConstantLimits, LimitProfile, RateLimits, StepLimits};
use envelope_model::{QuantityInterval, Time};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which algorithm computes the level bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Incremental max-flow envelope.
    #[default]
    Flow,
    /// Running sums over starts and ends.
    Timetable,
    /// Timetable envelope plus the grounded completion.
    Grounded,
}

impl StrategyKind {
    /// Every strategy, in display order.
    pub const ALL: [Self; 3] = [Self::Flow, Self::Timetable, Self::Grounded];

    /// Short name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Timetable => "timetable",
            Self::Grounded => "grounded",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown strategy '{s}'")))
    }
}

/// Which detector classifies instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Judges the committed bounds only.
    #[default]
    ClosedWorld,
    /// Allows for transactions that may still be added.
    OpenWorld,
    /// Flaws against the grounded completion.
    Grounded,
}

impl DetectorKind {
    /// Every detector, in display order.
    pub const ALL: [Self; 3] = [Self::ClosedWorld, Self::OpenWorld, Self::Grounded];

    /// Short name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClosedWorld => "closed_world",
            Self::OpenWorld => "open_world",
            Self::Grounded => "grounded",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown detector '{s}'")))
    }
}

/// Limits that take effect from a given time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitStep {
    /// First time the step applies.
    pub from: Time,
    /// Lower limit, or `None` for no lower limit.
    pub lower: Option<f64>,
    /// Upper limit, or `None` for no upper limit.
    pub upper: Option<f64>,
}

/// Configuration for a [`Profile`](crate::Profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Level before the first transaction.
    pub initial_level: QuantityInterval,
    /// Lower capacity limit, or `None` for no lower limit.
    pub lower_limit: Option<f64>,
    /// Upper capacity limit, or `None` for no upper limit.
    pub upper_limit: Option<f64>,
    /// Changes to the limits over time, in increasing time order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub limit_steps: Vec<LimitStep>,
    /// Most production allowed at one instant.
    pub max_instant_production: Option<f64>,
    /// Most consumption allowed at one instant.
    pub max_instant_consumption: Option<f64>,
    /// Most production allowed over the horizon.
    pub max_production: Option<f64>,
    /// Most consumption allowed over the horizon.
    pub max_consumption: Option<f64>,
    /// Keep sweeping past violated instants.
    pub allow_violations: bool,
    /// Level bound algorithm.
    pub strategy: StrategyKind,
    /// Flaw and violation detector.
    pub detector: DetectorKind,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            initial_level: QuantityInterval::new(0.0, 0.0),
            lower_limit: None,
            upper_limit: None,
            limit_steps: Vec::new(),
            max_instant_production: None,
            max_instant_consumption: None,
            max_production: None,
            max_consumption: None,
            allow_violations: false,
            strategy: StrategyKind::default(),
            detector: DetectorKind::default(),
        }
    }
}

fn bound(value: f64) -> Option<f64> {
    if value.is_infinite() {
        None
    } else {
        Some(value)
    }
}

impl ProfileConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this type or the
    /// values fail [`ProfileConfig::validate`].
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the initial level.
    #[must_use]
    pub fn with_initial_level(mut self, lb: f64, ub: f64) -> Self {
        self.initial_level = QuantityInterval::new(lb, ub);
        self
    }

    /// Sets constant capacity limits. Infinite values mean no limit.
    #[must_use]
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower_limit = bound(lower);
        self.upper_limit = bound(upper);
        self
    }

    /// Adds a limit change at `from`. Infinite values mean no limit.
    #[must_use]
    pub fn with_limit_step(mut self, from: Time, lower: f64, upper: f64) -> Self {
        self.limit_steps.push(LimitStep {
            from,
            lower: bound(lower),
            upper: bound(upper),
        });
        self
    }

    /// Sets the per-instant production maximum.
    #[must_use]
    pub fn with_max_instant_production(mut self, max: f64) -> Self {
        self.max_instant_production = bound(max);
        self
    }

    /// Sets the per-instant consumption maximum.
    #[must_use]
    pub fn with_max_instant_consumption(mut self, max: f64) -> Self {
        self.max_instant_consumption = bound(max);
        self
    }

    /// Sets the total production maximum.
    #[must_use]
    pub fn with_max_production(mut self, max: f64) -> Self {
        self.max_production = bound(max);
        self
    }

    /// Sets the total consumption maximum.
    #[must_use]
    pub fn with_max_consumption(mut self, max: f64) -> Self {
        self.max_consumption = bound(max);
        self
    }

    /// Sets whether the sweep continues past violations.
    #[must_use]
    pub fn with_allow_violations(mut self, allow: bool) -> Self {
        self.allow_violations = allow;
        self
    }

    /// Sets the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the detector.
    #[must_use]
    pub fn with_detector(mut self, detector: DetectorKind) -> Self {
        self.detector = detector;
        self
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let initial = self.initial_level;
        if !initial.lb.is_finite() || !initial.ub.is_finite() || initial.lb > initial.ub {
            return Err(Error::InvalidConfig(format!(
                "initial level {initial} must be finite and ordered"
            )));
        }

        check_limits("limits", self.lower_limit, self.upper_limit)?;
        let mut previous: Option<Time> = None;
        for step in &self.limit_steps {
            if previous.is_some_and(|time| time >= step.from) {
                return Err(Error::InvalidConfig(format!(
                    "limit step at {} is out of order",
                    step.from
                )));
            }
            previous = Some(step.from);
            check_limits(&format!("limit step at {}", step.from), step.lower, step.upper)?;
        }

        for (name, value) in [
            ("max_instant_production", self.max_instant_production),
            ("max_instant_consumption", self.max_instant_consumption),
            ("max_production", self.max_production),
            ("max_consumption", self.max_consumption),
        ] {
            if let Some(value) = value {
                if value.is_nan() || value < 0.0 {
                    return Err(Error::InvalidConfig(format!(
                        "{name} must be non-negative, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Constant limits before any step.
    pub fn base_limits(&self) -> ConstantLimits {
        ConstantLimits::new(
            self.lower_limit.unwrap_or(f64::NEG_INFINITY),
            self.upper_limit.unwrap_or(f64::INFINITY),
        )
    }

    /// Builds the limit profile described by this configuration.
    pub fn limits(&self) -> Box<dyn LimitProfile> {
        if self.limit_steps.is_empty() {
            return Box::new(self.base_limits());
        }
        let limits = self
            .limit_steps
            .iter()
            .fold(StepLimits::new(self.base_limits()), |limits, step| {
                limits.with_step(
                    step.from,
                    ConstantLimits::new(
                        step.lower.unwrap_or(f64::NEG_INFINITY),
                        step.upper.unwrap_or(f64::INFINITY),
                    ),
                )
            });
        Box::new(limits)
    }

    /// Rate and sum maxima, with absent values unbounded.
    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            max_instant_production: self.max_instant_production.unwrap_or(f64::INFINITY),
            max_instant_consumption: self.max_instant_consumption.unwrap_or(f64::INFINITY),
            max_production: self.max_production.unwrap_or(f64::INFINITY),
            max_consumption: self.max_consumption.unwrap_or(f64::INFINITY),
        }
    }
}

fn check_limits(what: &str, lower: Option<f64>, upper: Option<f64>) -> Result<()> {
    let lower_value = lower.unwrap_or(f64::NEG_INFINITY);
    let upper_value = upper.unwrap_or(f64::INFINITY);
    if lower_value.is_nan() || upper_value.is_nan() || lower_value > upper_value {
        return Err(Error::InvalidConfig(format!(
            "{what}: lower limit {lower_value} exceeds upper limit {upper_value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_unbounded() {
        let config = ProfileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, StrategyKind::Flow);
        assert_eq!(config.detector, DetectorKind::ClosedWorld);
        assert!(config.rate_limits().max_production.is_infinite());
        assert!(config.limits().upper_limit(0).is_infinite());
    }

    #[test]
    fn builders_map_infinity_to_absent() {
        let config = ProfileConfig::default().with_limits(f64::NEG_INFINITY, 5.0);
        assert_eq!(config.lower_limit, None);
        assert_eq!(config.upper_limit, Some(5.0));
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let config = ProfileConfig::default().with_limits(3.0, 1.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = ProfileConfig::default().with_initial_level(2.0, 1.0);
        assert!(config.validate().is_err());

        let config = ProfileConfig::default().with_max_consumption(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn steps_must_increase() {
        let config = ProfileConfig::default()
            .with_limit_step(10, 0.0, 5.0)
            .with_limit_step(10, 0.0, 6.0);
        assert!(config.validate().is_err());

        let config = ProfileConfig::default()
            .with_limits(0.0, 10.0)
            .with_limit_step(10, 0.0, 5.0);
        assert!(config.validate().is_ok());
        let limits = config.limits();
        assert!((limits.upper_limit(9) - 10.0).abs() < f64::EPSILON);
        assert!((limits.upper_limit(10) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn json_round_trip_and_partial_documents() {
        let config = ProfileConfig::default()
            .with_limits(-15.0, f64::INFINITY)
            .with_strategy(StrategyKind::Timetable)
            .with_detector(DetectorKind::OpenWorld);
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(ProfileConfig::from_json(&text).unwrap(), config);

        let partial = ProfileConfig::from_json(r#"{"upper_limit": 5.0, "strategy": "grounded"}"#)
            .unwrap();
        assert_eq!(partial.upper_limit, Some(5.0));
        assert_eq!(partial.strategy, StrategyKind::Grounded);

        assert!(matches!(
            ProfileConfig::from_json("{not json"),
            Err(Error::MalformedConfig(_))
        ));
    }

    #[test]
    fn kinds_parse_from_names() {
        assert_eq!("flow".parse::<StrategyKind>().unwrap(), StrategyKind::Flow);
        assert_eq!(
            "open-world".parse::<DetectorKind>().unwrap(),
            DetectorKind::OpenWorld
        );
        assert!("heap".parse::<StrategyKind>().is_err());
    }
}
