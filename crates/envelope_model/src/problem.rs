//! Flaw and violation records.

use crate::instant::InstantId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource problem found at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemKind {
    /// More production at one instant than the rate limit allows.
    ProductionRateExceeded,
    /// More consumption at one instant than the rate limit allows.
    ConsumptionRateExceeded,
    /// Total production exceeds its limit.
    ProductionSumExceeded,
    /// Total consumption exceeds its limit.
    ConsumptionSumExceeded,
    /// Level exceeds the upper limit.
    LevelTooHigh,
    /// Level falls below the lower limit.
    LevelTooLow,
    /// Remaining consumption cannot be absorbed.
    NoWayOutConsumption,
    /// Remaining production cannot be absorbed.
    NoWayOutProduction,
}

impl ProblemKind {
    /// Returns true for problems about the level rather than rates or sums.
    pub const fn is_level(self) -> bool {
        matches!(self, Self::LevelTooHigh | Self::LevelTooLow)
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProductionRateExceeded => "production rate exceeded",
            Self::ConsumptionRateExceeded => "consumption rate exceeded",
            Self::ProductionSumExceeded => "production sum exceeded",
            Self::ConsumptionSumExceeded => "consumption sum exceeded",
            Self::LevelTooHigh => "level too high",
            Self::LevelTooLow => "level too low",
            Self::NoWayOutConsumption => "no way out (consumption)",
            Self::NoWayOutProduction => "no way out (production)",
        };
        f.write_str(name)
    }
}

/// A flaw or violation record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceProblem {
    /// What went wrong.
    pub kind: ProblemKind,
    /// Instant the problem was found at, or `None` for a resource-wide problem.
    pub instant: Option<InstantId>,
    /// Size of the exceedance, for flaws that measure one.
    pub magnitude: Option<f64>,
}

impl ResourceProblem {
    /// Creates a problem attached to an instant.
    #[must_use]
    pub const fn at(kind: ProblemKind, instant: InstantId) -> Self {
        Self {
            kind,
            instant: Some(instant),
            magnitude: None,
        }
    }

    /// Creates a resource-wide problem.
    #[must_use]
    pub const fn global(kind: ProblemKind) -> Self {
        Self {
            kind,
            instant: None,
            magnitude: None,
        }
    }

    /// Attaches a magnitude.
    #[must_use]
    pub const fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }
}

impl fmt::Display for ResourceProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(instant) = self.instant {
            write!(f, " at instant {instant}")?;
        }
        if let Some(magnitude) = self.magnitude {
            write!(f, " by {magnitude}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_kinds() {
        assert!(ProblemKind::LevelTooHigh.is_level());
        assert!(ProblemKind::LevelTooLow.is_level());
        assert!(!ProblemKind::ConsumptionSumExceeded.is_level());
    }

    #[test]
    fn display_includes_magnitude() {
        let problem = ResourceProblem::global(ProblemKind::LevelTooHigh).with_magnitude(3.0);
        assert_eq!(problem.to_string(), "level too high by 3");
    }
}
