//! Open-world detection.
//!
//! Transactions not yet known may still be added, up to the production and
//! consumption totals. A level is only violated if even the remaining
//! allowance cannot bring it back inside the limits.

use super::LevelBounds;
use crate::limits::RateLimits;
use envelope_model::{Levels, QuantityInterval};

/// Widens the violation bounds by what may still happen.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorld;

impl LevelBounds for OpenWorld {
    fn violation_bounds(&self, levels: &Levels, rates: &RateLimits) -> QuantityInterval {
        let consumable = rates.max_consumption - levels.min_cumulative_consumption;
        let producible = rates.max_production - levels.min_cumulative_production;
        QuantityInterval::new(
            levels.lower_level_min - consumable,
            levels.upper_level_max + producible,
        )
    }

    fn flaw_bounds(&self, levels: &Levels) -> QuantityInterval {
        levels.envelope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::testing::{envelope, instant_with};
    use crate::detector::{build, FvDetector};
    use crate::config::DetectorKind;
    use crate::limits::ConstantLimits;
    use crate::listener::NullListener;

    #[test]
    fn unbounded_totals_never_violate_the_level() {
        let bounds = OpenWorld.violation_bounds(&envelope(-5.0, -3.0), &RateLimits::default());
        assert!(bounds.lb.is_infinite() && bounds.ub.is_infinite());

        let (_arena, id, mut instant) = instant_with(envelope(-5.0, -3.0));
        let mut detector = build(DetectorKind::OpenWorld, RateLimits::default(), false);
        let stop = detector.detect(id, &mut instant, &ConstantLimits::new(0.0, 10.0), &mut NullListener);
        assert!(!stop);
        assert!(!instant.is_violated());
        assert!(instant.is_flawed());
    }

    #[test]
    fn remaining_production_is_taken_into_account() {
        let mut levels = envelope(-5.0, -3.0);
        levels.min_cumulative_production = 1.0;
        let rates = RateLimits {
            max_production: 2.0,
            max_consumption: 0.0,
            ..RateLimits::default()
        };
        // At most one more unit may be produced: -3 + 1 is still below 0.
        assert_eq!(OpenWorld.violation_bounds(&levels, &rates), QuantityInterval::new(-5.0, -2.0));

        let (_arena, id, mut instant) = instant_with(levels);
        let mut detector = build(DetectorKind::OpenWorld, rates, false);
        assert!(detector.detect(id, &mut instant, &ConstantLimits::new(0.0, 10.0), &mut NullListener));
    }
}
