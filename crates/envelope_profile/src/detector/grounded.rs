//! Grounded detection: flaws are judged on the level reached when every
//! transaction happens as early as possible.

use super::LevelBounds;
use crate::limits::RateLimits;
use envelope_model::{Levels, QuantityInterval};

/// Checks the envelope for violations and the grounded levels for flaws.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grounded;

impl LevelBounds for Grounded {
    fn violation_bounds(&self, levels: &Levels, _rates: &RateLimits) -> QuantityInterval {
        levels.envelope()
    }

    fn flaw_bounds(&self, levels: &Levels) -> QuantityInterval {
        QuantityInterval::new(levels.lower_level_max, levels.upper_level_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flaws_use_the_grounded_levels() {
        let levels = Levels {
            lower_level_min: -10.0,
            lower_level_max: -1.0,
            upper_level_min: 2.0,
            upper_level_max: 10.0,
            ..Levels::default()
        };
        assert_eq!(Grounded.flaw_bounds(&levels), QuantityInterval::new(-1.0, 2.0));
        assert_eq!(
            Grounded.violation_bounds(&levels, &RateLimits::default()),
            QuantityInterval::new(-10.0, 10.0)
        );
    }
}
