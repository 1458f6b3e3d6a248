//! Closed-world detection: no transaction beyond the known ones will ever
//! touch the resource, so the envelope itself is checked.

use super::LevelBounds;
use crate::limits::RateLimits;
use envelope_model::{Levels, QuantityInterval};

/// Checks the envelope for both violations and flaws.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedWorld;

impl LevelBounds for ClosedWorld {
    fn violation_bounds(&self, levels: &Levels, _rates: &RateLimits) -> QuantityInterval {
        levels.envelope()
    }

    fn flaw_bounds(&self, levels: &Levels) -> QuantityInterval {
        levels.envelope()
    }
}
