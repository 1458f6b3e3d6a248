//! Grounded envelope.
//!
//! Same envelope as the timetable. On top of it the inner fields carry the
//! level reached if every transaction happened as early as possible:
//! `lower_level_max` with the smallest outcome of each transaction and
//! `upper_level_min` with the largest. The grounded detector flags those.

use super::timetable::timetable_levels;
use super::{tally, EnvelopeStrategy, RecomputeContext};
use crate::config::StrategyKind;
use envelope_model::{Instant, Levels};

/// Timetable envelope plus earliest-time grounded levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundedProfile;

impl GroundedProfile {
    /// Creates the strategy.
    pub const fn new() -> Self {
        Self
    }
}

impl EnvelopeStrategy for GroundedProfile {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grounded
    }

    fn init_recompute(&mut self, _ctx: &RecomputeContext<'_>, _seed: Option<&Instant>, _first: &Instant) {}

    fn recompute_levels(&mut self, ctx: &RecomputeContext<'_>, prev: &Levels, instant: &mut Instant) {
        let mut levels = timetable_levels(prev, instant, ctx.transactions);
        levels.lower_level_max = prev.lower_level_max;
        levels.upper_level_min = prev.upper_level_min;
        for &id in instant.starting() {
            let transaction = &ctx.transactions[id];
            levels.lower_level_max += transaction.minimum_effect();
            levels.upper_level_min += transaction.maximum_effect();
        }
        tally(prev, instant, ctx.transactions, &mut levels);
        instant.set_levels(levels);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{assert_envelope, sweep, timeline};
    use super::*;
    use crate::oracle::BoundsOracle;
    use envelope_model::{Arena, Transaction};

    #[test]
    fn grounded_levels_assume_earliest_times() {
        let mut arena = Arena::new();
        arena.insert(Transaction::producer((0, 10), (1.0, 2.0)).unwrap());
        arena.insert(Transaction::consumer((5, 15), (3.0, 4.0)).unwrap());
        let mut instants = timeline(&arena);
        let envelope = sweep(&mut GroundedProfile::new(), &arena, &BoundsOracle, &mut instants);

        assert_envelope(
            &envelope,
            &[(0, 0.0, 2.0), (5, -4.0, 2.0), (10, -3.0, 2.0), (15, -3.0, -1.0)],
        );

        let grounded: Vec<_> = instants
            .iter()
            .map(|i| (i.levels().lower_level_max, i.levels().upper_level_min))
            .collect();
        assert_eq!(grounded, vec![(1.0, 2.0), (-3.0, -1.0), (-3.0, -1.0), (-3.0, -1.0)]);
    }
}
