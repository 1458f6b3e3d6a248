//! Timetable envelope.
//!
//! Ignores temporal orders: a transaction is assumed to happen at whichever
//! end of its time window is worst for the side being computed. Cheap, and
//! never tighter than the flow envelope.

use super::{tally, EnvelopeStrategy, RecomputeContext};
use crate::config::StrategyKind;
use envelope_model::{Arena, Instant, Levels, Role, Transaction};

/// Running values of the four level fields after `instant`.
pub(super) fn timetable_levels(
    prev: &Levels,
    instant: &Instant,
    transactions: &Arena<Transaction>,
) -> Levels {
    let mut levels = *prev;
    for &id in instant.starting() {
        let transaction = &transactions[id];
        let q = transaction.quantity();
        match transaction.role() {
            Role::Consumer => {
                levels.lower_level_min -= q.ub;
                levels.lower_level_max -= q.lb;
            }
            Role::Producer => {
                levels.upper_level_min += q.lb;
                levels.upper_level_max += q.ub;
            }
        }
    }
    for &id in instant.ending() {
        let transaction = &transactions[id];
        let q = transaction.quantity();
        match transaction.role() {
            Role::Consumer => {
                levels.upper_level_max -= q.lb;
                levels.upper_level_min -= q.ub;
            }
            Role::Producer => {
                levels.lower_level_min += q.lb;
                levels.lower_level_max += q.ub;
            }
        }
    }
    levels
}

/// Envelope from running start and end sums.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimetableProfile;

impl TimetableProfile {
    /// Creates the strategy.
    pub const fn new() -> Self {
        Self
    }
}

impl EnvelopeStrategy for TimetableProfile {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Timetable
    }

    fn init_recompute(&mut self, _ctx: &RecomputeContext<'_>, _seed: Option<&Instant>, _first: &Instant) {}

    fn recompute_levels(&mut self, ctx: &RecomputeContext<'_>, prev: &Levels, instant: &mut Instant) {
        let mut levels = timetable_levels(prev, instant, ctx.transactions);
        tally(prev, instant, ctx.transactions, &mut levels);
        instant.set_levels(levels);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{assert_envelope, sweep, timeline};
    use super::*;
    use crate::oracle::{BoundsOracle, PrecedenceOracle, Relation};

    #[allow(clippy::cast_precision_loss)]
    fn area(envelope: &[(i64, f64, f64)]) -> f64 {
        envelope
            .windows(2)
            .map(|w| (w[0].2 - w[0].1) * (w[1].0 - w[0].0) as f64)
            .sum()
    }

    #[test]
    fn level_area_grows_with_overlapping_producers() {
        let mut arena = Arena::new();
        arena.insert(Transaction::producer((0, 1000), (45.0, 45.0)).unwrap());
        let mut instants = timeline(&arena);
        let envelope = sweep(&mut TimetableProfile::new(), &arena, &BoundsOracle, &mut instants);
        assert!((area(&envelope) - 45_000.0).abs() < 1e-9);

        arena.insert(Transaction::producer((1, 1000), (35.0, 35.0)).unwrap());
        let mut instants = timeline(&arena);
        let envelope = sweep(&mut TimetableProfile::new(), &arena, &BoundsOracle, &mut instants);
        assert!((area(&envelope) - (45.0 + 80.0 * 999.0)).abs() < 1e-9);

        arena.insert(Transaction::producer((2, 1000), (20.0, 20.0)).unwrap());
        let mut instants = timeline(&arena);
        let envelope = sweep(&mut TimetableProfile::new(), &arena, &BoundsOracle, &mut instants);
        assert!((area(&envelope) - (45.0 + 80.0 + 998.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn ignores_temporal_orders() {
        let mut arena = Arena::new();
        let a = arena.insert(Transaction::producer((0, 10), (1.0, 1.0)).unwrap());
        let b = arena.insert(Transaction::consumer((0, 10), (1.0, 1.0)).unwrap());
        let mut oracle = PrecedenceOracle::new();
        oracle.add(Relation::concurrent(a, b));

        let mut instants = timeline(&arena);
        let envelope = sweep(&mut TimetableProfile::new(), &arena, &oracle, &mut instants);
        assert_envelope(&envelope, &[(0, -1.0, 1.0), (10, 0.0, 0.0)]);
    }

    #[test]
    fn inner_fields_track_the_other_quantity_bound() {
        let mut arena = Arena::new();
        arena.insert(Transaction::consumer((0, 10), (1.0, 3.0)).unwrap());
        let mut instants = timeline(&arena);
        sweep(&mut TimetableProfile::new(), &arena, &BoundsOracle, &mut instants);

        let start = instants[0].levels();
        assert!((start.lower_level_min + 3.0).abs() < 1e-9);
        assert!((start.lower_level_max + 1.0).abs() < 1e-9);
        let end = instants[1].levels();
        assert!((end.upper_level_max + 1.0).abs() < 1e-9);
        assert!((end.upper_level_min + 3.0).abs() < 1e-9);
    }
}
