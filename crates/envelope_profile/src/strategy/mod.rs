//! Level bound strategies.
//!
//! A strategy turns the transactions overlapping an instant, plus the bounds
//! committed at the previous instant, into the bounds of that instant. The
//! profile owns exactly one strategy and drives it through a sweep:
//! [`EnvelopeStrategy::init_recompute`] once, then
//! [`EnvelopeStrategy::recompute_levels`] per instant in time order, then
//! [`EnvelopeStrategy::finish_recompute`].
//!
//! The change callbacks return the earliest time whose bounds the change can
//! affect. [`MINUS_INFINITY`](envelope_model::MINUS_INFINITY) means the whole
//! timeline.

mod flow;
mod grounded;
mod tally;
mod timetable;

pub use flow::FlowProfile;
pub use grounded::GroundedProfile;
pub use tally::tally;
pub use timetable::TimetableProfile;

use crate::config::StrategyKind;
use crate::flow_graph::Level;
use crate::oracle::TemporalOracle;
use envelope_model::{
    Arena, DomainChange, Instant, Levels, QuantityInterval, Time, TimeInterval, Transaction,
    TransactionId, MINUS_INFINITY,
};
use std::fmt;

/// What a strategy may read during a sweep.
pub struct RecomputeContext<'a> {
    /// Registered transactions.
    pub transactions: &'a Arena<Transaction>,
    /// Temporal distance oracle.
    pub oracle: &'a dyn TemporalOracle,
    /// Level before the first instant.
    pub initial_level: QuantityInterval,
}

impl fmt::Debug for RecomputeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecomputeContext")
            .field("transactions", &self.transactions.len())
            .field("initial_level", &self.initial_level)
            .finish_non_exhaustive()
    }
}

/// Computes level bounds instant by instant.
pub trait EnvelopeStrategy: fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Prepares a sweep starting at `first`. `seed` is the instant before
    /// `first` with its committed bounds, or `None` if `first` is the
    /// earliest instant.
    fn init_recompute(&mut self, ctx: &RecomputeContext<'_>, seed: Option<&Instant>, first: &Instant);

    /// Computes the bounds of `instant` from those of its predecessor.
    fn recompute_levels(&mut self, ctx: &RecomputeContext<'_>, prev: &Levels, instant: &mut Instant);

    /// Ends a sweep. `completed` is false if the sweep stopped early.
    fn finish_recompute(&mut self, _completed: bool) {}

    /// A transaction was registered.
    fn transaction_added(&mut self, _id: TransactionId, _transaction: &Transaction) -> Time {
        MINUS_INFINITY
    }

    /// A transaction was unregistered.
    fn transaction_removed(&mut self, _id: TransactionId, _transaction: &Transaction) -> Time {
        MINUS_INFINITY
    }

    /// A transaction's time bounds moved from `old` to `new`.
    fn transaction_time_changed(
        &mut self,
        _id: TransactionId,
        _old: TimeInterval,
        _new: TimeInterval,
        _change: DomainChange,
    ) -> Time {
        MINUS_INFINITY
    }

    /// A transaction's quantity bounds moved.
    fn transaction_quantity_changed(
        &mut self,
        _id: TransactionId,
        _transaction: &Transaction,
        _change: DomainChange,
    ) -> Time {
        MINUS_INFINITY
    }

    /// A temporal constraint between two transactions was added or removed.
    fn constraint_changed(&mut self, _a: &Transaction, _b: &Transaction, _added: bool) -> Time {
        MINUS_INFINITY
    }

    /// Time at which a transaction started contributing to one side of the
    /// envelope during the last sweep, for strategies that track it.
    fn contribution(&self, _id: TransactionId, _level: Level) -> Option<Time> {
        None
    }
}

/// Builds the strategy named by `kind`.
pub fn build(kind: StrategyKind) -> Box<dyn EnvelopeStrategy> {
    match kind {
        StrategyKind::Flow => Box::new(FlowProfile::new()),
        StrategyKind::Timetable => Box::new(TimetableProfile::new()),
        StrategyKind::Grounded => Box::new(GroundedProfile::new()),
    }
}

/// Timeline helpers shared by the strategy tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::{EnvelopeStrategy, RecomputeContext};
    use crate::oracle::TemporalOracle;
    use envelope_model::{Arena, Instant, Levels, QuantityInterval, Transaction};
    use std::collections::BTreeSet;

    /// Builds one instant per boundary time, holding every overlapping
    /// transaction.
    pub fn timeline(transactions: &Arena<Transaction>) -> Vec<Instant> {
        let times: BTreeSet<_> = transactions
            .iter()
            .flat_map(|(_, t)| [t.earliest(), t.latest()])
            .collect();
        times
            .into_iter()
            .map(|time| {
                let mut instant = Instant::new(time);
                for (id, t) in transactions.iter() {
                    if t.overlaps(time) {
                        instant.insert(id, t);
                    }
                }
                instant
            })
            .collect()
    }

    /// Runs a full sweep and returns `(time, lower, upper)` per instant.
    pub fn sweep(
        strategy: &mut dyn EnvelopeStrategy,
        transactions: &Arena<Transaction>,
        oracle: &dyn TemporalOracle,
        instants: &mut [Instant],
    ) -> Vec<(i64, f64, f64)> {
        let ctx = RecomputeContext {
            transactions,
            oracle,
            initial_level: QuantityInterval::new(0.0, 0.0),
        };
        let Some(first) = instants.first() else {
            return Vec::new();
        };
        strategy.init_recompute(&ctx, None, first);
        let mut prev = Levels::from_initial(ctx.initial_level);
        for instant in instants.iter_mut() {
            strategy.recompute_levels(&ctx, &prev, instant);
            prev = *instant.levels();
        }
        strategy.finish_recompute(true);
        instants
            .iter()
            .map(|i| (i.time(), i.lower_level(), i.upper_level()))
            .collect()
    }

    /// Asserts a swept envelope against `(time, lower, upper)` rows.
    pub fn assert_envelope(actual: &[(i64, f64, f64)], expected: &[(i64, f64, f64)]) {
        assert_eq!(actual.len(), expected.len(), "instant count: {actual:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert_eq!(a.0, e.0, "instant times: {actual:?}");
            assert!(
                (a.1 - e.1).abs() < 1e-9 && (a.2 - e.2).abs() < 1e-9,
                "at {}: got [{}, {}], expected [{}, {}]",
                a.0,
                a.1,
                a.2,
                e.1,
                e.2
            );
        }
    }
}
