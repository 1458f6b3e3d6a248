//! Incremental max-flow envelope.
//!
//! Each side of the envelope keeps a running level and a flow graph of the
//! transactions that may or may not have happened yet. At every instant the
//! newly possible transactions join the graph (expansion), transactions that
//! must have happened by now leave it and are added to the level
//! (contraction), and whatever the residual graph still reaches from the
//! source is assumed to have happened in the extreme case.
//!
//! A sweep that starts in the middle of the timeline rebuilds both graphs
//! from the transactions still pending at its first instant, so only the
//! dirty tail is ever recomputed.

use super::{tally, EnvelopeStrategy, RecomputeContext};
use crate::config::StrategyKind;
use crate::flow_graph::{FlowProfileGraph, Level};
use crate::order::{OrderCache, TemporalOrder};
use envelope_model::{
    DomainChange, Instant, Levels, Time, TimeInterval, Transaction, TransactionId,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// One side of the envelope.
#[derive(Debug, Clone)]
struct LevelGraph {
    graph: FlowProfileGraph,
    contributions: HashMap<TransactionId, Time>,
    dirty: bool,
    active: bool,
    reenabled: bool,
}

impl LevelGraph {
    fn new(level: Level) -> Self {
        Self {
            graph: FlowProfileGraph::new(level),
            contributions: HashMap::new(),
            dirty: true,
            active: false,
            reenabled: false,
        }
    }

    fn init(
        &mut self,
        orders: &mut OrderCache,
        ctx: &RecomputeContext<'_>,
        seed: Option<&Instant>,
        first: &Instant,
    ) {
        self.active = self.dirty;
        self.reenabled = false;
        if !self.active {
            return;
        }
        self.graph.reset();

        let Some(seed) = seed else {
            self.contributions.clear();
            return;
        };
        // Only the prefix up to the seed instant is still valid.
        let committed = seed.time();
        self.contributions.retain(|_, at| *at <= committed);

        let time = first.time();

        let pending: Vec<TransactionId> = first
            .transactions()
            .iter()
            .copied()
            .filter(|id| {
                let t = &ctx.transactions[*id];
                !t.is_time_singleton() && t.earliest() < time && !self.contributions.contains_key(id)
            })
            .collect();
        for &id in &pending {
            self.graph.enable_transaction(id, &ctx.transactions[id]);
        }
        self.reenabled = !pending.is_empty();
        for (i, &a) in pending.iter().enumerate() {
            for &b in &pending[i + 1..] {
                self.link(orders, ctx, a, b);
            }
        }
        trace!(level = ?self.graph.level(), pending = pending.len(), time, "rebuilt pending set");
    }

    /// Adds the ordering edge between two pending transactions.
    fn link(
        &mut self,
        orders: &mut OrderCache,
        ctx: &RecomputeContext<'_>,
        a: TransactionId,
        b: TransactionId,
    ) {
        if !self.graph.is_enabled(a) || !self.graph.is_enabled(b) {
            return;
        }
        let order = orders.get_order(
            (a, &ctx.transactions[a]),
            (b, &ctx.transactions[b]),
            ctx.oracle,
        );
        match order {
            TemporalOrder::StrictlyAt => self.graph.enable_at(a, b),
            TemporalOrder::BeforeOrAt => self.graph.enable_at_or_before(a, b),
            TemporalOrder::AfterOrAt => self.graph.enable_at_or_before(b, a),
            TemporalOrder::NotOrdered | TemporalOrder::Unknown => {}
        }
    }

    /// Advances the running level `start` across `instant`.
    fn recompute(
        &mut self,
        orders: &mut OrderCache,
        ctx: &RecomputeContext<'_>,
        instant: &Instant,
        start: f64,
    ) -> f64 {
        let time = instant.time();
        let level = self.graph.level();
        let mut value = start;

        let mut expanded = std::mem::take(&mut self.reenabled);
        for &id in instant.starting() {
            let transaction = &ctx.transactions[id];
            if transaction.is_time_singleton() {
                continue;
            }
            expanded = true;
            self.graph.enable_transaction(id, transaction);
            for &other in instant.transactions() {
                if other == id {
                    continue;
                }
                let candidate = &ctx.transactions[other];
                if candidate.is_time_singleton() || candidate.ends_at(time) {
                    continue;
                }
                if candidate.starts_at(time) || self.graph.is_enabled(other) {
                    self.link(orders, ctx, id, other);
                }
            }
        }
        if expanded {
            value += self.graph.disable_reachable_residual_graph(
                ctx.transactions,
                &mut self.contributions,
                time,
            );
        }

        let mut contracted = false;
        for &id in instant.ending() {
            let transaction = &ctx.transactions[id];
            if self.graph.is_enabled(id) {
                self.graph.push_flow(id);
                self.graph.disable(id);
                contracted = true;
            } else if !transaction.is_time_singleton() {
                continue;
            }
            self.contributions.insert(id, time);
            value += level.closed_contribution(transaction);
        }
        if contracted {
            self.graph.restore_flow();
            value += self.graph.disable_reachable_residual_graph(
                ctx.transactions,
                &mut self.contributions,
                time,
            );
        }
        value
    }
}

/// Envelope computed by incremental maximum flow.
#[derive(Debug, Clone)]
pub struct FlowProfile {
    lower: LevelGraph,
    upper: LevelGraph,
    orders: OrderCache,
}

impl Default for FlowProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowProfile {
    /// Creates a profile with both sides dirty.
    pub fn new() -> Self {
        Self {
            lower: LevelGraph::new(Level::Lower),
            upper: LevelGraph::new(Level::Upper),
            orders: OrderCache::new(),
        }
    }

    /// Returns true if the next sweep recomputes `level`.
    pub const fn is_dirty(&self, level: Level) -> bool {
        match level {
            Level::Lower => self.lower.dirty,
            Level::Upper => self.upper.dirty,
        }
    }

    /// Memoized orders.
    pub const fn orders(&self) -> &OrderCache {
        &self.orders
    }

    fn mark(&mut self, lower: bool, upper: bool) {
        self.lower.dirty |= lower;
        self.upper.dirty |= upper;
    }
}

impl EnvelopeStrategy for FlowProfile {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Flow
    }

    fn init_recompute(&mut self, ctx: &RecomputeContext<'_>, seed: Option<&Instant>, first: &Instant) {
        self.lower.init(&mut self.orders, ctx, seed, first);
        self.upper.init(&mut self.orders, ctx, seed, first);
        debug!(
            from = first.time(),
            seeded = seed.is_some(),
            lower = self.lower.active,
            upper = self.upper.active,
            "flow sweep"
        );
    }

    fn recompute_levels(&mut self, ctx: &RecomputeContext<'_>, prev: &Levels, instant: &mut Instant) {
        let mut levels = *instant.levels();
        if self.lower.active {
            let lower = self
                .lower
                .recompute(&mut self.orders, ctx, instant, prev.lower_level_min);
            levels.lower_level_min = lower;
            levels.lower_level_max = lower;
        }
        if self.upper.active {
            let upper = self
                .upper
                .recompute(&mut self.orders, ctx, instant, prev.upper_level_max);
            levels.upper_level_min = upper;
            levels.upper_level_max = upper;
        }
        tally(prev, instant, ctx.transactions, &mut levels);
        instant.set_levels(levels);
    }

    fn finish_recompute(&mut self, completed: bool) {
        if completed {
            self.lower.dirty = false;
            self.upper.dirty = false;
        }
        self.lower.active = false;
        self.upper.active = false;
    }

    fn transaction_added(&mut self, _id: TransactionId, transaction: &Transaction) -> Time {
        self.mark(true, true);
        transaction.earliest()
    }

    fn transaction_removed(&mut self, id: TransactionId, transaction: &Transaction) -> Time {
        self.mark(true, true);
        self.orders.forget(id);
        self.lower.contributions.remove(&id);
        self.upper.contributions.remove(&id);
        transaction.earliest()
    }

    fn transaction_time_changed(
        &mut self,
        id: TransactionId,
        old: TimeInterval,
        new: TimeInterval,
        change: DomainChange,
    ) -> Time {
        self.mark(true, true);
        self.lower.contributions.remove(&id);
        self.upper.contributions.remove(&id);
        if change.is_restriction() {
            self.orders.on_constraint_added();
        } else {
            self.orders.on_constraint_removed();
        }
        old.lb.min(new.lb)
    }

    fn transaction_quantity_changed(
        &mut self,
        _id: TransactionId,
        transaction: &Transaction,
        change: DomainChange,
    ) -> Time {
        let consumer = transaction.is_consumer();
        match change {
            DomainChange::UpperBoundDecreased => self.mark(consumer, !consumer),
            DomainChange::LowerBoundIncreased => self.mark(!consumer, consumer),
            _ => self.mark(true, true),
        }
        transaction.earliest()
    }

    fn constraint_changed(&mut self, a: &Transaction, b: &Transaction, added: bool) -> Time {
        self.mark(true, true);
        if added {
            self.orders.on_constraint_added();
        } else {
            self.orders.on_constraint_removed();
        }
        a.earliest().min(b.earliest())
    }

    fn contribution(&self, id: TransactionId, level: Level) -> Option<Time> {
        match level {
            Level::Lower => self.lower.contributions.get(&id).copied(),
            Level::Upper => self.upper.contributions.get(&id).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{assert_envelope, sweep, timeline};
    use super::*;
    use crate::oracle::{BoundsOracle, PrecedenceOracle, Relation};
    use envelope_model::Arena;

    fn producer(time: (i64, i64), quantity: (f64, f64)) -> Transaction {
        Transaction::producer(time, quantity).unwrap()
    }

    fn consumer(time: (i64, i64), quantity: (f64, f64)) -> Transaction {
        Transaction::consumer(time, quantity).unwrap()
    }

    fn run(transactions: Vec<Transaction>) -> Vec<(i64, f64, f64)> {
        let mut arena = Arena::new();
        for t in transactions {
            arena.insert(t);
        }
        let mut instants = timeline(&arena);
        sweep(&mut FlowProfile::new(), &arena, &BoundsOracle, &mut instants)
    }

    fn run_concurrent(first: Transaction, second: Transaction) -> Vec<(i64, f64, f64)> {
        let mut arena = Arena::new();
        let a = arena.insert(first);
        let b = arena.insert(second);
        let mut oracle = PrecedenceOracle::new();
        oracle.add(Relation::concurrent(a, b));
        let mut instants = timeline(&arena);
        sweep(&mut FlowProfile::new(), &arena, &oracle, &mut instants)
    }

    #[test]
    fn overlapping_producers_and_consumers() {
        let envelope = run(vec![
            producer((0, 10), (1.0, 1.0)),
            consumer((10, 15), (1.0, 1.0)),
            consumer((5, 15), (1.0, 1.0)),
            producer((5, 15), (1.0, 1.0)),
        ]);
        assert_envelope(
            &envelope,
            &[(0, 0.0, 1.0), (5, -1.0, 2.0), (10, -1.0, 2.0), (15, 0.0, 0.0)],
        );
    }

    #[test]
    fn unordered_pair() {
        let envelope = run(vec![
            producer((0, 10), (1.0, 1.0)),
            consumer((0, 10), (1.0, 1.0)),
        ]);
        assert_envelope(&envelope, &[(0, -1.0, 1.0), (10, 0.0, 0.0)]);
    }

    #[test]
    fn fixed_consumer_between_flexible_producers() {
        let envelope = run(vec![
            producer((0, 10), (1.0, 2.0)),
            consumer((10, 10), (1.0, 2.0)),
            producer((10, 20), (1.0, 2.0)),
        ]);
        assert_envelope(
            &envelope,
            &[(0, 0.0, 2.0), (10, -1.0, 3.0), (20, 0.0, 3.0)],
        );
    }

    #[test]
    fn disjoint_transactions() {
        let envelope = run(vec![
            producer((0, 5), (1.0, 2.0)),
            consumer((10, 15), (1.0, 2.0)),
            producer((20, 25), (1.0, 2.0)),
        ]);
        assert_envelope(
            &envelope,
            &[
                (0, 0.0, 2.0),
                (5, 1.0, 2.0),
                (10, -1.0, 2.0),
                (15, -1.0, 1.0),
                (20, -1.0, 3.0),
                (25, 0.0, 3.0),
            ],
        );
    }

    #[test]
    fn concurrent_pair_cancels() {
        let envelope = run_concurrent(
            producer((0, 10), (1.0, 1.0)),
            consumer((0, 10), (1.0, 1.0)),
        );
        assert_envelope(&envelope, &[(0, 0.0, 0.0), (10, 0.0, 0.0)]);
    }

    #[test]
    fn four_unordered_transactions() {
        let envelope = run(vec![
            producer((0, 100), (1.0, 2.0)),
            consumer((0, 100), (1.0, 2.0)),
            producer((0, 100), (1.0, 2.0)),
            consumer((0, 100), (1.0, 2.0)),
        ]);
        assert_envelope(&envelope, &[(0, -4.0, 4.0), (100, -2.0, 2.0)]);
    }

    #[test]
    fn concurrent_pair_with_larger_production() {
        let envelope = run_concurrent(
            producer((0, 10), (2.0, 2.0)),
            consumer((0, 10), (1.0, 2.0)),
        );
        assert_envelope(&envelope, &[(0, 0.0, 1.0), (10, 0.0, 1.0)]);
    }

    #[test]
    fn concurrent_pair_with_larger_consumption() {
        let envelope = run_concurrent(
            producer((0, 10), (1.0, 2.0)),
            consumer((0, 10), (2.0, 2.0)),
        );
        assert_envelope(&envelope, &[(0, -1.0, 0.0), (10, -1.0, 0.0)]);
    }

    #[test]
    fn concurrent_partners_contribute_together() {
        let mut arena = Arena::new();
        let a = arena.insert(producer((0, 10), (2.0, 2.0)));
        let b = arena.insert(consumer((0, 10), (1.0, 2.0)));
        let mut oracle = PrecedenceOracle::new();
        oracle.add(Relation::concurrent(a, b));
        let mut instants = timeline(&arena);
        let mut profile = FlowProfile::new();
        sweep(&mut profile, &arena, &oracle, &mut instants);

        for level in [Level::Lower, Level::Upper] {
            assert_eq!(profile.contribution(a, level), profile.contribution(b, level));
        }
        assert_eq!(profile.contribution(a, Level::Upper), Some(0));
    }

    #[test]
    fn quantity_changes_mark_one_side() {
        let mut profile = FlowProfile::new();
        profile.finish_recompute(true);
        let c = consumer((0, 10), (1.0, 2.0));
        let mut arena = Arena::new();
        let id = arena.insert(c.clone());

        assert_eq!(
            profile.transaction_quantity_changed(id, &c, DomainChange::UpperBoundDecreased),
            0
        );
        assert!(profile.is_dirty(Level::Lower));
        assert!(!profile.is_dirty(Level::Upper));

        profile.finish_recompute(true);
        profile.transaction_quantity_changed(id, &c, DomainChange::LowerBoundIncreased);
        assert!(!profile.is_dirty(Level::Lower));
        assert!(profile.is_dirty(Level::Upper));
    }

    #[test]
    fn early_stop_keeps_sides_dirty() {
        let mut profile = FlowProfile::new();
        profile.finish_recompute(false);
        assert!(profile.is_dirty(Level::Lower) && profile.is_dirty(Level::Upper));
        profile.finish_recompute(true);
        assert!(!profile.is_dirty(Level::Lower) && !profile.is_dirty(Level::Upper));
    }

    #[test]
    fn time_changes_return_the_earlier_start() {
        let mut profile = FlowProfile::new();
        let mut arena = Arena::new();
        let id = arena.insert(consumer((0, 10), (1.0, 1.0)));
        let start = profile.transaction_time_changed(
            id,
            TimeInterval::new(5, 10),
            TimeInterval::new(3, 10),
            DomainChange::Relaxed,
        );
        assert_eq!(start, 3);
    }

    #[test]
    fn seeded_sweep_matches_full_sweep() {
        let mut arena = Arena::new();
        arena.insert(producer((0, 100), (1.0, 2.0)));
        arena.insert(consumer((10, 100), (1.0, 1.0)));
        arena.insert(producer((0, 100), (1.0, 2.0)));
        arena.insert(consumer((0, 100), (1.0, 2.0)));
        let ctx = RecomputeContext {
            transactions: &arena,
            oracle: &BoundsOracle,
            initial_level: envelope_model::QuantityInterval::new(0.0, 0.0),
        };

        let mut instants = timeline(&arena);
        let mut profile = FlowProfile::new();
        let full = sweep(&mut profile, &arena, &BoundsOracle, &mut instants);

        // Sweep again from the second instant, seeded by the first.
        profile.mark(true, true);
        profile.init_recompute(&ctx, Some(&instants[0]), &instants[1]);
        let mut prev = *instants[0].levels();
        for instant in &mut instants[1..] {
            profile.recompute_levels(&ctx, &prev, instant);
            prev = *instant.levels();
        }
        profile.finish_recompute(true);

        let resumed: Vec<_> = instants
            .iter()
            .map(|i| (i.time(), i.lower_level(), i.upper_level()))
            .collect();
        assert_envelope(&resumed, &full);
        assert_envelope(&full, &[(0, -2.0, 4.0), (10, -3.0, 4.0), (100, -1.0, 2.0)]);
    }
}
