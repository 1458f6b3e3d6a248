//! The profile: transactions, their timeline, and the envelope over it.
//!
//! Change callbacks only record what moved and how far back the envelope is
//! stale. The envelope itself is recomputed lazily by [`Profile::recompute`]
//! or any query that needs fresh bounds. A sweep starts at the earliest
//! stale instant, seeds the strategy with the bounds of the instant before
//! it, and visits the rest of the timeline in time order, letting the
//! detector inspect each instant as soon as its bounds are known.

use crate::config::{ProfileConfig, StrategyKind};
use crate::constraint::{ConstraintEvent, ConstraintId, ConstraintPairing};
use crate::cursor::ProfileCursor;
use crate::detector::{self, DetectorStats, FvDetector};
use crate::error::Result;
use crate::limits::LimitProfile;
use crate::listener::{RecordingListener, ResourceListener};
use crate::oracle::{BoundsOracle, TemporalOracle};
use crate::strategy::{self, EnvelopeStrategy, RecomputeContext};
use envelope_model::{
    Arena, DomainChange, Instant, InstantId, Levels, QuantityInterval, Time, TimeInterval,
    Transaction, TransactionId, MINUS_INFINITY, PLUS_INFINITY,
};
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::{debug, info, trace};

/// Envelope of one resource.
#[derive(Debug)]
pub struct Profile<O: TemporalOracle = BoundsOracle, L: ResourceListener = RecordingListener> {
    config: ProfileConfig,
    transactions: Arena<Transaction>,
    instants: Arena<Instant>,
    timeline: BTreeMap<Time, InstantId>,
    strategy: Box<dyn EnvelopeStrategy>,
    detector: Box<dyn FvDetector>,
    limits: Box<dyn LimitProfile>,
    oracle: O,
    listener: L,
    pairing: ConstraintPairing,
    dirty_start: Option<Time>,
    needs_recompute: bool,
    change_count: u64,
}

impl Profile {
    /// Creates a profile that orders transactions by their time bounds alone
    /// and records every notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ProfileConfig) -> Result<Self> {
        Self::with_parts(config, BoundsOracle, RecordingListener::new())
    }
}

impl<O: TemporalOracle, L: ResourceListener> Profile<O, L> {
    /// Creates a profile around the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_parts(config: ProfileConfig, oracle: O, listener: L) -> Result<Self> {
        config.validate()?;
        let strategy = strategy::build(config.strategy);
        let detector = detector::build(config.detector, config.rate_limits(), config.allow_violations);
        let limits = config.limits();
        debug!(strategy = %config.strategy, detector = %config.detector, "profile created");
        Ok(Self {
            config,
            transactions: Arena::new(),
            instants: Arena::new(),
            timeline: BTreeMap::new(),
            strategy,
            detector,
            limits,
            oracle,
            listener,
            pairing: ConstraintPairing::new(),
            dirty_start: None,
            needs_recompute: false,
            change_count: 0,
        })
    }

    /// Configuration the profile was built from.
    pub const fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Level bound algorithm in use.
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// The strategy, for inspection.
    pub fn strategy(&self) -> &dyn EnvelopeStrategy {
        self.strategy.as_ref()
    }

    /// Detector counters of the last sweep.
    pub fn detector_stats(&self) -> DetectorStats {
        self.detector.stats()
    }

    /// The temporal oracle.
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The temporal oracle, for updating. Report the update through
    /// [`Profile::temporal_constraint_added`] or
    /// [`Profile::temporal_constraint_removed`].
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// The listener.
    pub const fn listener(&self) -> &L {
        &self.listener
    }

    /// The listener, for draining.
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Returns true if the envelope is stale.
    pub const fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    /// Earliest time whose bounds are stale.
    pub const fn dirty_start(&self) -> Option<Time> {
        self.dirty_start
    }

    /// Number of structural changes so far.
    pub const fn change_count(&self) -> u64 {
        self.change_count
    }

    pub(crate) const fn timeline(&self) -> &BTreeMap<Time, InstantId> {
        &self.timeline
    }

    /// A registered transaction.
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    /// Registered transactions.
    pub fn transactions(&self) -> impl Iterator<Item = (TransactionId, &Transaction)> {
        self.transactions.iter()
    }

    /// An instant by handle.
    pub fn instant(&self, id: InstantId) -> Option<&Instant> {
        self.instants.get(id)
    }

    /// The instant exactly at `time`.
    pub fn instant_at(&self, time: Time) -> Option<&Instant> {
        self.timeline.get(&time).map(|&id| &self.instants[id])
    }

    /// Handle of the instant exactly at `time`.
    pub fn instant_id_at(&self, time: Time) -> Option<InstantId> {
        self.timeline.get(&time).copied()
    }

    /// Instants in time order, with the bounds of the last sweep.
    pub fn instants(&self) -> impl Iterator<Item = &Instant> {
        self.timeline.values().map(|&id| &self.instants[id])
    }

    /// Number of instants.
    pub fn instant_count(&self) -> usize {
        self.timeline.len()
    }

    /// Recomputes if needed and returns a cursor over every instant.
    pub fn cursor(&mut self) -> ProfileCursor {
        self.cursor_between(MINUS_INFINITY, PLUS_INFINITY)
    }

    /// Recomputes if needed and returns a cursor over the instants in
    /// `[start, end]`.
    pub fn cursor_between(&mut self, start: Time, end: Time) -> ProfileCursor {
        self.recompute();
        ProfileCursor::new(self, start, end)
    }

    /// Envelope at `time`: the bounds of the latest instant at or before it,
    /// or the initial level before the first instant.
    pub fn level_at(&mut self, time: Time) -> QuantityInterval {
        self.recompute();
        self.timeline
            .range(..=time)
            .next_back()
            .map_or(self.config.initial_level, |(_, &id)| {
                self.instants[id].levels().envelope()
            })
    }

    /// Sets whether violations stop a sweep. Allowing them resumes a sweep
    /// that stopped early.
    pub fn set_allow_violations(&mut self, allow: bool) {
        self.config.allow_violations = allow;
        self.detector.set_allow_violations(allow);
        if allow && self.dirty_start.is_some() {
            self.needs_recompute = true;
        }
    }

    fn registered(&self, id: TransactionId) -> &Transaction {
        match self.transactions.get(id) {
            Some(transaction) => transaction,
            None => panic!("transaction {id} is not registered"),
        }
    }

    fn mark_dirty(&mut self, start: Time) {
        self.dirty_start = Some(self.dirty_start.map_or(start, |current| current.min(start)));
        self.needs_recompute = true;
        trace!(start, "dirty");
    }

    /// Creates the instant at `time` unless it exists. A new instant inherits
    /// the transactions of its predecessor that overlap it.
    fn ensure_instant(&mut self, time: Time) {
        if self.timeline.contains_key(&time) {
            return;
        }
        let mut instant = Instant::new(time);
        if let Some((_, &previous)) = self.timeline.range(..time).next_back() {
            for &id in self.instants[previous].transactions() {
                let transaction = &self.transactions[id];
                if transaction.overlaps(time) {
                    instant.insert(id, transaction);
                }
            }
        }
        let id = self.instants.insert(instant);
        self.timeline.insert(time, id);
        trace!(time, instant = %id, "instant created");
    }

    /// Brings the membership of `id` up to date in every instant of `span`.
    fn refresh_membership(&mut self, id: TransactionId, span: TimeInterval) {
        let transaction = &self.transactions[id];
        for (&time, &instant) in self.timeline.range(span.lb..=span.ub) {
            let instant = &mut self.instants[instant];
            if transaction.overlaps(time) {
                instant.insert(id, transaction);
            } else {
                instant.remove(id);
            }
        }
    }

    /// Deletes the instants of `span` that no longer mark a start or end.
    fn prune(&mut self, span: TimeInterval) {
        let stale: Vec<(Time, InstantId)> = self
            .timeline
            .range(span.lb..=span.ub)
            .filter(|(_, &id)| !self.instants[id].contains_start_or_end())
            .map(|(&time, &id)| (time, id))
            .collect();
        for (time, id) in stale {
            self.timeline.remove(&time);
            self.instants.remove(id);
            self.listener.notify_deleted(id);
            trace!(time, instant = %id, "instant deleted");
        }
    }

    /// Registers a transaction.
    pub fn add_transaction(&mut self, transaction: Transaction) -> TransactionId {
        let span = transaction.time();
        let id = self.transactions.insert(transaction);
        self.ensure_instant(span.lb);
        self.ensure_instant(span.ub);
        self.refresh_membership(id, span);

        let start = self.strategy.transaction_added(id, &self.transactions[id]);
        self.change_count += 1;
        self.mark_dirty(start);
        debug!(transaction = %id, time = %span, "transaction added");
        id
    }

    /// Unregisters a transaction and hands it back.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is not registered.
    pub fn remove_transaction(&mut self, id: TransactionId) -> Transaction {
        let span = self.registered(id).time();
        let start = self.strategy.transaction_removed(id, &self.transactions[id]);
        for (_, &instant) in self.timeline.range(span.lb..=span.ub) {
            self.instants[instant].remove(id);
        }
        let Some(transaction) = self.transactions.remove(id) else {
            panic!("transaction {id} is not registered");
        };
        self.prune(span);

        self.change_count += 1;
        self.mark_dirty(start);
        debug!(transaction = %id, time = %span, "transaction removed");
        transaction
    }

    /// A transaction's time bounds changed.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is not registered.
    pub fn transaction_time_changed(&mut self, id: TransactionId, time: TimeInterval) {
        let old = self.registered(id).time();
        let Some(change) = DomainChange::classify(old, time) else {
            return;
        };
        self.transactions[id].set_time(time);

        let span = TimeInterval::new(old.lb.min(time.lb), old.ub.max(time.ub));
        self.ensure_instant(time.lb);
        self.ensure_instant(time.ub);
        self.refresh_membership(id, span);
        self.prune(span);

        let start = self.strategy.transaction_time_changed(id, old, time, change);
        self.change_count += 1;
        self.mark_dirty(start);
        debug!(transaction = %id, from = %old, to = %time, ?change, "time changed");
    }

    /// A transaction's quantity bounds changed.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is not registered.
    pub fn transaction_quantity_changed(&mut self, id: TransactionId, quantity: QuantityInterval) {
        let old = self.registered(id).quantity();
        let Some(change) = DomainChange::classify(old, quantity) else {
            return;
        };
        self.transactions[id].set_quantity(quantity);
        let start = self
            .strategy
            .transaction_quantity_changed(id, &self.transactions[id], change);
        self.mark_dirty(start);
        debug!(transaction = %id, from = %old, to = %quantity, ?change, "quantity changed");
    }

    /// A temporal constraint between two transactions now holds.
    ///
    /// # Panics
    ///
    /// Panics if either transaction is not registered.
    pub fn temporal_constraint_added(&mut self, a: TransactionId, b: TransactionId) {
        self.constraint_changed(a, b, true);
    }

    /// A temporal constraint between two transactions was retracted.
    ///
    /// # Panics
    ///
    /// Panics if either transaction is not registered.
    pub fn temporal_constraint_removed(&mut self, a: TransactionId, b: TransactionId) {
        self.constraint_changed(a, b, false);
    }

    fn constraint_changed(&mut self, a: TransactionId, b: TransactionId, added: bool) {
        let (first, second) = (self.registered(a).clone(), self.registered(b).clone());
        let start = self.strategy.constraint_changed(&first, &second, added);
        self.mark_dirty(start);
        debug!(a = %a, b = %b, added, "temporal constraint changed");
    }

    /// One half of a temporal constraint notification. Fires
    /// [`Profile::temporal_constraint_added`] or
    /// [`Profile::temporal_constraint_removed`] once both related
    /// transactions have been reported.
    ///
    /// # Panics
    ///
    /// Panics if `scope_len` is not 2 or 3, or `arg_index` is outside it.
    pub fn constraint_message(
        &mut self,
        constraint: ConstraintId,
        scope_len: usize,
        arg_index: usize,
        transaction: TransactionId,
        event: ConstraintEvent,
    ) {
        let paired = self
            .pairing
            .offer(constraint, scope_len, arg_index, transaction, event);
        if let Some((a, b)) = paired {
            match event {
                ConstraintEvent::Added => self.temporal_constraint_added(a, b),
                ConstraintEvent::Removed => self.temporal_constraint_removed(a, b),
            }
        }
    }

    /// Brings the envelope up to date. Does nothing unless a change happened
    /// since the last sweep.
    pub fn recompute(&mut self) {
        if self.needs_recompute {
            self.handle_recompute();
        }
    }

    fn handle_recompute(&mut self) {
        self.needs_recompute = false;
        let Some(start) = self.dirty_start else {
            return;
        };
        let Some((&first_time, &first_id)) = self.timeline.range(start..).next() else {
            self.dirty_start = None;
            return;
        };

        let seed_instant = self
            .timeline
            .range(..first_time)
            .next_back()
            .map(|(_, &id)| &self.instants[id]);
        let seed = seed_instant.map(|instant| *instant.levels());
        let ctx = RecomputeContext {
            transactions: &self.transactions,
            oracle: &self.oracle,
            initial_level: self.config.initial_level,
        };
        self.strategy
            .init_recompute(&ctx, seed_instant, &self.instants[first_id]);
        self.detector.initialize(seed.as_ref());
        debug!(from = first_time, seeded = seed.is_some(), "sweep started");

        let mut prev = seed.unwrap_or_else(|| Levels::from_initial(self.config.initial_level));
        let mut stopped_at = None;
        for (&time, &id) in self.timeline.range(first_time..) {
            let instant = &mut self.instants[id];
            self.strategy.recompute_levels(&ctx, &prev, instant);
            prev = *instant.levels();
            if self
                .detector
                .detect(id, instant, self.limits.as_ref(), &mut self.listener)
            {
                stopped_at = Some(time);
                break;
            }
        }

        match stopped_at {
            Some(time) => {
                self.dirty_start = self
                    .timeline
                    .range((Bound::Excluded(time), Bound::Unbounded))
                    .next()
                    .map(|(&next, _)| next);
                self.strategy.finish_recompute(false);
                info!(time, "sweep stopped at a violation");
            }
            None => {
                self.dirty_start = None;
                self.strategy.finish_recompute(true);
                debug!(instants = self.detector.stats().instants, "sweep finished");
            }
        }
    }
}
