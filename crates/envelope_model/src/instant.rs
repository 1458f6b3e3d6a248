//! Timeline breakpoints.
//!
//! An [`Instant`] sits at a time where some registered transaction may start
//! or end. It remembers which transactions may be happening at that time and
//! carries the bounds the profile computed for it, together with whatever
//! flaws and violations the detector attached.

use crate::arena::Handle;
use crate::interval::{Interval, QuantityInterval, Time};
use crate::problem::ResourceProblem;
use crate::transaction::{Transaction, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Handle of an instant owned by a profile.
pub type InstantId = Handle<Instant>;

/// Bounds computed for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Levels {
    /// Lowest achievable level (the lower envelope).
    pub lower_level_min: f64,
    /// Largest value of the lower bound across completions.
    pub lower_level_max: f64,
    /// Smallest value of the upper bound across completions.
    pub upper_level_min: f64,
    /// Highest achievable level (the upper envelope).
    pub upper_level_max: f64,
    /// Production that must happen exactly at this instant.
    pub min_instant_production: f64,
    /// Production that may happen at this instant.
    pub max_instant_production: f64,
    /// Consumption that must happen exactly at this instant.
    pub min_instant_consumption: f64,
    /// Consumption that may happen at this instant.
    pub max_instant_consumption: f64,
    /// Production that must have happened by this instant.
    pub min_cumulative_production: f64,
    /// Production that may have happened by this instant.
    pub max_cumulative_production: f64,
    /// Consumption that must have happened by this instant.
    pub min_cumulative_consumption: f64,
    /// Consumption that may have happened by this instant.
    pub max_cumulative_consumption: f64,
}

impl Levels {
    /// Levels before any transaction, seeded from the initial level.
    pub const fn from_initial(initial: QuantityInterval) -> Self {
        Self {
            lower_level_min: initial.lb,
            lower_level_max: initial.lb,
            upper_level_min: initial.ub,
            upper_level_max: initial.ub,
            min_instant_production: 0.0,
            max_instant_production: 0.0,
            min_instant_consumption: 0.0,
            max_instant_consumption: 0.0,
            min_cumulative_production: 0.0,
            max_cumulative_production: 0.0,
            min_cumulative_consumption: 0.0,
            max_cumulative_consumption: 0.0,
        }
    }

    /// The envelope `[lower_level_min, upper_level_max]`.
    pub const fn envelope(&self) -> QuantityInterval {
        Interval {
            lb: self.lower_level_min,
            ub: self.upper_level_max,
        }
    }
}

/// A breakpoint on the resource timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Instant {
    time: Time,
    transactions: BTreeSet<TransactionId>,
    starting: BTreeSet<TransactionId>,
    ending: BTreeSet<TransactionId>,
    levels: Levels,
    violations: Vec<ResourceProblem>,
    flaws: Vec<ResourceProblem>,
    lower_flaw: Option<f64>,
    upper_flaw: Option<f64>,
}

impl Instant {
    /// Creates an empty instant at `time`.
    #[must_use]
    pub const fn new(time: Time) -> Self {
        Self {
            time,
            transactions: BTreeSet::new(),
            starting: BTreeSet::new(),
            ending: BTreeSet::new(),
            levels: Levels::from_initial(Interval { lb: 0.0, ub: 0.0 }),
            violations: Vec::new(),
            flaws: Vec::new(),
            lower_flaw: None,
            upper_flaw: None,
        }
    }

    /// Time of the instant.
    pub const fn time(&self) -> Time {
        self.time
    }

    /// Transactions whose time interval contains this instant.
    pub const fn transactions(&self) -> &BTreeSet<TransactionId> {
        &self.transactions
    }

    /// Transactions whose earliest time is this instant.
    pub const fn starting(&self) -> &BTreeSet<TransactionId> {
        &self.starting
    }

    /// Transactions whose latest time is this instant.
    pub const fn ending(&self) -> &BTreeSet<TransactionId> {
        &self.ending
    }

    /// Returns true if `id` overlaps this instant.
    pub fn contains(&self, id: TransactionId) -> bool {
        self.transactions.contains(&id)
    }

    /// Returns true if no transaction overlaps this instant.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Returns true if some transaction starts or ends here.
    pub fn contains_start_or_end(&self) -> bool {
        !self.starting.is_empty() || !self.ending.is_empty()
    }

    /// Adds a transaction, classifying it as starting and/or ending here.
    pub fn insert(&mut self, id: TransactionId, transaction: &Transaction) {
        self.transactions.insert(id);
        self.update(id, transaction);
    }

    /// Refreshes the start/end classification after the time bounds moved.
    pub fn update(&mut self, id: TransactionId, transaction: &Transaction) {
        if transaction.starts_at(self.time) {
            self.starting.insert(id);
        } else {
            self.starting.remove(&id);
        }
        if transaction.ends_at(self.time) {
            self.ending.insert(id);
        } else {
            self.ending.remove(&id);
        }
    }

    /// Drops a transaction. Returns true if it was present.
    pub fn remove(&mut self, id: TransactionId) -> bool {
        self.starting.remove(&id);
        self.ending.remove(&id);
        self.transactions.remove(&id)
    }

    /// Computed bounds.
    pub const fn levels(&self) -> &Levels {
        &self.levels
    }

    /// Replaces the computed bounds.
    pub fn set_levels(&mut self, levels: Levels) {
        self.levels = levels;
    }

    /// Lower envelope at this instant.
    pub const fn lower_level(&self) -> f64 {
        self.levels.lower_level_min
    }

    /// Upper envelope at this instant.
    pub const fn upper_level(&self) -> f64 {
        self.levels.upper_level_max
    }

    /// Returns true if a violation is attached.
    pub fn is_violated(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Attached violations, most significant first.
    pub fn violations(&self) -> &[ResourceProblem] {
        &self.violations
    }

    /// Attaches a violation.
    pub fn add_violation(&mut self, problem: ResourceProblem) {
        self.violations.push(problem);
    }

    /// Drops all violations.
    pub fn clear_violations(&mut self) {
        self.violations.clear();
    }

    /// Returns true if any flaw is attached.
    pub fn is_flawed(&self) -> bool {
        !self.flaws.is_empty() || self.lower_flaw.is_some() || self.upper_flaw.is_some()
    }

    /// Attached flaws.
    pub fn flaws(&self) -> &[ResourceProblem] {
        &self.flaws
    }

    /// Attaches a flaw.
    pub fn add_flaw(&mut self, problem: ResourceProblem) {
        self.flaws.push(problem);
    }

    /// Marks a possible undershoot of the lower limit by `magnitude`.
    pub fn set_lower_flaw(&mut self, magnitude: f64) {
        self.lower_flaw = Some(magnitude);
    }

    /// Marks a possible overshoot of the upper limit by `magnitude`.
    pub fn set_upper_flaw(&mut self, magnitude: f64) {
        self.upper_flaw = Some(magnitude);
    }

    /// Magnitude of the lower-limit flaw, if flawed there.
    pub const fn lower_flaw(&self) -> Option<f64> {
        self.lower_flaw
    }

    /// Magnitude of the upper-limit flaw, if flawed there.
    pub const fn upper_flaw(&self) -> Option<f64> {
        self.upper_flaw
    }

    /// Drops all flaws and both magnitudes.
    pub fn clear_flaws(&mut self) {
        self.flaws.clear();
        self.lower_flaw = None;
        self.upper_flaw = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::problem::ProblemKind;

    #[test]
    fn classification_follows_bounds() {
        let mut arena = Arena::new();
        let t = Transaction::producer((0, 10), (1.0, 1.0)).unwrap();
        let id = arena.insert(t.clone());

        let mut start = Instant::new(0);
        let mut end = Instant::new(10);
        let mut middle = Instant::new(5);
        start.insert(id, &t);
        end.insert(id, &t);
        middle.insert(id, &t);

        assert!(start.starting().contains(&id));
        assert!(end.ending().contains(&id));
        assert!(!middle.contains_start_or_end());
        assert!(middle.contains(id));
    }

    #[test]
    fn update_moves_transaction_between_sets() {
        let mut arena = Arena::new();
        let mut t = Transaction::consumer((0, 10), (1.0, 1.0)).unwrap();
        let id = arena.insert(t.clone());

        let mut instant = Instant::new(5);
        instant.insert(id, &t);
        assert!(!instant.contains_start_or_end());

        t.set_time((5, 10).into());
        instant.update(id, &t);
        assert!(instant.starting().contains(&id));

        assert!(instant.remove(id));
        assert!(instant.is_empty());
        assert!(!instant.contains_start_or_end());
    }

    #[test]
    fn clearing_flaws_resets_magnitudes() {
        let mut instant = Instant::new(0);
        instant.set_upper_flaw(2.0);
        instant.add_flaw(ResourceProblem::global(ProblemKind::ProductionRateExceeded));
        assert!(instant.is_flawed());

        instant.clear_flaws();
        assert!(!instant.is_flawed());
        assert_eq!(instant.upper_flaw(), None);
    }

    #[test]
    fn initial_levels_seed_both_sides() {
        let levels = Levels::from_initial(Interval::new(1.0, 4.0));
        assert_eq!(levels.envelope(), Interval::new(1.0, 4.0));
        assert!((levels.lower_level_max - 1.0).abs() < f64::EPSILON);
        assert!((levels.upper_level_min - 4.0).abs() < f64::EPSILON);
    }
}
