//! Temporal distance oracles.
//!
//! The profile never reasons about temporal constraints itself. It asks an
//! oracle how far apart two transactions can be and derives an order from
//! the answer.

use envelope_model::{Time, TimeInterval, TransactionId, MINUS_INFINITY, PLUS_INFINITY};
use std::collections::HashMap;

/// A transaction's time variable as seen by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timepoint {
    /// Transaction the time belongs to.
    pub id: TransactionId,
    /// Current time bounds.
    pub bounds: TimeInterval,
}

/// Answers bounded distance queries between timepoints.
pub trait TemporalOracle {
    /// Range of `to - from`.
    ///
    /// With `use_constraint_bounds` the oracle may tighten the answer using
    /// the constraints it knows about; without it only the domains count.
    fn temporal_distance(
        &self,
        from: &Timepoint,
        to: &Timepoint,
        use_constraint_bounds: bool,
    ) -> TimeInterval;
}

/// Distance implied by the two domains alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsOracle;

impl TemporalOracle for BoundsOracle {
    fn temporal_distance(
        &self,
        from: &Timepoint,
        to: &Timepoint,
        _use_constraint_bounds: bool,
    ) -> TimeInterval {
        from.bounds.distance_to(&to.bounds)
    }
}

/// A distance constraint between two transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `after - before` lies in `distance`.
    Distance {
        /// Reference timepoint.
        before: TransactionId,
        /// Constrained timepoint.
        after: TransactionId,
        /// Allowed range of `after - before`.
        distance: TimeInterval,
    },
}

impl Relation {
    /// `before` happens no later than `after`.
    pub const fn precedes(before: TransactionId, after: TransactionId) -> Self {
        Self::Distance {
            before,
            after,
            distance: TimeInterval::new(0, PLUS_INFINITY),
        }
    }

    /// Both happen at the same time.
    pub const fn concurrent(a: TransactionId, b: TransactionId) -> Self {
        Self::Distance {
            before: a,
            after: b,
            distance: TimeInterval::new(0, 0),
        }
    }

    /// `after - before` lies in `distance`.
    pub const fn within(before: TransactionId, after: TransactionId, distance: TimeInterval) -> Self {
        Self::Distance {
            before,
            after,
            distance,
        }
    }

    const fn key(&self) -> (TransactionId, TransactionId) {
        match self {
            Self::Distance { before, after, .. } => (*before, *after),
        }
    }
}

/// Oracle over explicit pairwise distance constraints.
///
/// Constraints are not propagated transitively. A pair without a direct
/// constraint gets the domain distance.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceOracle {
    distances: HashMap<(TransactionId, TransactionId), TimeInterval>,
}

impl PrecedenceOracle {
    /// Creates an oracle with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint, intersecting it with any constraint already
    /// present between the same pair.
    pub fn add(&mut self, relation: Relation) {
        let Relation::Distance {
            before,
            after,
            distance,
        } = relation;
        let (key, distance) = if before <= after {
            ((before, after), distance)
        } else {
            ((after, before), negate(distance))
        };
        let merged = match self.distances.get(&key) {
            Some(existing) => existing.intersect(&distance).unwrap_or(distance),
            None => distance,
        };
        self.distances.insert(key, merged);
    }

    /// Drops every constraint between the pair named by `relation`.
    pub fn remove(&mut self, relation: &Relation) -> bool {
        let (a, b) = relation.key();
        let key = if a <= b { (a, b) } else { (b, a) };
        self.distances.remove(&key).is_some()
    }

    /// Drops every constraint mentioning `id`.
    pub fn forget(&mut self, id: TransactionId) {
        self.distances.retain(|&(a, b), _| a != id && b != id);
    }

    fn constraint(&self, from: TransactionId, to: TransactionId) -> Option<TimeInterval> {
        if from <= to {
            self.distances.get(&(from, to)).copied()
        } else {
            self.distances.get(&(to, from)).map(|d| negate(*d))
        }
    }
}

fn negate(interval: TimeInterval) -> TimeInterval {
    let flip = |t: Time| match t {
        MINUS_INFINITY => PLUS_INFINITY,
        PLUS_INFINITY => MINUS_INFINITY,
        t => -t,
    };
    TimeInterval::new(flip(interval.ub), flip(interval.lb))
}

impl TemporalOracle for PrecedenceOracle {
    fn temporal_distance(
        &self,
        from: &Timepoint,
        to: &Timepoint,
        use_constraint_bounds: bool,
    ) -> TimeInterval {
        let domain = from.bounds.distance_to(&to.bounds);
        if !use_constraint_bounds {
            return domain;
        }
        match self.constraint(from.id, to.id) {
            Some(constraint) => domain.intersect(&constraint).unwrap_or(constraint),
            None => domain,
        }
    }
}
