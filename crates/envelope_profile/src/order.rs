//! Memoized pairwise orders between transactions.

use crate::oracle::{TemporalOracle, Timepoint};
use envelope_model::{TimeInterval, TimepointRole, Transaction, TransactionId};
use std::collections::HashMap;
use tracing::trace;

/// How two transactions are ordered in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalOrder {
    /// Always at the same time.
    StrictlyAt,
    /// The first is never after the second.
    BeforeOrAt,
    /// The first is never before the second.
    AfterOrAt,
    /// Either may come first.
    NotOrdered,
    /// Not computed.
    Unknown,
}

impl TemporalOrder {
    /// Order of the swapped pair.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::BeforeOrAt => Self::AfterOrAt,
            Self::AfterOrAt => Self::BeforeOrAt,
            other => other,
        }
    }

    /// Order implied by the range of `second - first`.
    pub const fn from_distance(distance: TimeInterval) -> Self {
        if distance.lb == 0 && distance.ub == 0 {
            Self::StrictlyAt
        } else if distance.lb >= 0 {
            Self::BeforeOrAt
        } else if distance.ub <= 0 {
            Self::AfterOrAt
        } else {
            Self::NotOrdered
        }
    }
}

type Pair = (TransactionId, TransactionId);

/// Cache of orders asked of the oracle.
///
/// `StrictlyAt` answers stay valid while constraints are only added, so they
/// are kept apart from the other answers and survive
/// [`OrderCache::on_constraint_added`].
#[derive(Debug, Clone, Default)]
pub struct OrderCache {
    strict: HashMap<Pair, TemporalOrder>,
    orderings: HashMap<Pair, TemporalOrder>,
}

impl OrderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized order, or [`TemporalOrder::Unknown`].
    pub fn cached(&self, a: TransactionId, b: TransactionId) -> TemporalOrder {
        if let Some(order) = self.strict.get(&(a, b)).or_else(|| self.strict.get(&(b, a))) {
            return *order;
        }
        if let Some(order) = self.orderings.get(&(a, b)) {
            return *order;
        }
        self.orderings
            .get(&(b, a))
            .map_or(TemporalOrder::Unknown, |order| order.reversed())
    }

    /// Order of `a` relative to `b`, computing and memoizing it on a miss.
    pub fn get_order(
        &mut self,
        a: (TransactionId, &Transaction),
        b: (TransactionId, &Transaction),
        oracle: &dyn TemporalOracle,
    ) -> TemporalOrder {
        let (a_id, a_tx) = a;
        let (b_id, b_tx) = b;
        let cached = self.cached(a_id, b_id);
        if cached != TemporalOrder::Unknown {
            return cached;
        }

        let order = match (a_tx.owner(), b_tx.owner()) {
            (Some(first), Some(second)) if first.token == second.token => {
                match (first.role, second.role) {
                    (TimepointRole::Start, TimepointRole::End) => TemporalOrder::BeforeOrAt,
                    (TimepointRole::End, TimepointRole::Start) => TemporalOrder::AfterOrAt,
                    _ => TemporalOrder::StrictlyAt,
                }
            }
            _ => {
                let from = Timepoint {
                    id: a_id,
                    bounds: a_tx.time(),
                };
                let to = Timepoint {
                    id: b_id,
                    bounds: b_tx.time(),
                };
                TemporalOrder::from_distance(oracle.temporal_distance(&from, &to, true))
            }
        };
        trace!(a = %a_id, b = %b_id, ?order, "computed order");

        if order == TemporalOrder::StrictlyAt {
            self.strict.insert((a_id, b_id), order);
        } else {
            self.orderings.insert((a_id, b_id), order);
        }
        order
    }

    /// A constraint was added: only strict answers are known to survive.
    pub fn on_constraint_added(&mut self) {
        self.orderings.clear();
    }

    /// A constraint was removed: nothing is known to survive.
    pub fn on_constraint_removed(&mut self) {
        self.strict.clear();
        self.orderings.clear();
    }

    /// Drops every entry mentioning `id`.
    pub fn forget(&mut self, id: TransactionId) {
        self.strict.retain(|&(a, b), _| a != id && b != id);
        self.orderings.retain(|&(a, b), _| a != id && b != id);
    }

    /// Number of memoized pairs.
    pub fn len(&self) -> usize {
        self.strict.len() + self.orderings.len()
    }

    /// Returns true if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
