//! Pairing of temporal constraint notifications.
//!
//! A constraint engine reports a new or removed temporal constraint once per
//! variable in its scope. The profile only cares about the two transactions
//! it relates, so the halves are held here until both have arrived.

use envelope_model::TransactionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Identifier the constraint engine gives a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

/// What happened to a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintEvent {
    /// The constraint now holds.
    Added,
    /// The constraint was retracted.
    Removed,
}

/// Scope positions of the two related timepoints.
///
/// Binary constraints relate positions 0 and 1. Distance constraints carry
/// the distance variable at position 1 and relate positions 0 and 2.
const fn endpoints(scope_len: usize) -> (usize, usize) {
    match scope_len {
        2 => (0, 1),
        3 => (0, 2),
        _ => panic!("temporal constraints have a scope of 2 or 3 variables"),
    }
}

/// Halves waiting for their partner.
#[derive(Debug, Clone, Default)]
pub struct ConstraintPairing {
    pending: HashMap<(ConstraintId, ConstraintEvent), (usize, TransactionId)>,
}

impl ConstraintPairing {
    /// Creates an empty pairing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one half. Returns the `(first, second)` transactions once both
    /// halves of the same event have arrived.
    ///
    /// # Panics
    ///
    /// Panics if `scope_len` is not 2 or 3, or `arg_index` is outside the
    /// scope.
    pub fn offer(
        &mut self,
        constraint: ConstraintId,
        scope_len: usize,
        arg_index: usize,
        transaction: TransactionId,
        event: ConstraintEvent,
    ) -> Option<(TransactionId, TransactionId)> {
        let (first, second) = endpoints(scope_len);
        assert!(
            arg_index < scope_len,
            "argument {arg_index} is outside a scope of {scope_len}"
        );
        if arg_index != first && arg_index != second {
            return None;
        }

        let key = (constraint, event);
        match self.pending.remove(&key) {
            Some((index, other)) if index != arg_index => {
                trace!(constraint = constraint.0, ?event, "constraint paired");
                if index == first {
                    Some((other, transaction))
                } else {
                    Some((transaction, other))
                }
            }
            _ => {
                self.pending.insert(key, (arg_index, transaction));
                None
            }
        }
    }

    /// Number of halves waiting for a partner.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope_model::{Arena, Transaction};

    fn ids() -> (TransactionId, TransactionId, TransactionId) {
        let mut arena = Arena::new();
        let t = Transaction::producer((0, 1), (1.0, 1.0)).unwrap();
        (arena.insert(t.clone()), arena.insert(t.clone()), arena.insert(t))
    }

    #[test]
    fn binary_scope_pairs_in_order() {
        let (a, b, _) = ids();
        let mut pairing = ConstraintPairing::new();
        let c = ConstraintId(7);
        assert_eq!(pairing.offer(c, 2, 1, b, ConstraintEvent::Added), None);
        assert_eq!(pairing.offer(c, 2, 0, a, ConstraintEvent::Added), Some((a, b)));
        assert_eq!(pairing.pending(), 0);
    }

    #[test]
    fn distance_scope_skips_the_middle_variable() {
        let (a, b, d) = ids();
        let mut pairing = ConstraintPairing::new();
        let c = ConstraintId(1);
        assert_eq!(pairing.offer(c, 3, 0, a, ConstraintEvent::Removed), None);
        assert_eq!(pairing.offer(c, 3, 1, d, ConstraintEvent::Removed), None);
        assert_eq!(pairing.offer(c, 3, 2, b, ConstraintEvent::Removed), Some((a, b)));
    }

    #[test]
    fn events_pair_separately() {
        let (a, b, _) = ids();
        let mut pairing = ConstraintPairing::new();
        let c = ConstraintId(2);
        assert_eq!(pairing.offer(c, 2, 0, a, ConstraintEvent::Added), None);
        assert_eq!(pairing.offer(c, 2, 1, b, ConstraintEvent::Removed), None);
        assert_eq!(pairing.pending(), 2);
    }

    #[test]
    #[should_panic(expected = "scope of 2 or 3")]
    fn other_scopes_panic() {
        let (a, _, _) = ids();
        ConstraintPairing::new().offer(ConstraintId(0), 4, 0, a, ConstraintEvent::Added);
    }

    #[test]
    #[should_panic(expected = "outside a scope")]
    fn out_of_scope_index_panics() {
        let (a, _, _) = ids();
        ConstraintPairing::new().offer(ConstraintId(0), 2, 2, a, ConstraintEvent::Added);
    }
}
