//! Property-based generators for synthetic plans.
//!
//! Uses proptest strategies to generate:
//! - time windows and quantity bounds
//! - producers and consumers
//! - whole plans and sequences of plan edits
//! - ordering constraints between live transactions

use envelope_model::{QuantityInterval, Role, Time, TimeInterval, Transaction, TransactionId};
use envelope_profile::Relation;
use proptest::prelude::*;

/// Last time generated windows reach.
pub const HORIZON: Time = 100;

/// Strategy for generating time windows within `[0, HORIZON]`.
pub fn time_window() -> impl Strategy<Value = TimeInterval> {
    prop_oneof![
        2 => (0..=HORIZON).prop_map(TimeInterval::singleton),
        8 => (0..=HORIZON, 0..=HORIZON / 2)
            .prop_map(|(start, width)| TimeInterval::new(start, (start + width).min(HORIZON))),
    ]
}

/// Strategy for generating quantity bounds with small integer endpoints.
pub fn quantity() -> impl Strategy<Value = QuantityInterval> {
    (0u8..=5, 0u8..=3).prop_map(|(lb, width)| {
        QuantityInterval::new(f64::from(lb), f64::from(lb) + f64::from(width))
    })
}

/// Strategy for generating transaction roles.
pub fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Producer), Just(Role::Consumer)]
}

/// Strategy for generating valid transactions.
///
/// # Panics
///
/// Panics if a generated interval is rejected (should never happen).
pub fn transaction() -> impl Strategy<Value = Transaction> {
    (role(), time_window(), quantity()).prop_map(|(role, time, quantity)| {
        Transaction::try_new(role, time, quantity).expect("generated intervals are valid")
    })
}

/// Strategy for generating plans.
pub fn plan() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec(transaction(), 1..12)
}

/// Kind of ordering constraint added by [`Edit::Relate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The first happens no later than the second.
    Precedes,
    /// Both happen at the same time.
    Concurrent,
}

impl Link {
    /// The relation this link places between `a` and `b`.
    pub const fn relation(self, a: TransactionId, b: TransactionId) -> Relation {
        match self {
            Self::Precedes => Relation::precedes(a, b),
            Self::Concurrent => Relation::concurrent(a, b),
        }
    }
}

/// One edit to a plan. Transaction indices are taken modulo the live
/// transactions, relation indices modulo the live relations.
#[derive(Debug, Clone)]
pub enum Edit {
    /// Add a transaction.
    Add(Transaction),
    /// Remove a transaction.
    Remove(usize),
    /// Move a transaction's time window.
    Retime(usize, TimeInterval),
    /// Change a transaction's quantity bounds.
    Requantify(usize, QuantityInterval),
    /// Constrain the order of two transactions.
    Relate(usize, usize, Link),
    /// Retract one ordering constraint.
    Unrelate(usize),
}

/// Strategy for generating plan edits.
pub fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => transaction().prop_map(Edit::Add),
        1 => any::<usize>().prop_map(Edit::Remove),
        3 => (any::<usize>(), time_window()).prop_map(|(i, time)| Edit::Retime(i, time)),
        3 => (any::<usize>(), quantity()).prop_map(|(i, quantity)| Edit::Requantify(i, quantity)),
    ]
}

/// Strategy for generating edit sequences.
pub fn edits() -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit(), 1..20)
}

/// Strategy for generating ordering constraint kinds.
pub fn link() -> impl Strategy<Value = Link> {
    prop_oneof![Just(Link::Precedes), Just(Link::Concurrent)]
}

/// Strategy for generating plan edits mixed with constraint edits.
pub fn constrained_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        5 => edit(),
        3 => (any::<usize>(), any::<usize>(), link()).prop_map(|(a, b, link)| Edit::Relate(a, b, link)),
        1 => any::<usize>().prop_map(Edit::Unrelate),
    ]
}

/// Strategy for generating constrained edit sequences.
pub fn constrained_edits() -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(constrained_edit(), 1..20)
}
