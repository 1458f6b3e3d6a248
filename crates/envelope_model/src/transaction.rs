//! Transactions: atomic changes to a resource level.

use crate::arena::Handle;
use crate::error::Result;
use crate::interval::{format_time, Interval, QuantityInterval, Time, TimeInterval};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a transaction registered with a profile.
pub type TransactionId = Handle<Transaction>;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Adds to the resource level.
    Producer,
    /// Takes from the resource level.
    Consumer,
}

impl Role {
    /// Returns true for consumers.
    pub const fn is_consumer(self) -> bool {
        matches!(self, Self::Consumer)
    }

    /// Sign applied to quantities of this role.
    pub const fn sign(self) -> f64 {
        match self {
            Self::Producer => 1.0,
            Self::Consumer => -1.0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// Opaque reference to the token owning a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenRef(pub u64);

/// Which end of its token a transaction sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimepointRole {
    /// The token's start timepoint.
    Start,
    /// The token's end timepoint.
    End,
}

/// Owner of a transaction: a token plus the timepoint it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    /// The owning token.
    pub token: TokenRef,
    /// Timepoint of the token.
    pub role: TimepointRole,
}

/// A quantity change with flexible timing and amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    time: TimeInterval,
    quantity: QuantityInterval,
    role: Role,
    owner: Option<Owner>,
}

impl Transaction {
    /// Creates a transaction after validating both intervals.
    ///
    /// # Errors
    ///
    /// Returns an error if the time interval is inverted or the quantity
    /// interval is inverted, negative or not finite.
    pub fn try_new(
        role: Role,
        time: impl Into<TimeInterval>,
        quantity: impl Into<QuantityInterval>,
    ) -> Result<Self> {
        let time = time.into();
        let quantity = quantity.into();
        Ok(Self {
            time: Interval::try_new(time.lb, time.ub)?,
            quantity: Interval::try_quantity(quantity.lb, quantity.ub)?,
            role,
            owner: None,
        })
    }

    /// Creates a producer.
    ///
    /// # Errors
    ///
    /// See [`Transaction::try_new`].
    pub fn producer(
        time: impl Into<TimeInterval>,
        quantity: impl Into<QuantityInterval>,
    ) -> Result<Self> {
        Self::try_new(Role::Producer, time, quantity)
    }

    /// Creates a consumer.
    ///
    /// # Errors
    ///
    /// See [`Transaction::try_new`].
    pub fn consumer(
        time: impl Into<TimeInterval>,
        quantity: impl Into<QuantityInterval>,
    ) -> Result<Self> {
        Self::try_new(Role::Consumer, time, quantity)
    }

    /// Attaches the owning token timepoint.
    #[must_use]
    pub const fn with_owner(mut self, token: TokenRef, role: TimepointRole) -> Self {
        self.owner = Some(Owner { token, role });
        self
    }

    /// Current time bounds.
    pub const fn time(&self) -> TimeInterval {
        self.time
    }

    /// Current quantity bounds.
    pub const fn quantity(&self) -> QuantityInterval {
        self.quantity
    }

    /// Producer or consumer.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns true for consumers.
    pub const fn is_consumer(&self) -> bool {
        self.role.is_consumer()
    }

    /// Owning token timepoint, if any.
    pub const fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Earliest possible time.
    pub const fn earliest(&self) -> Time {
        self.time.lb
    }

    /// Latest possible time.
    pub const fn latest(&self) -> Time {
        self.time.ub
    }

    /// Returns true if the earliest time is `time`.
    pub const fn starts_at(&self, time: Time) -> bool {
        self.time.lb == time
    }

    /// Returns true if the latest time is `time`.
    pub const fn ends_at(&self, time: Time) -> bool {
        self.time.ub == time
    }

    /// Returns true if the time is fixed.
    pub const fn is_time_singleton(&self) -> bool {
        self.time.lb == self.time.ub
    }

    /// Returns true if the transaction may happen at `time`.
    pub const fn overlaps(&self, time: Time) -> bool {
        self.time.lb <= time && time <= self.time.ub
    }

    /// Signed effect on the level when the smallest outcome is assumed.
    ///
    /// Consumers take their maximum, producers give their minimum.
    pub fn minimum_effect(&self) -> f64 {
        match self.role {
            Role::Consumer => -self.quantity.ub,
            Role::Producer => self.quantity.lb,
        }
    }

    /// Signed effect on the level when the largest outcome is assumed.
    pub fn maximum_effect(&self) -> f64 {
        match self.role {
            Role::Consumer => -self.quantity.lb,
            Role::Producer => self.quantity.ub,
        }
    }

    /// Replaces the time bounds. The caller classifies the change.
    pub fn set_time(&mut self, time: TimeInterval) {
        self.time = time;
    }

    /// Replaces the quantity bounds. The caller classifies the change.
    pub fn set_quantity(&mut self, quantity: QuantityInterval) {
        self.quantity = quantity;
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} time=[{}, {}] quantity={}",
            self.role,
            format_time(self.time.lb),
            format_time(self.time.ub),
            self.quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_validate_intervals() {
        assert!(Transaction::producer((0, 10), (1.0, 2.0)).is_ok());
        assert!(Transaction::producer((10, 0), (1.0, 2.0)).is_err());
        assert!(Transaction::consumer((0, 10), (3.0, 2.0)).is_err());
        assert!(Transaction::consumer((0, 10), (-1.0, 2.0)).is_err());
    }

    #[test]
    fn effects_follow_role() {
        let producer = Transaction::producer((0, 10), (1.0, 2.0)).unwrap();
        let consumer = Transaction::consumer((0, 10), (1.0, 2.0)).unwrap();

        assert!((producer.minimum_effect() - 1.0).abs() < f64::EPSILON);
        assert!((producer.maximum_effect() - 2.0).abs() < f64::EPSILON);
        assert!((consumer.minimum_effect() + 2.0).abs() < f64::EPSILON);
        assert!((consumer.maximum_effect() + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn boundary_queries() {
        let t = Transaction::consumer((5, 15), (1.0, 1.0)).unwrap();
        assert!(t.starts_at(5));
        assert!(t.ends_at(15));
        assert!(t.overlaps(10));
        assert!(!t.overlaps(16));
        assert!(!t.is_time_singleton());
        assert!(Transaction::consumer((3, 3), (1.0, 1.0))
            .unwrap()
            .is_time_singleton());
    }

    #[test]
    fn owner_is_attached() {
        let t = Transaction::producer((0, 4), (1.0, 1.0))
            .unwrap()
            .with_owner(TokenRef(7), TimepointRole::End);
        assert_eq!(
            t.owner(),
            Some(Owner {
                token: TokenRef(7),
                role: TimepointRole::End
            })
        );
    }

    #[test]
    fn display_spells_out_infinity() {
        let t = Transaction::producer((0, crate::interval::PLUS_INFINITY), (1.0, 1.0)).unwrap();
        assert_eq!(t.to_string(), "producer time=[0, +inf] quantity=[1, 1]");
    }
}
