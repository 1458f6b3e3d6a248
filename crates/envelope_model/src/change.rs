//! Domain change tags.

use crate::interval::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a domain moved between two notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainChange {
    /// Only the lower bound moved up.
    LowerBoundIncreased,
    /// Only the upper bound moved down.
    UpperBoundDecreased,
    /// Both bounds moved inwards.
    BoundsRestricted,
    /// Fixed to a single value by a decision.
    SetToSingleton,
    /// Narrowed to a single value by propagation.
    RestrictToSingleton,
    /// Replaced by an unrelated domain.
    Reset,
    /// Widened.
    Relaxed,
}

impl DomainChange {
    /// Classifies the move from `old` to `new`. Returns `None` if nothing moved.
    pub fn classify<T: Copy + PartialOrd + fmt::Display>(
        old: Interval<T>,
        new: Interval<T>,
    ) -> Option<Self> {
        if old == new {
            return None;
        }
        if old.encloses(&new) {
            if new.is_singleton() {
                return Some(Self::RestrictToSingleton);
            }
            return Some(match (new.lb > old.lb, new.ub < old.ub) {
                (true, true) => Self::BoundsRestricted,
                (true, false) => Self::LowerBoundIncreased,
                _ => Self::UpperBoundDecreased,
            });
        }
        if new.encloses(&old) {
            Some(Self::Relaxed)
        } else {
            Some(Self::Reset)
        }
    }

    /// Returns true if the new domain is contained in the old one.
    pub const fn is_restriction(self) -> bool {
        !matches!(self, Self::Reset | Self::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::TimeInterval;

    fn change(old: (i64, i64), new: (i64, i64)) -> Option<DomainChange> {
        DomainChange::classify::<i64>(TimeInterval::from(old), TimeInterval::from(new))
    }

    #[test]
    fn classifies_restrictions() {
        assert_eq!(change((0, 10), (2, 10)), Some(DomainChange::LowerBoundIncreased));
        assert_eq!(change((0, 10), (0, 8)), Some(DomainChange::UpperBoundDecreased));
        assert_eq!(change((0, 10), (2, 8)), Some(DomainChange::BoundsRestricted));
        assert_eq!(change((0, 10), (4, 4)), Some(DomainChange::RestrictToSingleton));
    }

    #[test]
    fn classifies_relaxations() {
        assert_eq!(change((2, 8), (0, 10)), Some(DomainChange::Relaxed));
        assert_eq!(change((0, 5), (3, 9)), Some(DomainChange::Reset));
        assert_eq!(change((0, 5), (0, 5)), None);
    }

    #[test]
    fn restriction_flag() {
        assert!(DomainChange::SetToSingleton.is_restriction());
        assert!(!DomainChange::Relaxed.is_restriction());
        assert!(!DomainChange::Reset.is_restriction());
    }

    proptest::proptest! {
        #[test]
        fn restriction_matches_enclosure(
            a in -50_i64..50, b in -50_i64..50, c in -50_i64..50, d in -50_i64..50,
        ) {
            let old = TimeInterval::new(a.min(b), a.max(b));
            let new = TimeInterval::new(c.min(d), c.max(d));
            match DomainChange::classify(old, new) {
                None => proptest::prop_assert_eq!(old, new),
                Some(change) => {
                    proptest::prop_assert_eq!(change.is_restriction(), old.encloses(&new));
                }
            }
        }
    }
}
