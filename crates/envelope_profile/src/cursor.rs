//! Detached iteration over a profile's instants.
//!
//! A cursor holds no borrow of the profile, so the profile can be queried
//! between steps. It remembers the profile's change count instead and
//! refuses to move once instants were added or removed behind its back.

use crate::listener::ResourceListener;
use crate::oracle::TemporalOracle;
use crate::profile::Profile;
use envelope_model::{Instant, InstantId, Time, PLUS_INFINITY};
use std::ops::Bound;

/// Position in a profile's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileCursor {
    current: Option<Time>,
    end: Time,
    change_count: u64,
}

impl ProfileCursor {
    pub(crate) fn new<O: TemporalOracle, L: ResourceListener>(
        profile: &Profile<O, L>,
        start: Time,
        end: Time,
    ) -> Self {
        let current = profile
            .timeline()
            .range(start..)
            .next()
            .map(|(&time, _)| time)
            .filter(|&time| time <= end);
        Self {
            current,
            end,
            change_count: profile.change_count(),
        }
    }

    /// # Panics
    ///
    /// Panics if the profile changed structurally since the cursor was made.
    fn check<O: TemporalOracle, L: ResourceListener>(&self, profile: &Profile<O, L>) {
        assert_eq!(
            self.change_count,
            profile.change_count(),
            "profile cursor used after the timeline changed"
        );
    }

    /// Returns true once the cursor moved past its last instant.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is stale.
    pub fn done<O: TemporalOracle, L: ResourceListener>(&self, profile: &Profile<O, L>) -> bool {
        self.check(profile);
        self.current.is_none()
    }

    /// Time of the current instant.
    pub const fn time(&self) -> Option<Time> {
        self.current
    }

    /// Handle of the current instant.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is stale.
    pub fn id<O: TemporalOracle, L: ResourceListener>(&self, profile: &Profile<O, L>) -> Option<InstantId> {
        self.check(profile);
        self.current
            .and_then(|time| profile.timeline().get(&time).copied())
    }

    /// The current instant.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is stale.
    pub fn instant<'p, O: TemporalOracle, L: ResourceListener>(
        &self,
        profile: &'p Profile<O, L>,
    ) -> Option<&'p Instant> {
        self.id(profile).and_then(|id| profile.instant(id))
    }

    /// Moves to the next instant. Returns false if there is none.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is stale.
    pub fn advance<O: TemporalOracle, L: ResourceListener>(&mut self, profile: &Profile<O, L>) -> bool {
        self.check(profile);
        let Some(time) = self.current else {
            return false;
        };
        self.current = profile
            .timeline()
            .range((Bound::Excluded(time), Bound::Unbounded))
            .next()
            .map(|(&next, _)| next)
            .filter(|&next| next <= self.end);
        self.current.is_some()
    }

    /// Returns true if the cursor stops at the end of the timeline.
    pub const fn is_unbounded(&self) -> bool {
        self.end == PLUS_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ProfileConfig;
    use crate::profile::Profile;
    use envelope_model::Transaction;

    fn profile() -> Profile {
        let mut profile = Profile::new(ProfileConfig::default()).unwrap();
        profile.add_transaction(Transaction::producer((0, 10), (1.0, 1.0)).unwrap());
        profile.add_transaction(Transaction::consumer((5, 15), (1.0, 1.0)).unwrap());
        profile
    }

    #[test]
    fn walks_instants_in_time_order() {
        let mut profile = profile();
        let mut cursor = profile.cursor();
        let mut times = Vec::new();
        while !cursor.done(&profile) {
            times.push(cursor.instant(&profile).unwrap().time());
            cursor.advance(&profile);
        }
        assert_eq!(times, vec![0, 5, 10, 15]);
        assert!(cursor.is_unbounded());
    }

    #[test]
    fn window_limits_the_walk() {
        let mut profile = profile();
        let mut cursor = profile.cursor_between(1, 10);
        assert_eq!(cursor.time(), Some(5));
        assert!(cursor.advance(&profile));
        assert_eq!(cursor.time(), Some(10));
        assert!(!cursor.advance(&profile));
        assert!(cursor.done(&profile));
    }

    #[test]
    #[should_panic(expected = "after the timeline changed")]
    fn stale_cursor_panics() {
        let mut profile = profile();
        let cursor = profile.cursor();
        profile.add_transaction(Transaction::producer((20, 30), (1.0, 1.0)).unwrap());
        cursor.done(&profile);
    }
}
