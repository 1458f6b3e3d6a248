//! Flaw and violation detection.
//!
//! A detector inspects each instant right after the strategy computed its
//! bounds. It attaches violations (the limits are exceeded in every
//! completion of the plan) and flaws (they may be exceeded, depending on
//! later decisions), and tells the listener about every change of state.
//!
//! The three detectors share [`GenericDetector`] and differ only in which
//! level bounds they hold against the limits, see [`LevelBounds`].

mod closed_world;
mod grounded;
mod open_world;

pub use closed_world::ClosedWorld;
pub use grounded::Grounded;
pub use open_world::OpenWorld;

use crate::config::DetectorKind;
use crate::limits::{LimitProfile, RateLimits};
use crate::listener::ResourceListener;
use envelope_model::{Instant, InstantId, Levels, ProblemKind, QuantityInterval, ResourceProblem};
use std::fmt;
use tracing::{debug, trace};

/// Checks instants against the resource limits.
pub trait FvDetector: fmt::Debug {
    /// Which detector this is.
    fn kind(&self) -> DetectorKind;

    /// Prepares a sweep. `seed` holds the bounds before its first instant.
    fn initialize(&mut self, seed: Option<&Levels>);

    /// Inspects one instant. Returns true if the sweep should stop.
    fn detect(
        &mut self,
        id: InstantId,
        instant: &mut Instant,
        limits: &dyn LimitProfile,
        listener: &mut dyn ResourceListener,
    ) -> bool;

    /// Returns true if violations do not stop a sweep.
    fn allow_violations(&self) -> bool;

    /// Sets whether violations stop a sweep.
    fn set_allow_violations(&mut self, allow: bool);

    /// Counters of the current sweep.
    fn stats(&self) -> DetectorStats;
}

/// The two views of an instant's level a detector checks.
pub trait LevelBounds: fmt::Debug {
    /// Bounds that must stay within the limits, or the instant is violated.
    fn violation_bounds(&self, levels: &Levels, rates: &RateLimits) -> QuantityInterval;

    /// Bounds that may leave the limits, which makes the instant flawed.
    fn flaw_bounds(&self, levels: &Levels) -> QuantityInterval;
}

/// Counters of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    /// Instants inspected.
    pub instants: usize,
    /// Instants found violated.
    pub violated: usize,
    /// Instants found flawed.
    pub flawed: usize,
}

/// Detection shared by every detector.
#[derive(Debug, Clone)]
pub struct GenericDetector<B> {
    kind: DetectorKind,
    bounds: B,
    rates: RateLimits,
    allow_violations: bool,
    stats: DetectorStats,
}

impl<B: LevelBounds> GenericDetector<B> {
    /// Creates a detector holding `bounds` against `rates`.
    pub const fn new(kind: DetectorKind, bounds: B, rates: RateLimits, allow_violations: bool) -> Self {
        Self {
            kind,
            bounds,
            rates,
            allow_violations,
            stats: DetectorStats {
                instants: 0,
                violated: 0,
                flawed: 0,
            },
        }
    }

    /// Rate and sum limits in force.
    pub const fn rates(&self) -> &RateLimits {
        &self.rates
    }

    fn violation(
        &self,
        id: InstantId,
        levels: &Levels,
        lower_limit: f64,
        upper_limit: f64,
    ) -> Option<ResourceProblem> {
        let rates = &self.rates;
        let kind = if levels.min_cumulative_consumption > rates.max_consumption {
            Some(ProblemKind::ConsumptionSumExceeded)
        } else if levels.min_cumulative_production > rates.max_production {
            Some(ProblemKind::ProductionSumExceeded)
        } else if levels.min_instant_consumption > rates.max_instant_consumption {
            Some(ProblemKind::ConsumptionRateExceeded)
        } else if levels.min_instant_production > rates.max_instant_production {
            Some(ProblemKind::ProductionRateExceeded)
        } else {
            None
        };
        if let Some(kind) = kind {
            return Some(ResourceProblem::at(kind, id));
        }

        let bounds = self.bounds.violation_bounds(levels, rates);
        if bounds.ub < lower_limit {
            Some(ResourceProblem::at(ProblemKind::LevelTooLow, id).with_magnitude(lower_limit - bounds.ub))
        } else if bounds.lb > upper_limit {
            Some(ResourceProblem::at(ProblemKind::LevelTooHigh, id).with_magnitude(bounds.lb - upper_limit))
        } else {
            None
        }
    }

    fn flag_flaws(&self, id: InstantId, instant: &mut Instant, lower_limit: f64, upper_limit: f64) {
        let levels = *instant.levels();
        let rates = &self.rates;
        let checks = [
            (
                levels.max_cumulative_consumption > rates.max_consumption,
                ProblemKind::ConsumptionSumExceeded,
            ),
            (
                levels.max_cumulative_production > rates.max_production,
                ProblemKind::ProductionSumExceeded,
            ),
            (
                levels.max_instant_consumption > rates.max_instant_consumption,
                ProblemKind::ConsumptionRateExceeded,
            ),
            (
                levels.max_instant_production > rates.max_instant_production,
                ProblemKind::ProductionRateExceeded,
            ),
        ];
        for (exceeded, kind) in checks {
            if exceeded {
                instant.add_flaw(ResourceProblem::at(kind, id));
            }
        }

        let bounds = self.bounds.flaw_bounds(&levels);
        if bounds.lb < lower_limit {
            let magnitude = (lower_limit - bounds.lb).abs();
            instant.set_lower_flaw(magnitude);
            instant.add_flaw(ResourceProblem::at(ProblemKind::LevelTooLow, id).with_magnitude(magnitude));
        }
        if bounds.ub > upper_limit {
            let magnitude = bounds.ub - upper_limit;
            instant.set_upper_flaw(magnitude);
            instant.add_flaw(ResourceProblem::at(ProblemKind::LevelTooHigh, id).with_magnitude(magnitude));
        }
    }
}

impl<B: LevelBounds> FvDetector for GenericDetector<B> {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn initialize(&mut self, seed: Option<&Levels>) {
        self.stats = DetectorStats::default();
        debug!(detector = %self.kind, seeded = seed.is_some(), "detector initialized");
    }

    fn detect(
        &mut self,
        id: InstantId,
        instant: &mut Instant,
        limits: &dyn LimitProfile,
        listener: &mut dyn ResourceListener,
    ) -> bool {
        let previous = instant.violations().first().map(|problem| problem.kind);
        let was_flawed = instant.is_flawed();
        instant.clear_violations();
        instant.clear_flaws();

        let time = instant.time();
        let lower_limit = limits.lower_limit(time);
        let upper_limit = limits.upper_limit(time);

        let violation = self.violation(id, instant.levels(), lower_limit, upper_limit);
        self.flag_flaws(id, instant, lower_limit, upper_limit);
        self.stats.instants += 1;

        match (violation, previous) {
            (Some(problem), previous) => {
                self.stats.violated += 1;
                instant.add_violation(problem);
                if previous != Some(problem.kind) {
                    debug!(instant = %id, time, kind = %problem.kind, "violation");
                    listener.notify_of_violation(id, problem.kind);
                }
            }
            (None, Some(_)) => {
                debug!(instant = %id, time, "violation cleared");
                listener.notify_no_longer_violated(id);
            }
            (None, None) => {}
        }

        let flawed = instant.is_flawed();
        if flawed {
            self.stats.flawed += 1;
        }
        match (was_flawed, flawed) {
            (false, true) => {
                trace!(instant = %id, time, flaws = instant.flaws().len(), "flawed");
                listener.notify_of_flaw(id);
            }
            (true, false) => {
                trace!(instant = %id, time, "flaw cleared");
                listener.notify_no_longer_flawed(id);
            }
            _ => {}
        }

        instant.is_violated() && !self.allow_violations
    }

    fn allow_violations(&self) -> bool {
        self.allow_violations
    }

    fn set_allow_violations(&mut self, allow: bool) {
        self.allow_violations = allow;
    }

    fn stats(&self) -> DetectorStats {
        self.stats
    }
}

/// Builds the detector named by `kind`.
pub fn build(kind: DetectorKind, rates: RateLimits, allow_violations: bool) -> Box<dyn FvDetector> {
    match kind {
        DetectorKind::ClosedWorld => Box::new(GenericDetector::new(kind, ClosedWorld, rates, allow_violations)),
        DetectorKind::OpenWorld => Box::new(GenericDetector::new(kind, OpenWorld, rates, allow_violations)),
        DetectorKind::Grounded => Box::new(GenericDetector::new(kind, Grounded, rates, allow_violations)),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{envelope, instant_with};
    use super::*;
    use crate::limits::ConstantLimits;
    use crate::listener::{RecordingListener, ResourceEvent};

    fn closed_world(rates: RateLimits) -> Box<dyn FvDetector> {
        build(DetectorKind::ClosedWorld, rates, false)
    }

    #[test]
    fn build_matches_kind() {
        for kind in DetectorKind::ALL {
            assert_eq!(build(kind, RateLimits::default(), true).kind(), kind);
        }
    }

    #[test]
    fn level_below_lower_limit_is_violated() {
        let (_arena, id, mut instant) = instant_with(envelope(-5.0, -3.0));
        let mut listener = RecordingListener::new();
        let mut detector = closed_world(RateLimits::default());

        let stop = detector.detect(id, &mut instant, &ConstantLimits::new(-2.0, 10.0), &mut listener);

        assert!(stop);
        assert_eq!(instant.violations()[0].kind, ProblemKind::LevelTooLow);
        assert_eq!(instant.violations()[0].magnitude, Some(1.0));
        assert_eq!(instant.lower_flaw(), Some(3.0));
        assert_eq!(
            listener.events(),
            &[
                ResourceEvent::Violation {
                    instant: id,
                    kind: ProblemKind::LevelTooLow
                },
                ResourceEvent::Flaw { instant: id },
            ]
        );
    }

    #[test]
    fn level_above_upper_limit_is_violated() {
        let (_arena, id, mut instant) = instant_with(envelope(6.0, 8.0));
        let mut detector = closed_world(RateLimits::default());
        detector.detect(id, &mut instant, &ConstantLimits::new(0.0, 5.0), &mut RecordingListener::new());
        assert_eq!(instant.violations()[0].kind, ProblemKind::LevelTooHigh);
        assert_eq!(instant.upper_flaw(), Some(3.0));
    }

    #[test]
    fn sums_and_rates_take_precedence_in_order() {
        let mut levels = envelope(-100.0, 100.0);
        levels.min_cumulative_production = 5.0;
        levels.min_instant_consumption = 5.0;
        let rates = RateLimits {
            max_production: 4.0,
            max_instant_consumption: 4.0,
            ..RateLimits::default()
        };
        let (_arena, id, mut instant) = instant_with(levels);
        let mut detector = closed_world(rates);
        detector.detect(id, &mut instant, &ConstantLimits::new(0.0, 1.0), &mut RecordingListener::new());

        assert_eq!(instant.violations().len(), 1);
        assert_eq!(instant.violations()[0].kind, ProblemKind::ProductionSumExceeded);
    }

    #[test]
    fn each_rate_and_sum_kind_is_reported() {
        let cases = [
            (ProblemKind::ConsumptionSumExceeded, RateLimits { max_consumption: 1.0, ..RateLimits::default() }),
            (ProblemKind::ProductionSumExceeded, RateLimits { max_production: 1.0, ..RateLimits::default() }),
            (
                ProblemKind::ConsumptionRateExceeded,
                RateLimits { max_instant_consumption: 1.0, ..RateLimits::default() },
            ),
            (
                ProblemKind::ProductionRateExceeded,
                RateLimits { max_instant_production: 1.0, ..RateLimits::default() },
            ),
        ];
        let mut levels = envelope(0.0, 0.0);
        levels.min_cumulative_consumption = 2.0;
        levels.max_cumulative_consumption = 2.0;
        levels.min_cumulative_production = 2.0;
        levels.max_cumulative_production = 2.0;
        levels.min_instant_consumption = 2.0;
        levels.max_instant_consumption = 2.0;
        levels.min_instant_production = 2.0;
        levels.max_instant_production = 2.0;

        for (kind, rates) in cases {
            let (_arena, id, mut instant) = instant_with(levels);
            closed_world(rates).detect(id, &mut instant, &ConstantLimits::unbounded(), &mut RecordingListener::new());
            assert_eq!(instant.violations()[0].kind, kind);
            assert!(instant.flaws().iter().any(|flaw| flaw.kind == kind));
        }
    }

    #[test]
    fn possible_overshoot_is_only_a_flaw() {
        let (_arena, id, mut instant) = instant_with(envelope(0.0, 8.0));
        let mut listener = RecordingListener::new();
        let mut detector = closed_world(RateLimits::default());
        let stop = detector.detect(id, &mut instant, &ConstantLimits::new(0.0, 5.0), &mut listener);

        assert!(!stop);
        assert!(!instant.is_violated());
        assert_eq!(instant.upper_flaw(), Some(3.0));
        assert_eq!(listener.events(), &[ResourceEvent::Flaw { instant: id }]);
        assert_eq!(detector.stats().flawed, 1);
    }

    #[test]
    fn notifications_fire_on_change_only() {
        let (_arena, id, mut instant) = instant_with(envelope(-5.0, -3.0));
        let limits = ConstantLimits::new(-2.0, 10.0);
        let mut listener = RecordingListener::new();
        let mut detector = build(DetectorKind::ClosedWorld, RateLimits::default(), true);

        assert!(!detector.detect(id, &mut instant, &limits, &mut listener));
        assert_eq!(listener.drain().len(), 2);

        // Same state again: nothing new to say.
        detector.detect(id, &mut instant, &limits, &mut listener);
        assert!(listener.events().is_empty());

        instant.set_levels(envelope(0.0, 1.0));
        detector.detect(id, &mut instant, &limits, &mut listener);
        assert_eq!(
            listener.events(),
            &[
                ResourceEvent::NoLongerViolated { instant: id },
                ResourceEvent::NoLongerFlawed { instant: id },
            ]
        );
        assert!(!instant.is_flawed() && !instant.is_violated());
    }

    #[test]
    fn initialize_resets_stats() {
        let (_arena, id, mut instant) = instant_with(envelope(0.0, 0.0));
        let mut detector = closed_world(RateLimits::default());
        detector.detect(id, &mut instant, &ConstantLimits::unbounded(), &mut RecordingListener::new());
        assert_eq!(detector.stats().instants, 1);
        detector.initialize(None);
        assert_eq!(detector.stats(), DetectorStats::default());
    }

    #[test]
    fn allow_violations_toggles_the_stop() {
        let mut detector = closed_world(RateLimits::default());
        assert!(!detector.allow_violations());
        detector.set_allow_violations(true);
        assert!(detector.allow_violations());
    }
}
