//! Named reference workloads with known envelopes.
//!
//! Each workload is a small plan whose flow envelope was worked out by hand.
//! The simulation checks the engine against them and the CLI evaluates them
//! under any strategy and detector.

use envelope_model::{Role, Time, Transaction, TransactionId};
use envelope_profile::{
    DetectorKind, PrecedenceOracle, Profile, ProfileConfig, RecordingListener, Relation,
    ResourceEvent, Result, StrategyKind,
};
use serde::Serialize;
use tracing::debug;

/// One transaction of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransactionSpec {
    /// Producer or consumer.
    pub role: Role,
    /// Time window.
    pub time: (Time, Time),
    /// Quantity bounds.
    pub quantity: (f64, f64),
}

const fn produce(time: (Time, Time), quantity: (f64, f64)) -> TransactionSpec {
    TransactionSpec {
        role: Role::Producer,
        time,
        quantity,
    }
}

const fn consume(time: (Time, Time), quantity: (f64, f64)) -> TransactionSpec {
    TransactionSpec {
        role: Role::Consumer,
        time,
        quantity,
    }
}

/// A named plan and its flow envelope.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Short identifier.
    pub name: &'static str,
    /// What the workload exercises.
    pub description: &'static str,
    /// Limits and initial level. Strategy and detector are chosen per run.
    pub config: ProfileConfig,
    /// Transactions in insertion order.
    pub transactions: Vec<TransactionSpec>,
    /// Pairs of transaction indices constrained to happen together.
    pub concurrent: Vec<(usize, usize)>,
    /// Flow envelope as `(time, lower, upper)` per instant.
    pub expected: Vec<(Time, f64, f64)>,
}

/// One row of an evaluated envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvelopeRow {
    /// Instant time.
    pub time: Time,
    /// Lowest achievable level.
    pub lower: f64,
    /// Highest achievable level.
    pub upper: f64,
    /// Whether a violation was found here.
    pub violated: bool,
    /// Whether a flaw was found here.
    pub flawed: bool,
}

/// Result of evaluating a workload.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Workload name.
    pub workload: &'static str,
    /// Strategy used.
    pub strategy: StrategyKind,
    /// Detector used.
    pub detector: DetectorKind,
    /// Envelope, one row per instant.
    pub rows: Vec<EnvelopeRow>,
    /// Notifications raised while computing it.
    pub events: Vec<ResourceEvent>,
}

impl Evaluation {
    /// Returns true if the envelope matches `expected` within `tolerance`.
    pub fn matches(&self, expected: &[(Time, f64, f64)], tolerance: f64) -> bool {
        self.rows.len() == expected.len()
            && self.rows.iter().zip(expected).all(|(row, &(time, lower, upper))| {
                row.time == time
                    && (row.lower - lower).abs() <= tolerance
                    && (row.upper - upper).abs() <= tolerance
            })
    }
}

impl Workload {
    /// Builds a profile holding the workload, with its concurrency relations
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or a transaction is invalid.
    pub fn build(
        &self,
        strategy: StrategyKind,
        detector: DetectorKind,
    ) -> Result<(Profile<PrecedenceOracle, RecordingListener>, Vec<TransactionId>)> {
        let config = self
            .config
            .clone()
            .with_strategy(strategy)
            .with_detector(detector);
        let mut profile =
            Profile::with_parts(config, PrecedenceOracle::new(), RecordingListener::new())?;
        let mut ids = Vec::with_capacity(self.transactions.len());
        for spec in &self.transactions {
            let transaction = Transaction::try_new(spec.role, spec.time, spec.quantity)?;
            ids.push(profile.add_transaction(transaction));
        }
        for &(a, b) in &self.concurrent {
            profile.oracle_mut().add(Relation::concurrent(ids[a], ids[b]));
            profile.temporal_constraint_added(ids[a], ids[b]);
        }
        Ok((profile, ids))
    }

    /// Computes the envelope under the given strategy and detector.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or a transaction is invalid.
    pub fn evaluate(&self, strategy: StrategyKind, detector: DetectorKind) -> Result<Evaluation> {
        let (mut profile, _) = self.build(strategy, detector)?;
        profile.recompute();
        let rows = profile
            .instants()
            .map(|instant| EnvelopeRow {
                time: instant.time(),
                lower: instant.lower_level(),
                upper: instant.upper_level(),
                violated: instant.is_violated(),
                flawed: instant.is_flawed(),
            })
            .collect();
        let events = profile.listener_mut().drain();
        debug!(workload = self.name, %strategy, %detector, "workload evaluated");
        Ok(Evaluation {
            workload: self.name,
            strategy,
            detector,
            rows,
            events,
        })
    }
}

/// Every reference workload.
pub fn all() -> Vec<Workload> {
    let unlimited = ProfileConfig::default();
    vec![
        Workload {
            name: "single_instant",
            description: "A fixed production and consumption at the same time",
            config: unlimited.clone(),
            transactions: vec![produce((0, 0), (5.0, 5.0)), consume((0, 0), (3.0, 3.0))],
            concurrent: vec![],
            expected: vec![(0, 2.0, 2.0)],
        },
        Workload {
            name: "possible_overshoot",
            description: "A flexible production that may exceed the upper limit",
            config: unlimited.clone().with_limits(f64::NEG_INFINITY, 5.0),
            transactions: vec![produce((0, 10), (0.0, 8.0))],
            concurrent: vec![],
            expected: vec![(0, 0.0, 8.0), (10, 0.0, 8.0)],
        },
        Workload {
            name: "isolated_consumptions",
            description: "Two fixed consumptions within the lower limit",
            config: unlimited.clone().with_limits(-20.0, f64::INFINITY),
            transactions: vec![consume((0, 0), (10.0, 10.0)), consume((5, 5), (10.0, 10.0))],
            concurrent: vec![],
            expected: vec![(0, -10.0, -10.0), (5, -20.0, -20.0)],
        },
        Workload {
            name: "cumulative_violation",
            description: "Two fixed consumptions that together break the lower limit",
            config: unlimited.clone().with_limits(-15.0, f64::INFINITY),
            transactions: vec![consume((0, 0), (10.0, 10.0)), consume((5, 5), (10.0, 10.0))],
            concurrent: vec![],
            expected: vec![(0, -10.0, -10.0), (5, -20.0, -20.0)],
        },
        Workload {
            name: "overlapping",
            description: "Producers and consumers with overlapping windows",
            config: unlimited.clone(),
            transactions: vec![
                produce((0, 10), (1.0, 1.0)),
                consume((10, 15), (1.0, 1.0)),
                consume((5, 15), (1.0, 1.0)),
                produce((5, 15), (1.0, 1.0)),
            ],
            concurrent: vec![],
            expected: vec![(0, 0.0, 1.0), (5, -1.0, 2.0), (10, -1.0, 2.0), (15, 0.0, 0.0)],
        },
        Workload {
            name: "unordered_pair",
            description: "A producer and a consumer sharing one window",
            config: unlimited.clone(),
            transactions: vec![produce((0, 10), (1.0, 1.0)), consume((0, 10), (1.0, 1.0))],
            concurrent: vec![],
            expected: vec![(0, -1.0, 1.0), (10, 0.0, 0.0)],
        },
        Workload {
            name: "fixed_between_flexible",
            description: "A fixed consumer between two flexible producers",
            config: unlimited.clone(),
            transactions: vec![
                produce((0, 10), (1.0, 2.0)),
                consume((10, 10), (1.0, 2.0)),
                produce((10, 20), (1.0, 2.0)),
            ],
            concurrent: vec![],
            expected: vec![(0, 0.0, 2.0), (10, -1.0, 3.0), (20, 0.0, 3.0)],
        },
        Workload {
            name: "disjoint",
            description: "Transactions with disjoint windows",
            config: unlimited.clone(),
            transactions: vec![
                produce((0, 5), (1.0, 2.0)),
                consume((10, 15), (1.0, 2.0)),
                produce((20, 25), (1.0, 2.0)),
            ],
            concurrent: vec![],
            expected: vec![
                (0, 0.0, 2.0),
                (5, 1.0, 2.0),
                (10, -1.0, 2.0),
                (15, -1.0, 1.0),
                (20, -1.0, 3.0),
                (25, 0.0, 3.0),
            ],
        },
        Workload {
            name: "concurrent_pair",
            description: "A producer and a consumer forced to happen together",
            config: unlimited.clone(),
            transactions: vec![produce((0, 10), (1.0, 1.0)), consume((0, 10), (1.0, 1.0))],
            concurrent: vec![(0, 1)],
            expected: vec![(0, 0.0, 0.0), (10, 0.0, 0.0)],
        },
        Workload {
            name: "four_unordered",
            description: "Two producers and two consumers sharing one long window",
            config: unlimited.clone(),
            transactions: vec![
                produce((0, 100), (1.0, 2.0)),
                consume((0, 100), (1.0, 2.0)),
                produce((0, 100), (1.0, 2.0)),
                consume((0, 100), (1.0, 2.0)),
            ],
            concurrent: vec![],
            expected: vec![(0, -4.0, 4.0), (100, -2.0, 2.0)],
        },
        Workload {
            name: "concurrent_surplus",
            description: "A concurrent pair whose production always covers the consumption",
            config: unlimited.clone(),
            transactions: vec![produce((0, 10), (2.0, 2.0)), consume((0, 10), (1.0, 2.0))],
            concurrent: vec![(0, 1)],
            expected: vec![(0, 0.0, 1.0), (10, 0.0, 1.0)],
        },
        Workload {
            name: "concurrent_deficit",
            description: "A concurrent pair whose consumption always covers the production",
            config: unlimited,
            transactions: vec![produce((0, 10), (1.0, 2.0)), consume((0, 10), (2.0, 2.0))],
            concurrent: vec![(0, 1)],
            expected: vec![(0, -1.0, 0.0), (10, -1.0, 0.0)],
        },
    ]
}

/// Looks a workload up by name.
pub fn find(name: &str) -> Option<Workload> {
    all().into_iter().find(|workload| workload.name == name)
}
