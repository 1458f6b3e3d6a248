//! Deterministic simulation harness.
//!
//! Builds random plans and edit sequences from a seeded generator and checks
//! the engine's properties against them. Every random choice flows from the
//! master seed, so a failing seed replays exactly.

use crate::generators::{Edit, Link, HORIZON};
use crate::simulation::{Scenario, SimResult, SimSummary};
use crate::workloads;
use envelope_model::{QuantityInterval, Role, Time, TimeInterval, Transaction, TransactionId};
use envelope_profile::{
    DetectorKind, Level, NullListener, PrecedenceOracle, Profile, ProfileConfig, RecordingListener,
    Relation, ResourceListener, StrategyKind, TemporalOracle,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, info};
use xxhash_rust::xxh64::xxh64;

/// Envelope as `(time, lower, upper)` per instant.
pub type Envelope = Vec<(Time, f64, f64)>;

/// Largest difference two envelopes may show and still be equal.
pub const TOLERANCE: f64 = 1e-6;

/// Level limit used by the limited equivalence scenario. Random plans cross
/// it often enough that most edit sequences stop a sweep early.
pub const LIMIT: f64 = 6.0;

/// Configuration for the simulation.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for all randomness.
    pub seed: u64,
    /// Number of random iterations to run.
    pub iterations: usize,
    /// Transactions in each random plan.
    pub transactions: usize,
    /// Edits applied to each random plan.
    pub edits: usize,
    /// Level bound algorithm under test.
    pub strategy: StrategyKind,
    /// Whether to verify determinism.
    pub verify_determinism: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            iterations: 100,
            transactions: 8,
            edits: 12,
            strategy: StrategyKind::Flow,
            verify_determinism: true,
        }
    }
}

impl SimConfig {
    /// Creates a new config with the given seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the size of each random plan.
    #[must_use]
    pub const fn with_transactions(mut self, transactions: usize) -> Self {
        self.transactions = transactions;
        self
    }

    /// Sets the number of edits per plan.
    #[must_use]
    pub const fn with_edits(mut self, edits: usize) -> Self {
        self.edits = edits;
        self
    }

    /// Sets the strategy under test.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Disables determinism verification.
    #[must_use]
    pub const fn without_determinism_check(mut self) -> Self {
        self.verify_determinism = false;
        self
    }

    fn profile_config(&self) -> ProfileConfig {
        ProfileConfig::default().with_strategy(self.strategy)
    }
}

/// Recomputes and returns the envelope of a profile.
pub fn envelope_of<O: TemporalOracle, L: ResourceListener>(profile: &mut Profile<O, L>) -> Envelope {
    profile.recompute();
    profile
        .instants()
        .map(|instant| (instant.time(), instant.lower_level(), instant.upper_level()))
        .collect()
}

/// Returns true if two envelopes have the same instants and bounds within
/// [`TOLERANCE`].
pub fn same_envelope(a: &[(Time, f64, f64)], b: &[(Time, f64, f64)]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.0 == y.0 && (x.1 - y.1).abs() <= TOLERANCE && (x.2 - y.2).abs() <= TOLERANCE
        })
}

/// Fingerprint of an envelope for determinism checks.
pub fn envelope_hash(envelope: &[(Time, f64, f64)]) -> u64 {
    let mut bytes = Vec::with_capacity(envelope.len() * 24);
    for &(time, lower, upper) in envelope {
        bytes.extend_from_slice(&time.to_le_bytes());
        bytes.extend_from_slice(&lower.to_bits().to_le_bytes());
        bytes.extend_from_slice(&upper.to_bits().to_le_bytes());
    }
    xxh64(&bytes, 0)
}

/// Envelope of a new profile holding copies of `live`, added in order.
///
/// # Panics
///
/// Panics if `config` is invalid or a handle in `live` is not registered.
pub fn fresh_envelope<O: TemporalOracle, L: ResourceListener>(
    profile: &Profile<O, L>,
    live: &[TransactionId],
    config: ProfileConfig,
) -> Envelope {
    let mut fresh = Profile::new(config).expect("configuration was already validated");
    for &id in live {
        let transaction = profile.transaction(id).expect("live transactions are registered");
        fresh.add_transaction(transaction.clone());
    }
    envelope_of(&mut fresh)
}

/// Applies one edit. Index-based edits pick `index % live.len()` and are
/// skipped when nothing is live.
pub fn apply_edit<O: TemporalOracle, L: ResourceListener>(
    profile: &mut Profile<O, L>,
    live: &mut Vec<TransactionId>,
    edit: Edit,
) {
    if let Edit::Add(transaction) = edit {
        live.push(profile.add_transaction(transaction));
        return;
    }
    if live.is_empty() {
        return;
    }
    match edit {
        Edit::Remove(index) => {
            let id = live.remove(index % live.len());
            profile.remove_transaction(id);
        }
        Edit::Retime(index, time) => {
            let id = live[index % live.len()];
            profile.transaction_time_changed(id, time);
        }
        Edit::Requantify(index, quantity) => {
            let id = live[index % live.len()];
            profile.transaction_quantity_changed(id, quantity);
        }
        Edit::Add(_) | Edit::Relate(..) | Edit::Unrelate(_) => {}
    }
}

/// The two transactions a relation constrains.
pub const fn endpoints(relation: &Relation) -> (TransactionId, TransactionId) {
    let Relation::Distance { before, after, .. } = *relation;
    (before, after)
}

fn retract<L: ResourceListener>(profile: &mut Profile<PrecedenceOracle, L>, relation: &Relation) {
    let (a, b) = endpoints(relation);
    profile.oracle_mut().remove(relation);
    profile.temporal_constraint_removed(a, b);
}

/// Applies one edit to a profile whose oracle holds `relations`.
///
/// A pair is related at most once. Removing a transaction first retracts
/// every relation that mentions it.
pub fn apply_constrained_edit<L: ResourceListener>(
    profile: &mut Profile<PrecedenceOracle, L>,
    live: &mut Vec<TransactionId>,
    relations: &mut Vec<Relation>,
    edit: Edit,
) {
    match edit {
        Edit::Relate(first, second, link) if !live.is_empty() => {
            let a = live[first % live.len()];
            let b = live[second % live.len()];
            let taken = relations.iter().any(|relation| {
                let pair = endpoints(relation);
                pair == (a, b) || pair == (b, a)
            });
            if a == b || taken {
                return;
            }
            let relation = link.relation(a, b);
            profile.oracle_mut().add(relation);
            profile.temporal_constraint_added(a, b);
            relations.push(relation);
        }
        Edit::Unrelate(index) if !relations.is_empty() => {
            let relation = relations.remove(index % relations.len());
            retract(profile, &relation);
        }
        Edit::Remove(index) if !live.is_empty() => {
            let id = live[index % live.len()];
            relations.retain(|relation| {
                let (a, b) = endpoints(relation);
                if a == id || b == id {
                    retract(profile, relation);
                    false
                } else {
                    true
                }
            });
            apply_edit(profile, live, edit);
        }
        edit => apply_edit(profile, live, edit),
    }
}

/// Envelope of a new profile holding copies of `live` and the same
/// `relations`, mapped onto the copies.
///
/// # Panics
///
/// Panics if `config` is invalid, a handle in `live` is not registered, or a
/// relation mentions a transaction outside `live`.
pub fn fresh_constrained_envelope<L: ResourceListener>(
    profile: &Profile<PrecedenceOracle, L>,
    live: &[TransactionId],
    relations: &[Relation],
    config: ProfileConfig,
) -> Envelope {
    let mut fresh = Profile::with_parts(config, PrecedenceOracle::new(), NullListener)
        .expect("configuration was already validated");
    let mut copies = HashMap::with_capacity(live.len());
    for &id in live {
        let transaction = profile.transaction(id).expect("live transactions are registered");
        copies.insert(id, fresh.add_transaction(transaction.clone()));
    }
    for relation in relations {
        let Relation::Distance {
            before,
            after,
            distance,
        } = *relation;
        fresh
            .oracle_mut()
            .add(Relation::within(copies[&before], copies[&after], distance));
    }
    envelope_of(&mut fresh)
}

/// Simulation harness for deterministic testing.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Creates a new simulation with the given configuration.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    fn random_window(&mut self) -> TimeInterval {
        let start = self.rng.gen_range(0..=HORIZON);
        if self.rng.gen_bool(0.2) {
            return TimeInterval::singleton(start);
        }
        let end = (start + self.rng.gen_range(0..=HORIZON / 2)).min(HORIZON);
        TimeInterval::new(start, end)
    }

    fn random_quantity(&mut self) -> QuantityInterval {
        let lb = f64::from(self.rng.gen_range(0u8..=5));
        let width = f64::from(self.rng.gen_range(0u8..=3));
        QuantityInterval::new(lb, lb + width)
    }

    fn random_transaction(&mut self) -> envelope_model::Result<Transaction> {
        let role = if self.rng.gen_bool(0.5) {
            Role::Producer
        } else {
            Role::Consumer
        };
        let time = self.random_window();
        let quantity = self.random_quantity();
        Transaction::try_new(role, time, quantity)
    }

    fn random_plan(&mut self, size: usize) -> envelope_model::Result<Vec<Transaction>> {
        (0..size).map(|_| self.random_transaction()).collect()
    }

    fn random_edit(&mut self) -> envelope_model::Result<Edit> {
        let index = self.rng.gen_range(0..usize::MAX);
        Ok(match self.rng.gen_range(0..10) {
            0..=2 => Edit::Add(self.random_transaction()?),
            3 => Edit::Remove(index),
            4..=6 => Edit::Retime(index, self.random_window()),
            _ => Edit::Requantify(index, self.random_quantity()),
        })
    }

    fn random_constrained_edit(&mut self) -> envelope_model::Result<Edit> {
        if !self.rng.gen_bool(0.3) {
            return self.random_edit();
        }
        let first = self.rng.gen_range(0..usize::MAX);
        if self.rng.gen_bool(0.25) {
            return Ok(Edit::Unrelate(first));
        }
        let second = self.rng.gen_range(0..usize::MAX);
        let link = if self.rng.gen_bool(0.5) {
            Link::Precedes
        } else {
            Link::Concurrent
        };
        Ok(Edit::Relate(first, second, link))
    }

    /// Runs a scenario and returns the result.
    pub fn run_scenario(&mut self, scenario: &Scenario) -> SimResult {
        let result = match scenario {
            Scenario::IncrementalEquivalence {
                transactions,
                edits,
            } => self.test_incremental_equivalence(*transactions, *edits),
            Scenario::LimitedEquivalence {
                transactions,
                edits,
            } => self.test_limited_equivalence(*transactions, *edits),
            Scenario::ConstrainedEquivalence {
                transactions,
                edits,
            } => self.test_constrained_equivalence(*transactions, *edits),
            Scenario::Idempotence { transactions } => self.test_idempotence(*transactions),
            Scenario::BoundOrdering { transactions } => self.test_bound_ordering(*transactions),
            Scenario::OrderAtomicity { pairs } => self.test_order_atomicity(*pairs),
            Scenario::ReferenceWorkload { name } => self.test_reference_workload(name),
            Scenario::Determinism => self.test_determinism(),
        };
        debug!(scenario = scenario.name(), passed = result.passed, "scenario finished");
        result
    }

    /// Runs all scenarios and returns their results.
    pub fn run_all(&mut self, scenarios: &[Scenario]) -> Vec<SimResult> {
        scenarios.iter().map(|s| self.run_scenario(s)).collect()
    }

    /// Runs the configured number of random iterations, every reference
    /// workload, and the determinism check.
    pub fn run_campaign(&mut self) -> SimSummary {
        let mut scenarios = Vec::with_capacity(self.config.iterations * 6 + 16);
        for _ in 0..self.config.iterations {
            scenarios.push(Scenario::incremental_equivalence(
                self.config.transactions,
                self.config.edits,
            ));
            scenarios.push(Scenario::limited_equivalence(
                self.config.transactions,
                self.config.edits,
            ));
            scenarios.push(Scenario::constrained_equivalence(
                self.config.transactions,
                self.config.edits,
            ));
            scenarios.push(Scenario::idempotence(self.config.transactions));
            scenarios.push(Scenario::bound_ordering(self.config.transactions));
            scenarios.push(Scenario::order_atomicity(self.config.transactions / 2 + 1));
        }
        scenarios.extend(
            workloads::all()
                .into_iter()
                .map(|workload| Scenario::reference_workload(workload.name)),
        );
        scenarios.push(Scenario::Determinism);

        let summary = SimSummary::from_results(self.run_all(&scenarios));
        info!(
            seed = self.config.seed,
            total = summary.total,
            failed = summary.failed,
            "campaign finished"
        );
        summary
    }

    fn test_incremental_equivalence(&mut self, transactions: usize, edits: usize) -> SimResult {
        const NAME: &str = "incremental_equivalence";
        let config = self.config.profile_config();
        let plan = match self.random_plan(transactions) {
            Ok(plan) => plan,
            Err(e) => return SimResult::fail(NAME, format!("Invalid random plan: {e}")),
        };
        let mut profile = match Profile::new(config.clone()) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };
        let mut live: Vec<_> = plan.into_iter().map(|t| profile.add_transaction(t)).collect();
        profile.recompute();

        for step in 0..edits {
            let edit = match self.random_edit() {
                Ok(edit) => edit,
                Err(e) => return SimResult::fail(NAME, format!("Invalid random edit: {e}")),
            };
            let description = format!("{edit:?}");
            apply_edit(&mut profile, &mut live, edit);
            let incremental = envelope_of(&mut profile);
            let fresh = fresh_envelope(&profile, &live, config.clone());
            if !same_envelope(&incremental, &fresh) {
                return SimResult::fail(NAME, format!("Envelopes diverged after edit {step}"))
                    .with_diagnostic(description)
                    .with_diagnostic(format!("incremental: {incremental:?}"))
                    .with_diagnostic(format!("fresh: {fresh:?}"));
            }
        }
        SimResult::pass(NAME, format!("{edits} edits matched a fresh rebuild"))
    }

    fn test_limited_equivalence(&mut self, transactions: usize, edits: usize) -> SimResult {
        const NAME: &str = "limited_equivalence";
        let config = self.config.profile_config().with_limits(-LIMIT, LIMIT);
        let resumed = config.clone().with_allow_violations(true);
        let plan = match self.random_plan(transactions) {
            Ok(plan) => plan,
            Err(e) => return SimResult::fail(NAME, format!("Invalid random plan: {e}")),
        };
        let mut profile = match Profile::new(config) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };
        let mut live: Vec<_> = plan.into_iter().map(|t| profile.add_transaction(t)).collect();
        profile.recompute();

        let mut stopped = 0;
        for step in 0..edits {
            let edit = match self.random_edit() {
                Ok(edit) => edit,
                Err(e) => return SimResult::fail(NAME, format!("Invalid random edit: {e}")),
            };
            let description = format!("{edit:?}");
            apply_edit(&mut profile, &mut live, edit);
            profile.recompute();
            if profile.dirty_start().is_some() {
                stopped += 1;
            }
            profile.set_allow_violations(true);
            let incremental = envelope_of(&mut profile);
            profile.set_allow_violations(false);
            let fresh = fresh_envelope(&profile, &live, resumed.clone());
            if !same_envelope(&incremental, &fresh) {
                return SimResult::fail(NAME, format!("Envelopes diverged after edit {step}"))
                    .with_diagnostic(description)
                    .with_diagnostic(format!("incremental: {incremental:?}"))
                    .with_diagnostic(format!("fresh: {fresh:?}"));
            }
        }
        SimResult::pass(
            NAME,
            format!("{edits} edits matched a fresh rebuild, {stopped} sweeps resumed"),
        )
    }

    fn test_constrained_equivalence(&mut self, transactions: usize, edits: usize) -> SimResult {
        const NAME: &str = "constrained_equivalence";
        let config = self.config.profile_config();
        let plan = match self.random_plan(transactions) {
            Ok(plan) => plan,
            Err(e) => return SimResult::fail(NAME, format!("Invalid random plan: {e}")),
        };
        let mut profile: Profile<PrecedenceOracle, RecordingListener> = match Profile::with_parts(
            config.clone(),
            PrecedenceOracle::new(),
            RecordingListener::new(),
        ) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };
        let mut live: Vec<_> = plan.into_iter().map(|t| profile.add_transaction(t)).collect();
        let mut relations = Vec::new();
        profile.recompute();

        for step in 0..edits {
            let edit = match self.random_constrained_edit() {
                Ok(edit) => edit,
                Err(e) => return SimResult::fail(NAME, format!("Invalid random edit: {e}")),
            };
            let description = format!("{edit:?}");
            apply_constrained_edit(&mut profile, &mut live, &mut relations, edit);
            let incremental = envelope_of(&mut profile);
            let fresh = fresh_constrained_envelope(&profile, &live, &relations, config.clone());
            if !same_envelope(&incremental, &fresh) {
                return SimResult::fail(NAME, format!("Envelopes diverged after edit {step}"))
                    .with_diagnostic(description)
                    .with_diagnostic(format!("relations: {relations:?}"))
                    .with_diagnostic(format!("incremental: {incremental:?}"))
                    .with_diagnostic(format!("fresh: {fresh:?}"));
            }
        }
        SimResult::pass(
            NAME,
            format!("{edits} edits under {} relations matched a fresh rebuild", relations.len()),
        )
    }

    fn test_idempotence(&mut self, transactions: usize) -> SimResult {
        const NAME: &str = "idempotence";
        let plan = match self.random_plan(transactions) {
            Ok(plan) => plan,
            Err(e) => return SimResult::fail(NAME, format!("Invalid random plan: {e}")),
        };
        let mut profile = match Profile::new(self.config.profile_config()) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };
        for transaction in plan {
            profile.add_transaction(transaction);
        }
        let first = envelope_of(&mut profile);
        if profile.needs_recompute() {
            return SimResult::fail(NAME, "Profile still stale after a recompute");
        }
        profile.recompute();
        let second = envelope_of(&mut profile);
        if envelope_hash(&first) == envelope_hash(&second) {
            SimResult::pass(NAME, "Second recompute left the envelope unchanged")
        } else {
            SimResult::fail(NAME, "Second recompute changed the envelope")
        }
    }

    fn test_bound_ordering(&mut self, transactions: usize) -> SimResult {
        const NAME: &str = "bound_ordering";
        let plan = match self.random_plan(transactions) {
            Ok(plan) => plan,
            Err(e) => return SimResult::fail(NAME, format!("Invalid random plan: {e}")),
        };
        let mut profile = match Profile::new(self.config.profile_config()) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };
        for transaction in plan {
            profile.add_transaction(transaction);
        }
        profile.recompute();
        let crossed: Vec<String> = profile
            .instants()
            .filter(|i| i.lower_level() > i.upper_level() + TOLERANCE && !i.is_violated())
            .map(|i| format!("at {}: [{}, {}]", i.time(), i.lower_level(), i.upper_level()))
            .collect();
        if crossed.is_empty() {
            return SimResult::pass(NAME, "Every instant has ordered bounds");
        }
        crossed.into_iter().fold(
            SimResult::fail(NAME, "Crossed bounds without a violation"),
            SimResult::with_diagnostic,
        )
    }

    fn test_order_atomicity(&mut self, pairs: usize) -> SimResult {
        const NAME: &str = "order_atomicity";
        let mut profile: Profile<PrecedenceOracle, RecordingListener> = match Profile::with_parts(
            self.config.profile_config(),
            PrecedenceOracle::new(),
            RecordingListener::new(),
        ) {
            Ok(profile) => profile,
            Err(e) => return SimResult::fail(NAME, format!("Invalid configuration: {e}")),
        };

        let mut partners = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let (first, second) = match (self.random_transaction(), self.random_transaction()) {
                (Ok(first), Ok(second)) => (first, second),
                (Err(e), _) | (_, Err(e)) => {
                    return SimResult::fail(NAME, format!("Invalid random transaction: {e}"))
                }
            };
            // Partners share one window so the relation is satisfiable.
            let window = first.time();
            let mut second = second;
            second.set_time(window);
            let a = profile.add_transaction(first);
            let b = profile.add_transaction(second);
            profile.oracle_mut().add(Relation::concurrent(a, b));
            profile.temporal_constraint_added(a, b);
            partners.push((a, b));
        }
        profile.recompute();

        let split: Vec<String> = partners
            .iter()
            .flat_map(|&(a, b)| [(a, b, Level::Lower), (a, b, Level::Upper)])
            .filter(|&(a, b, level)| {
                profile.strategy().contribution(a, level) != profile.strategy().contribution(b, level)
            })
            .map(|(a, b, level)| format!("{a} and {b} split on the {level:?} level"))
            .collect();
        if split.is_empty() {
            return SimResult::pass(NAME, format!("{pairs} concurrent pairs committed together"));
        }
        split.into_iter().fold(
            SimResult::fail(NAME, "Concurrent partners committed at different instants"),
            SimResult::with_diagnostic,
        )
    }

    #[allow(clippy::unused_self)]
    fn test_reference_workload(&self, name: &str) -> SimResult {
        const NAME: &str = "reference_workload";
        let Some(workload) = workloads::find(name) else {
            return SimResult::skip(NAME, format!("No workload named {name}"));
        };
        match workload.evaluate(StrategyKind::Flow, DetectorKind::ClosedWorld) {
            Ok(evaluation) if evaluation.matches(&workload.expected, TOLERANCE) => {
                SimResult::pass(NAME, format!("{name} produced its known envelope"))
            }
            Ok(evaluation) => SimResult::fail(NAME, format!("{name} produced a different envelope"))
                .with_diagnostic(format!("expected: {:?}", workload.expected))
                .with_diagnostic(format!("actual: {:?}", evaluation.rows)),
            Err(e) => SimResult::fail(NAME, format!("{name} could not be built: {e}")),
        }
    }

    fn test_determinism(&self) -> SimResult {
        const NAME: &str = "determinism";
        if !self.config.verify_determinism {
            return SimResult::skip(NAME, "Determinism verification disabled");
        }
        match (self.fingerprint(), self.fingerprint()) {
            (Ok(first), Ok(second)) if first == second => {
                SimResult::pass(NAME, format!("Seed {} fingerprint {first:016x}", self.config.seed))
            }
            (Ok(first), Ok(second)) => SimResult::fail(
                NAME,
                format!("Fingerprints differ: {first:016x} vs {second:016x}"),
            ),
            (Err(e), _) | (_, Err(e)) => SimResult::fail(NAME, format!("Replay failed: {e}")),
        }
    }

    /// Hash of every envelope seen while editing a plan drawn from the
    /// master seed.
    fn fingerprint(&self) -> envelope_profile::Result<u64> {
        let mut replay = Self::new(self.config.clone());
        let plan = replay.random_plan(replay.config.transactions)?;
        let mut profile = Profile::new(replay.config.profile_config())?;
        let mut live: Vec<_> = plan.into_iter().map(|t| profile.add_transaction(t)).collect();
        let mut hash = envelope_hash(&envelope_of(&mut profile));
        for _ in 0..replay.config.edits {
            let edit = replay.random_edit()?;
            apply_edit(&mut profile, &mut live, edit);
            hash ^= envelope_hash(&envelope_of(&mut profile)).rotate_left(7);
        }
        Ok(hash)
    }

    /// Verifies that replaying the master seed produces identical envelopes.
    pub fn verify_determinism(&self) -> bool {
        !self.config.verify_determinism
            || matches!((self.fingerprint(), self.fingerprint()), (Ok(a), Ok(b)) if a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_is_deterministic() {
        let sim = Simulation::new(SimConfig::default().with_seed(12345));
        assert!(sim.verify_determinism());
    }

    #[test]
    fn different_seeds_draw_different_plans() {
        let a = Simulation::new(SimConfig::default().with_seed(1)).fingerprint().unwrap();
        let b = Simulation::new(SimConfig::default().with_seed(2)).fingerprint().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn reference_workloads_pass() {
        let mut sim = Simulation::new(SimConfig::default());
        for workload in workloads::all() {
            let result = sim.run_scenario(&Scenario::reference_workload(workload.name));
            assert!(result.passed && !result.skipped, "Result: {result}");
        }
    }

    #[test]
    fn unknown_workload_is_skipped() {
        let mut sim = Simulation::new(SimConfig::default());
        let result = sim.run_scenario(&Scenario::reference_workload("missing"));
        assert!(result.skipped);
    }

    #[test]
    fn small_campaign_passes_for_every_strategy() {
        for strategy in StrategyKind::ALL {
            let config = SimConfig::default()
                .with_seed(7)
                .with_iterations(5)
                .with_strategy(strategy);
            let summary = Simulation::new(config).run_campaign();
            assert!(summary.all_passed(), "{strategy}: {summary}");
        }
    }

    #[test]
    fn apply_edit_skips_index_edits_on_an_empty_plan() {
        let mut profile = Profile::new(ProfileConfig::default()).unwrap();
        let mut live = Vec::new();
        apply_edit(&mut profile, &mut live, Edit::Remove(3));
        assert!(live.is_empty());
        let t = Transaction::producer((0, 5), (1.0, 1.0)).unwrap();
        apply_edit(&mut profile, &mut live, Edit::Add(t));
        apply_edit(&mut profile, &mut live, Edit::Retime(9, TimeInterval::new(2, 5)));
        assert_eq!(profile.transaction(live[0]).unwrap().time(), TimeInterval::new(2, 5));
    }

    #[test]
    fn limited_equivalence_resumes_stopped_sweeps() {
        let mut sim = Simulation::new(SimConfig::default().with_seed(21));
        for _ in 0..20 {
            let result = sim.run_scenario(&Scenario::limited_equivalence(8, 12));
            assert!(result.passed, "{result}");
        }
    }

    #[test]
    fn constrained_equivalence_holds_across_seeds() {
        for seed in [3, 211, 4096] {
            let mut sim = Simulation::new(SimConfig::default().with_seed(seed));
            for _ in 0..10 {
                let result = sim.run_scenario(&Scenario::constrained_equivalence(8, 12));
                assert!(result.passed, "seed {seed}: {result}");
            }
        }
    }

    #[test]
    fn retime_after_a_stopped_sweep_matches_a_fresh_profile() {
        let config = ProfileConfig::default().with_limits(-10.0, 10.0);
        let mut profile = Profile::new(config.clone()).unwrap();
        let mut live = Vec::new();
        for transaction in [
            Transaction::producer((0, 100), (1.0, 1.0)).unwrap(),
            Transaction::consumer((10, 20), (1.0, 1.0)).unwrap(),
            Transaction::producer((40, 40), (50.0, 50.0)).unwrap(),
        ] {
            apply_edit(&mut profile, &mut live, Edit::Add(transaction));
        }
        profile.recompute();

        apply_edit(&mut profile, &mut live, Edit::Retime(1, TimeInterval::new(30, 60)));
        profile.recompute();
        assert!(profile.dirty_start().is_some());
        profile.set_allow_violations(true);

        let incremental = envelope_of(&mut profile);
        let fresh = fresh_envelope(&profile, &live, config.with_allow_violations(true));
        assert!(same_envelope(&incremental, &fresh), "{incremental:?} vs {fresh:?}");
    }

    #[test]
    fn removing_a_related_transaction_retracts_its_relations() {
        let mut profile =
            Profile::with_parts(ProfileConfig::default(), PrecedenceOracle::new(), RecordingListener::new())
                .unwrap();
        let mut live = Vec::new();
        let mut relations = Vec::new();
        for _ in 0..3 {
            let t = Transaction::producer((0, 10), (1.0, 2.0)).unwrap();
            apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Add(t));
        }
        apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Relate(0, 1, Link::Concurrent));
        apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Relate(1, 0, Link::Precedes));
        apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Relate(2, 2, Link::Precedes));
        apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Relate(1, 2, Link::Precedes));
        assert_eq!(relations.len(), 2);

        apply_constrained_edit(&mut profile, &mut live, &mut relations, Edit::Remove(1));
        assert!(relations.is_empty());
        assert_eq!(live.len(), 2);
        let fresh = fresh_constrained_envelope(&profile, &live, &relations, ProfileConfig::default());
        assert!(same_envelope(&envelope_of(&mut profile), &fresh));
    }

    #[test]
    fn envelope_hash_sees_every_field() {
        let base = vec![(0, -1.0, 1.0)];
        assert_ne!(envelope_hash(&base), envelope_hash(&[(1, -1.0, 1.0)]));
        assert_ne!(envelope_hash(&base), envelope_hash(&[(0, -1.0, 2.0)]));
        assert_eq!(envelope_hash(&base), envelope_hash(&base.clone()));
    }
}
