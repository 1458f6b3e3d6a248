//! Simulation scenarios and results.

use std::fmt;

/// A test scenario to run in the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// Random edits must leave the envelope equal to a fresh rebuild.
    IncrementalEquivalence {
        /// Transactions in the starting plan.
        transactions: usize,
        /// Edits applied to it.
        edits: usize,
    },
    /// Random edits under finite limits must match a fresh rebuild once a
    /// sweep stopped at a violation is resumed.
    LimitedEquivalence {
        /// Transactions in the starting plan.
        transactions: usize,
        /// Edits applied to it.
        edits: usize,
    },
    /// Random edits mixed with ordering constraints must match a fresh
    /// rebuild under the same constraints.
    ConstrainedEquivalence {
        /// Transactions in the starting plan.
        transactions: usize,
        /// Edits applied to it.
        edits: usize,
    },
    /// A second recompute must change nothing.
    Idempotence {
        /// Transactions in the plan.
        transactions: usize,
    },
    /// Lower bounds must not exceed upper bounds where nothing is violated.
    BoundOrdering {
        /// Transactions in the plan.
        transactions: usize,
    },
    /// Concurrent partners must be committed at the same instant.
    OrderAtomicity {
        /// Concurrent pairs in the plan.
        pairs: usize,
    },
    /// A reference workload must produce its known envelope.
    ReferenceWorkload {
        /// Workload name.
        name: String,
    },
    /// The same seed must produce the same envelopes.
    Determinism,
}

impl Scenario {
    /// Creates an incremental equivalence scenario.
    #[must_use]
    pub const fn incremental_equivalence(transactions: usize, edits: usize) -> Self {
        Self::IncrementalEquivalence {
            transactions,
            edits,
        }
    }

    /// Creates a limited equivalence scenario.
    #[must_use]
    pub const fn limited_equivalence(transactions: usize, edits: usize) -> Self {
        Self::LimitedEquivalence {
            transactions,
            edits,
        }
    }

    /// Creates a constrained equivalence scenario.
    #[must_use]
    pub const fn constrained_equivalence(transactions: usize, edits: usize) -> Self {
        Self::ConstrainedEquivalence {
            transactions,
            edits,
        }
    }

    /// Creates an idempotence scenario.
    #[must_use]
    pub const fn idempotence(transactions: usize) -> Self {
        Self::Idempotence { transactions }
    }

    /// Creates a bound ordering scenario.
    #[must_use]
    pub const fn bound_ordering(transactions: usize) -> Self {
        Self::BoundOrdering { transactions }
    }

    /// Creates an order atomicity scenario.
    #[must_use]
    pub const fn order_atomicity(pairs: usize) -> Self {
        Self::OrderAtomicity { pairs }
    }

    /// Creates a reference workload scenario.
    #[must_use]
    pub fn reference_workload(name: impl Into<String>) -> Self {
        Self::ReferenceWorkload { name: name.into() }
    }

    /// Returns the name of this scenario.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IncrementalEquivalence { .. } => "incremental_equivalence",
            Self::LimitedEquivalence { .. } => "limited_equivalence",
            Self::ConstrainedEquivalence { .. } => "constrained_equivalence",
            Self::Idempotence { .. } => "idempotence",
            Self::BoundOrdering { .. } => "bound_ordering",
            Self::OrderAtomicity { .. } => "order_atomicity",
            Self::ReferenceWorkload { .. } => "reference_workload",
            Self::Determinism => "determinism",
        }
    }
}

/// Result of running a simulation scenario.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Name of the test.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Whether the test was skipped.
    pub skipped: bool,
    /// Human-readable message.
    pub message: String,
    /// Detailed diagnostics (if any).
    pub diagnostics: Vec<String>,
}

impl SimResult {
    /// Creates a passing result.
    #[must_use]
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            skipped: false,
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Creates a failing result.
    #[must_use]
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            skipped: false,
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skip(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            skipped: true,
            message: reason.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Adds a diagnostic message.
    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostics.push(diagnostic.into());
        self
    }
}

impl fmt::Display for SimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.skipped {
            "SKIP"
        } else if self.passed {
            "PASS"
        } else {
            "FAIL"
        };

        write!(f, "[{status}] {}: {}", self.name, self.message)?;

        for diag in &self.diagnostics {
            write!(f, "\n  - {diag}")?;
        }

        Ok(())
    }
}

/// Aggregated results from multiple scenarios.
#[derive(Debug, Default)]
pub struct SimSummary {
    /// Total number of tests.
    pub total: usize,
    /// Number of passed tests.
    pub passed: usize,
    /// Number of failed tests.
    pub failed: usize,
    /// Number of skipped tests.
    pub skipped: usize,
    /// Individual results.
    pub results: Vec<SimResult>,
}

impl SimSummary {
    /// Creates a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<SimResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed && !r.skipped).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = total - passed - skipped;

        Self {
            total,
            passed,
            failed,
            skipped,
            results,
        }
    }

    /// Returns true if no scenario failed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &SimResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

impl fmt::Display for SimSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Summary")?;
        writeln!(f, "==================")?;
        writeln!(f, "Total:   {}", self.total)?;
        writeln!(f, "Passed:  {}", self.passed)?;
        writeln!(f, "Failed:  {}", self.failed)?;
        writeln!(f, "Skipped: {}", self.skipped)?;

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            writeln!(f)?;
            for result in failures {
                writeln!(f, "{result}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_result_display() {
        let result = SimResult::pass("test", "it worked");
        assert!(result.to_string().contains("PASS"));
        assert!(result.to_string().contains("test"));

        let result = SimResult::fail("test", "it broke").with_diagnostic("at 5: [-2, -3]");
        assert!(result.to_string().contains("FAIL"));
        assert!(result.to_string().contains("\n  - at 5"));
    }

    #[test]
    fn sim_summary_aggregation() {
        let results = vec![
            SimResult::pass("a", "ok"),
            SimResult::fail("b", "not ok"),
            SimResult::skip("c", "skipped"),
        ];

        let summary = SimSummary::from_results(results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.failures().count(), 1);
        assert!(summary.to_string().contains("[FAIL] b"));
        assert!(!summary.to_string().contains("[PASS] a"));
    }

    #[test]
    fn scenario_names() {
        assert_eq!(Scenario::idempotence(3).name(), "idempotence");
        assert_eq!(Scenario::limited_equivalence(3, 4).name(), "limited_equivalence");
        assert_eq!(Scenario::constrained_equivalence(3, 4).name(), "constrained_equivalence");
        assert_eq!(Scenario::reference_workload("disjoint").name(), "reference_workload");
        assert_eq!(Scenario::Determinism.name(), "determinism");
    }
}
