//! Flow graph for one side of the envelope.
//!
//! Pending transactions are nodes. For the lower level, consumers hang off
//! the source with their largest quantity and producers feed the sink with
//! their smallest; the upper level mirrors this. Ordering constraints become
//! interior edges. A maximum flow then pairs off pending transactions that
//! cancel each other, and whatever stays reachable from the source in the
//! residual graph is forced to have happened already in the extreme case.

use envelope_flow::{Graph, MaxFlow, NodeId, EPSILON};
use envelope_model::{Arena, Role, Time, Transaction, TransactionId};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Node key in a [`FlowProfileGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertex {
    /// Flow source.
    Source,
    /// Flow sink.
    Sink,
    /// A pending transaction.
    Transaction(TransactionId),
}

/// Side of the envelope a graph computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// The lowest achievable level.
    Lower,
    /// The highest achievable level.
    Upper,
}

impl Level {
    /// What a transaction adds to this side once it has happened.
    pub fn closed_contribution(self, transaction: &Transaction) -> f64 {
        match self {
            Self::Lower => transaction.minimum_effect(),
            Self::Upper => transaction.maximum_effect(),
        }
    }

    /// Returns true if the transaction is fed from the source on this side.
    pub const fn feeds_from_source(self, role: Role) -> bool {
        matches!(
            (self, role),
            (Self::Lower, Role::Consumer) | (Self::Upper, Role::Producer)
        )
    }
}

/// A flow graph and its solver for one side of the envelope.
#[derive(Debug, Clone)]
pub struct FlowProfileGraph {
    level: Level,
    graph: Graph<Vertex>,
    solver: MaxFlow,
    source: NodeId,
    sink: NodeId,
    recalculate: bool,
}

impl FlowProfileGraph {
    /// Creates an empty graph for `level`.
    pub fn new(level: Level) -> Self {
        let mut graph = Graph::new();
        let source = graph.create_node(Vertex::Source);
        let sink = graph.create_node(Vertex::Sink);
        Self {
            level,
            graph,
            solver: MaxFlow::new(source, sink),
            source,
            sink,
            recalculate: false,
        }
    }

    /// Side of the envelope.
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Returns true if the flow must be solved from scratch before use.
    pub const fn needs_recalculation(&self) -> bool {
        self.recalculate
    }

    /// Drops every transaction.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.source = self.graph.create_node(Vertex::Source);
        self.sink = self.graph.create_node(Vertex::Sink);
        self.solver = MaxFlow::new(self.source, self.sink);
        self.recalculate = true;
    }

    fn node(&self, id: TransactionId) -> Option<NodeId> {
        self.graph.node(Vertex::Transaction(id))
    }

    /// Returns true if the transaction is pending in this graph.
    pub fn is_enabled(&self, id: TransactionId) -> bool {
        self.node(id)
            .is_some_and(|node| self.graph.is_node_enabled(node))
    }

    /// Adds a pending transaction.
    ///
    /// A transaction with nothing to move on this side still gets a node with
    /// a zero-capacity edge, so ordering edges keep it with its partners.
    pub fn enable_transaction(&mut self, id: TransactionId, transaction: &Transaction) {
        let quantity = transaction.quantity();
        let from_source = self.level.feeds_from_source(transaction.role());
        let capacity = if from_source { quantity.ub } else { quantity.lb };
        if capacity <= 0.0 {
            trace!(level = ?self.level, transaction = %id, "zero capacity");
        }

        let node = self.graph.create_node(Vertex::Transaction(id));
        if from_source {
            self.graph.create_edge_with_reverse(self.source, node, capacity);
        } else {
            self.graph.create_edge_with_reverse(node, self.sink, capacity);
        }
        self.recalculate = true;
    }

    /// Joins two transactions that always happen together.
    pub fn enable_at(&mut self, a: TransactionId, b: TransactionId) {
        let (Some(a), Some(b)) = (self.node(a), self.node(b)) else {
            return;
        };
        self.graph.create_edge(a, b, f64::INFINITY);
        self.graph.create_edge(b, a, f64::INFINITY);
        self.recalculate = true;
    }

    /// Records that `before` never happens after `after`.
    pub fn enable_at_or_before(&mut self, before: TransactionId, after: TransactionId) {
        let (Some(before), Some(after)) = (self.node(before), self.node(after)) else {
            return;
        };
        self.graph.create_edge_with_reverse(after, before, f64::INFINITY);
        self.recalculate = true;
    }

    /// Takes a pending transaction out of the graph without touching the flow.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is not pending.
    pub fn disable(&mut self, id: TransactionId) {
        let node = self
            .node(id)
            .filter(|&node| self.graph.is_node_enabled(node));
        let Some(node) = node else {
            panic!("transaction {id} is not pending in the {:?} graph", self.level);
        };
        self.graph.set_node_enabled(node, false);
    }

    /// Withdraws the flow through a pending transaction.
    ///
    /// Skipped when a full solve is due anyway. If the flow cannot be
    /// withdrawn incrementally the next query solves from scratch.
    pub fn push_flow(&mut self, id: TransactionId) {
        if self.recalculate {
            return;
        }
        let Some(node) = self.node(id) else {
            return;
        };
        if !self.solver.push_flow_back(&self.graph, node) {
            debug!(level = ?self.level, transaction = %id, "falling back to a full solve");
            self.recalculate = true;
        }
    }

    /// Resumes the solver after [`FlowProfileGraph::push_flow`].
    pub fn restore_flow(&mut self) {
        if !self.recalculate {
            self.solver.execute(&self.graph, false);
        }
    }

    /// Disables every transaction reachable from the source in the residual
    /// graph, records `time` as when each of them started contributing, and
    /// returns the sum of their closed contributions.
    pub fn disable_reachable_residual_graph(
        &mut self,
        transactions: &Arena<Transaction>,
        contributions: &mut HashMap<TransactionId, Time>,
        time: Time,
    ) -> f64 {
        if self.recalculate {
            self.solver.execute(&self.graph, true);
            self.recalculate = false;
        }

        let mut visited = vec![false; self.graph.node_capacity()];
        visited[self.source.index()] = true;
        visited[self.sink.index()] = true;
        let mut stack = vec![self.source];
        let mut reached = Vec::new();
        while let Some(node) = stack.pop() {
            for &edge in self.graph.out_edges(node) {
                if !self.graph.is_edge_enabled(edge)
                    || self.solver.residual(&self.graph, edge) <= EPSILON
                {
                    continue;
                }
                let target = self.graph.edge_data(edge).target();
                if visited[target.index()] {
                    continue;
                }
                visited[target.index()] = true;
                stack.push(target);
                reached.push(target);
            }
        }

        let mut delta = 0.0;
        for node in reached {
            self.graph.set_node_enabled(node, false);
            if let Vertex::Transaction(id) = self.graph.key(node) {
                contributions.insert(id, time);
                delta += self.level.closed_contribution(&transactions[id]);
                trace!(level = ?self.level, transaction = %id, time, "starts contributing");
            }
        }
        delta
    }

    /// Value of the current flow.
    pub fn max_flow(&self) -> f64 {
        self.solver.max_flow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(transactions: &[Transaction]) -> (Arena<Transaction>, Vec<TransactionId>) {
        let mut arena = Arena::new();
        let ids = transactions.iter().map(|t| arena.insert(t.clone())).collect();
        (arena, ids)
    }

    #[test]
    fn unmatched_consumer_is_reachable_on_the_lower_side() {
        let (arena, ids) = setup(&[Transaction::consumer((0, 10), (1.0, 2.0)).unwrap()]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();

        graph.enable_transaction(ids[0], &arena[ids[0]]);
        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);

        assert!((delta + 2.0).abs() < 1e-9);
        assert_eq!(contributions.get(&ids[0]), Some(&0));
        assert!(!graph.is_enabled(ids[0]));
    }

    #[test]
    fn unordered_pair_can_cancel() {
        let (arena, ids) = setup(&[
            Transaction::producer((0, 10), (1.0, 1.0)).unwrap(),
            Transaction::consumer((0, 10), (1.0, 1.0)).unwrap(),
        ]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        for &id in &ids {
            graph.enable_transaction(id, &arena[id]);
        }
        // Unordered: the consumer may come first, so it stays reachable.
        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);
        assert!((delta + 1.0).abs() < 1e-9);
    }

    #[test]
    fn concurrent_pair_cancels_out() {
        let (arena, ids) = setup(&[
            Transaction::producer((0, 10), (1.0, 1.0)).unwrap(),
            Transaction::consumer((0, 10), (1.0, 1.0)).unwrap(),
        ]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        for &id in &ids {
            graph.enable_transaction(id, &arena[id]);
        }
        graph.enable_at(ids[0], ids[1]);

        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);
        assert!(delta.abs() < 1e-9);
        assert!((graph.max_flow() - 1.0).abs() < 1e-9);
        assert!(contributions.is_empty());
        assert!(graph.is_enabled(ids[0]) && graph.is_enabled(ids[1]));
    }

    #[test]
    fn producer_known_first_shields_the_consumer() {
        let (arena, ids) = setup(&[
            Transaction::producer((0, 10), (2.0, 2.0)).unwrap(),
            Transaction::consumer((0, 10), (1.0, 1.0)).unwrap(),
        ]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        for &id in &ids {
            graph.enable_transaction(id, &arena[id]);
        }
        graph.enable_at_or_before(ids[0], ids[1]);

        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);
        assert!(delta.abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_transaction_stays_pending() {
        let (arena, ids) = setup(&[Transaction::producer((0, 10), (0.0, 3.0)).unwrap()]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        graph.enable_transaction(ids[0], &arena[ids[0]]);
        assert!(graph.is_enabled(ids[0]));

        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);
        assert!(delta.abs() < 1e-9);
        assert!(graph.is_enabled(ids[0]));
        assert!(contributions.is_empty());
    }

    #[test]
    fn zero_capacity_partner_is_reached_with_its_partner() {
        let (arena, ids) = setup(&[
            Transaction::consumer((0, 10), (0.0, 0.0)).unwrap(),
            Transaction::consumer((0, 10), (1.0, 2.0)).unwrap(),
        ]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        for &id in &ids {
            graph.enable_transaction(id, &arena[id]);
        }
        graph.enable_at(ids[0], ids[1]);

        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);
        assert!((delta + 2.0).abs() < 1e-9);
        assert_eq!(contributions.get(&ids[0]), Some(&0));
        assert_eq!(contributions.get(&ids[1]), Some(&0));
    }

    #[test]
    fn contraction_after_push_back() {
        let (arena, ids) = setup(&[
            Transaction::producer((0, 10), (1.0, 1.0)).unwrap(),
            Transaction::consumer((0, 10), (1.0, 1.0)).unwrap(),
        ]);
        let mut graph = FlowProfileGraph::new(Level::Lower);
        let mut contributions = HashMap::new();
        for &id in &ids {
            graph.enable_transaction(id, &arena[id]);
        }
        graph.enable_at(ids[0], ids[1]);
        graph.disable_reachable_residual_graph(&arena, &mut contributions, 0);

        graph.push_flow(ids[0]);
        graph.disable(ids[0]);
        graph.restore_flow();
        // The consumer lost its partner and must now be assumed to happen.
        let delta = graph.disable_reachable_residual_graph(&arena, &mut contributions, 10);
        assert!((delta + 1.0).abs() < 1e-9);
        assert_eq!(contributions.get(&ids[1]), Some(&10));
    }

    #[test]
    #[should_panic(expected = "is not pending")]
    fn disabling_unknown_transaction_panics() {
        let (_, ids) = setup(&[Transaction::producer((0, 10), (1.0, 1.0)).unwrap()]);
        FlowProfileGraph::new(Level::Upper).disable(ids[0]);
    }
}
