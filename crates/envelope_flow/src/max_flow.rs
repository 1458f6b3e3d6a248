//! Push-relabel maximum flow with a relabel-to-front scan list.
//!
//! Flow is stored per edge with skew symmetry: pushing `delta` along an edge
//! subtracts `delta` from its reverse, so the residual arcs of a node are
//! exactly its enabled out-edges. Every edge that can carry flow must have its
//! reverse in the graph (see [`Graph::create_edge_with_reverse`]).
//!
//! Besides full solves the solver supports the incremental pattern the
//! envelope sweep relies on: [`MaxFlow::push_flow_back`] takes a node out of
//! the current flow while leaving a valid preflow behind, and
//! [`MaxFlow::execute`] with `reset = false` resumes from that preflow.

use crate::graph::{EdgeId, Graph, NodeId};
use std::collections::VecDeque;
use std::hash::Hash;
use tracing::{debug, trace};

/// Flows and excesses below this magnitude count as zero.
pub const EPSILON: f64 = 1e-9;

/// Push-relabel solver state for one graph.
#[derive(Debug, Clone)]
pub struct MaxFlow {
    source: NodeId,
    sink: NodeId,
    flows: Vec<f64>,
    excess: Vec<f64>,
    labels: Vec<usize>,
    current: Vec<usize>,
}

impl MaxFlow {
    /// Creates a solver between `source` and `sink`.
    pub const fn new(source: NodeId, sink: NodeId) -> Self {
        Self {
            source,
            sink,
            flows: Vec::new(),
            excess: Vec::new(),
            labels: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Source node.
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Sink node.
    pub const fn sink(&self) -> NodeId {
        self.sink
    }

    /// Flow on an edge.
    pub fn flow(&self, edge: EdgeId) -> f64 {
        self.flows.get(edge.index()).copied().unwrap_or(0.0)
    }

    /// Unused capacity on an edge.
    pub fn residual<K: Copy + Eq + Hash>(&self, graph: &Graph<K>, edge: EdgeId) -> f64 {
        graph.edge_data(edge).capacity() - self.flow(edge)
    }

    /// Excess held by a node.
    pub fn excess(&self, node: NodeId) -> f64 {
        self.excess.get(node.index()).copied().unwrap_or(0.0)
    }

    /// Value of the current flow: the excess collected at the sink.
    pub fn max_flow(&self) -> f64 {
        self.excess(self.sink)
    }

    fn fit<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>) {
        self.flows.resize(graph.edge_count(), 0.0);
        self.excess.resize(graph.node_capacity(), 0.0);
        self.labels.resize(graph.node_capacity(), 0);
        self.current.resize(graph.node_capacity(), 0);
    }

    /// Computes a maximum flow over the enabled part of `graph`.
    ///
    /// With `reset` the solve starts from zero flow. Without it the existing
    /// preflow is kept, which is how work resumes after
    /// [`MaxFlow::push_flow_back`]. Returns the flow value.
    ///
    /// # Panics
    ///
    /// Panics if an edge leaving the source has unbounded capacity or an edge
    /// that must carry flow has no reverse.
    pub fn execute<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, reset: bool) -> f64 {
        self.fit(graph);
        if reset {
            self.flows.iter_mut().for_each(|flow| *flow = 0.0);
            self.excess.iter_mut().for_each(|excess| *excess = 0.0);
        }
        self.current.iter_mut().for_each(|arc| *arc = 0);

        for &edge in graph.out_edges(self.source) {
            if !graph.is_edge_enabled(edge) {
                continue;
            }
            let residual = self.residual(graph, edge);
            if residual > EPSILON {
                assert!(
                    residual.is_finite(),
                    "edge leaving the source has unbounded capacity"
                );
                self.push(graph, edge, residual);
            }
        }

        self.global_relabel(graph);

        let mut list: Vec<NodeId> = graph
            .enabled_nodes()
            .filter(|&node| node != self.source && node != self.sink)
            .collect();

        loop {
            let mut progressed = false;
            let mut position = 0;
            while position < list.len() {
                let node = list[position];
                let before = self.labels[node.index()];
                progressed |= self.discharge(graph, node);
                if self.labels[node.index()] > before {
                    list.remove(position);
                    list.insert(0, node);
                    position = 1;
                } else {
                    position += 1;
                }
            }
            let pending = list
                .iter()
                .any(|node| self.excess[node.index()] > EPSILON);
            if !pending || !progressed {
                break;
            }
        }

        let value = self.max_flow();
        debug!(
            nodes = graph.enabled_node_count(),
            reset,
            value,
            "max flow solved"
        );
        value
    }

    /// Exact labels: distance to the sink in the residual graph, or `n` plus
    /// the distance to the source, or `2n` for nodes that reach neither.
    fn global_relabel<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>) {
        let n = graph.enabled_node_count();
        let mut seen = vec![false; graph.node_capacity()];
        for node in graph.enabled_nodes() {
            self.labels[node.index()] = 2 * n;
        }

        let mut queue = VecDeque::new();
        self.labels[self.sink.index()] = 0;
        self.labels[self.source.index()] = n;
        seen[self.sink.index()] = true;
        seen[self.source.index()] = true;
        queue.push_back(self.sink);
        self.label_backwards(graph, &mut queue, &mut seen);

        queue.push_back(self.source);
        self.label_backwards(graph, &mut queue, &mut seen);
    }

    fn label_backwards<K: Copy + Eq + Hash>(
        &mut self,
        graph: &Graph<K>,
        queue: &mut VecDeque<NodeId>,
        seen: &mut [bool],
    ) {
        while let Some(node) = queue.pop_front() {
            for &edge in graph.in_edges(node) {
                if !graph.is_edge_enabled(edge) || self.residual(graph, edge) <= EPSILON {
                    continue;
                }
                let tail = graph.edge_data(edge).source();
                if seen[tail.index()] {
                    continue;
                }
                seen[tail.index()] = true;
                self.labels[tail.index()] = self.labels[node.index()] + 1;
                queue.push_back(tail);
            }
        }
    }

    /// Pushes and relabels until `node` holds no excess. Returns true if any
    /// push or relabel happened.
    fn discharge<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, node: NodeId) -> bool {
        let mut progressed = false;
        let out_edges = graph.out_edges(node);
        while self.excess[node.index()] > EPSILON {
            let arc = self.current[node.index()];
            let Some(&edge) = out_edges.get(arc) else {
                if !self.relabel(graph, node) {
                    trace!(node = node.index(), "node has no residual arc");
                    break;
                }
                progressed = true;
                self.current[node.index()] = 0;
                continue;
            };
            let head = graph.edge_data(edge).target();
            let residual = self.residual(graph, edge);
            if graph.is_edge_enabled(edge)
                && residual > EPSILON
                && self.labels[node.index()] == self.labels[head.index()] + 1
            {
                let delta = residual.min(self.excess[node.index()]);
                self.push(graph, edge, delta);
                progressed = true;
            } else {
                self.current[node.index()] += 1;
            }
        }
        progressed
    }

    fn relabel<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, node: NodeId) -> bool {
        let lowest = graph
            .out_edges(node)
            .iter()
            .filter(|&&edge| graph.is_edge_enabled(edge) && self.residual(graph, edge) > EPSILON)
            .map(|&edge| self.labels[graph.edge_data(edge).target().index()])
            .min();
        match lowest {
            Some(label) => {
                self.labels[node.index()] = label + 1;
                true
            }
            None => false,
        }
    }

    fn push<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, edge: EdgeId, delta: f64) {
        let data = graph.edge_data(edge);
        let Some(reverse) = data.reverse() else {
            panic!("flow edge {} has no reverse edge", edge.index());
        };
        self.flows[edge.index()] += delta;
        self.flows[reverse.index()] -= delta;
        self.excess[data.source().index()] -= delta;
        self.excess[data.target().index()] += delta;
    }

    /// Withdraws all flow through `node`, leaving a preflow that is valid for
    /// the graph without it.
    ///
    /// Inbound flow goes back to the tail nodes as excess. Outbound flow is
    /// cancelled along positive-flow paths that end at the sink, the source,
    /// a node holding excess, or `node` itself. Returns false if some outbound
    /// flow could not be traced; the caller must then solve from scratch.
    pub fn push_flow_back<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, node: NodeId) -> bool {
        self.fit(graph);

        for &edge in graph.in_edges(node) {
            let flow = self.flows[edge.index()];
            if flow > EPSILON {
                self.push(graph, edge, -flow);
            }
        }

        for &edge in graph.out_edges(node) {
            while self.flows[edge.index()] > EPSILON {
                let Some((path, limit)) = self.flow_path(graph, node, edge) else {
                    debug!(node = node.index(), "push back found no path");
                    return false;
                };
                self.cancel(graph, &path, limit);
            }
        }
        self.excess[node.index()] = 0.0;
        true
    }

    /// Depth-first search along positive-flow edges starting with `first`.
    /// Returns the edges of the path and the amount that can be cancelled.
    fn flow_path<K: Copy + Eq + Hash>(
        &self,
        graph: &Graph<K>,
        origin: NodeId,
        first: EdgeId,
    ) -> Option<(Vec<EdgeId>, f64)> {
        let mut visited = vec![false; graph.node_capacity()];
        visited[origin.index()] = true;
        let mut path = vec![first];
        let mut cursor = vec![0_usize];

        while let Some(&edge) = path.last() {
            let head = graph.edge_data(edge).target();
            let terminal_limit = if head == origin || head == self.sink || head == self.source {
                Some(f64::INFINITY)
            } else if self.excess[head.index()] > EPSILON {
                Some(self.excess[head.index()])
            } else {
                None
            };
            if let Some(limit) = terminal_limit {
                let bottleneck = path
                    .iter()
                    .map(|e| self.flows[e.index()])
                    .fold(limit, f64::min);
                return Some((path, bottleneck));
            }
            visited[head.index()] = true;

            let outs = graph.out_edges(head);
            let depth = cursor.len() - 1;
            let mut next = None;
            while cursor[depth] < outs.len() {
                let candidate = outs[cursor[depth]];
                cursor[depth] += 1;
                let target = graph.edge_data(candidate).target();
                if self.flows[candidate.index()] > EPSILON
                    && (!visited[target.index()] || target == origin)
                {
                    next = Some(candidate);
                    break;
                }
            }
            match next {
                Some(candidate) => {
                    path.push(candidate);
                    cursor.push(0);
                }
                None => {
                    path.pop();
                    cursor.pop();
                }
            }
        }
        None
    }

    /// Interior nodes of the path stay balanced. The origin gains `amount`
    /// and the end node loses it, so a cycle back to the origin is neutral.
    fn cancel<K: Copy + Eq + Hash>(&mut self, graph: &Graph<K>, path: &[EdgeId], amount: f64) {
        for &edge in path {
            self.push(graph, edge, -amount);
        }
        trace!(edges = path.len(), amount, "cancelled flow path");
    }
}
