//! Directed graph with per-node and per-edge enable flags.
//!
//! Nodes are identified by a caller-chosen key. Storage is index based: node
//! and edge ids stay valid until [`Graph::clear`], and removing a node only
//! retires its slot, so solvers can keep per-id arrays alongside the graph.

use std::collections::HashMap;
use std::hash::Hash;

/// Index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the graph's storage.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Index of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(usize);

impl EdgeId {
    /// Position of the edge in the graph's storage.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node and its adjacency.
#[derive(Debug, Clone)]
pub struct Node<K> {
    key: K,
    enabled: bool,
    removed: bool,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

impl<K: Copy> Node<K> {
    /// Key the node was created with.
    pub const fn key(&self) -> K {
        self.key
    }

    /// Own enable flag.
    pub const fn is_enabled(&self) -> bool {
        self.enabled && !self.removed
    }

    /// Edges leaving the node.
    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    /// Edges entering the node.
    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }
}

/// A directed edge with a capacity.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    from: NodeId,
    to: NodeId,
    capacity: f64,
    enabled: bool,
    removed: bool,
    reverse: Option<EdgeId>,
}

impl Edge {
    /// Tail of the edge.
    pub const fn source(&self) -> NodeId {
        self.from
    }

    /// Head of the edge.
    pub const fn target(&self) -> NodeId {
        self.to
    }

    /// Capacity; `f64::INFINITY` for unbounded edges.
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    /// The edge running the other way between the same nodes, if present.
    pub const fn reverse(&self) -> Option<EdgeId> {
        self.reverse
    }
}

/// Directed graph keyed by `K`.
#[derive(Debug, Clone)]
pub struct Graph<K> {
    nodes: Vec<Node<K>>,
    edges: Vec<Edge>,
    index: HashMap<K, NodeId>,
    edge_index: HashMap<(NodeId, NodeId), EdgeId>,
}

impl<K: Copy + Eq + Hash> Default for Graph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> Graph<K> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
            edge_index: HashMap::new(),
        }
    }

    /// Creates an enabled node for `key`, or re-enables the existing one.
    pub fn create_node(&mut self, key: K) -> NodeId {
        if let Some(&id) = self.index.get(&key) {
            self.nodes[id.0].enabled = true;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            key,
            enabled: true,
            removed: false,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.index.insert(key, id);
        id
    }

    /// Looks up the node for `key`.
    pub fn node(&self, key: K) -> Option<NodeId> {
        self.index.get(&key).copied()
    }

    /// Key of a node.
    pub fn key(&self, node: NodeId) -> K {
        self.nodes[node.0].key
    }

    /// Retires the node for `key` together with its edges.
    ///
    /// Returns false if no such node exists.
    pub fn remove_node(&mut self, key: K) -> bool {
        let Some(id) = self.index.remove(&key) else {
            return false;
        };
        let incident: Vec<EdgeId> = self.nodes[id.0]
            .out_edges
            .iter()
            .chain(self.nodes[id.0].in_edges.iter())
            .copied()
            .collect();
        for edge in incident {
            self.detach_edge(edge);
        }
        let node = &mut self.nodes[id.0];
        node.removed = true;
        node.enabled = false;
        true
    }

    /// Creates an enabled edge, or re-enables and re-weights the existing one
    /// between the same nodes. The reverse links are filled in when both
    /// directions exist.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint has been removed.
    pub fn create_edge(&mut self, from: NodeId, to: NodeId, capacity: f64) -> EdgeId {
        assert!(
            !self.nodes[from.0].removed && !self.nodes[to.0].removed,
            "edge endpoint was removed from the graph"
        );
        if let Some(&id) = self.edge_index.get(&(from, to)) {
            self.edges[id.0].enabled = true;
            self.edges[id.0].capacity = capacity;
            return id;
        }
        let id = EdgeId(self.edges.len());
        let reverse = self.edge_index.get(&(to, from)).copied();
        self.edges.push(Edge {
            from,
            to,
            capacity,
            enabled: true,
            removed: false,
            reverse,
        });
        if let Some(reverse) = reverse {
            self.edges[reverse.0].reverse = Some(id);
        }
        self.edge_index.insert((from, to), id);
        self.nodes[from.0].out_edges.push(id);
        self.nodes[to.0].in_edges.push(id);
        id
    }

    /// Creates `from -> to` and, if it does not exist yet, a zero-capacity
    /// edge back so the pair can carry skew-symmetric flow.
    pub fn create_edge_with_reverse(&mut self, from: NodeId, to: NodeId, capacity: f64) -> EdgeId {
        let edge = self.create_edge(from, to, capacity);
        match self.edge(to, from) {
            Some(reverse) => self.set_edge_enabled(reverse, true),
            None => {
                self.create_edge(to, from, 0.0);
            }
        }
        edge
    }

    /// Looks up the edge from `from` to `to`.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edge_index.get(&(from, to)).copied()
    }

    /// Edge data.
    pub fn edge_data(&self, edge: EdgeId) -> &Edge {
        &self.edges[edge.0]
    }

    /// Node data.
    pub fn node_data(&self, node: NodeId) -> &Node<K> {
        &self.nodes[node.0]
    }

    /// Removes an edge. Returns false if it was already gone.
    pub fn remove_edge(&mut self, edge: EdgeId) -> bool {
        if self.edges[edge.0].removed {
            return false;
        }
        self.detach_edge(edge);
        true
    }

    fn detach_edge(&mut self, edge: EdgeId) {
        let Edge {
            from, to, reverse, ..
        } = self.edges[edge.0];
        self.edges[edge.0].removed = true;
        self.edges[edge.0].enabled = false;
        self.edges[edge.0].reverse = None;
        if let Some(reverse) = reverse {
            self.edges[reverse.0].reverse = None;
        }
        self.edge_index.remove(&(from, to));
        self.nodes[from.0].out_edges.retain(|&e| e != edge);
        self.nodes[to.0].in_edges.retain(|&e| e != edge);
    }

    /// Sets a node's own enable flag. Removed nodes stay disabled.
    pub fn set_node_enabled(&mut self, node: NodeId, enabled: bool) {
        let node = &mut self.nodes[node.0];
        node.enabled = enabled && !node.removed;
    }

    /// Sets an edge's own enable flag. Removed edges stay disabled.
    pub fn set_edge_enabled(&mut self, edge: EdgeId, enabled: bool) {
        let edge = &mut self.edges[edge.0];
        edge.enabled = enabled && !edge.removed;
    }

    /// Returns true if the node is enabled.
    pub fn is_node_enabled(&self, node: NodeId) -> bool {
        self.nodes[node.0].is_enabled()
    }

    /// Returns true if the edge and both of its endpoints are enabled.
    pub fn is_edge_enabled(&self, edge: EdgeId) -> bool {
        let edge = &self.edges[edge.0];
        edge.enabled && self.is_node_enabled(edge.from) && self.is_node_enabled(edge.to)
    }

    /// Edges leaving `node`, enabled or not.
    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node.0].out_edges
    }

    /// Edges entering `node`, enabled or not.
    pub fn in_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node.0].in_edges
    }

    /// Ids of nodes that have not been removed.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.removed)
            .map(|(index, _)| NodeId(index))
    }

    /// Ids of enabled nodes.
    pub fn enabled_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_enabled())
            .map(|(index, _)| NodeId(index))
    }

    /// Number of enabled nodes.
    pub fn enabled_node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_enabled()).count()
    }

    /// Size of the node storage, including retired slots.
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Size of the edge storage, including retired slots.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drops every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.index.clear();
        self.edge_index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_node_reuses_key() {
        let mut graph = Graph::new();
        let a = graph.create_node('a');
        graph.set_node_enabled(a, false);
        assert!(!graph.is_node_enabled(a));

        assert_eq!(graph.create_node('a'), a);
        assert!(graph.is_node_enabled(a));
        assert_eq!(graph.key(a), 'a');
    }

    #[test]
    fn reverse_edges_are_linked() {
        let mut graph = Graph::new();
        let a = graph.create_node('a');
        let b = graph.create_node('b');
        let ab = graph.create_edge(a, b, 3.0);
        assert_eq!(graph.edge_data(ab).reverse(), None);

        let ba = graph.create_edge(b, a, 0.0);
        assert_eq!(graph.edge_data(ab).reverse(), Some(ba));
        assert_eq!(graph.edge_data(ba).reverse(), Some(ab));
        assert_eq!(graph.create_edge(a, b, 3.0), ab);
    }

    #[test]
    fn paired_creation_keeps_existing_reverse_capacity() {
        let mut graph = Graph::new();
        let a = graph.create_node('a');
        let b = graph.create_node('b');
        let ba = graph.create_edge(b, a, f64::INFINITY);
        let ab = graph.create_edge_with_reverse(a, b, 0.0);

        assert_eq!(graph.edge_data(ab).reverse(), Some(ba));
        assert!(graph.edge_data(ba).capacity().is_infinite());

        let c = graph.create_node('c');
        let ac = graph.create_edge_with_reverse(a, c, 2.0);
        let ca = graph.edge(c, a).unwrap();
        assert_eq!(graph.edge_data(ac).reverse(), Some(ca));
        assert!(graph.edge_data(ca).capacity().abs() < f64::EPSILON);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn edge_enabled_requires_both_endpoints() {
        let mut graph = Graph::new();
        let a = graph.create_node('a');
        let b = graph.create_node('b');
        let ab = graph.create_edge(a, b, 1.0);
        assert!(graph.is_edge_enabled(ab));

        graph.set_node_enabled(b, false);
        assert!(!graph.is_edge_enabled(ab));

        graph.set_node_enabled(b, true);
        graph.set_edge_enabled(ab, false);
        assert!(!graph.is_edge_enabled(ab));
    }

    #[test]
    fn remove_node_detaches_edges() {
        let mut graph = Graph::new();
        let a = graph.create_node('a');
        let b = graph.create_node('b');
        let c = graph.create_node('c');
        let ab = graph.create_edge(a, b, 1.0);
        graph.create_edge(b, c, 1.0);

        assert!(graph.remove_node('b'));
        assert!(!graph.remove_node('b'));
        assert_eq!(graph.node('b'), None);
        assert!(graph.out_edges(a).is_empty());
        assert!(graph.in_edges(c).is_empty());
        assert!(!graph.is_edge_enabled(ab));
        assert_eq!(graph.enabled_node_count(), 2);
        assert_eq!(graph.nodes().count(), 2);
    }

    #[test]
    fn removing_an_edge_unlinks_its_reverse() {
        let mut graph = Graph::new();
        let a = graph.create_node(1_u32);
        let b = graph.create_node(2_u32);
        let ab = graph.create_edge(a, b, 1.0);
        let ba = graph.create_edge(b, a, 0.0);

        assert!(graph.remove_edge(ab));
        assert!(!graph.remove_edge(ab));
        assert_eq!(graph.edge_data(ba).reverse(), None);
        assert_eq!(graph.edge(a, b), None);
    }
}
