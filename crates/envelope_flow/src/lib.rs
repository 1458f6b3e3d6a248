//! Flow graph substrate for the resource envelope engine.
//!
//! This crate provides:
//! - [`Graph`]: a keyed directed graph whose nodes and edges can be switched
//!   off without being removed
//! - [`MaxFlow`]: push-relabel maximum flow that can withdraw a node from an
//!   existing flow and resume from the resulting preflow
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_flow::{Graph, MaxFlow};
//!
//! let mut graph = Graph::new();
//! let s = graph.create_node("s");
//! let t = graph.create_node("t");
//! graph.create_edge_with_reverse(s, t, 4.0);
//!
//! let mut solver = MaxFlow::new(s, t);
//! assert_eq!(solver.execute(&graph, true), 4.0);
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod graph;
pub mod max_flow;

pub use graph::{Edge, EdgeId, Graph, Node, NodeId};
pub use max_flow::{MaxFlow, EPSILON};
