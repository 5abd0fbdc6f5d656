//! Trait abstractions the graph algorithms are written against.
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - forward edge traversal
//! - [`Predecessors`] - backward edge traversal
//! - [`RootedGraph`] - graphs with a designated entry node
//!
//! Both [`DirectedGraph`](crate::utils::graph::DirectedGraph) and the
//! control-flow [`Function`](crate::analysis::Function) implement these, so
//! dominators, loop detection and the scheduler's readiness sweep share one
//! set of algorithms.

use crate::utils::graph::NodeId;

/// Core graph properties: how many nodes exist and how to enumerate them.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successors of `node`, in edge insertion order.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessors of `node`, in edge insertion order.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a single distinguished entry node.
///
/// Required by dominator computation and by everything built on top of it.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry (root) node of the graph.
    fn entry(&self) -> NodeId;
}
