//! Generic directed-graph infrastructure.
//!
//! The control-flow graph, dominator tree, loop forest and the data-flow
//! scheduler are all built on the pieces in this module:
//!
//! - [`NodeId`] / [`EdgeId`] - strongly-typed indices
//! - [`DirectedGraph`] - adjacency-list storage with node and edge payloads
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - the
//!   traits algorithms are written against
//! - [`algorithms`] - traversal orders, dominators, dominance frontiers

pub mod algorithms;

mod directed;
mod edge;
mod node;
mod traits;

pub use directed::DirectedGraph;
pub use edge::{EdgeData, EdgeId};
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
