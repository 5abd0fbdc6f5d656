//! Graph algorithms written against the traits in [`crate::utils::graph`].
//!
//! - [`bfs`], [`postorder`], [`reverse_postorder`] - traversal orders
//! - [`compute_dominators`] / [`DominatorTree`] - immediate dominators
//! - [`compute_dominance_frontiers`] - join points for phi placement

mod dominators;
mod traversal;

pub use dominators::{compute_dominance_frontiers, compute_dominators, DominatorTree};
pub use traversal::{bfs, postorder, reverse_postorder, BfsIterator};
