//! Node identifiers for directed graphs.
//!
//! [`NodeId`] is the handle every graph algorithm in this crate speaks. In a
//! control-flow graph the node index doubles as the basic-block id, so
//! per-block side tables (visited flags, SSA blocks, loop membership) can be
//! plain vectors indexed by [`NodeId::index`].

use std::fmt;

/// A strongly-typed identifier for a node within a directed graph.
///
/// Node IDs are assigned sequentially from 0 as nodes are added to a
/// [`DirectedGraph`](crate::utils::graph::DirectedGraph).
///
/// # Examples
///
/// ```rust
/// use adfa::utils::graph::{DirectedGraph, NodeId};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
///
/// assert_eq!(a, NodeId::new(0));
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// # Arguments
    ///
    /// * `index` - The raw node index (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this node identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_id_formatting() {
        let node = NodeId::new(7);
        assert_eq!(format!("{node}"), "n7");
        assert_eq!(format!("{node:?}"), "NodeId(7)");
    }

    #[test]
    fn test_node_id_conversions() {
        let node: NodeId = 3usize.into();
        assert_eq!(node.index(), 3);
        assert_eq!(usize::from(node), 3);
    }

    #[test]
    fn test_node_id_ordering_and_hash() {
        assert!(NodeId::new(1) < NodeId::new(2));

        let set: HashSet<NodeId> = [NodeId::new(1), NodeId::new(1), NodeId::new(4)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
