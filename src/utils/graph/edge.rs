//! Edge identifiers and edge storage for directed graphs.

use std::fmt;

use crate::utils::graph::NodeId;

/// A strongly-typed identifier for an edge within a directed graph.
///
/// Edge IDs are assigned sequentially from 0 in insertion order, which is
/// also the order in which [`DirectedGraph::successors`](crate::utils::graph::DirectedGraph::successors)
/// and [`DirectedGraph::predecessors`](crate::utils::graph::DirectedGraph::predecessors)
/// report neighbours.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Creates a new `EdgeId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        EdgeId(index)
    }

    /// Returns the raw index value of this edge identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A stored edge: endpoints plus the user payload.
#[derive(Debug, Clone)]
pub struct EdgeData<E> {
    pub(crate) source: NodeId,
    pub(crate) target: NodeId,
    pub(crate) data: E,
}

impl<E> EdgeData<E> {
    /// Returns the node this edge leaves.
    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Returns the node this edge enters.
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Returns the payload attached to this edge.
    #[must_use]
    pub fn data(&self) -> &E {
        &self.data
    }
}
