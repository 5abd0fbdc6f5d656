//! Breadth-first and depth-first orderings.
//!
//! The breadth-first walk drives the scheduler's readiness sweep; the
//! postorder variants feed dominator computation and SSA renaming. All walks
//! only reach nodes reachable from `start` and return nothing for an
//! out-of-range start node.

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Successors};

/// Iterator performing a breadth-first walk from a start node.
///
/// Each reachable node is yielded exactly once; successors are enqueued in
/// the order the graph reports them.
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<NodeId>,
    visited: Vec<bool>,
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        for succ in self.graph.successors(node) {
            if let Some(seen) = self.visited.get_mut(succ.index()) {
                if !*seen {
                    *seen = true;
                    self.queue.push_back(succ);
                }
            }
        }
        Some(node)
    }
}

/// Returns a breadth-first iterator starting at `start`.
///
/// # Examples
///
/// ```rust
/// use adfa::utils::graph::{algorithms::bfs, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// let c = graph.add_node(());
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(b, c, ())?;
/// graph.add_edge(a, c, ())?;
///
/// assert_eq!(bfs(&graph, a).collect::<Vec<_>>(), vec![a, b, c]);
/// # Ok::<(), adfa::Error>(())
/// ```
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    if let Some(seen) = visited.get_mut(start.index()) {
        *seen = true;
        queue.push_back(start);
    }

    BfsIterator {
        graph,
        queue,
        visited,
    }
}

/// Computes the depth-first postorder of the nodes reachable from `start`.
///
/// Uses an explicit stack, so deep graphs do not exhaust the call stack.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);
    // (node, successors, next successor to explore)
    let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();

    visited[start.index()] = true;
    stack.push((start, graph.successors(start).collect(), 0));

    while let Some((node, succs, cursor)) = stack.last_mut() {
        if let Some(&next) = succs.get(*cursor) {
            *cursor += 1;
            if next.index() < node_count && !visited[next.index()] {
                visited[next.index()] = true;
                let next_succs = graph.successors(next).collect();
                stack.push((next, next_succs, 0));
            }
        } else {
            order.push(*node);
            stack.pop();
        }
    }

    order
}

/// Computes the reverse postorder of the nodes reachable from `start`.
///
/// In an acyclic region every node appears after all of its predecessors,
/// which is the iteration order dominator and data-flow algorithms want.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{utils::graph::DirectedGraph, Result};

    fn diamond() -> Result<(DirectedGraph<(), ()>, [NodeId; 4])> {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        let d = graph.add_node(());
        graph.add_edge(a, b, ())?;
        graph.add_edge(a, c, ())?;
        graph.add_edge(b, d, ())?;
        graph.add_edge(c, d, ())?;
        Ok((graph, [a, b, c, d]))
    }

    #[test]
    fn test_bfs_visits_by_distance() -> Result<()> {
        let (graph, [a, b, c, d]) = diamond()?;
        assert_eq!(bfs(&graph, a).collect::<Vec<_>>(), vec![a, b, c, d]);
        Ok(())
    }

    #[test]
    fn test_bfs_invalid_start_is_empty() -> Result<()> {
        let (graph, _) = diamond()?;
        assert_eq!(bfs(&graph, NodeId::new(99)).count(), 0);
        Ok(())
    }

    #[test]
    fn test_postorder_diamond() -> Result<()> {
        let (graph, [a, b, c, d]) = diamond()?;
        assert_eq!(postorder(&graph, a), vec![d, b, c, a]);
        assert_eq!(reverse_postorder(&graph, a), vec![a, c, b, d]);
        Ok(())
    }

    #[test]
    fn test_postorder_with_cycle_and_unreachable() -> Result<()> {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let _unreachable = graph.add_node(());
        graph.add_edge(a, b, ())?;
        graph.add_edge(b, a, ())?;

        assert_eq!(postorder(&graph, a), vec![b, a]);
        Ok(())
    }
}
