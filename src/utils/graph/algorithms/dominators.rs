//! Dominator trees and dominance frontiers.
//!
//! A node `d` dominates `n` if every path from the entry to `n` passes
//! through `d`. The immediate dominator of `n` is its closest strict
//! dominator; linking every node to it yields the dominator tree.
//!
//! The tree is computed with the iterative algorithm of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm"), which converges in a
//! handful of passes over the reverse postorder on function-sized graphs.
//! Nodes unreachable from the entry have no dominator and are not dominated
//! by anything but themselves.

use rustc_hash::FxHashSet;

use crate::utils::graph::{algorithms::reverse_postorder, NodeId, Predecessors, Successors};

/// Result of dominator computation for a rooted graph.
///
/// # Examples
///
/// ```rust
/// use adfa::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let entry = graph.add_node(());
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(a, b, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// # Ok::<(), adfa::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    /// Immediate dominator per node; the entry maps to itself, unreachable nodes to `None`
    idom: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
}

impl DominatorTree {
    /// Returns the root of the tree.
    #[must_use]
    #[inline]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`.
    ///
    /// `None` for the entry, for unreachable nodes and for out-of-range ids.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        matches!(self.idom.get(node.index()), Some(Some(_)))
    }

    /// Returns `true` if `a` dominates `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        while let Some(parent) = self.immediate_dominator(current) {
            if parent == a {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    #[inline]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the nodes immediately dominated by `node`, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the depth of `node` in the tree (the entry has depth 0).
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.immediate_dominator(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Returns the number of nodes covered by the tree, reachable or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Computes the dominator tree of `graph` rooted at `entry`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `entry` - The root node
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let rpo = reverse_postorder(graph, entry);

    let mut rpo_number: Vec<Option<usize>> = vec![None; node_count];
    for (number, node) in rpo.iter().enumerate() {
        rpo_number[node.index()] = Some(number);
    }

    let mut idom: Vec<Option<NodeId>> = vec![None; node_count];
    if entry.index() < node_count {
        idom[entry.index()] = Some(entry);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &node in rpo.iter().skip(1) {
            let mut new_idom: Option<NodeId> = None;
            for pred in graph.predecessors(node) {
                if idom.get(pred.index()).copied().flatten().is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred,
                    Some(current) => intersect(&idom, &rpo_number, pred, current),
                });
            }
            if new_idom.is_some() && idom[node.index()] != new_idom {
                idom[node.index()] = new_idom;
                changed = true;
            }
        }
    }

    let mut children = vec![Vec::new(); node_count];
    for (index, parent) in idom.iter().enumerate() {
        if let Some(parent) = parent {
            if parent.index() != index {
                children[parent.index()].push(NodeId::new(index));
            }
        }
    }

    DominatorTree {
        entry,
        idom,
        children,
    }
}

fn intersect(
    idom: &[Option<NodeId>],
    rpo_number: &[Option<usize>],
    mut a: NodeId,
    mut b: NodeId,
) -> NodeId {
    let number = |n: NodeId| rpo_number[n.index()].unwrap_or(usize::MAX);
    while a != b {
        while number(a) > number(b) {
            match idom[a.index()] {
                Some(parent) if parent != a => a = parent,
                _ => return b,
            }
        }
        while number(b) > number(a) {
            match idom[b.index()] {
                Some(parent) if parent != b => b = parent,
                _ => return a,
            }
        }
    }
    a
}

/// Computes the dominance frontier of every node.
///
/// `DF(n)` holds the nodes where `n`'s dominance ends: `m` is in `DF(n)` if
/// `n` dominates a predecessor of `m` but does not strictly dominate `m`.
/// The entry is treated as having an extra incoming edge from outside the
/// graph, so an entry block that is also a loop target lands in its own
/// frontier. Unreachable nodes have empty frontiers.
pub fn compute_dominance_frontiers<G>(graph: &G, tree: &DominatorTree) -> Vec<FxHashSet<NodeId>>
where
    G: Successors + Predecessors,
{
    let mut frontiers = vec![FxHashSet::default(); graph.node_count()];

    for node in graph.node_ids() {
        if !tree.is_reachable(node) {
            continue;
        }
        let stop = tree.immediate_dominator(node);
        for pred in graph.predecessors(node) {
            if !tree.is_reachable(pred) {
                continue;
            }
            let mut runner = pred;
            loop {
                if Some(runner) == stop {
                    break;
                }
                frontiers[runner.index()].insert(node);
                match tree.immediate_dominator(runner) {
                    Some(parent) => runner = parent,
                    None => break,
                }
            }
        }
    }

    frontiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{utils::graph::DirectedGraph, Result};

    fn graph_with(count: usize, edges: &[(usize, usize)]) -> Result<DirectedGraph<(), ()>> {
        let mut graph = DirectedGraph::new();
        for _ in 0..count {
            graph.add_node(());
        }
        for &(src, dst) in edges {
            graph.add_edge(NodeId::new(src), NodeId::new(dst), ())?;
        }
        Ok(graph)
    }

    #[test]
    fn test_diamond_dominators() -> Result<()> {
        let graph = graph_with(4, &[(0, 1), (0, 2), (1, 3), (2, 3)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));

        assert_eq!(tree.immediate_dominator(NodeId::new(0)), None);
        assert_eq!(tree.immediate_dominator(NodeId::new(3)), Some(NodeId::new(0)));
        assert!(tree.dominates(NodeId::new(0), NodeId::new(3)));
        assert!(!tree.dominates(NodeId::new(1), NodeId::new(3)));
        assert_eq!(
            tree.children(NodeId::new(0)),
            &[NodeId::new(1), NodeId::new(2), NodeId::new(3)]
        );
        assert_eq!(tree.depth(NodeId::new(3)), 1);
        Ok(())
    }

    #[test]
    fn test_loop_dominators() -> Result<()> {
        // 0 -> 1 -> 2 -> 1, 1 -> 3
        let graph = graph_with(4, &[(0, 1), (1, 2), (2, 1), (1, 3)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));

        assert_eq!(tree.immediate_dominator(NodeId::new(2)), Some(NodeId::new(1)));
        assert_eq!(tree.immediate_dominator(NodeId::new(3)), Some(NodeId::new(1)));
        assert!(tree.strictly_dominates(NodeId::new(1), NodeId::new(2)));
        assert!(!tree.strictly_dominates(NodeId::new(1), NodeId::new(1)));
        Ok(())
    }

    #[test]
    fn test_unreachable_nodes() -> Result<()> {
        let graph = graph_with(3, &[(0, 1), (2, 1)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));

        assert!(!tree.is_reachable(NodeId::new(2)));
        assert_eq!(tree.immediate_dominator(NodeId::new(1)), Some(NodeId::new(0)));
        assert!(!tree.dominates(NodeId::new(2), NodeId::new(1)));
        Ok(())
    }

    #[test]
    fn test_dominance_frontiers() -> Result<()> {
        let graph = graph_with(4, &[(0, 1), (0, 2), (1, 3), (2, 3)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));
        let df = compute_dominance_frontiers(&graph, &tree);

        assert!(df[0].is_empty());
        assert!(df[1].contains(&NodeId::new(3)));
        assert!(df[2].contains(&NodeId::new(3)));
        assert!(df[3].is_empty());
        Ok(())
    }

    #[test]
    fn test_self_loop_entry_in_own_frontier() -> Result<()> {
        let graph = graph_with(1, &[(0, 0)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));
        let df = compute_dominance_frontiers(&graph, &tree);

        assert!(df[0].contains(&NodeId::new(0)));
        Ok(())
    }

    #[test]
    fn test_loop_header_frontier() -> Result<()> {
        let graph = graph_with(4, &[(0, 1), (1, 2), (2, 1), (1, 3)])?;
        let tree = compute_dominators(&graph, NodeId::new(0));
        let df = compute_dominance_frontiers(&graph, &tree);

        assert!(df[2].contains(&NodeId::new(1)));
        assert!(df[1].contains(&NodeId::new(1)));
        Ok(())
    }
}
