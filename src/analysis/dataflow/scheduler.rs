//! Backedge-aware block ordering.
//!
//! A block becomes ready once every predecessor reached through a forward
//! edge has been visited; backedges are ignored, so loop headers do not wait
//! for their own latches. When the ready queue drains it is refilled by a
//! breadth-first sweep from the entry. If the sweep finds nothing while
//! blocks are still pending (irreducible control flow), the first visited
//! block with an unvisited successor forces that successor in. Forced blocks
//! are counted, see [`Scheduler::fallback_count`].

use std::collections::VecDeque;

use log::debug;

use crate::{
    analysis::cfg::Function,
    utils::graph::{algorithms::bfs, NodeId},
};

/// Scheduling state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStatus {
    /// Not yet considered
    Unvisited,
    /// Queued for analysis
    Ready,
    /// Handed out by [`Scheduler::next_block`]
    Visited,
}

/// Work-list over the blocks of one [`Function`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    status: Vec<BlockStatus>,
    ready: VecDeque<NodeId>,
    order: Vec<NodeId>,
    fallbacks: usize,
}

impl Scheduler {
    /// Creates a scheduler with the entry block queued and every other block unvisited.
    #[must_use]
    pub fn new(function: &Function) -> Self {
        let mut status = vec![BlockStatus::Unvisited; function.block_count()];
        let mut ready = VecDeque::new();

        let entry = function.entry();
        if let Some(slot) = status.get_mut(entry.index()) {
            *slot = BlockStatus::Ready;
            ready.push_back(entry);
        }

        Scheduler {
            status,
            ready,
            order: Vec::with_capacity(function.block_count()),
            fallbacks: 0,
        }
    }

    /// Returns the next block to analyze and marks it visited, or `None`
    /// once no further block can be reached.
    pub fn next_block(&mut self, function: &Function) -> Option<NodeId> {
        if self.ready.is_empty() {
            self.refill(function);
            if self.ready.is_empty() && self.has_pending(function) {
                self.force_successor(function);
            }
        }

        let block = self.ready.pop_front()?;
        self.status[block.index()] = BlockStatus::Visited;
        self.order.push(block);
        Some(block)
    }

    /// Returns the status of `block`.
    #[must_use]
    pub fn status(&self, block: NodeId) -> Option<BlockStatus> {
        self.status.get(block.index()).copied()
    }

    /// Returns `true` if `block` has been handed out.
    #[must_use]
    pub fn is_visited(&self, block: NodeId) -> bool {
        self.status(block) == Some(BlockStatus::Visited)
    }

    /// Returns the blocks in the order they were handed out.
    #[must_use]
    pub fn visit_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns how many blocks were forced in ahead of their predecessors.
    ///
    /// Zero means every block was visited after all of its forward predecessors.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    fn is_ready(&self, function: &Function, block: NodeId) -> bool {
        function.predecessors(block).all(|pred| {
            self.status[pred.index()] == BlockStatus::Visited || function.is_backedge(pred, block)
        })
    }

    fn refill(&mut self, function: &Function) {
        let candidates: Vec<NodeId> = bfs(function, function.entry())
            .filter(|block| self.status[block.index()] == BlockStatus::Unvisited)
            .filter(|block| self.is_ready(function, *block))
            .collect();

        if !candidates.is_empty() {
            debug!("{}: {} block(s) ready", function.name(), candidates.len());
        }
        for block in candidates {
            self.status[block.index()] = BlockStatus::Ready;
            self.ready.push_back(block);
        }
    }

    fn has_pending(&self, function: &Function) -> bool {
        function
            .blocks()
            .iter()
            .any(|block| !block.padding && self.status[block.id.index()] == BlockStatus::Unvisited)
    }

    fn force_successor(&mut self, function: &Function) {
        let forced = function
            .blocks()
            .iter()
            .filter(|block| !block.padding && self.status[block.id.index()] == BlockStatus::Visited)
            .find_map(|block| {
                function
                    .successors(block.id)
                    .find(|succ| self.status[succ.index()] == BlockStatus::Unvisited)
            });

        if let Some(block) = forced {
            debug!(
                "{}: no block ready, forcing {} ahead of its predecessors",
                function.name(),
                block
            );
            self.status[block.index()] = BlockStatus::Ready;
            self.ready.push_back(block);
            self.fallbacks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test as factories, Result};

    fn drain(function: &Function) -> Scheduler {
        let mut scheduler = Scheduler::new(function);
        while scheduler.next_block(function).is_some() {}
        scheduler
    }

    #[test]
    fn test_straight_line_order() -> Result<()> {
        let function = factories::straight_line()?;
        let scheduler = drain(&function);

        assert_eq!(
            scheduler.visit_order(),
            &[NodeId::new(0), NodeId::new(1), NodeId::new(2)]
        );
        assert_eq!(scheduler.fallback_count(), 0);
        Ok(())
    }

    #[test]
    fn test_self_loop_visited_once() -> Result<()> {
        let function = factories::self_loop()?;
        let mut scheduler = Scheduler::new(&function);

        assert_eq!(scheduler.status(NodeId::new(0)), Some(BlockStatus::Ready));
        assert_eq!(scheduler.next_block(&function), Some(NodeId::new(0)));
        assert_eq!(scheduler.next_block(&function), None);
        assert_eq!(scheduler.visit_order().len(), 1);
        assert_eq!(scheduler.fallback_count(), 0);
        Ok(())
    }

    #[test]
    fn test_join_waits_for_both_arms() -> Result<()> {
        let function = factories::diamond_redefining(crate::arch::x86::RAX)?;
        let scheduler = drain(&function);
        let order = scheduler.visit_order();

        assert_eq!(order.len(), 4);
        assert_eq!(order[0], NodeId::new(0));
        assert_eq!(order[3], NodeId::new(3));
        assert_eq!(scheduler.fallback_count(), 0);
        Ok(())
    }

    #[test]
    fn test_nested_loops_respect_forward_edges() -> Result<()> {
        let function = factories::nested_loops()?;
        let scheduler = drain(&function);
        let order = scheduler.visit_order();

        assert_eq!(order.len(), function.block_count());
        assert_eq!(scheduler.fallback_count(), 0);
        for (position, block) in order.iter().enumerate() {
            for pred in function.predecessors(*block) {
                if !function.is_backedge(pred, *block) {
                    assert!(order[..position].contains(&pred), "{pred} before {block}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_irreducible_uses_fallback() -> Result<()> {
        let function = factories::irreducible()?;
        let scheduler = drain(&function);

        assert_eq!(
            scheduler.visit_order(),
            &[NodeId::new(0), NodeId::new(1), NodeId::new(2)]
        );
        assert_eq!(scheduler.fallback_count(), 1);
        Ok(())
    }

    #[test]
    fn test_unreachable_block_is_never_visited() -> Result<()> {
        let function = factories::with_unreachable_block()?;
        let scheduler = drain(&function);

        assert_eq!(scheduler.visit_order(), &[NodeId::new(0)]);
        assert_eq!(scheduler.status(NodeId::new(1)), Some(BlockStatus::Unvisited));
        assert!(!scheduler.is_visited(NodeId::new(1)));
        Ok(())
    }
}
