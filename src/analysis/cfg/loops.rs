//! Natural loop detection.
//!
//! A back edge is an edge `latch -> header` whose target dominates its
//! source. Every back edge defines a natural loop: the header plus all
//! blocks that reach the latch without passing through the header. Back
//! edges sharing a header are merged into one loop.
//!
//! Loops are nested by body containment and numbered in ascending header
//! order, so loop ids are stable for a given graph.
//!
//! Irreducible regions (cycles without a dominating header) produce no loop;
//! the data-flow scheduler handles them with its fallback strategy instead.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::utils::graph::{
    algorithms::DominatorTree, GraphBase, NodeId, Predecessors, Successors,
};

/// One natural loop.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    /// Position of this loop in its [`LoopForest`]
    pub id: usize,
    /// Block that dominates the whole body
    pub header: NodeId,
    /// Blocks through which the loop is entered; `[header]` for natural loops
    pub entries: Vec<NodeId>,
    /// Sources of the back edges
    pub latches: Vec<NodeId>,
    /// All blocks of the loop, header included
    pub body: BTreeSet<NodeId>,
    /// Smallest enclosing loop
    pub parent: Option<usize>,
    /// Directly nested loops
    pub children: Vec<usize>,
    /// Nesting depth, 0 for outermost loops
    pub depth: usize,
}

impl LoopInfo {
    fn new(header: NodeId) -> Self {
        LoopInfo {
            id: 0,
            header,
            entries: vec![header],
            latches: Vec::new(),
            body: BTreeSet::from([header]),
            parent: None,
            children: Vec::new(),
            depth: 0,
        }
    }

    /// Returns `true` if `block` belongs to the loop body.
    #[must_use]
    pub fn contains(&self, block: NodeId) -> bool {
        self.body.contains(&block)
    }

    /// Returns the blocks through which the loop is entered.
    #[must_use]
    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    /// Returns `true` if `block` is one of the loop entries.
    #[must_use]
    pub fn is_entry(&self, block: NodeId) -> bool {
        self.entries.contains(&block)
    }

    /// Returns `true` if no other loop is nested in this one.
    #[must_use]
    pub fn is_innermost(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the number of blocks in the body.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// All loops of a function with block membership lookups.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: Vec<LoopInfo>,
    /// Innermost loop per block
    block_to_loop: Vec<Option<usize>>,
}

impl LoopForest {
    /// Returns all loops ordered by id.
    #[must_use]
    pub fn loops(&self) -> &[LoopInfo] {
        &self.loops
    }

    /// Returns the loop with the given id.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&LoopInfo> {
        self.loops.get(id)
    }

    /// Returns the number of loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns `true` if the function has no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the most deeply nested loop containing `block`.
    #[must_use]
    pub fn innermost_loop(&self, block: NodeId) -> Option<&LoopInfo> {
        self.block_to_loop
            .get(block.index())
            .copied()
            .flatten()
            .map(|id| &self.loops[id])
    }

    /// Iterates `id` and its enclosing loops, innermost first.
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &LoopInfo> + '_ {
        std::iter::successors(self.loops.get(id), move |current| {
            current.parent.and_then(|parent| self.loops.get(parent))
        })
    }

    /// Iterates the loops that contain no nested loop.
    pub fn innermost_loops(&self) -> impl Iterator<Item = &LoopInfo> + '_ {
        self.loops.iter().filter(|l| l.is_innermost())
    }

    /// Returns how many loops enclose `block`.
    #[must_use]
    pub fn loop_depth(&self, block: NodeId) -> usize {
        self.innermost_loop(block).map_or(0, |l| l.depth + 1)
    }
}

/// Finds all natural loops of `graph`.
///
/// # Arguments
///
/// * `graph` - The control-flow graph
/// * `dominators` - Its dominator tree
#[must_use]
pub fn detect_loops<G>(graph: &G, dominators: &DominatorTree) -> LoopForest
where
    G: GraphBase + Successors + Predecessors,
{
    let mut by_header: FxHashMap<NodeId, LoopInfo> = FxHashMap::default();

    for node in graph.node_ids() {
        if !dominators.is_reachable(node) {
            continue;
        }
        for succ in graph.successors(node) {
            if dominators.dominates(succ, node) {
                let info = by_header
                    .entry(succ)
                    .or_insert_with(|| LoopInfo::new(succ));
                if !info.latches.contains(&node) {
                    info.latches.push(node);
                }
                expand_loop_body(graph, info, node);
            }
        }
    }

    let mut loops: Vec<LoopInfo> = by_header.into_values().collect();
    loops.sort_by_key(|l| l.header);
    for (id, info) in loops.iter_mut().enumerate() {
        info.id = id;
    }
    compute_nesting(&mut loops);

    let mut block_to_loop = vec![None; graph.node_count()];
    for info in &loops {
        for block in &info.body {
            let slot: &mut Option<usize> = &mut block_to_loop[block.index()];
            match *slot {
                Some(existing) if loops[existing].depth >= info.depth => {}
                _ => *slot = Some(info.id),
            }
        }
    }

    LoopForest {
        loops,
        block_to_loop,
    }
}

/// Adds every block that reaches `latch` without crossing the header.
fn expand_loop_body<G: Predecessors>(graph: &G, info: &mut LoopInfo, latch: NodeId) {
    let mut worklist = vec![latch];
    while let Some(node) = worklist.pop() {
        if info.body.insert(node) {
            worklist.extend(
                graph
                    .predecessors(node)
                    .filter(|pred| *pred != info.header && !info.body.contains(pred)),
            );
        }
    }
}

fn compute_nesting(loops: &mut [LoopInfo]) {
    let count = loops.len();

    for i in 0..count {
        let header = loops[i].header;
        loops[i].parent = (0..count)
            .filter(|&j| j != i && loops[j].contains(header))
            .min_by_key(|&j| loops[j].size());
    }

    for i in 0..count {
        if let Some(parent) = loops[i].parent {
            loops[parent].children.push(i);
        }
    }

    for i in 0..count {
        let mut depth = 0;
        let mut current = loops[i].parent;
        while let Some(parent) = current {
            depth += 1;
            current = loops[parent].parent;
        }
        loops[i].depth = depth;
    }
}
