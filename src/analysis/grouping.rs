//! Grouping of memory accesses by symbolic array base.
//!
//! [`ArrayGrouping`] is a [`Driver`] that looks at memory-referencing
//! instructions inside innermost loops and groups those whose coarse
//! address `(base + index)` renders identically. Offsets and scales are
//! ignored, so `a[i]` and `a[i + 1]` land in the same group while `a[i]`
//! and `b[i]` do not.
//!
//! # Usage
//!
//! ```rust,ignore
//! use adfa::analysis::{analyze_function, ArrayGrouping};
//!
//! let analysis = analyze_function(&function, &mut ArrayGrouping::new())?;
//! for groups in analysis.state().loops() {
//!     for (key, addresses) in groups.shared_groups() {
//!         println!("loop {}: {key} accessed at {addresses:x?}", groups.loop_id());
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::{
    analysis::{
        cfg::Function,
        dataflow::{AnalysisContext, Driver, DriverFlags, SymOp, SymValKind, ValueId, ValueStore},
        ssa::SsaInsn,
    },
    arch::OpcodeFamily,
    utils::graph::NodeId,
};

/// Accesses of one innermost loop, grouped by rendered coarse address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopGroups {
    loop_id: usize,
    header: NodeId,
    groups: BTreeMap<String, Vec<u64>>,
}

impl LoopGroups {
    fn new(loop_id: usize, header: NodeId) -> Self {
        LoopGroups {
            loop_id,
            header,
            groups: BTreeMap::new(),
        }
    }

    /// Returns the id of the loop in the function's loop forest.
    #[must_use]
    pub fn loop_id(&self) -> usize {
        self.loop_id
    }

    /// Returns the loop header.
    #[must_use]
    pub fn header(&self) -> NodeId {
        self.header
    }

    /// Returns instruction addresses keyed by coarse address, in key order.
    #[must_use]
    pub fn groups(&self) -> &BTreeMap<String, Vec<u64>> {
        &self.groups
    }

    /// Iterates the groups accessed by more than one instruction.
    pub fn shared_groups(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.groups
            .iter()
            .filter(|(_, addresses)| addresses.len() > 1)
            .map(|(key, addresses)| (key.as_str(), addresses.as_slice()))
    }

    /// Returns the key of the group containing the instruction at `address`.
    #[must_use]
    pub fn group_of(&self, address: u64) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, addresses)| addresses.contains(&address))
            .map(|(key, _)| key.as_str())
    }

    /// Consumes the loop, returning its groups.
    #[must_use]
    pub fn into_groups(self) -> BTreeMap<String, Vec<u64>> {
        self.groups
    }
}

/// Per-function state of [`ArrayGrouping`].
#[derive(Debug, Clone, Default)]
pub struct GroupingState {
    loops: BTreeMap<usize, LoopGroups>,
    loop_of_address: FxHashMap<u64, usize>,
}

impl GroupingState {
    /// Iterates the innermost loops in loop-id order.
    pub fn loops(&self) -> impl Iterator<Item = &LoopGroups> + '_ {
        self.loops.values()
    }

    /// Returns the groups of loop `loop_id`.
    #[must_use]
    pub fn get(&self, loop_id: usize) -> Option<&LoopGroups> {
        self.loops.get(&loop_id)
    }

    /// Returns the number of innermost loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns `true` if the function has no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Consumes the state, returning the loops in loop-id order.
    #[must_use]
    pub fn into_loops(self) -> Vec<LoopGroups> {
        self.loops.into_values().collect()
    }
}

/// Driver grouping in-loop memory accesses by array base.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayGrouping {
    flags: DriverFlags,
}

impl ArrayGrouping {
    /// Creates a grouping driver with full memory tracking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a grouping driver evaluating with `flags`.
    #[must_use]
    pub fn with_flags(flags: DriverFlags) -> Self {
        ArrayGrouping { flags }
    }

    /// `(base + index)` of the memory operand of `insn`, flagged as a memory node.
    fn coarse_address(insn: &SsaInsn, store: &mut ValueStore<'_>) -> Option<ValueId> {
        let (position, memory) = insn.raw_insn.as_ref()?.memory_operand()?;
        let base = insn.operand_var(position).and_then(|var| store.value_of(var));
        let index = insn.index_var(position).and_then(|var| store.value_of(var));

        Some(match (base, index) {
            (Some(base), Some(index)) => store.alloc(
                SymValKind::BinOp {
                    op: SymOp::Add,
                    left: base,
                    right: index,
                },
                true,
            ),
            (Some(part), None) | (None, Some(part)) => store.with_mem_flag(part, true),
            (None, None) => store.alloc(SymValKind::Imm(memory.offset), true),
        })
    }
}

impl Driver for ArrayGrouping {
    type State = GroupingState;

    fn flags(&self) -> DriverFlags {
        self.flags
    }

    fn init(&mut self, function: &Function, _context: &AnalysisContext<'_>) -> GroupingState {
        let mut state = GroupingState::default();
        for info in function.loops().innermost_loops() {
            state
                .loops
                .insert(info.id, LoopGroups::new(info.id, info.header));
            for block in info.body.iter().filter_map(|id| function.block(*id)) {
                for insn in &block.instructions {
                    state.loop_of_address.insert(insn.address, info.id);
                }
            }
        }
        state
    }

    fn insn_filter(&self, insn: &SsaInsn, state: &GroupingState) -> bool {
        let Some(raw) = insn.raw_insn.as_ref() else {
            return false;
        };
        !matches!(
            raw.family,
            OpcodeFamily::Lea | OpcodeFamily::Call | OpcodeFamily::Nop
        ) && raw.references_memory()
            && state.loop_of_address.contains_key(&raw.address)
    }

    fn insn_execute(
        &self,
        insn: &SsaInsn,
        _result: Option<ValueId>,
        store: &mut ValueStore<'_>,
        state: &mut GroupingState,
    ) {
        let Some(address) = insn.address() else {
            return;
        };
        let Some(loop_id) = state.loop_of_address.get(&address).copied() else {
            return;
        };
        let Some(coarse) = Self::coarse_address(insn, store) else {
            return;
        };

        let key = store.render(coarse);
        if let Some(groups) = state.loops.get_mut(&loop_id) {
            groups.groups.entry(key).or_default().push(address);
        }
    }
}
