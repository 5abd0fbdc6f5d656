//! Translation of a [`Function`] into SSA form.
//!
//! The pipeline follows Cytron et al.:
//!
//! ```text
//! Function (CFG) -> definition sites -> phi placement on iterated dominance
//!                -> block translation in reverse postorder -> phi operands
//! ```
//!
//! Blocks are translated in reverse postorder, so a block's immediate
//! dominator is always finished first; the register state entering a block
//! is its immediate dominator's exit state overlaid with the block's own
//! phis. Phi operands are filled last from each predecessor's exit state.
//!
//! The entry block behaves as if it had one extra predecessor outside the
//! function; when it needs a phi (it is the target of a loop), operand 0
//! carries the register's entry value.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::{
    analysis::{
        cfg::Function,
        ssa::{InsnRef, SsaBlock, SsaFunction, SsaInsn, SsaVarId},
    },
    arch::{Instruction, OperandKind, Register},
    utils::graph::{
        algorithms::{compute_dominance_frontiers, reverse_postorder},
        NodeId,
    },
};

/// Current SSA variable per register.
type RegisterState = FxHashMap<Register, SsaVarId>;

/// Builds the SSA form of `function`.
///
/// Prefer [`Function::ssa`], which caches the result.
#[must_use]
pub fn compute_ssa(function: &Function) -> SsaFunction {
    SsaBuilder::new(function).build()
}

struct SsaBuilder<'a> {
    function: &'a Function,
    pc: Register,
    ssa: SsaFunction,
    /// Blocks writing each register
    def_blocks: BTreeMap<Register, BTreeSet<NodeId>>,
    /// Phis per block in ascending register order
    phis: Vec<Vec<(Register, SsaVarId)>>,
    versions: FxHashMap<Register, u32>,
    entry_values: FxHashMap<Register, SsaVarId>,
    exit_states: Vec<Option<RegisterState>>,
}

impl<'a> SsaBuilder<'a> {
    fn new(function: &'a Function) -> Self {
        let block_count = function.block_count();
        SsaBuilder {
            function,
            pc: function.arch().program_counter(),
            ssa: SsaFunction {
                blocks: (0..block_count).map(|i| SsaBlock::new(NodeId::new(i))).collect(),
                ..SsaFunction::default()
            },
            def_blocks: BTreeMap::new(),
            phis: vec![Vec::new(); block_count],
            versions: FxHashMap::default(),
            entry_values: FxHashMap::default(),
            exit_states: vec![None; block_count],
        }
    }

    fn build(mut self) -> SsaFunction {
        self.analyze_definitions();
        self.place_phis();
        self.translate_blocks();
        self.fill_phi_operands();
        self.ssa
    }

    fn analyze_definitions(&mut self) {
        for block in self.function.blocks() {
            for insn in &block.instructions {
                for register in written_registers(insn, self.pc) {
                    self.def_blocks.entry(register).or_default().insert(block.id);
                }
            }
        }
    }

    fn place_phis(&mut self) {
        let function = self.function;
        let frontiers = compute_dominance_frontiers(function, function.dominators());
        let def_blocks = std::mem::take(&mut self.def_blocks);

        for (register, defs) in &def_blocks {
            let mut worklist: Vec<NodeId> = defs.iter().copied().collect();
            let mut has_phi: BTreeSet<NodeId> = BTreeSet::new();

            while let Some(block) = worklist.pop() {
                let mut frontier: Vec<NodeId> = frontiers[block.index()].iter().copied().collect();
                frontier.sort_unstable();

                for target in frontier {
                    if !has_phi.insert(target) {
                        continue;
                    }
                    let location = InsnRef {
                        block: target,
                        index: self.phis[target.index()].len(),
                    };
                    let var = self.new_version(*register, Some(location));
                    self.phis[target.index()].push((*register, var));

                    if !defs.contains(&target) {
                        worklist.push(target);
                    }
                }
            }
        }

        self.def_blocks = def_blocks;
    }

    fn translate_blocks(&mut self) {
        let function = self.function;
        let mut order = reverse_postorder(function, function.entry());
        let mut seen = vec![false; function.block_count()];
        for block in &order {
            seen[block.index()] = true;
        }
        order.extend(
            (0..seen.len())
                .filter(|&i| !seen[i])
                .map(NodeId::new),
        );

        for block in order {
            self.translate_block(block);
        }
    }

    fn translate_block(&mut self, block: NodeId) {
        let function = self.function;
        let mut state = function
            .dominators()
            .immediate_dominator(block)
            .and_then(|idom| self.exit_states[idom.index()].clone())
            .unwrap_or_default();

        let pred_count = function.predecessors(block).count();
        let extra = usize::from(block == function.entry());
        let mut instructions = Vec::new();

        for &(register, var) in &self.phis[block.index()] {
            state.insert(register, var);
            instructions.push(SsaInsn::phi(var, vec![None; pred_count + extra]));
        }

        let Some(basic_block) = function.block(block) else {
            return;
        };
        for insn in &basic_block.instructions {
            let location = InsnRef {
                block,
                index: instructions.len(),
            };
            instructions.push(self.translate_instruction(insn, location, &mut state));
        }

        self.ssa.blocks[block.index()].instructions = instructions;
        self.exit_states[block.index()] = Some(state);
    }

    fn translate_instruction(
        &mut self,
        insn: &Instruction,
        location: InsnRef,
        state: &mut RegisterState,
    ) -> SsaInsn {
        let next_address = insn.next_address();
        let slot_count = (insn.operand_count() + insn.implicit_reads.len()) * 2;
        let mut operands = Vec::with_capacity(slot_count);

        for operand in &insn.operands {
            let (primary, secondary) = match &operand.kind {
                OperandKind::Register(register) => {
                    (operand.access.is_read().then_some(*register), None)
                }
                OperandKind::IndexedRegister { register, index } => {
                    (operand.access.is_read().then_some(*register), Some(*index))
                }
                OperandKind::Memory(mem) => (mem.base, mem.index),
                OperandKind::MemoryRelative(mem) => (mem.base.or(Some(self.pc)), mem.index),
                OperandKind::Immediate(_) | OperandKind::Pointer(_) => (None, None),
            };
            operands.push(primary.map(|r| self.read(r, state, next_address)));
            operands.push(secondary.map(|r| self.read(r, state, next_address)));
        }

        for &register in &insn.implicit_reads {
            operands.push(Some(self.read(register, state, next_address)));
            operands.push(None);
        }

        let mut outputs = Vec::new();
        for register in written_registers(insn, self.pc) {
            let var = self.new_version(register, Some(location));
            state.insert(register, var);
            outputs.push(var);
        }

        SsaInsn {
            raw_insn: Some(insn.clone()),
            operands,
            outputs,
            implicit_operand_count: insn.implicit_reads.len(),
        }
    }

    fn fill_phi_operands(&mut self) {
        let function = self.function;
        let dominators = function.dominators();

        for block in 0..self.phis.len() {
            if self.phis[block].is_empty() {
                continue;
            }
            let node = NodeId::new(block);
            let preds: Vec<NodeId> = function.predecessors(node).collect();
            let extra = usize::from(node == function.entry());

            for (index, &(register, _)) in self.phis[block].clone().iter().enumerate() {
                let mut operands = Vec::with_capacity(preds.len() + extra);
                if extra == 1 {
                    operands.push(Some(self.entry_value(register)));
                }
                for pred in &preds {
                    let incoming = if dominators.is_reachable(*pred) {
                        let current = self.exit_states[pred.index()]
                            .as_ref()
                            .and_then(|state| state.get(&register).copied());
                        Some(current.unwrap_or_else(|| self.entry_value(register)))
                    } else {
                        None
                    };
                    operands.push(incoming);
                }
                self.ssa.blocks[block].instructions[index].operands = operands;
            }
        }
    }

    /// Returns the variable read for `register`; program-counter reads get a fresh variable.
    fn read(&mut self, register: Register, state: &RegisterState, next_address: u64) -> SsaVarId {
        if register == self.pc {
            let var = self.new_version(register, None);
            self.ssa.pc_reads.push((var, next_address));
            return var;
        }
        match state.get(&register) {
            Some(var) => *var,
            None => self.entry_value(register),
        }
    }

    fn entry_value(&mut self, register: Register) -> SsaVarId {
        if let Some(var) = self.entry_values.get(&register) {
            return *var;
        }
        let var = self.ssa.new_variable(register, 0, None);
        self.entry_values.insert(register, var);
        var
    }

    fn new_version(&mut self, register: Register, def: Option<InsnRef>) -> SsaVarId {
        let version = self.versions.entry(register).or_insert(0);
        *version += 1;
        let version = *version;
        self.ssa.new_variable(register, version, def)
    }
}

/// Registers an instruction defines: explicit destinations in operand order,
/// then implicit writes. The program counter is never versioned.
fn written_registers(insn: &Instruction, pc: Register) -> Vec<Register> {
    insn.operands
        .iter()
        .filter(|op| op.access.is_write())
        .filter_map(|op| match &op.kind {
            OperandKind::Register(register) | OperandKind::IndexedRegister { register, .. } => {
                Some(*register)
            }
            _ => None,
        })
        .chain(insn.implicit_writes.iter().copied())
        .filter(|register| *register != pc)
        .collect()
}
