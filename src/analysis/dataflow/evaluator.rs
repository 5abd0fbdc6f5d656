//! Per-instruction symbolic evaluation.
//!
//! The evaluator turns one SSA instruction into a [`SymVal`](super::SymVal)
//! by dispatching on its [`OpcodeFamily`], and memoizes results per SSA
//! variable in the store's [`Rvals`](super::Rvals). Operands whose variables
//! are still unbound are resolved on demand by analyzing their defining
//! instruction, which makes the evaluation order independent of the block
//! order in most cases.
//!
//! Unmodeled shapes never fail the analysis. They either produce no value
//! or bind an opaque `Reg` placeholder, and every variable an instruction
//! reads is bound by the time [`Evaluator::analyze_instruction`] returns.

use rustc_hash::FxHashSet;

use crate::{
    analysis::{
        dataflow::{DriverFlags, SymOp, SymValKind, ValueId, ValueStore},
        ssa::{SsaInsn, SsaVarId},
    },
    arch::{Instruction, MemoryOperand, OpcodeFamily, OperandKind},
    Error, Result,
};

/// Maximum number of nested definitions resolved before giving up on a variable.
pub const MAX_RESOLVE_DEPTH: usize = 1024;

/// Evaluates instructions against a [`ValueStore`].
pub(crate) struct Evaluator<'s, 'a> {
    store: &'s mut ValueStore<'a>,
    flags: DriverFlags,
    in_progress: FxHashSet<SsaVarId>,
    max_depth: usize,
}

impl<'s, 'a> Evaluator<'s, 'a> {
    pub(crate) fn new(store: &'s mut ValueStore<'a>, flags: DriverFlags) -> Self {
        Evaluator {
            store,
            flags,
            in_progress: FxHashSet::default(),
            max_depth: MAX_RESOLVE_DEPTH,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Computes the value of `insn` and binds it to the primary output.
    ///
    /// Returns the value bound to the primary output (which may be an
    /// earlier binding), the computed value for instructions without
    /// outputs, or `None` if the instruction is not modeled.
    pub(crate) fn analyze_instruction(&mut self, insn: &SsaInsn) -> Option<ValueId> {
        match insn.raw_insn.as_ref() {
            None => self.analyze_phi(insn),
            Some(raw) => {
                let result = self.analyze_machine(insn, raw);
                for var in insn.used_vars() {
                    if !self.store.rvals().contains(var) {
                        self.resolve_ssa_var(var);
                    }
                }
                result
            }
        }
    }

    /// Resolves the explicit or implicit operand at `position` of `insn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperand`] for code pointers, write-only
    /// registers, phi-functions and positions past the last operand.
    pub(crate) fn resolve_operand(&mut self, insn: &SsaInsn, position: usize) -> Result<ValueId> {
        let Some(raw) = insn.raw_insn.as_ref() else {
            return Err(Error::UnsupportedOperand {
                address: 0,
                position,
            });
        };
        let unsupported = || Error::UnsupportedOperand {
            address: raw.address,
            position,
        };

        let Some(operand) = raw.operand(position) else {
            // implicit reads follow the explicit operands
            if position < insn.position_count() {
                let var = insn.operand_var(position).ok_or_else(unsupported)?;
                return Ok(self.resolve_ssa_var(var));
            }
            return Err(unsupported());
        };

        match &operand.kind {
            OperandKind::Immediate(value) => Ok(self.store.imm(*value)),
            OperandKind::Register(_) | OperandKind::IndexedRegister { .. } => {
                let var = insn.operand_var(position).ok_or_else(unsupported)?;
                Ok(self.resolve_ssa_var(var))
            }
            OperandKind::Memory(mem) | OperandKind::MemoryRelative(mem) => {
                Ok(self.resolve_memory(insn, raw, position, mem))
            }
            OperandKind::Pointer(_) => Err(unsupported()),
        }
    }

    /// Returns the value of `var`, analyzing its definition if it is not bound yet.
    ///
    /// Definition chains are walked with an explicit stack: a definition is
    /// analyzed only once everything it reads is bound, so the analysis
    /// itself never nests.
    pub(crate) fn resolve_ssa_var(&mut self, var: SsaVarId) -> ValueId {
        if let Some(bound) = self.store.value_of(var) {
            return bound;
        }
        if self.in_progress.contains(&var) {
            log::trace!("{var}: cyclic definition, binding placeholder");
            return self.store.bind_placeholder(var);
        }

        let ssa = self.store.ssa();
        let mut pending = vec![var];
        self.in_progress.insert(var);

        while let Some(&top) = pending.last() {
            if self.store.rvals().contains(top) {
                self.leave(&mut pending);
                continue;
            }
            let Some(def) = ssa.def_insn(top) else {
                log::trace!("{top}: no definition, binding placeholder");
                self.store.bind_placeholder(top);
                self.leave(&mut pending);
                continue;
            };

            if let Some(input) = self.unresolved_input(def) {
                if let Err(error) = self.enter(input, &mut pending) {
                    log::warn!("{input}: {error}, using placeholder");
                    self.store.bind_placeholder(input);
                }
                continue;
            }

            self.analyze_instruction(def);
            // secondary outputs and unmodeled definitions stay opaque
            self.store.bind_placeholder(top);
            self.leave(&mut pending);
        }

        self.store.bind_placeholder(var)
    }

    /// First variable `def` reads that is neither bound nor being resolved.
    fn unresolved_input(&self, def: &SsaInsn) -> Option<SsaVarId> {
        let unresolved =
            |var: &SsaVarId| !self.store.rvals().contains(*var) && !self.in_progress.contains(var);

        if def.is_phi() {
            // only a single-source phi reads its operand
            let mut sources = def.operands.iter().flatten();
            return match (sources.next(), sources.next()) {
                (Some(source), None) if unresolved(source) => Some(*source),
                _ => None,
            };
        }
        def.used_vars().find(unresolved)
    }

    fn enter(&mut self, var: SsaVarId, pending: &mut Vec<SsaVarId>) -> Result<()> {
        if self.in_progress.len() >= self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }
        self.in_progress.insert(var);
        pending.push(var);
        Ok(())
    }

    fn leave(&mut self, pending: &mut Vec<SsaVarId>) {
        if let Some(var) = pending.pop() {
            self.in_progress.remove(&var);
        }
    }

    fn analyze_phi(&mut self, insn: &SsaInsn) -> Option<ValueId> {
        let output = insn.output()?;
        if let Some(bound) = self.store.value_of(output) {
            return Some(bound);
        }

        let mut sources = insn.operands.iter().flatten();
        let value = match (sources.next(), sources.next()) {
            (Some(&source), None) => {
                let value = self.resolve_ssa_var(source);
                self.store.bind(output, value)
            }
            _ => self.store.bind_placeholder(output),
        };
        Some(value)
    }

    fn analyze_machine(&mut self, insn: &SsaInsn, raw: &Instruction) -> Option<ValueId> {
        if let Some(bound) = insn.output().and_then(|out| self.store.value_of(out)) {
            return Some(bound);
        }
        log::trace!("evaluating {raw} ({})", raw.family);

        let result = match raw.family {
            OpcodeFamily::Move => self.resolve_operand(insn, 0).ok(),
            OpcodeFamily::Add => self.binary(insn, SymOp::Add),
            OpcodeFamily::Sub => self.binary(insn, SymOp::Sub),
            OpcodeFamily::Mul => self.binary(insn, SymOp::Mul),
            OpcodeFamily::Div => self.binary(insn, SymOp::Div),
            OpcodeFamily::Shl | OpcodeFamily::Sal => return self.shift(insn, raw, SymOp::ShiftLeft),
            OpcodeFamily::Shr | OpcodeFamily::Sar => {
                return self.shift(insn, raw, SymOp::ShiftRight)
            }
            OpcodeFamily::Xor => self.self_xor(raw),
            OpcodeFamily::Lea => self
                .resolve_operand(insn, 0)
                .ok()
                .map(|address| self.store.with_mem_flag(address, false)),
            OpcodeFamily::Inc => self.step(insn, 1),
            OpcodeFamily::Dec => self.step(insn, -1),
            OpcodeFamily::Sqrt => self
                .resolve_operand(insn, 0)
                .ok()
                .map(|src| self.store.unop(SymOp::Sqrt, src)),
            OpcodeFamily::Gather => {
                let target = insn
                    .outputs
                    .get(1)
                    .filter(|out| !self.store.rvals().contains(**out))
                    .or_else(|| insn.outputs.first())
                    .copied();
                if let Some(out) = target {
                    self.store.bind_placeholder(out);
                }
                return None;
            }
            _ => return insn.output().map(|out| self.store.bind_placeholder(out)),
        };

        match (result, insn.output()) {
            (Some(value), Some(out)) => Some(self.store.bind(out, value)),
            (result, _) => result,
        }
    }

    /// `BinOp(op, src1, src0)`, requiring both operands.
    fn binary(&mut self, insn: &SsaInsn, op: SymOp) -> Option<ValueId> {
        if insn.explicit_operand_count() < 2 {
            return None;
        }
        let src0 = self.resolve_operand(insn, 0).ok()?;
        let src1 = self.resolve_operand(insn, 1).ok()?;
        Some(self.store.binop(op, src1, src0))
    }

    fn shift(&mut self, insn: &SsaInsn, raw: &Instruction, op: SymOp) -> Option<ValueId> {
        let amount = self.resolve_operand(insn, 0).ok();
        let value = self.resolve_operand(insn, 1).ok();

        let (Some(amount), Some(value)) = (amount, value) else {
            return insn.output().map(|out| self.store.bind_placeholder(out));
        };
        let resolved_amount = self.store.node(amount).as_imm().is_some();
        if self.flags.contains(DriverFlags::NO_UNRESOLVED_SHIFT) && !resolved_amount {
            log::trace!("{raw}: shift amount unresolved, binding placeholder");
            return insn.output().map(|out| self.store.bind_placeholder(out));
        }

        let shifted = self.store.binop(op, value, amount);
        Some(match insn.output() {
            Some(out) => self.store.bind(out, shifted),
            None => shifted,
        })
    }

    fn self_xor(&mut self, raw: &Instruction) -> Option<ValueId> {
        let first = raw.operand(0).and_then(|op| op.as_register());
        let second = raw.operand(1).and_then(|op| op.as_register());
        match (first, second) {
            (Some(a), Some(b)) if a == b => Some(self.store.imm(0)),
            _ => {
                log::trace!("{raw}: xor of distinct operands left unresolved");
                None
            }
        }
    }

    /// `BinOp(Add, Imm(delta), src0)` for increments and decrements.
    fn step(&mut self, insn: &SsaInsn, delta: i64) -> Option<ValueId> {
        let src0 = self.resolve_operand(insn, 0).ok()?;
        let delta = self.store.imm(delta);
        Some(self.store.binop(SymOp::Add, delta, src0))
    }

    fn resolve_memory(
        &mut self,
        insn: &SsaInsn,
        raw: &Instruction,
        position: usize,
        mem: &MemoryOperand,
    ) -> ValueId {
        if self.flags.contains(DriverFlags::NO_MEMORY_TRACKING) && raw.family != OpcodeFamily::Lea
        {
            return self.store.mem(raw.address);
        }

        // a relative operand without base reads the program counter through this slot
        let base = insn
            .operand_var(position)
            .map(|var| self.resolve_ssa_var(var));
        let index = insn.index_var(position).map(|var| self.resolve_ssa_var(var));

        let scaled = index.map(|index| {
            let scale = self.store.imm(i64::from(mem.scale));
            self.store.binop(SymOp::Mul, index, scale)
        });
        let register_part = match (base, scaled) {
            (Some(base), Some(scaled)) => Some(self.store.binop(SymOp::Add, base, scaled)),
            (Some(part), None) | (None, Some(part)) => Some(part),
            (None, None) => None,
        };

        match register_part {
            Some(part) => {
                let offset = self.store.imm(mem.offset);
                self.store.alloc(
                    SymValKind::BinOp {
                        op: SymOp::Add,
                        left: offset,
                        right: part,
                    },
                    true,
                )
            }
            None => self.store.alloc(SymValKind::Imm(mem.offset), true),
        }
    }
}
