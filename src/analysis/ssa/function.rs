//! Whole-function SSA form.

use std::fmt;

use crate::{
    analysis::ssa::{InsnRef, SsaBlock, SsaInsn, SsaVarId, SsaVariable},
    arch::Register,
    utils::graph::NodeId,
};

/// SSA form of a function: one [`SsaBlock`] per CFG block plus the variable table.
///
/// Program-counter reads are not versioned like other registers. Each read
/// gets its own variable, listed in [`pc_reads`](Self::pc_reads) together
/// with the address of the instruction following the reading instruction.
#[derive(Debug, Clone, Default)]
pub struct SsaFunction {
    pub(crate) blocks: Vec<SsaBlock>,
    pub(crate) variables: Vec<SsaVariable>,
    pub(crate) pc_reads: Vec<(SsaVarId, u64)>,
}

impl SsaFunction {
    /// Returns all blocks indexed by block id.
    #[must_use]
    pub fn blocks(&self) -> &[SsaBlock] {
        &self.blocks
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&SsaBlock> {
        self.blocks.get(id.index())
    }

    /// Returns all variables indexed by [`SsaVarId::index`].
    #[must_use]
    pub fn variables(&self) -> &[SsaVariable] {
        &self.variables
    }

    /// Returns the variable with the given id.
    #[must_use]
    pub fn variable(&self, id: SsaVarId) -> Option<&SsaVariable> {
        self.variables.get(id.index())
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Returns `(variable, next instruction address)` for every program-counter read.
    #[must_use]
    pub fn pc_reads(&self) -> &[(SsaVarId, u64)] {
        &self.pc_reads
    }

    /// Returns the instruction at `location`.
    #[must_use]
    pub fn insn(&self, location: InsnRef) -> Option<&SsaInsn> {
        self.blocks
            .get(location.block.index())
            .and_then(|block| block.instructions.get(location.index))
    }

    /// Returns the instruction defining `var`, if it is defined inside the function.
    #[must_use]
    pub fn def_insn(&self, var: SsaVarId) -> Option<&SsaInsn> {
        self.variable(var)
            .and_then(|v| v.def)
            .and_then(|location| self.insn(location))
    }

    /// Returns the total number of SSA instructions, phis included.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(SsaBlock::len).sum()
    }

    pub(crate) fn new_variable(
        &mut self,
        register: Register,
        version: u32,
        def: Option<InsnRef>,
    ) -> SsaVarId {
        let id = SsaVarId::new(self.variables.len());
        self.variables.push(SsaVariable {
            id,
            register,
            version,
            def,
        });
        id
    }
}

impl fmt::Display for SsaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{}:", block.id)?;
            for insn in &block.instructions {
                writeln!(f, "  {insn}")?;
            }
        }
        Ok(())
    }
}
