//! SSA instructions.

use std::fmt;

use crate::{
    analysis::ssa::SsaVarId,
    arch::{Instruction, OpcodeFamily},
};

/// A machine instruction or phi-function with its SSA operands resolved.
///
/// # Operand slots
///
/// Each operand position `p` owns two slots in [`operands`](Self::operands):
/// slot `2p` holds the variable read for the register (or memory base) and
/// slot `2p + 1` the variable read for the index register, if any. Implicit
/// reads follow the explicit operands, one position each, so implicit read
/// `k` lives at position `operand_count + k`.
///
/// A phi-function has no `raw_insn`; its operands hold one incoming variable
/// per predecessor edge and `outputs[0]` is the merged variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaInsn {
    /// The decoded instruction, `None` for phi-functions
    pub raw_insn: Option<Instruction>,
    /// Variables read, see the slot layout above
    pub operands: Vec<Option<SsaVarId>>,
    /// Variables defined, explicit destinations first, then implicit writes
    pub outputs: Vec<SsaVarId>,
    /// Number of implicit-read positions following the explicit operands
    pub implicit_operand_count: usize,
}

impl SsaInsn {
    /// Creates a phi-function merging `operands` into `output`.
    #[must_use]
    pub fn phi(output: SsaVarId, operands: Vec<Option<SsaVarId>>) -> Self {
        SsaInsn {
            raw_insn: None,
            operands,
            outputs: vec![output],
            implicit_operand_count: 0,
        }
    }

    /// Returns `true` for phi-functions.
    #[must_use]
    pub fn is_phi(&self) -> bool {
        self.raw_insn.is_none()
    }

    /// Returns the opcode family, `None` for phi-functions.
    #[must_use]
    pub fn family(&self) -> Option<OpcodeFamily> {
        self.raw_insn.as_ref().map(|insn| insn.family)
    }

    /// Returns the instruction address, `None` for phi-functions.
    #[must_use]
    pub fn address(&self) -> Option<u64> {
        self.raw_insn.as_ref().map(|insn| insn.address)
    }

    /// Returns the number of explicit operand positions.
    #[must_use]
    pub fn explicit_operand_count(&self) -> usize {
        self.raw_insn.as_ref().map_or(0, |insn| insn.operand_count())
    }

    /// Returns the number of operand positions, explicit and implicit.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.explicit_operand_count() + self.implicit_operand_count
    }

    /// Returns the variable read for the register or base of operand `position`.
    #[must_use]
    pub fn operand_var(&self, position: usize) -> Option<SsaVarId> {
        self.operands.get(position * 2).copied().flatten()
    }

    /// Returns the variable read for the index register of operand `position`.
    #[must_use]
    pub fn index_var(&self, position: usize) -> Option<SsaVarId> {
        self.operands.get(position * 2 + 1).copied().flatten()
    }

    /// Returns the primary output.
    #[must_use]
    pub fn output(&self) -> Option<SsaVarId> {
        self.outputs.first().copied()
    }

    /// Iterates every variable this instruction reads.
    pub fn used_vars(&self) -> impl Iterator<Item = SsaVarId> + '_ {
        self.operands.iter().filter_map(|slot| *slot)
    }
}

impl fmt::Display for SsaInsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: Vec<String> = self.outputs.iter().map(ToString::to_string).collect();
        let inputs: Vec<String> = self
            .operands
            .iter()
            .map(|slot| slot.map_or_else(|| "_".to_string(), |v| v.to_string()))
            .collect();
        match &self.raw_insn {
            None => write!(f, "{} = phi({})", outputs.join(", "), inputs.join(", ")),
            Some(insn) => write!(
                f,
                "{} = {} [{}]",
                outputs.join(", "),
                insn.mnemonic,
                inputs.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{x86, Operand};

    #[test]
    fn test_phi_shape() {
        let phi = SsaInsn::phi(SsaVarId::new(4), vec![Some(SsaVarId::new(1)), None]);
        assert!(phi.is_phi());
        assert_eq!(phi.family(), None);
        assert_eq!(phi.output(), Some(SsaVarId::new(4)));
        assert_eq!(phi.to_string(), "v4 = phi(v1, _)");
    }

    #[test]
    fn test_slot_accessors() {
        let raw = Instruction::new(0, 3, "add", OpcodeFamily::Add)
            .with_operand(Operand::reg_read(x86::RCX))
            .with_operand(Operand::reg_rw(x86::RAX));
        let insn = SsaInsn {
            raw_insn: Some(raw),
            operands: vec![Some(SsaVarId::new(0)), None, Some(SsaVarId::new(1)), None],
            outputs: vec![SsaVarId::new(2)],
            implicit_operand_count: 0,
        };

        assert_eq!(insn.position_count(), 2);
        assert_eq!(insn.operand_var(0), Some(SsaVarId::new(0)));
        assert_eq!(insn.operand_var(1), Some(SsaVarId::new(1)));
        assert_eq!(insn.index_var(1), None);
        assert_eq!(insn.operand_var(7), None);
        assert_eq!(insn.used_vars().count(), 2);
        assert_eq!(insn.to_string(), "v2 = add [v0, _, v1, _]");
    }
}
