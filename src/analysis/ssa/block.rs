//! SSA basic blocks.

use crate::{analysis::ssa::SsaInsn, utils::graph::NodeId};

/// The SSA view of one basic block: phi-functions first, then the
/// translated instructions in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaBlock {
    /// Block id, identical to the CFG node id
    pub id: NodeId,
    /// Phis followed by machine instructions
    pub instructions: Vec<SsaInsn>,
}

impl SsaBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        SsaBlock {
            id,
            instructions: Vec::new(),
        }
    }

    /// Iterates the phi-functions at the top of the block.
    pub fn phis(&self) -> impl Iterator<Item = &SsaInsn> {
        self.instructions.iter().take_while(|insn| insn.is_phi())
    }

    /// Iterates the instructions that carry a decoded machine instruction.
    pub fn machine_instructions(&self) -> impl Iterator<Item = &SsaInsn> {
        self.instructions.iter().filter(|insn| !insn.is_phi())
    }

    /// Returns the number of entries, phis included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
