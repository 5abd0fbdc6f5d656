//! SSA variable identities.

use std::fmt;

use crate::{arch::Register, utils::graph::NodeId};

/// Identifier of one SSA variable (one version of one register).
///
/// Displays as `v{n}`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SsaVarId(pub(crate) usize);

impl SsaVarId {
    /// Creates a variable id from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        SsaVarId(index)
    }

    /// Returns the raw index into [`SsaFunction::variables`](crate::analysis::SsaFunction::variables).
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for SsaVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for SsaVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Location of an SSA instruction: block plus position within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsnRef {
    /// Owning block
    pub block: NodeId,
    /// Index into [`SsaBlock::instructions`](crate::analysis::SsaBlock::instructions), phis included
    pub index: usize,
}

/// One version of a register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaVariable {
    /// Identity of this variable
    pub id: SsaVarId,
    /// Register this variable is a version of
    pub register: Register,
    /// Version number; 0 is the value live on function entry
    pub version: u32,
    /// Defining instruction, `None` for entry values and program-counter reads
    pub def: Option<InsnRef>,
}

impl SsaVariable {
    /// Returns `true` if nothing inside the function defines this variable.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.def.is_none()
    }
}
