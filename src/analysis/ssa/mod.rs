//! Static single assignment form over machine registers.
//!
//! Every register write creates a new [`SsaVariable`] version; reads refer to
//! the version reaching them, and phi-functions merge versions at join
//! points. The data-flow engine walks this form instead of raw registers so
//! each value has exactly one definition to evaluate.
//!
//! - [`SsaVarId`] / [`SsaVariable`] / [`InsnRef`] - variable identities and definition sites
//! - [`SsaInsn`] - one instruction or phi with its operand slots
//! - [`SsaBlock`] / [`SsaFunction`] - per-block and whole-function containers
//! - [`compute_ssa`] - construction from a [`Function`](crate::analysis::Function)

mod block;
mod builder;
mod function;
mod instruction;
mod variable;

pub use block::SsaBlock;
pub use builder::compute_ssa;
pub use function::SsaFunction;
pub use instruction::SsaInsn;
pub use variable::{InsnRef, SsaVarId, SsaVariable};
