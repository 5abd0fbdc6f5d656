//! Control-flow graphs of machine-code functions.
//!
//! [`FunctionBuilder`] assembles a [`Function`] from basic blocks and typed
//! edges. The function lazily derives everything the data-flow engine asks
//! about its shape:
//!
//! - the dominator tree ([`Function::dominators`])
//! - natural loops with nesting and entries ([`Function::loops`], [`loops`])
//! - back-edge classification ([`Function::is_backedge`])
//! - SSA form ([`Function::ssa`])

mod function;
pub mod loops;

pub use function::{BasicBlock, EdgeKind, Function, FunctionBuilder};
pub use loops::{detect_loops, LoopForest, LoopInfo};
