//! Program analysis over machine-code functions.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules, each building
//! on the previous one:
//!
//! - [`cfg`] - functions as control flow graphs, with lazily computed
//!   dominators and natural loops
//! - [`ssa`] - SSA construction (Cytron et al.) over the register model
//! - [`dataflow`] - the symbolic data-flow engine and its driver protocol
//! - [`grouping`] - a driver grouping in-loop memory accesses by array base
//!
//! # Usage
//!
//! ```rust
//! use adfa::analysis::{analyze_function, ArrayGrouping, EdgeKind, FunctionBuilder};
//! use adfa::arch::{x86, Access, Instruction, MemoryOperand, OpcodeFamily, Operand, X86_64};
//!
//! let mut builder = FunctionBuilder::new("sum", &X86_64);
//! let body = builder.add_block(vec![
//!     Instruction::new(0x10, 4, "add", OpcodeFamily::Add)
//!         .with_operand(Operand::mem(
//!             MemoryOperand::base_index(x86::RDI, x86::RCX, 8, 0),
//!             Access::Read,
//!         ))
//!         .with_operand(Operand::reg_rw(x86::RAX)),
//!     Instruction::new(0x14, 4, "inc", OpcodeFamily::Inc).with_operand(Operand::reg_rw(x86::RCX)),
//! ]);
//! let exit = builder.add_block(vec![Instruction::new(0x18, 1, "ret", OpcodeFamily::Ret)]);
//! builder.add_edge(body, body, EdgeKind::ConditionalTaken)?;
//! builder.add_edge(body, exit, EdgeKind::ConditionalNotTaken)?;
//! let function = builder.build()?;
//!
//! let analysis = analyze_function(&function, &mut ArrayGrouping::new())?;
//! assert_eq!(analysis.state().len(), 1);
//! # Ok::<(), adfa::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
pub mod grouping;
pub mod ssa;

// Re-export primary types at module level
pub use cfg::{BasicBlock, EdgeKind, Function, FunctionBuilder, LoopForest, LoopInfo};
pub use dataflow::{
    analyze_function, analyze_functions, Analysis, AnalysisContext, BlockStatus, Driver,
    DriverFlags, Rvals, Scheduler, SymOp, SymVal, SymValKind, ValueArena, ValueId, ValueStore,
};
pub use grouping::{ArrayGrouping, GroupingState, LoopGroups};
pub use ssa::{compute_ssa, InsnRef, SsaBlock, SsaFunction, SsaInsn, SsaVarId, SsaVariable};
