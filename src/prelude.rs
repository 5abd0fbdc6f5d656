//! # adfa Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the adfa library. Import this module to get quick access to everything needed to
//! build a function, run an analysis and inspect its values.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all adfa operations
pub use crate::Error;

/// The result type used throughout adfa
pub use crate::Result;

// ================================================================================================
// Architecture Model
// ================================================================================================

/// Register model and decoded instructions
pub use crate::arch::{
    x86, Access, Architecture, Instruction, MemoryOperand, OpcodeFamily, Operand, OperandKind,
    Register, X86_64,
};

// ================================================================================================
// Control Flow and SSA
// ================================================================================================

/// Functions, blocks and loops
pub use crate::analysis::{BasicBlock, EdgeKind, Function, FunctionBuilder, LoopForest, LoopInfo};

/// SSA form
pub use crate::analysis::{SsaBlock, SsaFunction, SsaInsn, SsaVarId, SsaVariable};

// ================================================================================================
// Data-Flow Engine
// ================================================================================================

/// Entry points and the client protocol
pub use crate::analysis::{
    analyze_function, analyze_functions, Analysis, AnalysisContext, Driver, DriverFlags,
};

/// Symbolic values
pub use crate::analysis::{SymOp, SymVal, SymValKind, ValueId, ValueStore};

/// Array grouping client
pub use crate::analysis::{ArrayGrouping, GroupingState, LoopGroups};

// ================================================================================================
// Graph Utilities
// ================================================================================================

/// Graph node identifier
pub use crate::utils::graph::NodeId;
