//! Symbolic data-flow analysis over SSA form.
//!
//! The engine computes, for every value produced by the machine
//! instructions of a function, a symbolic expression describing how it was
//! built. It runs a single pass over the blocks and does not iterate loops
//! to a fixpoint: a phi merging more than one incoming value becomes an
//! opaque placeholder.
//!
//! # Architecture
//!
//! - [`value`] - the expression model: [`SymVal`] nodes in an append-only
//!   [`ValueArena`], SSA bindings in [`Rvals`], both owned by a [`ValueStore`]
//! - `render` - the canonical string form used to compare addresses
//! - `evaluator` - per-opcode-family evaluation with memoization
//! - [`Scheduler`] - backedge-aware block ordering with a fallback for
//!   irreducible graphs
//! - [`Driver`] / [`AnalysisContext`] - the client protocol and the session
//!
//! # Example
//!
//! ```rust
//! use adfa::analysis::{
//!     analyze_function, AnalysisContext, Driver, Function, FunctionBuilder, EdgeKind,
//! };
//! use adfa::arch::{x86, Access, Instruction, MemoryOperand, OpcodeFamily, Operand, X86_64};
//!
//! struct Loads;
//! impl Driver for Loads {
//!     type State = ();
//!     fn init(&mut self, _: &Function, _: &AnalysisContext<'_>) {}
//! }
//!
//! let mut builder = FunctionBuilder::new("f", &X86_64);
//! let b0 = builder.add_block(vec![Instruction::new(0x10, 4, "mov", OpcodeFamily::Move)
//!     .with_operand(Operand::imm(0x400))
//!     .with_operand(Operand::reg_write(x86::RBX))]);
//! let b1 = builder.add_block(vec![Instruction::new(0x14, 4, "mov", OpcodeFamily::Move)
//!     .with_operand(Operand::mem(MemoryOperand::base_offset(x86::RBX, 8), Access::Read))
//!     .with_operand(Operand::reg_write(x86::RAX))]);
//! builder.add_edge(b0, b1, EdgeKind::Fallthrough)?;
//! let function = builder.build()?;
//!
//! let analysis = analyze_function(&function, &mut Loads)?;
//! let load = &function.ssa().blocks()[1].instructions[0];
//! let value = analysis.context().value_of(load.outputs[0]).expect("bound");
//! assert_eq!(analysis.context().render(value), "@[(8+1024)]");
//! # Ok::<(), adfa::Error>(())
//! ```

mod context;
mod driver;
mod evaluator;
mod render;
mod scheduler;
pub mod value;

pub use context::{analyze_function, analyze_functions, Analysis, AnalysisContext};
pub use driver::{Driver, DriverFlags};
pub use evaluator::MAX_RESOLVE_DEPTH;
pub use scheduler::{BlockStatus, Scheduler};
pub use value::{Rvals, SymOp, SymVal, SymValKind, ValueArena, ValueDisplay, ValueId, ValueStore};
