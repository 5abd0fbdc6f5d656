// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # adfa
//!
//! Symbolic data-flow analysis over the SSA form of machine-code functions.
//!
//! For every register value produced by the instructions of a function,
//! `adfa` computes a symbolic expression describing how the value was built
//! from constants, function inputs and memory. The analysis is a single
//! pass in a backedge-aware block order; loops are not iterated to a
//! fixpoint, values merged at a loop header stay opaque.
//!
//! ## Quick Start
//!
//! ```rust
//! use adfa::prelude::*;
//!
//! let mut builder = FunctionBuilder::new("scale", &X86_64);
//! builder.add_block(vec![
//!     Instruction::new(0x1000, 4, "mov", OpcodeFamily::Move)
//!         .with_operand(Operand::imm(4))
//!         .with_operand(Operand::reg_write(x86::RCX)),
//!     Instruction::new(0x1004, 4, "shl", OpcodeFamily::Shl)
//!         .with_operand(Operand::imm(2))
//!         .with_operand(Operand::reg_rw(x86::RCX)),
//! ]);
//! let function = builder.build()?;
//!
//! // no loops, so the grouping client reports nothing
//! let mut analysis = analyze_function(&function, &mut ArrayGrouping::new())?;
//! assert!(analysis.state().is_empty());
//!
//! // values are still available on demand
//! let shl = &function.ssa().blocks()[0].instructions[1];
//! let value = analysis.context_mut().analyze_instruction(shl).expect("modeled");
//! assert!(matches!(
//!     analysis.context().store().node(value).kind,
//!     SymValKind::BinOp { op: SymOp::ShiftLeft, .. }
//! ));
//! # Ok::<(), adfa::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`arch`] - register model, operands and opcode families
//! - [`analysis`] - control-flow graphs, loops, SSA construction, the
//!   data-flow engine and the array-grouping client
//! - [`utils`] - the directed graph and its algorithms
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Writing a client
//!
//! Clients implement [`analysis::Driver`]. The engine calls `init` once,
//! then `insn_filter` and `insn_execute` for every machine instruction in
//! block order and `propagate` after each block. See
//! [`analysis::ArrayGrouping`] for a complete client.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger itself.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use adfa::prelude::*;
///
/// let function = FunctionBuilder::new("empty", &X86_64).build();
/// assert!(matches!(function, Err(Error::EmptyFunction)));
/// ```
pub mod prelude;

/// Target architecture model: registers, operands, instructions.
pub mod arch;

/// Control flow, SSA construction and the data-flow engine.
pub mod analysis;

/// Generic helpers, currently the graph library.
pub mod utils;

/// `adfa` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `adfa` Error type
///
/// # Examples
///
/// ```rust
/// use adfa::{analysis::FunctionBuilder, arch::X86_64, Error};
///
/// match FunctionBuilder::new("f", &X86_64).build() {
///     Ok(function) => println!("{} blocks", function.block_count()),
///     Err(Error::EmptyFunction) => println!("nothing to analyze"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;
