//! Target architecture model.
//!
//! The data-flow engine is architecture-neutral: it sees registers as opaque
//! [`Register`] numbers and asks an [`Architecture`] for the two facts it
//! cannot infer, which register is the program counter and how a register is
//! named when an expression is rendered. Instruction semantics come from the
//! [`OpcodeFamily`] a decoder assigned, not from mnemonics.
//!
//! [`X86_64`] is the bundled implementation.

mod types;
pub mod x86;

pub use types::{
    Access, Instruction, MemoryOperand, OpcodeFamily, Operand, OperandKind, Register,
};
pub use x86::X86_64;

/// Register-level facts about a target architecture.
///
/// Implementations are stateless descriptors shared by every function of a
/// program, so they are `Send + Sync` and normally referenced as
/// `&'static dyn Architecture`.
pub trait Architecture: Send + Sync {
    /// Short architecture name, e.g. `"x86-64"`.
    fn name(&self) -> &'static str;

    /// The program counter register.
    fn program_counter(&self) -> Register;

    /// Human-readable name of `register`.
    fn register_name(&self, register: Register) -> String;

    /// Returns `true` if `register` is the program counter.
    fn is_program_counter(&self, register: Register) -> bool {
        register == self.program_counter()
    }
}
