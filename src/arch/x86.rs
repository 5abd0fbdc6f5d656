//! x86-64 register table.
//!
//! Register numbers are the indices into [`NAMES`]; the constants below are
//! the registers the rest of the crate and its tests refer to by name.

use crate::arch::{Architecture, Register};

/// Register names indexed by register number.
pub const NAMES: [&str; 34] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15", "rip", "rflags", "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6",
    "xmm7", "xmm8", "xmm9", "xmm10", "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

/// Accumulator
pub const RAX: Register = Register(0);
/// Counter
pub const RCX: Register = Register(1);
/// Data
pub const RDX: Register = Register(2);
/// Base
pub const RBX: Register = Register(3);
/// Stack pointer
pub const RSP: Register = Register(4);
/// Frame pointer
pub const RBP: Register = Register(5);
/// Source index
pub const RSI: Register = Register(6);
/// Destination index
pub const RDI: Register = Register(7);
/// Extended register r8
pub const R8: Register = Register(8);
/// Extended register r9
pub const R9: Register = Register(9);
/// Extended register r10
pub const R10: Register = Register(10);
/// Extended register r11
pub const R11: Register = Register(11);
/// Extended register r12
pub const R12: Register = Register(12);
/// Extended register r13
pub const R13: Register = Register(13);
/// Extended register r14
pub const R14: Register = Register(14);
/// Extended register r15
pub const R15: Register = Register(15);
/// Instruction pointer
pub const RIP: Register = Register(16);
/// Flags register
pub const RFLAGS: Register = Register(17);

/// Returns the SSE register `xmm{n}`, or `None` past `xmm15`.
#[must_use]
pub fn xmm(n: u16) -> Option<Register> {
    (n < 16).then_some(Register(18 + n))
}

/// The x86-64 architecture.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86_64;

impl Architecture for X86_64 {
    fn name(&self) -> &'static str {
        "x86-64"
    }

    fn program_counter(&self) -> Register {
        RIP
    }

    fn register_name(&self, register: Register) -> String {
        NAMES
            .get(register.index())
            .map_or_else(|| format!("r?{}", register.0), |name| (*name).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        assert_eq!(X86_64.register_name(RAX), "rax");
        assert_eq!(X86_64.register_name(R15), "r15");
        assert_eq!(X86_64.register_name(RIP), "rip");
        assert_eq!(X86_64.register_name(Register(500)), "r?500");
    }

    #[test]
    fn test_xmm_registers() {
        assert_eq!(xmm(0).map(|r| X86_64.register_name(r)), Some("xmm0".to_string()));
        assert_eq!(xmm(15).map(|r| X86_64.register_name(r)), Some("xmm15".to_string()));
        assert_eq!(xmm(16), None);
    }

    #[test]
    fn test_program_counter() {
        assert_eq!(X86_64.program_counter(), RIP);
        assert!(X86_64.is_program_counter(RIP));
        assert!(!X86_64.is_program_counter(RSP));
        assert_eq!(X86_64.name(), "x86-64");
    }
}
