//! Decoded instruction model consumed by SSA construction and evaluation.
//!
//! The layout mirrors what a disassembler front end hands over after
//! classification:
//!
//! - [`Register`] - architecture-neutral register identity
//! - [`MemoryOperand`] - `[base + index*scale + offset]` addressing
//! - [`OperandKind`] / [`Operand`] - one explicit operand plus its access mode
//! - [`OpcodeFamily`] - coarse semantic class of an instruction
//! - [`Instruction`] - a decoded instruction with explicit and implicit operands
//!
//! # Operand order
//!
//! Operands are stored sources first, destination last (AT&T order). For a
//! two-operand `add` the first operand (`src0`) is the addend and the second
//! (`src1`) is both the augend and the destination.

use std::fmt;

use strum::{Display, EnumCount, EnumIter};

/// Architecture-neutral register identity.
///
/// The numeric value is an index into the owning
/// [`Architecture`](crate::arch::Architecture)'s register table; only the
/// architecture knows how to name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(pub u16);

impl Register {
    /// Returns the raw register number.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// How an instruction touches an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Operand is only read
    Read,
    /// Operand is only written
    Write,
    /// Operand is read, then written
    ReadWrite,
}

impl Access {
    /// Returns `true` if the operand value is consumed.
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    /// Returns `true` if the operand is a destination.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// A memory reference `[base + index*scale + offset]`.
///
/// Every component is optional except the offset, which defaults to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOperand {
    /// Base register
    pub base: Option<Register>,
    /// Index register
    pub index: Option<Register>,
    /// Scale applied to the index (1, 2, 4 or 8)
    pub scale: u8,
    /// Signed displacement
    pub offset: i64,
}

impl MemoryOperand {
    /// `[base + offset]`
    #[must_use]
    pub fn base_offset(base: Register, offset: i64) -> Self {
        MemoryOperand {
            base: Some(base),
            index: None,
            scale: 1,
            offset,
        }
    }

    /// `[base + index*scale + offset]`
    #[must_use]
    pub fn base_index(base: Register, index: Register, scale: u8, offset: i64) -> Self {
        MemoryOperand {
            base: Some(base),
            index: Some(index),
            scale,
            offset,
        }
    }

    /// `[index*scale + offset]`
    #[must_use]
    pub fn index_only(index: Register, scale: u8, offset: i64) -> Self {
        MemoryOperand {
            base: None,
            index: Some(index),
            scale,
            offset,
        }
    }

    /// `[offset]`
    #[must_use]
    pub fn absolute(offset: i64) -> Self {
        MemoryOperand {
            base: None,
            index: None,
            scale: 1,
            offset,
        }
    }
}

/// Shape of an explicit operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    /// Constant value encoded in the instruction
    Immediate(i64),
    /// Plain register
    Register(Register),
    /// Register selected through an index register, such as a vector lane
    IndexedRegister {
        /// The register being accessed
        register: Register,
        /// The register selecting the element
        index: Register,
    },
    /// Memory reference with explicit base/index
    Memory(MemoryOperand),
    /// Memory reference relative to the program counter
    MemoryRelative(MemoryOperand),
    /// Absolute code pointer, e.g. a direct branch or call target
    Pointer(u64),
}

impl OperandKind {
    /// Returns the registers occupying this operand's SSA slots as
    /// `(primary, secondary)`: the register or base, then the index.
    #[must_use]
    pub fn slot_registers(&self) -> (Option<Register>, Option<Register>) {
        match self {
            OperandKind::Register(reg) => (Some(*reg), None),
            OperandKind::IndexedRegister { register, index } => (Some(*register), Some(*index)),
            OperandKind::Memory(mem) | OperandKind::MemoryRelative(mem) => (mem.base, mem.index),
            OperandKind::Immediate(_) | OperandKind::Pointer(_) => (None, None),
        }
    }
}

/// An explicit instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// What the operand is
    pub kind: OperandKind,
    /// How the instruction uses it
    pub access: Access,
}

impl Operand {
    /// Immediate source operand.
    #[must_use]
    pub fn imm(value: i64) -> Self {
        Operand {
            kind: OperandKind::Immediate(value),
            access: Access::Read,
        }
    }

    /// Register operand with explicit access mode.
    #[must_use]
    pub fn reg(register: Register, access: Access) -> Self {
        Operand {
            kind: OperandKind::Register(register),
            access,
        }
    }

    /// Register operand that is only read.
    #[must_use]
    pub fn reg_read(register: Register) -> Self {
        Self::reg(register, Access::Read)
    }

    /// Register operand that is only written.
    #[must_use]
    pub fn reg_write(register: Register) -> Self {
        Self::reg(register, Access::Write)
    }

    /// Register operand that is read and then written.
    #[must_use]
    pub fn reg_rw(register: Register) -> Self {
        Self::reg(register, Access::ReadWrite)
    }

    /// Indexed register operand.
    #[must_use]
    pub fn indexed(register: Register, index: Register, access: Access) -> Self {
        Operand {
            kind: OperandKind::IndexedRegister { register, index },
            access,
        }
    }

    /// Memory operand. The access mode describes the memory cell; the
    /// address registers are always read.
    #[must_use]
    pub fn mem(memory: MemoryOperand, access: Access) -> Self {
        Operand {
            kind: OperandKind::Memory(memory),
            access,
        }
    }

    /// Program-counter relative memory operand.
    #[must_use]
    pub fn mem_relative(memory: MemoryOperand, access: Access) -> Self {
        Operand {
            kind: OperandKind::MemoryRelative(memory),
            access,
        }
    }

    /// Code pointer operand.
    #[must_use]
    pub fn pointer(target: u64) -> Self {
        Operand {
            kind: OperandKind::Pointer(target),
            access: Access::Read,
        }
    }

    /// Returns the memory reference if this is a memory-shaped operand.
    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryOperand> {
        match &self.kind {
            OperandKind::Memory(mem) | OperandKind::MemoryRelative(mem) => Some(mem),
            _ => None,
        }
    }

    /// Returns the immediate value if this is an immediate operand.
    #[must_use]
    pub fn as_immediate(&self) -> Option<i64> {
        match self.kind {
            OperandKind::Immediate(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the register if this is a plain register operand.
    #[must_use]
    pub fn as_register(&self) -> Option<Register> {
        match self.kind {
            OperandKind::Register(reg) => Some(reg),
            _ => None,
        }
    }
}

/// Coarse semantic class of an instruction.
///
/// The evaluator models a handful of families precisely; everything else
/// yields an opaque placeholder for its primary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum OpcodeFamily {
    /// Register/memory/immediate copy
    Move,
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Logical shift left
    Shl,
    /// Arithmetic shift left
    Sal,
    /// Logical shift right
    Shr,
    /// Arithmetic shift right
    Sar,
    /// Exclusive or
    Xor,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Address computation without dereference
    Lea,
    /// Increment by one
    Inc,
    /// Decrement by one
    Dec,
    /// Square root
    Sqrt,
    /// Vector gather load
    Gather,
    /// Comparison setting flags
    Cmp,
    /// Bit test setting flags
    Test,
    /// Stack push
    Push,
    /// Stack pop
    Pop,
    /// Call
    Call,
    /// Return
    Ret,
    /// Unconditional jump
    Jump,
    /// Conditional jump
    CondJump,
    /// No operation
    Nop,
    /// Anything not classified above
    Other,
}

impl OpcodeFamily {
    /// Returns `true` for families that transfer control.
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OpcodeFamily::Call | OpcodeFamily::Ret | OpcodeFamily::Jump | OpcodeFamily::CondJump
        )
    }
}

/// A decoded machine instruction.
///
/// Built with a small fluent API:
///
/// ```rust
/// use adfa::arch::{Instruction, MemoryOperand, OpcodeFamily, Operand, Access, x86};
///
/// // mov rax, [rbx + rcx*8 + 0x10]
/// let insn = Instruction::new(0x1000, 5, "mov", OpcodeFamily::Move)
///     .with_operand(Operand::mem(
///         MemoryOperand::base_index(x86::RBX, x86::RCX, 8, 0x10),
///         Access::Read,
///     ))
///     .with_operand(Operand::reg_write(x86::RAX));
///
/// assert_eq!(insn.operand_count(), 2);
/// assert_eq!(insn.next_address(), 0x1005);
/// assert!(insn.references_memory());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Virtual address of the first byte
    pub address: u64,
    /// Encoded length in bytes
    pub size: u8,
    /// Assembler mnemonic
    pub mnemonic: String,
    /// Semantic class
    pub family: OpcodeFamily,
    /// Explicit operands, sources first, destination last
    pub operands: Vec<Operand>,
    /// Registers read without appearing as operands
    pub implicit_reads: Vec<Register>,
    /// Registers written without appearing as operands
    pub implicit_writes: Vec<Register>,
}

impl Instruction {
    /// Creates an instruction without operands.
    #[must_use]
    pub fn new(address: u64, size: u8, mnemonic: impl Into<String>, family: OpcodeFamily) -> Self {
        Instruction {
            address,
            size,
            mnemonic: mnemonic.into(),
            family,
            operands: Vec::new(),
            implicit_reads: Vec::new(),
            implicit_writes: Vec::new(),
        }
    }

    /// Appends an explicit operand.
    #[must_use]
    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    /// Appends an implicitly read register.
    #[must_use]
    pub fn with_implicit_read(mut self, register: Register) -> Self {
        self.implicit_reads.push(register);
        self
    }

    /// Appends an implicitly written register.
    #[must_use]
    pub fn with_implicit_write(mut self, register: Register) -> Self {
        self.implicit_writes.push(register);
        self
    }

    /// Returns the number of explicit operands.
    #[must_use]
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Returns the explicit operand at `position`.
    #[must_use]
    pub fn operand(&self, position: usize) -> Option<&Operand> {
        self.operands.get(position)
    }

    /// Returns the address of the instruction that follows this one.
    #[must_use]
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(u64::from(self.size))
    }

    /// Returns the first memory-shaped operand and its position.
    #[must_use]
    pub fn memory_operand(&self) -> Option<(usize, &MemoryOperand)> {
        self.operands
            .iter()
            .enumerate()
            .find_map(|(position, op)| op.as_memory().map(|mem| (position, mem)))
    }

    /// Returns `true` if any explicit operand references memory.
    #[must_use]
    pub fn references_memory(&self) -> bool {
        self.memory_operand().is_some()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}: {}", self.address, self.mnemonic)
    }
}
