//! Function factories shared by the unit tests.
//!
//! Every instruction built here is 4 bytes long, so `next_address` is always
//! `address + 4`. Blocks are laid out at ascending addresses.

use crate::{
    analysis::{EdgeKind, Function, FunctionBuilder, SsaFunction, SsaVarId},
    arch::{x86, Access, Instruction, MemoryOperand, OpcodeFamily, Operand, Register, X86_64},
    utils::graph::NodeId,
    Result,
};

// Helper function to create an instruction from explicit operands
pub fn insn(address: u64, mnemonic: &str, family: OpcodeFamily, operands: Vec<Operand>) -> Instruction {
    operands
        .into_iter()
        .fold(Instruction::new(address, 4, mnemonic, family), Instruction::with_operand)
}

// Helper function to create a nop
pub fn nop(address: u64) -> Instruction {
    insn(address, "nop", OpcodeFamily::Nop, Vec::new())
}

// Helper function to create `mov $value, %reg`
pub fn mov_imm(address: u64, value: i64, register: Register) -> Instruction {
    insn(address, "mov", OpcodeFamily::Move, vec![
        Operand::imm(value),
        Operand::reg_write(register),
    ])
}

// Helper function to create a function made of one block
pub fn single_block(instructions: Vec<Instruction>) -> Result<Function> {
    let mut builder = FunctionBuilder::new("single_block", &X86_64);
    builder.add_block(instructions);
    builder.build()
}

// Helper function to create a function of nop blocks wired by `edges`
fn nop_graph(name: &str, blocks: usize, edges: &[(usize, usize)]) -> Result<Function> {
    let mut builder = FunctionBuilder::new(name, &X86_64);
    for i in 0..blocks {
        builder.add_block(vec![nop(0x1000 + i as u64 * 0x10)]);
    }
    for &(src, dst) in edges {
        let kind = if dst == src + 1 {
            EdgeKind::Fallthrough
        } else {
            EdgeKind::Jump
        };
        builder.add_edge(NodeId::new(src), NodeId::new(dst), kind)?;
    }
    builder.build()
}

/// `B0 -> B1 -> B2`:
///
/// ```text
/// B0: mov $5, %rcx
/// B1: add %rcx, $3, %rdx
/// B2: mov (%rdx), %rax
/// ```
pub fn straight_line() -> Result<Function> {
    let mut builder = FunctionBuilder::new("straight_line", &X86_64);
    let b0 = builder.add_block(vec![mov_imm(0x1000, 5, x86::RCX)]);
    let b1 = builder.add_block(vec![insn(0x1004, "add", OpcodeFamily::Add, vec![
        Operand::reg_read(x86::RCX),
        Operand::imm(3),
        Operand::reg_write(x86::RDX),
    ])]);
    let b2 = builder.add_block(vec![insn(0x1008, "mov", OpcodeFamily::Move, vec![
        Operand::mem(MemoryOperand::base_offset(x86::RDX, 0), Access::Read),
        Operand::reg_write(x86::RAX),
    ])]);
    builder.add_edge(b0, b1, EdgeKind::Fallthrough)?;
    builder.add_edge(b1, b2, EdgeKind::Fallthrough)?;
    builder.build()
}

/// Diamond `B0 -> {B1, B2} -> B3` where both arms write `register` and the
/// join copies it into `%rbx`.
pub fn diamond_redefining(register: Register) -> Result<Function> {
    let mut builder = FunctionBuilder::new("diamond", &X86_64);
    let b0 = builder.add_block(vec![insn(0x1000, "jne", OpcodeFamily::CondJump, vec![
        Operand::pointer(0x1020),
    ])]);
    let b1 = builder.add_block(vec![
        mov_imm(0x1010, 1, register),
        insn(0x1014, "jmp", OpcodeFamily::Jump, vec![Operand::pointer(0x1030)]),
    ]);
    let b2 = builder.add_block(vec![mov_imm(0x1020, 2, register)]);
    let b3 = builder.add_block(vec![insn(0x1030, "mov", OpcodeFamily::Move, vec![
        Operand::reg_read(register),
        Operand::reg_write(x86::RBX),
    ])]);
    builder.add_edge(b0, b1, EdgeKind::ConditionalNotTaken)?;
    builder.add_edge(b0, b2, EdgeKind::ConditionalTaken)?;
    builder.add_edge(b1, b3, EdgeKind::Jump)?;
    builder.add_edge(b2, b3, EdgeKind::Fallthrough)?;
    builder.build()
}

/// Single block looping on itself while incrementing `%rcx`.
pub fn self_loop() -> Result<Function> {
    let mut builder = FunctionBuilder::new("self_loop", &X86_64);
    let b0 = builder.add_block(vec![
        insn(0x1000, "inc", OpcodeFamily::Inc, vec![Operand::reg_rw(x86::RCX)]),
        insn(0x1004, "jmp", OpcodeFamily::Jump, vec![Operand::pointer(0x1000)]),
    ]);
    builder.add_edge(b0, b0, EdgeKind::Jump)?;
    builder.build()
}

/// `0 -> 1 -> 2 -> 3 -> 2`, `3 -> 4 -> 1`, `4 -> 5`: loop `{1..4}` around loop `{2, 3}`.
pub fn nested_loops() -> Result<Function> {
    nop_graph(
        "nested_loops",
        6,
        &[(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (4, 5)],
    )
}

/// `0 -> {1, 2}`, `1 <-> 2`: a cycle with two entries and no natural loop.
pub fn irreducible() -> Result<Function> {
    nop_graph("irreducible", 3, &[(0, 1), (0, 2), (1, 2), (2, 1)])
}

/// Two blocks without any edge.
pub fn with_unreachable_block() -> Result<Function> {
    nop_graph("unreachable", 2, &[])
}

/// Array loop in `B1`, entered from `B0` and left to `B2`:
///
/// ```text
/// B0: 0x1000 xor %rcx, %rcx
/// B1: 0x1010 mov (%rdi,%rcx,4), %rax
///     0x1014 mov %rax, 4(%rdi,%rcx,4)
///     0x1018 add (%rsi,%rcx,4), %rax
///     0x101c lea (%rdi,%rcx,4), %rdx
///     0x1020 inc %rcx
///     0x1024 cmp $64, %rcx
///     0x1028 jl 0x1010
/// B2: 0x1030 mov (%rdx), %rax
/// ```
pub fn array_loop() -> Result<Function> {
    let rdi_rcx = |offset| MemoryOperand::base_index(x86::RDI, x86::RCX, 4, offset);

    let mut builder = FunctionBuilder::new("array_loop", &X86_64);
    let b0 = builder.add_block(vec![insn(0x1000, "xor", OpcodeFamily::Xor, vec![
        Operand::reg_read(x86::RCX),
        Operand::reg_rw(x86::RCX),
    ])]);
    let b1 = builder.add_block(vec![
        insn(0x1010, "mov", OpcodeFamily::Move, vec![
            Operand::mem(rdi_rcx(0), Access::Read),
            Operand::reg_write(x86::RAX),
        ]),
        insn(0x1014, "mov", OpcodeFamily::Move, vec![
            Operand::reg_read(x86::RAX),
            Operand::mem(rdi_rcx(4), Access::Write),
        ]),
        insn(0x1018, "add", OpcodeFamily::Add, vec![
            Operand::mem(MemoryOperand::base_index(x86::RSI, x86::RCX, 4, 0), Access::Read),
            Operand::reg_rw(x86::RAX),
        ]),
        insn(0x101c, "lea", OpcodeFamily::Lea, vec![
            Operand::mem(rdi_rcx(0), Access::Read),
            Operand::reg_write(x86::RDX),
        ]),
        insn(0x1020, "inc", OpcodeFamily::Inc, vec![Operand::reg_rw(x86::RCX)]),
        insn(0x1024, "cmp", OpcodeFamily::Cmp, vec![
            Operand::imm(64),
            Operand::reg_read(x86::RCX),
        ]),
        insn(0x1028, "jl", OpcodeFamily::CondJump, vec![Operand::pointer(0x1010)]),
    ]);
    let b2 = builder.add_block(vec![insn(0x1030, "mov", OpcodeFamily::Move, vec![
        Operand::mem(MemoryOperand::base_offset(x86::RDX, 0), Access::Read),
        Operand::reg_write(x86::RAX),
    ])]);
    builder.add_edge(b0, b1, EdgeKind::Fallthrough)?;
    builder.add_edge(b1, b1, EdgeKind::ConditionalTaken)?;
    builder.add_edge(b1, b2, EdgeKind::ConditionalNotTaken)?;
    builder.build()
}

// Helper function to copy `ssa` with the operands of the first phi in `block` replaced.
//
// The builder gives every reachable predecessor an operand, so phis with a
// single incoming value only arise from hand-edited SSA.
pub fn with_phi_sources(
    ssa: &SsaFunction,
    block: NodeId,
    sources: Vec<Option<SsaVarId>>,
) -> SsaFunction {
    let mut edited = ssa.clone();
    if let Some(phi) = edited.blocks[block.index()]
        .instructions
        .iter_mut()
        .find(|insn| insn.is_phi())
    {
        phi.operands = sources;
    }
    edited
}
