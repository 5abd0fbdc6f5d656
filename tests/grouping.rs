//! Array grouping integration tests.
//!
//! Builds loop nests through the public API and checks which memory
//! accesses the grouping driver puts together.

use adfa::{
    analysis::{analyze_function, ArrayGrouping, DriverFlags, EdgeKind, Function, FunctionBuilder},
    arch::{x86, Access, Instruction, MemoryOperand, OpcodeFamily, Operand, Register, X86_64},
    Result,
};

fn insn(address: u64, mnemonic: &str, family: OpcodeFamily, operands: Vec<Operand>) -> Instruction {
    operands
        .into_iter()
        .fold(Instruction::new(address, 4, mnemonic, family), Instruction::with_operand)
}

fn load(address: u64, base: Register, index: Register, offset: i64, dst: Register) -> Instruction {
    insn(address, "mov", OpcodeFamily::Move, vec![
        Operand::mem(MemoryOperand::base_index(base, index, 8, offset), Access::Read),
        Operand::reg_write(dst),
    ])
}

fn store(address: u64, src: Register, base: Register, index: Register, offset: i64) -> Instruction {
    insn(address, "mov", OpcodeFamily::Move, vec![
        Operand::reg_read(src),
        Operand::mem(MemoryOperand::base_index(base, index, 8, offset), Access::Write),
    ])
}

/// Two-level nest, `B1` outer header, `B2` inner self loop:
///
/// ```text
/// B0: xor %rcx, %rcx
/// B1: xor %rdx, %rdx            ; outer: for rcx
///     mov (%rsi,%rcx,8), %r8    ; outer-only access
/// B2: mov (%rdi,%rdx,8), %rax   ; inner: for rdx
///     mov %rax, 8(%rdi,%rdx,8)
///     mov (%rbx,%rdx,8), %r9
///     mov %r9, (%rbx,%rdx,8)
///     inc %rdx
/// B3: inc %rcx
/// B4: ret
/// ```
fn loop_nest() -> Result<Function> {
    let zero = |address, register| {
        insn(address, "xor", OpcodeFamily::Xor, vec![
            Operand::reg_read(register),
            Operand::reg_rw(register),
        ])
    };

    let mut builder = FunctionBuilder::new("loop_nest", &X86_64);
    let b0 = builder.add_block(vec![zero(0x1000, x86::RCX)]);
    let b1 = builder.add_block(vec![
        zero(0x1010, x86::RDX),
        load(0x1014, x86::RSI, x86::RCX, 0, x86::R8),
    ]);
    let b2 = builder.add_block(vec![
        load(0x1020, x86::RDI, x86::RDX, 0, x86::RAX),
        store(0x1024, x86::RAX, x86::RDI, x86::RDX, 8),
        load(0x1028, x86::RBX, x86::RDX, 0, x86::R9),
        store(0x102c, x86::R9, x86::RBX, x86::RDX, 0),
        insn(0x1030, "inc", OpcodeFamily::Inc, vec![Operand::reg_rw(x86::RDX)]),
    ]);
    let b3 = builder.add_block(vec![insn(0x1040, "inc", OpcodeFamily::Inc, vec![
        Operand::reg_rw(x86::RCX),
    ])]);
    let b4 = builder.add_block(vec![insn(0x1050, "ret", OpcodeFamily::Ret, Vec::new())]);

    builder.add_edge(b0, b1, EdgeKind::Fallthrough)?;
    builder.add_edge(b1, b2, EdgeKind::Fallthrough)?;
    builder.add_edge(b2, b2, EdgeKind::ConditionalTaken)?;
    builder.add_edge(b2, b3, EdgeKind::ConditionalNotTaken)?;
    builder.add_edge(b3, b1, EdgeKind::ConditionalTaken)?;
    builder.add_edge(b3, b4, EdgeKind::ConditionalNotTaken)?;
    builder.build()
}

#[test]
fn only_innermost_loops_are_grouped() -> Result<()> {
    let function = loop_nest()?;
    assert_eq!(function.loops().len(), 2);

    let analysis = analyze_function(&function, &mut ArrayGrouping::new())?;
    let state = analysis.state();
    assert_eq!(state.len(), 1);

    let inner = state.loops().next().expect("inner loop");
    assert_eq!(inner.header().index(), 2);
    assert!(inner.group_of(0x1014).is_none());
    Ok(())
}

#[test]
fn accesses_group_by_array() -> Result<()> {
    let function = loop_nest()?;
    let analysis = analyze_function(&function, &mut ArrayGrouping::new())?;
    let inner = analysis.state().loops().next().expect("inner loop");

    assert_eq!(inner.groups().len(), 2);
    let shared: Vec<_> = inner.shared_groups().map(|(_, a)| a.to_vec()).collect();
    assert_eq!(shared, vec![vec![0x1028, 0x102c], vec![0x1020, 0x1024]]);

    let rdi = inner.group_of(0x1020).expect("rdi group");
    let rbx = inner.group_of(0x1028).expect("rbx group");
    assert_ne!(rdi, rbx);
    assert!(rdi.starts_with("@[(rdi_0+"));
    assert!(rbx.starts_with("@[(rbx_0+"));
    Ok(())
}

#[test]
fn grouping_is_stable_across_runs_and_flags() -> Result<()> {
    let function = loop_nest()?;
    let first = analyze_function(&function, &mut ArrayGrouping::new())?.into_state();
    let second = analyze_function(&function, &mut ArrayGrouping::new())?.into_state();
    let untracked = analyze_function(
        &function,
        &mut ArrayGrouping::with_flags(DriverFlags::NO_MEMORY_TRACKING),
    )?
    .into_state();

    assert_eq!(first.clone().into_loops(), second.into_loops());
    assert_eq!(first.into_loops(), untracked.into_loops());
    Ok(())
}
