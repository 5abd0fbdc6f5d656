//! Benchmarks for the data-flow engine.
//!
//! Runs the array grouping driver over synthetic loop nests:
//! - a deep nest of small loops
//! - one wide loop body with many array accesses
//! - the same functions with SSA construction included

extern crate adfa;

use adfa::{
    analysis::{analyze_function, analyze_functions, ArrayGrouping, EdgeKind, Function, FunctionBuilder},
    arch::{x86, Access, Instruction, MemoryOperand, OpcodeFamily, Operand, X86_64},
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

const BASES: [adfa::arch::Register; 4] = [x86::RDI, x86::RSI, x86::RBX, x86::R8];

fn access(address: u64, slot: usize) -> Instruction {
    Instruction::new(address, 4, "mov", OpcodeFamily::Move)
        .with_operand(Operand::mem(
            MemoryOperand::base_index(BASES[slot % BASES.len()], x86::RCX, 8, (slot as i64) * 8),
            Access::Read,
        ))
        .with_operand(Operand::reg_write(x86::RAX))
}

/// `depth` nested loops, each header doing `accesses` loads and one increment.
fn loop_nest(depth: usize, accesses: usize) -> Function {
    let mut builder = FunctionBuilder::new("nest", &X86_64);
    let mut address = 0x1000u64;
    let mut next = |builder: &mut FunctionBuilder, count: usize| {
        let mut instructions = Vec::with_capacity(count + 1);
        for slot in 0..count {
            instructions.push(access(address, slot));
            address += 4;
        }
        instructions.push(
            Instruction::new(address, 4, "inc", OpcodeFamily::Inc)
                .with_operand(Operand::reg_rw(x86::RCX)),
        );
        address += 4;
        builder.add_block(instructions)
    };

    let entry = next(&mut builder, 0);
    let headers: Vec<_> = (0..depth).map(|_| next(&mut builder, accesses)).collect();
    let exit = next(&mut builder, 0);

    let mut previous = entry;
    for &header in &headers {
        builder
            .add_edge(previous, header, EdgeKind::Fallthrough)
            .expect("valid edge");
        previous = header;
    }
    builder
        .add_edge(previous, previous, EdgeKind::ConditionalTaken)
        .expect("valid edge");
    for pair in headers.windows(2).rev() {
        builder
            .add_edge(pair[1], pair[0], EdgeKind::ConditionalTaken)
            .expect("valid edge");
    }
    builder
        .add_edge(headers[0], exit, EdgeKind::ConditionalNotTaken)
        .expect("valid edge");
    builder.build().expect("valid function")
}

fn bench_deep_nest(c: &mut Criterion) {
    let function = loop_nest(64, 4);
    let _ = function.ssa();

    c.bench_function("dataflow_deep_nest", |b| {
        b.iter(|| {
            let analysis = analyze_function(black_box(&function), &mut ArrayGrouping::new())
                .expect("analysis");
            black_box(analysis.into_state())
        });
    });
}

fn bench_wide_body(c: &mut Criterion) {
    let function = loop_nest(1, 512);
    let _ = function.ssa();

    c.bench_function("dataflow_wide_body", |b| {
        b.iter(|| {
            let analysis = analyze_function(black_box(&function), &mut ArrayGrouping::new())
                .expect("analysis");
            black_box(analysis.into_state())
        });
    });
}

fn bench_with_ssa(c: &mut Criterion) {
    c.bench_function("dataflow_with_ssa", |b| {
        b.iter_batched(
            || loop_nest(16, 16),
            |function| {
                let analysis =
                    analyze_function(&function, &mut ArrayGrouping::new()).expect("analysis");
                black_box(analysis.state().len())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_parallel(c: &mut Criterion) {
    let functions: Vec<Function> = (0..64).map(|_| loop_nest(8, 8)).collect();
    for function in &functions {
        let _ = function.ssa();
    }

    c.bench_function("dataflow_parallel_64", |b| {
        b.iter(|| {
            let results = analyze_functions(black_box(&functions), |_| ArrayGrouping::new());
            black_box(results.len())
        });
    });
}

criterion_group!(
    benches,
    bench_deep_nest,
    bench_wide_body,
    bench_with_ssa,
    bench_parallel
);
criterion_main!(benches);
