//! Canonical string form of symbolic values.
//!
//! The rendered string doubles as the structural key clients compare
//! addresses by, so the output must depend only on the tree shape and the
//! memory flags. The rules:
//!
//! - every internal node is fully parenthesized: `(l+r)`, `SQRT(x)`
//! - a node whose own `is_mem` flag is set is wrapped in `@[...]`
//! - the memory context starts at the root's flag and is inherited through
//!   `Add`/`Sub`; multiplicative, shift and unary operators clear it for
//!   their operands
//! - an immediate is printed only inside a memory context or when it is the
//!   root itself; elsewhere it renders empty
//! - a register placeholder renders as `{register}_{version}`, an unresolved
//!   memory token as `mem:0x{address}`
//!
//! Rendering walks the tree with an explicit stack, so arbitrarily deep
//! expressions cannot exhaust the call stack.

use std::fmt::Write;

use crate::analysis::{
    dataflow::{
        value::{SymValKind, ValueStore},
        ValueId,
    },
    SsaVarId,
};

enum Frame {
    Visit { id: ValueId, ctx: bool, root: bool },
    Text(&'static str),
    Symbol(String),
}

/// Renders `root` to its canonical string.
pub(crate) fn render(store: &ValueStore<'_>, root: ValueId) -> String {
    let mut out = String::new();
    let mut stack = vec![Frame::Visit {
        id: root,
        ctx: store.node(root).is_mem,
        root: true,
    }];

    while let Some(frame) = stack.pop() {
        let (id, ctx, is_root) = match frame {
            Frame::Text(text) => {
                out.push_str(text);
                continue;
            }
            Frame::Symbol(text) => {
                out.push_str(&text);
                continue;
            }
            Frame::Visit { id, ctx, root } => (id, ctx, root),
        };

        let node = store.node(id);
        let effective = ctx || node.is_mem;
        if node.is_mem {
            out.push_str("@[");
            stack.push(Frame::Text("]"));
        }

        match node.kind {
            SymValKind::Imm(value) => {
                if effective || is_root {
                    let _ = write!(out, "{value}");
                }
            }
            SymValKind::Reg(var) => {
                let _ = write!(out, "{}", register_label(store, var));
            }
            SymValKind::Mem(address) => {
                let _ = write!(out, "mem:0x{address:x}");
            }
            SymValKind::BinOp { op, left, right } => {
                let child_ctx = op.is_additive() && effective;
                out.push('(');
                // Pushed in reverse: left, operator, right, closing paren.
                stack.push(Frame::Text(")"));
                stack.push(Frame::Visit {
                    id: right,
                    ctx: child_ctx,
                    root: false,
                });
                stack.push(Frame::Symbol(op.to_string()));
                stack.push(Frame::Visit {
                    id: left,
                    ctx: child_ctx,
                    root: false,
                });
            }
            SymValKind::UnOp { op, operand } => {
                let _ = write!(out, "{op}(");
                stack.push(Frame::Text(")"));
                stack.push(Frame::Visit {
                    id: operand,
                    ctx: false,
                    root: false,
                });
            }
        }
    }

    out
}

fn register_label(store: &ValueStore<'_>, var: SsaVarId) -> String {
    match store.ssa().variable(var) {
        Some(variable) => format!(
            "{}_{}",
            store.arch().register_name(variable.register),
            variable.version
        ),
        None => var.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{
            dataflow::{SymOp, ValueStore},
            SsaFunction, SsaVarId,
        },
        arch::{x86, X86_64},
    };

    fn ssa_with_rcx() -> SsaFunction {
        let mut ssa = SsaFunction::default();
        ssa.new_variable(x86::RCX, 2, None);
        ssa
    }

    #[test]
    fn test_memory_address_keeps_offsets() {
        let ssa = SsaFunction::default();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let three = store.imm(3);
        let five = store.imm(5);
        let sum = store.binop(SymOp::Add, three, five);
        let zero = store.imm(0);
        let address = store.binop(SymOp::Add, zero, sum);
        let address = store.with_mem_flag(address, true);

        assert_eq!(store.render(address), "@[(0+(3+5))]");
    }

    #[test]
    fn test_immediates_hidden_outside_memory_context() {
        let ssa = SsaFunction::default();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let three = store.imm(3);
        let five = store.imm(5);
        let sum = store.binop(SymOp::Add, three, five);

        assert_eq!(store.render(sum), "(+)");
        assert_eq!(store.render(three), "3");
    }

    #[test]
    fn test_multiplication_clears_memory_context() {
        let ssa = ssa_with_rcx();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let index = store.reg(SsaVarId::new(0));
        let scale = store.imm(8);
        let scaled = store.binop(SymOp::Mul, index, scale);
        let offset = store.imm(16);
        let address = store.binop(SymOp::Add, offset, scaled);
        let address = store.with_mem_flag(address, true);

        assert_eq!(store.render(address), "@[(16+(rcx_2*))]");
    }

    #[test]
    fn test_leaves_and_unary() {
        let ssa = ssa_with_rcx();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let token = store.mem(0x401000);
        let reg = store.reg(SsaVarId::new(0));
        let root = store.unop(SymOp::Sqrt, reg);
        let unknown = store.reg(SsaVarId::new(42));

        assert_eq!(store.render(token), "@[mem:0x401000]");
        assert_eq!(store.render(root), "SQRT(rcx_2)");
        assert_eq!(store.render(unknown), "v42");
    }

    #[test]
    fn test_nested_memory_flags() {
        let ssa = ssa_with_rcx();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let reg = store.reg(SsaVarId::new(0));
        let inner = store.mem(0x10);
        let sum = store.binop(SymOp::Sub, reg, inner);

        assert_eq!(store.render(sum), "(rcx_2-@[mem:0x10])");
        assert_eq!(store.display(sum).to_string(), store.render(sum));
    }

    #[test]
    fn test_render_is_deterministic() {
        let ssa = SsaFunction::default();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let a = store.imm(1);
        let b = store.imm(2);
        let left = store.binop(SymOp::ShiftLeft, a, b);
        let again = store.binop(SymOp::ShiftLeft, a, b);

        assert_eq!(store.render(left), store.render(left));
        assert_eq!(store.render(left), store.render(again));
        assert!(store.same_address(left, again));
        assert_eq!(store.render(left), "(<<)");
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let ssa = SsaFunction::default();
        let mut store = ValueStore::new(&ssa, &X86_64);
        let one = store.imm(1);
        let mut acc = store.imm(0);
        for _ in 0..100_000 {
            acc = store.binop(SymOp::Add, one, acc);
        }
        let acc = store.with_mem_flag(acc, true);
        let rendered = store.render(acc);

        assert!(rendered.starts_with("@[(1+(1+"));
        assert!(rendered.contains("(1+0)"));
        assert!(rendered.ends_with("))]"));
    }
}
