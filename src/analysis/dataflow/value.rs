//! Symbolic values and the arena that owns them.
//!
//! A [`SymVal`] is an immutable expression node; children are referenced by
//! [`ValueId`] handles into the same [`ValueArena`]. Nodes are appended and
//! never removed, so a handle stays valid for the arena's lifetime and a
//! node can only reference nodes created before it.
//!
//! [`ValueStore`] bundles the arena with the SSA-variable bindings
//! ([`Rvals`]) and the SSA/architecture context needed to name registers
//! when rendering.

use std::{fmt, ops::Index};

use rustc_hash::FxHashMap;

use crate::{
    analysis::{dataflow::render, ssa::SsaFunction, SsaVarId},
    arch::Architecture,
};

/// Handle of a node inside a [`ValueArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(u32);

impl ValueId {
    /// Returns the raw arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Operators of internal expression nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Left shift
    ShiftLeft,
    /// Right shift
    ShiftRight,
    /// Square root (unary)
    Sqrt,
}

impl SymOp {
    /// Returns `true` for operators that keep a memory context alive in
    /// their operands when rendering.
    #[must_use]
    pub fn is_additive(self) -> bool {
        matches!(self, SymOp::Add | SymOp::Sub)
    }
}

impl fmt::Display for SymOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymOp::Add => write!(f, "+"),
            SymOp::Sub => write!(f, "-"),
            SymOp::Mul => write!(f, "*"),
            SymOp::Div => write!(f, "/"),
            SymOp::ShiftLeft => write!(f, "<<"),
            SymOp::ShiftRight => write!(f, ">>"),
            SymOp::Sqrt => write!(f, "SQRT"),
        }
    }
}

/// Shape of a symbolic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymValKind {
    /// Known constant
    Imm(i64),
    /// Opaque reference to an SSA variable whose value is not modeled
    Reg(SsaVarId),
    /// Unresolved memory token, tagged with the address of the accessing instruction
    Mem(u64),
    /// Binary operator over two earlier nodes
    BinOp {
        /// Operator
        op: SymOp,
        /// Left operand
        left: ValueId,
        /// Right operand
        right: ValueId,
    },
    /// Unary operator over an earlier node
    UnOp {
        /// Operator
        op: SymOp,
        /// Operand
        operand: ValueId,
    },
}

/// An expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymVal {
    /// What the node computes
    pub kind: SymValKind,
    /// The node denotes a dereferenced address rather than a value
    pub is_mem: bool,
}

impl SymVal {
    /// Returns the constant if this is an immediate.
    #[must_use]
    pub fn as_imm(&self) -> Option<i64> {
        match self.kind {
            SymValKind::Imm(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if this node is an opaque register placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, SymValKind::Reg(_))
    }
}

/// Append-only storage of [`SymVal`] nodes.
#[derive(Debug, Clone, Default)]
pub struct ValueArena {
    nodes: Vec<SymVal>,
}

impl ValueArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the arena outgrows `u32::MAX` nodes. Exhausting the arena
    /// is treated like allocation failure.
    pub fn alloc(&mut self, value: SymVal) -> ValueId {
        let id = u32::try_from(self.nodes.len())
            .unwrap_or_else(|_| panic!("value arena exhausted"));
        self.nodes.push(value);
        ValueId(id)
    }

    /// Returns the node behind `id`.
    #[must_use]
    pub fn get(&self, id: ValueId) -> Option<&SymVal> {
        self.nodes.get(id.index())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &SymVal)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ValueId(i as u32), node))
    }
}

impl Index<ValueId> for ValueArena {
    type Output = SymVal;

    fn index(&self, id: ValueId) -> &SymVal {
        &self.nodes[id.index()]
    }
}

/// Binding of SSA variables to symbolic values.
///
/// Each variable is bound at most once; a second binding attempt keeps the
/// first value. Only the evaluator binds entries.
#[derive(Debug, Clone, Default)]
pub struct Rvals {
    map: FxHashMap<SsaVarId, ValueId>,
}

impl Rvals {
    /// Returns the value bound to `var`.
    #[must_use]
    pub fn get(&self, var: SsaVarId) -> Option<ValueId> {
        self.map.get(&var).copied()
    }

    /// Returns `true` if `var` is bound.
    #[must_use]
    pub fn contains(&self, var: SsaVarId) -> bool {
        self.map.contains_key(&var)
    }

    /// Returns the number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates all bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (SsaVarId, ValueId)> + '_ {
        self.map.iter().map(|(var, value)| (*var, *value))
    }

    /// Binds `var` to `value` unless it is already bound; returns the binding in effect.
    pub(crate) fn insert(&mut self, var: SsaVarId, value: ValueId) -> ValueId {
        *self.map.entry(var).or_insert(value)
    }
}

/// Arena, variable bindings and the naming context of one analysis.
///
/// Drivers receive `&mut ValueStore` and may allocate nodes of their own
/// (for example a coarse address to use as a grouping key) but cannot
/// rebind variables.
pub struct ValueStore<'a> {
    arena: ValueArena,
    rvals: Rvals,
    ssa: &'a SsaFunction,
    arch: &'static dyn Architecture,
}

impl<'a> ValueStore<'a> {
    /// Creates an empty store for `ssa`.
    #[must_use]
    pub fn new(ssa: &'a SsaFunction, arch: &'static dyn Architecture) -> Self {
        ValueStore {
            arena: ValueArena::new(),
            rvals: Rvals::default(),
            ssa,
            arch,
        }
    }

    /// Returns the arena.
    #[must_use]
    pub fn arena(&self) -> &ValueArena {
        &self.arena
    }

    /// Returns the variable bindings.
    #[must_use]
    pub fn rvals(&self) -> &Rvals {
        &self.rvals
    }

    /// Returns the SSA form the bindings refer to.
    #[must_use]
    pub fn ssa(&self) -> &'a SsaFunction {
        self.ssa
    }

    /// Returns the architecture used to name registers.
    #[must_use]
    pub fn arch(&self) -> &'static dyn Architecture {
        self.arch
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this store.
    #[must_use]
    pub fn node(&self, id: ValueId) -> &SymVal {
        &self.arena[id]
    }

    /// Returns the value bound to `var`.
    #[must_use]
    pub fn value_of(&self, var: SsaVarId) -> Option<ValueId> {
        self.rvals.get(var)
    }

    /// Allocates an arbitrary node.
    pub fn alloc(&mut self, kind: SymValKind, is_mem: bool) -> ValueId {
        self.arena.alloc(SymVal { kind, is_mem })
    }

    /// Allocates an immediate.
    pub fn imm(&mut self, value: i64) -> ValueId {
        self.alloc(SymValKind::Imm(value), false)
    }

    /// Allocates an opaque placeholder for `var`.
    pub fn reg(&mut self, var: SsaVarId) -> ValueId {
        self.alloc(SymValKind::Reg(var), false)
    }

    /// Allocates an unresolved memory token for the instruction at `address`.
    pub fn mem(&mut self, address: u64) -> ValueId {
        self.alloc(SymValKind::Mem(address), true)
    }

    /// Allocates a binary node.
    pub fn binop(&mut self, op: SymOp, left: ValueId, right: ValueId) -> ValueId {
        self.alloc(SymValKind::BinOp { op, left, right }, false)
    }

    /// Allocates a unary node.
    pub fn unop(&mut self, op: SymOp, operand: ValueId) -> ValueId {
        self.alloc(SymValKind::UnOp { op, operand }, false)
    }

    /// Returns `id` if its memory flag already equals `is_mem`, else a
    /// shallow copy carrying the requested flag. Nodes are never mutated.
    pub fn with_mem_flag(&mut self, id: ValueId, is_mem: bool) -> ValueId {
        let node = self.arena[id];
        if node.is_mem == is_mem {
            id
        } else {
            self.alloc(node.kind, is_mem)
        }
    }

    /// Renders `id` to its canonical string form.
    #[must_use]
    pub fn render(&self, id: ValueId) -> String {
        render::render(self, id)
    }

    /// Returns a [`fmt::Display`] adapter rendering `id`.
    #[must_use]
    pub fn display(&self, id: ValueId) -> ValueDisplay<'_, 'a> {
        ValueDisplay { store: self, id }
    }

    /// Returns `true` if `a` and `b` denote the same symbolic address.
    #[must_use]
    pub fn same_address(&self, a: ValueId, b: ValueId) -> bool {
        a == b || self.render(a) == self.render(b)
    }

    pub(crate) fn bind(&mut self, var: SsaVarId, value: ValueId) -> ValueId {
        self.rvals.insert(var, value)
    }

    /// Binds `var` to a fresh placeholder unless it is already bound.
    pub(crate) fn bind_placeholder(&mut self, var: SsaVarId) -> ValueId {
        match self.rvals.get(var) {
            Some(bound) => bound,
            None => {
                let placeholder = self.reg(var);
                self.bind(var, placeholder)
            }
        }
    }
}

impl fmt::Debug for ValueStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("nodes", &self.arena.len())
            .field("bound", &self.rvals.len())
            .field("arch", &self.arch.name())
            .finish()
    }
}

/// Display adapter returned by [`ValueStore::display`].
pub struct ValueDisplay<'s, 'a> {
    store: &'s ValueStore<'a>,
    id: ValueId,
}

impl fmt::Display for ValueDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.store.render(self.id))
    }
}
