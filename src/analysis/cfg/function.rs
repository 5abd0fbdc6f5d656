//! Control-flow graph of one machine-code function.

use std::{fmt, sync::OnceLock};

use crate::{
    analysis::{
        cfg::loops::{detect_loops, LoopForest, LoopInfo},
        ssa::{compute_ssa, SsaFunction},
    },
    arch::{Architecture, Instruction},
    utils::graph::{
        algorithms::{compute_dominators, DominatorTree},
        DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
    },
    Error, Result,
};

/// A basic block.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Index within the function, equal to its graph node id
    pub id: NodeId,
    /// Program-wide block number
    pub global_id: usize,
    /// Alignment filler between real blocks; never analyzed on its own merit
    pub padding: bool,
    /// Instructions in address order
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Returns the address of the first instruction.
    #[must_use]
    pub fn start_address(&self) -> Option<u64> {
        self.instructions.first().map(|insn| insn.address)
    }

    /// Returns the last instruction.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Classification of a CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Execution falls into the next block
    Fallthrough,
    /// Unconditional jump
    Jump,
    /// Taken side of a conditional branch
    ConditionalTaken,
    /// Not-taken side of a conditional branch
    ConditionalNotTaken,
    /// Target resolved from a jump table or similar
    Indirect,
}

/// A function: basic blocks, their edges and lazily computed analyses.
///
/// Dominators, loops and SSA form are computed on first use and cached; a
/// `Function` is immutable after [`FunctionBuilder::build`], so the caches
/// never go stale and the function can be shared across threads.
pub struct Function {
    name: String,
    arch: &'static dyn Architecture,
    graph: DirectedGraph<BasicBlock, EdgeKind>,
    entry: NodeId,
    dominators: OnceLock<DominatorTree>,
    loops: OnceLock<LoopForest>,
    ssa: OnceLock<SsaFunction>,
}

impl Function {
    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target architecture.
    #[must_use]
    pub fn arch(&self) -> &'static dyn Architecture {
        self.arch
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the block with id `block`.
    #[must_use]
    pub fn block(&self, block: NodeId) -> Option<&BasicBlock> {
        self.graph.node(block)
    }

    /// Returns all blocks in id order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        self.graph.nodes()
    }

    /// Returns the total number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks().iter().map(BasicBlock::len).sum()
    }

    /// Iterates successors of `block` in edge insertion order.
    pub fn successors(&self, block: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(block)
    }

    /// Iterates predecessors of `block` in edge insertion order.
    pub fn predecessors(&self, block: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(block)
    }

    /// Iterates `(source, kind)` for every edge entering `block`.
    pub fn incoming_edges(&self, block: NodeId) -> impl Iterator<Item = (NodeId, EdgeKind)> + '_ {
        self.graph
            .incoming_edges(block)
            .map(|(_, edge)| (edge.source(), *edge.data()))
    }

    /// Iterates `(target, kind)` for every edge leaving `block`.
    pub fn outgoing_edges(&self, block: NodeId) -> impl Iterator<Item = (NodeId, EdgeKind)> + '_ {
        self.graph
            .outgoing_edges(block)
            .map(|(_, edge)| (edge.target(), *edge.data()))
    }

    /// Returns the dominator tree, computing it on first use.
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| compute_dominators(&self.graph, self.entry))
    }

    /// Returns the loop forest, computing it on first use.
    pub fn loops(&self) -> &LoopForest {
        self.loops
            .get_or_init(|| detect_loops(&self.graph, self.dominators()))
    }

    /// Returns the SSA form, computing it on first use.
    pub fn ssa(&self) -> &SsaFunction {
        self.ssa.get_or_init(|| compute_ssa(self))
    }

    /// Returns the most deeply nested loop containing `block`.
    #[must_use]
    pub fn innermost_loop(&self, block: NodeId) -> Option<&LoopInfo> {
        self.loops().innermost_loop(block)
    }

    /// Returns `true` if the edge `src -> dst` is a back edge.
    ///
    /// That is the case when some loop containing `dst` also contains `src`
    /// and lists `dst` among its entries. A self-edge on a loop header is
    /// always a back edge.
    #[must_use]
    pub fn is_backedge(&self, src: NodeId, dst: NodeId) -> bool {
        let loops = self.loops();
        let Some(innermost) = loops.innermost_loop(dst) else {
            return false;
        };
        loops
            .ancestors(innermost.id)
            .any(|l| l.contains(src) && l.is_entry(dst))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arch", &self.arch.name())
            .field("entry", &self.entry)
            .field("blocks", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl GraphBase for Function {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        GraphBase::node_ids(&self.graph)
    }
}

impl Successors for Function {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for Function {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for Function {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

/// Incremental construction of a [`Function`].
///
/// # Examples
///
/// ```rust
/// use adfa::{
///     analysis::{EdgeKind, FunctionBuilder},
///     arch::{x86, Instruction, OpcodeFamily, Operand, X86_64},
/// };
///
/// let mut builder = FunctionBuilder::new("f", &X86_64);
/// let head = builder.add_block(vec![Instruction::new(0x10, 5, "mov", OpcodeFamily::Move)
///     .with_operand(Operand::imm(1))
///     .with_operand(Operand::reg_write(x86::RAX))]);
/// let tail = builder.add_block(vec![Instruction::new(0x15, 1, "ret", OpcodeFamily::Ret)]);
/// builder.add_edge(head, tail, EdgeKind::Fallthrough)?;
///
/// let function = builder.build()?;
/// assert_eq!(function.block_count(), 2);
/// assert_eq!(function.entry(), head);
/// # Ok::<(), adfa::Error>(())
/// ```
pub struct FunctionBuilder {
    name: String,
    arch: &'static dyn Architecture,
    graph: DirectedGraph<BasicBlock, EdgeKind>,
    entry: Option<NodeId>,
    global_base: usize,
}

impl FunctionBuilder {
    /// Starts a function named `name` for `arch`.
    #[must_use]
    pub fn new(name: impl Into<String>, arch: &'static dyn Architecture) -> Self {
        FunctionBuilder {
            name: name.into(),
            arch,
            graph: DirectedGraph::new(),
            entry: None,
            global_base: 0,
        }
    }

    /// Sets the program-wide number of the first block; later blocks count up from it.
    #[must_use]
    pub fn global_base(mut self, base: usize) -> Self {
        self.global_base = base;
        self
    }

    /// Appends a regular block and returns its id.
    pub fn add_block(&mut self, instructions: Vec<Instruction>) -> NodeId {
        self.push_block(instructions, false)
    }

    /// Appends a padding block and returns its id.
    pub fn add_padding_block(&mut self, instructions: Vec<Instruction>) -> NodeId {
        self.push_block(instructions, true)
    }

    fn push_block(&mut self, instructions: Vec<Instruction>, padding: bool) -> NodeId {
        let index = self.graph.node_count();
        self.graph.add_node(BasicBlock {
            id: NodeId::new(index),
            global_id: self.global_base + index,
            padding,
            instructions,
        })
    }

    /// Appends an instruction to an existing block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `block` does not exist.
    pub fn push_instruction(&mut self, block: NodeId, instruction: Instruction) -> Result<()> {
        match self.graph.node_mut(block) {
            Some(data) => {
                data.instructions.push(instruction);
                Ok(())
            }
            None => Err(Error::GraphError(format!("block {block} does not exist"))),
        }
    }

    /// Adds a control-flow edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either block does not exist.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, kind: EdgeKind) -> Result<()> {
        self.graph.add_edge(src, dst, kind).map(|_| ())
    }

    /// Selects the entry block. Defaults to the first block added.
    pub fn set_entry(&mut self, entry: NodeId) {
        self.entry = Some(entry);
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyFunction`] if no block was added
    /// - [`Error::InvalidEntry`] if the selected entry does not exist
    /// - [`Error::Malformed`] if a block's instruction addresses are not ascending
    pub fn build(self) -> Result<Function> {
        if self.graph.is_empty() {
            return Err(Error::EmptyFunction);
        }

        let entry = self.entry.unwrap_or(NodeId::new(0));
        if entry.index() >= self.graph.node_count() {
            return Err(Error::InvalidEntry(entry));
        }

        for block in self.graph.nodes() {
            if let Some(pair) = block
                .instructions
                .windows(2)
                .find(|pair| pair[1].address <= pair[0].address)
            {
                return Err(malformed_error!(
                    "block {} of {}: instruction at 0x{:x} does not follow 0x{:x}",
                    block.id,
                    self.name,
                    pair[1].address,
                    pair[0].address
                ));
            }
        }

        Ok(Function {
            name: self.name,
            arch: self.arch,
            graph: self.graph,
            entry,
            dominators: OnceLock::new(),
            loops: OnceLock::new(),
            ssa: OnceLock::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{OpcodeFamily, X86_64},
        test as factories,
    };

    #[test]
    fn test_empty_function() {
        let result = FunctionBuilder::new("empty", &X86_64).build();
        assert!(matches!(result, Err(Error::EmptyFunction)));
    }

    #[test]
    fn test_invalid_entry() {
        let mut builder = FunctionBuilder::new("f", &X86_64);
        builder.add_block(Vec::new());
        builder.set_entry(NodeId::new(3));
        assert!(matches!(builder.build(), Err(Error::InvalidEntry(n)) if n.index() == 3));
    }

    #[test]
    fn test_unordered_instructions_are_malformed() {
        let mut builder = FunctionBuilder::new("f", &X86_64);
        builder.add_block(vec![
            Instruction::new(0x20, 1, "nop", OpcodeFamily::Nop),
            Instruction::new(0x10, 1, "nop", OpcodeFamily::Nop),
        ]);
        assert!(matches!(builder.build(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_bad_edge() {
        let mut builder = FunctionBuilder::new("f", &X86_64);
        let a = builder.add_block(Vec::new());
        assert!(matches!(
            builder.add_edge(a, NodeId::new(1), EdgeKind::Jump),
            Err(Error::GraphError(_))
        ));
        assert!(builder.push_instruction(NodeId::new(9), factories::nop(0)).is_err());
    }

    #[test]
    fn test_block_metadata() -> Result<()> {
        let mut builder = FunctionBuilder::new("f", &X86_64).global_base(100);
        let a = builder.add_block(vec![factories::nop(0x10)]);
        let pad = builder.add_padding_block(vec![factories::nop(0x11)]);
        builder.push_instruction(a, factories::nop(0x12))?;
        builder.add_edge(a, pad, EdgeKind::Fallthrough)?;
        let function = builder.build()?;

        let first = function.block(a).expect("block a");
        assert_eq!(first.global_id, 100);
        assert_eq!(first.start_address(), Some(0x10));
        assert_eq!(first.len(), 2);
        assert!(function.block(pad).is_some_and(|b| b.padding && b.global_id == 101));
        assert_eq!(function.instruction_count(), 3);
        assert_eq!(
            function.outgoing_edges(a).collect::<Vec<_>>(),
            vec![(pad, EdgeKind::Fallthrough)]
        );
        assert_eq!(
            function.incoming_edges(pad).collect::<Vec<_>>(),
            vec![(a, EdgeKind::Fallthrough)]
        );
        Ok(())
    }

    #[test]
    fn test_backedges() -> Result<()> {
        let function = factories::self_loop()?;
        let b0 = NodeId::new(0);
        assert!(function.is_backedge(b0, b0));

        let function = factories::nested_loops()?;
        // 0 -> 1 -> 2 -> 3 -> 2, 3 -> 4 -> 1, 4 -> 5
        assert!(function.is_backedge(NodeId::new(3), NodeId::new(2)));
        assert!(function.is_backedge(NodeId::new(4), NodeId::new(1)));
        assert!(!function.is_backedge(NodeId::new(0), NodeId::new(1)));
        assert!(!function.is_backedge(NodeId::new(1), NodeId::new(2)));
        assert!(!function.is_backedge(NodeId::new(4), NodeId::new(5)));
        Ok(())
    }

    #[test]
    fn test_lazy_analyses_are_cached() -> Result<()> {
        let function = factories::straight_line()?;
        let first = function.ssa() as *const SsaFunction;
        let second = function.ssa() as *const SsaFunction;
        assert_eq!(first, second);
        assert!(function.loops().is_empty());
        assert_eq!(function.dominators().entry(), function.entry());
        Ok(())
    }
}
