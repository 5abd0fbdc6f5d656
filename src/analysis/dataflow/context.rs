//! Analysis session and the public entry points.
//!
//! [`analyze_function`] creates an [`AnalysisContext`] for one function,
//! seeds the program-counter reads, lets the driver build its state, and
//! then walks the blocks in [`Scheduler`] order. Within a block:
//!
//! - phi-functions are evaluated for propagation but never reported
//! - every machine instruction goes through [`Driver::insn_filter`]; when it
//!   passes, the instruction is evaluated and the result handed to
//!   [`Driver::insn_execute`]
//! - [`Driver::propagate`] runs once after the last instruction
//!
//! The returned [`Analysis`] owns the context and the driver state.
//! Dropping it releases the arena and the bindings; the function, its SSA
//! form and the driver remain with the caller.

use log::debug;
use rayon::prelude::*;

use crate::{
    analysis::{
        cfg::Function,
        dataflow::{
            evaluator::Evaluator,
            value::{Rvals, ValueArena, ValueDisplay},
            Driver, DriverFlags, Scheduler, ValueId, ValueStore,
        },
        ssa::{SsaInsn, SsaVarId},
    },
    Error, Result,
};

/// State of one analysis run over one function.
#[derive(Debug)]
pub struct AnalysisContext<'a> {
    function: &'a Function,
    store: ValueStore<'a>,
    scheduler: Scheduler,
    flags: DriverFlags,
}

impl<'a> AnalysisContext<'a> {
    /// Creates a context for `function` with every program-counter read
    /// bound to the address of the instruction following it.
    #[must_use]
    pub fn new(function: &'a Function, flags: DriverFlags) -> Self {
        let ssa = function.ssa();
        let mut store = ValueStore::new(ssa, function.arch());
        for &(var, next_address) in ssa.pc_reads() {
            #[allow(clippy::cast_possible_wrap)]
            let value = store.imm(next_address as i64);
            store.bind(var, value);
        }

        AnalysisContext {
            function,
            store,
            scheduler: Scheduler::new(function),
            flags,
        }
    }

    /// Returns the analyzed function.
    #[must_use]
    pub fn function(&self) -> &'a Function {
        self.function
    }

    /// Returns the evaluation policy in effect.
    #[must_use]
    pub fn flags(&self) -> DriverFlags {
        self.flags
    }

    /// Returns the value store.
    #[must_use]
    pub fn store(&self) -> &ValueStore<'a> {
        &self.store
    }

    /// Returns the value store for allocating additional nodes.
    pub fn store_mut(&mut self) -> &mut ValueStore<'a> {
        &mut self.store
    }

    /// Returns every node allocated so far.
    #[must_use]
    pub fn values(&self) -> &ValueArena {
        self.store.arena()
    }

    /// Returns the SSA-variable bindings.
    #[must_use]
    pub fn rvals(&self) -> &Rvals {
        self.store.rvals()
    }

    /// Returns the value bound to `var`.
    #[must_use]
    pub fn value_of(&self, var: SsaVarId) -> Option<ValueId> {
        self.store.value_of(var)
    }

    /// Returns the block scheduler, including the visit order.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Renders `value` to its canonical string.
    #[must_use]
    pub fn render(&self, value: ValueId) -> String {
        self.store.render(value)
    }

    /// Returns a [`std::fmt::Display`] adapter for `value`.
    #[must_use]
    pub fn display(&self, value: ValueId) -> ValueDisplay<'_, 'a> {
        self.store.display(value)
    }

    /// Evaluates `insn` on demand, e.g. one skipped by the driver's filter.
    ///
    /// Already bound outputs are returned as they are.
    pub fn analyze_instruction(&mut self, insn: &SsaInsn) -> Option<ValueId> {
        Evaluator::new(&mut self.store, self.flags).analyze_instruction(insn)
    }

    /// Returns the value of `var`, evaluating its definition if needed.
    pub fn resolve_ssa_var(&mut self, var: SsaVarId) -> ValueId {
        Evaluator::new(&mut self.store, self.flags).resolve_ssa_var(var)
    }

    /// Resolves operand `position` of `insn` with this context's policy.
    ///
    /// Returns `None` for operands the evaluator does not model.
    pub fn resolve_operand(&mut self, insn: &SsaInsn, position: usize) -> Option<ValueId> {
        Evaluator::new(&mut self.store, self.flags)
            .resolve_operand(insn, position)
            .ok()
    }

    fn run<D: Driver>(&mut self, driver: &D, state: &mut D::State) {
        let function = self.function;
        let ssa = function.ssa();

        while let Some(id) = self.scheduler.next_block(function) {
            let Some(block) = ssa.block(id) else {
                continue;
            };

            for insn in &block.instructions {
                if insn.is_phi() {
                    Evaluator::new(&mut self.store, self.flags).analyze_instruction(insn);
                    continue;
                }
                if !driver.insn_filter(insn, state) {
                    continue;
                }
                let result = Evaluator::new(&mut self.store, self.flags).analyze_instruction(insn);
                driver.insn_execute(insn, result, &mut self.store, state);
            }

            driver.propagate(state, block);
        }

        debug!(
            "{}: visited {} of {} blocks, {} forced, {} values",
            function.name(),
            self.scheduler.visit_order().len(),
            function.block_count(),
            self.scheduler.fallback_count(),
            self.store.arena().len()
        );
    }
}

/// Result of [`analyze_function`]: the finished context plus the driver's state.
#[derive(Debug)]
pub struct Analysis<'a, S> {
    context: AnalysisContext<'a>,
    state: S,
}

impl<'a, S> Analysis<'a, S> {
    /// Returns the finished context.
    #[must_use]
    pub fn context(&self) -> &AnalysisContext<'a> {
        &self.context
    }

    /// Returns the finished context mutably, e.g. to resolve further operands.
    pub fn context_mut(&mut self) -> &mut AnalysisContext<'a> {
        &mut self.context
    }

    /// Returns the driver state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consumes the analysis, releasing the context and keeping the driver state.
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }

    /// Splits the analysis into context and driver state.
    #[must_use]
    pub fn into_parts(self) -> (AnalysisContext<'a>, S) {
        (self.context, self.state)
    }
}

/// Runs the data-flow analysis over `function` with `driver`.
///
/// # Arguments
///
/// * `function` - The function to analyze; its SSA form is computed on first use
/// * `driver` - The client receiving instruction results
///
/// # Errors
///
/// Returns [`Error::EmptyFunction`] if the function has no blocks.
///
/// # Examples
///
/// ```rust
/// use adfa::analysis::{analyze_function, AnalysisContext, Driver, Function, FunctionBuilder};
/// use adfa::arch::{x86, Instruction, OpcodeFamily, Operand, X86_64};
///
/// struct Nothing;
/// impl Driver for Nothing {
///     type State = ();
///     fn init(&mut self, _: &Function, _: &AnalysisContext<'_>) {}
/// }
///
/// let mut builder = FunctionBuilder::new("f", &X86_64);
/// builder.add_block(vec![Instruction::new(0x1000, 5, "mov", OpcodeFamily::Move)
///     .with_operand(Operand::imm(5))
///     .with_operand(Operand::reg_write(x86::RCX))]);
/// let function = builder.build()?;
///
/// let analysis = analyze_function(&function, &mut Nothing)?;
/// assert_eq!(analysis.context().rvals().len(), 1);
/// # Ok::<(), adfa::Error>(())
/// ```
pub fn analyze_function<'a, D: Driver>(
    function: &'a Function,
    driver: &mut D,
) -> Result<Analysis<'a, D::State>> {
    if function.block_count() == 0 {
        return Err(Error::EmptyFunction);
    }

    let mut context = AnalysisContext::new(function, driver.flags());
    let mut state = driver.init(function, &context);
    context.run(driver, &mut state);

    Ok(Analysis { context, state })
}

/// Analyzes every function in parallel, one context and one driver per function.
///
/// Results are returned in the order of `functions`.
pub fn analyze_functions<'a, D, F>(
    functions: &'a [Function],
    make_driver: F,
) -> Vec<Result<Analysis<'a, D::State>>>
where
    D: Driver,
    D::State: Send,
    F: Fn(&Function) -> D + Sync,
{
    functions
        .par_iter()
        .map(|function| {
            let mut driver = make_driver(function);
            analyze_function(function, &mut driver)
        })
        .collect()
}
