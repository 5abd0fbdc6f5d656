//! Client-side visitor protocol.
//!
//! A [`Driver`] decides which instructions the engine reports and what
//! happens with each result. Every hook except [`Driver::init`] has a no-op
//! default, so a client only overrides what it needs.

use bitflags::bitflags;

use crate::analysis::{
    cfg::Function,
    dataflow::{AnalysisContext, ValueId, ValueStore},
    ssa::{SsaBlock, SsaInsn},
};

bitflags! {
    /// Evaluation policy switches reported by [`Driver::flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DriverFlags: u32 {
        /// Memory operands of non-`Lea` instructions become opaque
        /// `Mem(address)` tokens instead of decomposed address expressions.
        const NO_MEMORY_TRACKING = 0x1;
        /// Shifts by a non-immediate amount produce an opaque placeholder
        /// instead of a shift expression.
        const NO_UNRESOLVED_SHIFT = 0x2;
    }
}

/// A client analysis plugged into [`analyze_function`](crate::analysis::analyze_function).
///
/// `State` is the client's own data, created by [`init`](Self::init) and
/// threaded through every later hook. It is handed back inside the
/// resulting [`Analysis`](crate::analysis::Analysis).
///
/// # Examples
///
/// ```rust
/// use adfa::analysis::{AnalysisContext, Driver, Function, SsaInsn, ValueId, ValueStore};
///
/// /// Counts the instructions that produced a value.
/// struct Counter;
///
/// impl Driver for Counter {
///     type State = usize;
///
///     fn init(&mut self, _function: &Function, _context: &AnalysisContext<'_>) -> usize {
///         0
///     }
///
///     fn insn_execute(
///         &self,
///         _insn: &SsaInsn,
///         result: Option<ValueId>,
///         _store: &mut ValueStore<'_>,
///         state: &mut usize,
///     ) {
///         if result.is_some() {
///             *state += 1;
///         }
///     }
/// }
/// ```
pub trait Driver {
    /// Per-function client state.
    type State;

    /// Evaluation policy for this client.
    fn flags(&self) -> DriverFlags {
        DriverFlags::empty()
    }

    /// Creates the client state once the context is seeded, before any block is visited.
    fn init(&mut self, function: &Function, context: &AnalysisContext<'_>) -> Self::State;

    /// Returns `false` to skip evaluating and reporting `insn`.
    ///
    /// Only called for machine instructions; phi-functions are always
    /// evaluated and never reported.
    fn insn_filter(&self, insn: &SsaInsn, state: &Self::State) -> bool {
        let _ = (insn, state);
        true
    }

    /// Receives the value computed for `insn`, `None` if the evaluator
    /// could not model it.
    fn insn_execute(
        &self,
        insn: &SsaInsn,
        result: Option<ValueId>,
        store: &mut ValueStore<'_>,
        state: &mut Self::State,
    ) {
        let _ = (insn, result, store, state);
    }

    /// Called once after every instruction of `block` was processed.
    fn propagate(&self, state: &mut Self::State, block: &SsaBlock) {
        let _ = (state, block);
    }
}
