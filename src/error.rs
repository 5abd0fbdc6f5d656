use thiserror::Error;

use crate::utils::graph::NodeId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of these are construction errors raised while a [`Function`](crate::analysis::Function)
/// is being assembled. The data-flow engine itself degrades to opaque placeholders instead of
/// failing, so the evaluator variants only travel between internal layers and are never handed
/// to a [`Driver`](crate::analysis::Driver).
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::EmptyFunction`] - Function without any basic block
/// - [`Error::InvalidEntry`] - Entry block does not exist
/// - [`Error::Malformed`] - Structurally invalid builder input
/// - [`Error::GraphError`] - Edge endpoints outside the graph
///
/// ## Evaluation Errors
/// - [`Error::UnsupportedOperand`] - Operand kind the evaluator cannot model
/// - [`Error::RecursionLimit`] - Definition chain deeper than the evaluator allows
///
/// # Examples
///
/// ```rust
/// use adfa::{analysis::FunctionBuilder, arch::X86_64, Error};
///
/// match FunctionBuilder::new("empty", &X86_64).build() {
///     Err(Error::EmptyFunction) => println!("nothing to analyze"),
///     Err(e) => eprintln!("Other error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The function has no basic blocks.
    ///
    /// Returned by the builder and by
    /// [`analyze_function`](crate::analysis::analyze_function); no analysis context is created.
    #[error("Function has no basic blocks")]
    EmptyFunction,

    /// The requested entry block is not part of the function.
    #[error("Entry block {0} does not exist")]
    InvalidEntry(NodeId),

    /// The input is structurally invalid.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Graph construction error, e.g. an edge referencing a missing node.
    #[error("{0}")]
    GraphError(String),

    /// The operand at `position` of the instruction at `address` has a shape the
    /// evaluator does not model (branch targets, write-only registers, out of range).
    #[error("Unsupported operand {position} at 0x{address:x}")]
    UnsupportedOperand {
        /// Address of the instruction owning the operand
        address: u64,
        /// Operand index within the instruction
        position: usize,
    },

    /// Recursion limit reached while resolving a definition chain.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
