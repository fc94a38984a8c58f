//! Workflow execution engine
//!
//! The engine walks the step graph from the start step, renders each step's
//! prompt, invokes the generation capability and streams [`StepResult`]s over
//! a channel as they finish. Step failures never escape the traversal; they
//! become failed results and are handled by the configured retry/fallback/
//! continue-on-error policy.
//!
//! [`StepResult`]: crate::workflow::StepResult

pub mod core;
pub mod parallel;
pub mod step;

/// Capacity of the result stream channel. Traversal suspends when the caller
/// falls this far behind, which keeps the stream lazy.
pub const RESULT_CHANNEL_CAPACITY: usize = 32;

/// Separator between branch outputs in a parallel step's combined output
pub const COMBINED_OUTPUT_SEPARATOR: &str = "\n\n";

/// Merge-variable prefix used when a parallel step does not configure one
pub const DEFAULT_PARALLEL_PREFIX: &str = "parallel";

/// Why a traversal stopped before its path ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraversalStop {
    /// The cancellation signal fired; the run ends with no further results
    Cancelled,
    /// The caller dropped the result stream
    ReceiverClosed,
}

/// Control flow of one dispatch: the next step to traverse to (`None` ends
/// the path), or an abort that ends the whole run.
pub(crate) type Flow = Result<Option<crate::workflow::StepId>, TraversalStop>;

// Re-export main types
pub use self::core::WorkflowExecutor;
