//! Workflow system data structures and execution
//!
//! This module provides the core types for representing, validating and
//! executing prompt-pipeline workflows: directed graphs of typed steps whose
//! prompts are rendered from a shared variable context and sent to a
//! text-generation capability.

mod condition;
mod context;
mod definition;
mod executor;
mod generator;
mod graph;
mod migration;
mod step;
mod template;
#[cfg(test)]
mod test_helpers;
mod validator;

pub use condition::{Condition, ConditionOperator, ConditionType};
pub use context::{ExecutionContext, StepResult, StepStatus};
pub use definition::{Workflow, WorkflowError, WorkflowId, WorkflowName, WorkflowResult};
pub use executor::{
    WorkflowExecutor, COMBINED_OUTPUT_SEPARATOR, DEFAULT_PARALLEL_PREFIX, RESULT_CHANNEL_CAPACITY,
};
pub use generator::{Generation, Generator, GeneratorError, GeneratorResult, GeneratorSettings};
pub use graph::StepGraph;
pub use migration::migrate_workflow;
pub use step::{
    ConditionalBranch, ErrorHandlingConfig, LoopConfig, ParallelConfig, Position, Step, StepError,
    StepId, StepType,
};
pub use template::{
    render_prompt, INITIAL_INPUT_KEY, INPUT_KEY, PREVIOUS_KEY, PREVIOUS_OUTPUT_KEY,
};
pub use validator::WorkflowValidator;
