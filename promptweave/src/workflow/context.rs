//! Runtime execution context and per-step results

use crate::workflow::StepId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Lifecycle status of a step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StepStatus {
    /// Not yet executed
    #[default]
    Pending,
    /// Currently executing
    Running,
    /// Completed successfully
    Success,
    /// Completed with a failure
    Failed,
    /// Skipped by traversal policy
    Skipped,
}

/// Outcome of a single step execution, streamed to the caller as soon as the
/// step finishes. The engine does not retain emitted results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Step this result belongs to
    pub step_id: StepId,
    /// The step's legacy linear order
    pub order: u32,
    /// Display name, decorated with `(Iteration N)` / `(Branch i)` suffixes
    pub name: String,
    /// The fully rendered prompt sent to the generator
    pub input: String,
    /// Generated output (empty on failure)
    pub output: String,
    /// Whether the step ultimately succeeded
    pub success: bool,
    /// Error description when the step failed
    #[serde(default)]
    pub error: Option<String>,
    /// Wall-clock duration across all attempts, in milliseconds
    pub duration_ms: u64,
    /// Tokens consumed by the generation capability
    pub tokens_used: u32,
    /// How many retries were spent (0 when the first attempt decided it)
    pub retry_count: u32,
    /// Lifecycle status
    pub status: StepStatus,
    /// When the result was finalized
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl StepResult {
    /// Create a pending result shell for a step
    pub fn pending(step_id: StepId, order: u32, name: impl Into<String>) -> Self {
        Self {
            step_id,
            order,
            name: name.into(),
            input: String::new(),
            output: String::new(),
            success: false,
            error: None,
            duration_ms: 0,
            tokens_used: 0,
            retry_count: 0,
            status: StepStatus::Pending,
            completed_at: chrono::Utc::now(),
        }
    }
}

/// Mutable bag of variables, results and traversal bookkeeping threaded
/// through one run (or one parallel branch fork).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Named string variables available to prompt templates
    pub variables: HashMap<String, String>,
    /// Finalized results keyed by step id
    pub step_results: HashMap<StepId, StepResult>,
    /// Step currently being dispatched
    pub current_step_id: Option<StepId>,
    /// Cycle guard for non-loop steps
    pub visited_steps: HashSet<StepId>,
    /// Iteration counters for loop steps
    pub loop_counters: HashMap<StepId, u32>,
    /// Cooperative cancellation signal for this run
    pub cancellation: CancellationToken,
    /// The input the run was started with
    pub initial_input: String,
    /// Most recent successful output; seeds `{{previous_output}}`
    pub previous_output: String,
}

impl ExecutionContext {
    /// Create a fresh context for a top-level run.
    ///
    /// `previous_output` starts as the initial input so the first step's
    /// `{{input}}` / `{{previous_output}}` tokens resolve.
    pub fn new(initial_input: impl Into<String>, cancellation: CancellationToken) -> Self {
        let initial_input = initial_input.into();
        Self {
            variables: HashMap::new(),
            step_results: HashMap::new(),
            current_step_id: None,
            visited_steps: HashSet::new(),
            loop_counters: HashMap::new(),
            cancellation,
            previous_output: initial_input.clone(),
            initial_input,
        }
    }

    /// Fork a private context for a parallel branch: shallow-copied variable,
    /// result and counter maps, a fresh visited set, the same cancellation
    /// signal. The fork never writes back; merging is the coordinator's job.
    pub fn fork(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            step_results: self.step_results.clone(),
            current_step_id: None,
            visited_steps: HashSet::new(),
            loop_counters: self.loop_counters.clone(),
            cancellation: self.cancellation.clone(),
            initial_input: self.initial_input.clone(),
            previous_output: self.previous_output.clone(),
        }
    }

    /// Merge another context's variables using first-writer-wins: a key
    /// already present here is never overwritten.
    pub fn merge_variables_first_writer_wins(&mut self, variables: HashMap<String, String>) {
        for (key, value) in variables {
            self.variables.entry(key).or_insert(value);
        }
    }

    /// Record a finalized result for a step
    pub fn record_result(&mut self, result: StepResult) {
        self.step_results.insert(result.step_id.clone(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_helpers::*;

    #[test]
    fn test_new_context_seeds_previous_output() {
        let ctx = ExecutionContext::new("seed text", CancellationToken::new());
        assert_eq!(ctx.initial_input, "seed text");
        assert_eq!(ctx.previous_output, "seed text");
        assert!(ctx.variables.is_empty());
    }

    #[test]
    fn test_fork_copies_maps_and_resets_visited() {
        let mut ctx = ExecutionContext::new("seed", CancellationToken::new());
        ctx.variables.insert("draft".to_string(), "v1".to_string());
        ctx.visited_steps.insert(StepId::new("a"));
        ctx.loop_counters.insert(StepId::new("loop"), 3);
        ctx.record_result(successful_result("a", "out", 5));

        let fork = ctx.fork();
        assert_eq!(fork.variables.get("draft").unwrap(), "v1");
        assert_eq!(fork.loop_counters.get(&StepId::new("loop")), Some(&3));
        assert!(fork.step_results.contains_key(&StepId::new("a")));
        assert!(fork.visited_steps.is_empty());
        assert_eq!(fork.previous_output, "seed");
    }

    #[test]
    fn test_fork_is_isolated_from_parent() {
        let ctx = ExecutionContext::new("seed", CancellationToken::new());
        let mut fork = ctx.fork();
        fork.variables
            .insert("branch_only".to_string(), "x".to_string());
        assert!(!ctx.variables.contains_key("branch_only"));
    }

    #[test]
    fn test_merge_first_writer_wins() {
        let mut ctx = ExecutionContext::new("seed", CancellationToken::new());
        ctx.variables
            .insert("existing".to_string(), "parent".to_string());

        let mut first = HashMap::new();
        first.insert("existing".to_string(), "branch1".to_string());
        first.insert("fresh".to_string(), "branch1".to_string());
        ctx.merge_variables_first_writer_wins(first);

        let mut second = HashMap::new();
        second.insert("fresh".to_string(), "branch2".to_string());
        ctx.merge_variables_first_writer_wins(second);

        // Parent value survives; the earlier branch claims the new key.
        assert_eq!(ctx.variables.get("existing").unwrap(), "parent");
        assert_eq!(ctx.variables.get("fresh").unwrap(), "branch1");
    }
}
