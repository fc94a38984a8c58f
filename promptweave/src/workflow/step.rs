//! Step types and per-kind configuration for workflows

use crate::workflow::Condition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Types of workflow steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StepType {
    /// Ordinary prompt step
    #[default]
    Standard,
    /// Step whose successor is chosen by evaluating branch conditions
    Conditional,
    /// Step re-executed until its exit condition or iteration cap is hit
    Loop,
    /// Step that fans out to concurrently executed branch steps
    Parallel,
}

impl StepType {
    /// Get the string representation of the step type
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Standard => "Standard",
            StepType::Conditional => "Conditional",
            StepType::Loop => "Loop",
            StepType::Parallel => "Parallel",
        }
    }
}

/// Errors that can occur when creating step-related types
#[derive(Debug, Error)]
pub enum StepError {
    /// Step ID cannot be empty or whitespace only
    #[error("Step ID cannot be empty or whitespace only")]
    EmptyStepId,
}

/// Unique identifier for workflow steps
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct StepId(String);

impl StepId {
    /// Create a new step ID
    ///
    /// # Panics
    /// Panics if the ID is empty or whitespace only. For non-panicking creation,
    /// use `try_new` instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self::try_new(id).expect("Step ID cannot be empty or whitespace only")
    }

    /// Create a new step ID, returning an error for invalid input
    pub fn try_new(id: impl Into<String>) -> Result<Self, StepError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(StepError::EmptyStepId);
        }
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty or whitespace only (legacy documents allow this;
    /// migration assigns a fresh id)
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A guarded candidate successor for a conditional step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalBranch {
    /// Predicate deciding whether this branch is taken
    pub condition: Condition,
    /// Step executed when the condition holds
    #[serde(default)]
    pub next_step_id: Option<StepId>,
    /// Display label for editors and logs
    #[serde(default)]
    pub label: String,
}

/// Retry, fallback and continuation policy for a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandlingConfig {
    /// Number of retries after the initial attempt
    #[serde(default)]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// Double the delay on every failed attempt
    #[serde(default)]
    pub use_exponential_backoff: bool,
    /// Step to traverse to when all retries are exhausted
    #[serde(default)]
    pub fallback_step_id: Option<StepId>,
    /// Continue to `next_step_id` even when the step ultimately failed
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 1000,
            use_exponential_backoff: false,
            fallback_step_id: None,
            continue_on_error: false,
        }
    }
}

/// Configuration for loop steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// Upper bound on iterations, must be at least 1
    pub max_iterations: u32,
    /// Predicate checked after each successful iteration
    #[serde(default)]
    pub exit_condition: Option<Condition>,
    /// Variable name the current iteration number is stored under
    #[serde(default = "default_loop_variable")]
    pub loop_variable: String,
}

fn default_loop_variable() -> String {
    "iteration".to_string()
}

/// Configuration for parallel steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelConfig {
    /// Steps executed concurrently, one branch each
    pub branch_step_ids: Vec<StepId>,
    /// Wait for every branch before merging (always true today; kept for
    /// definition compatibility)
    #[serde(default = "default_true")]
    pub wait_for_all: bool,
    /// Treat the parallel step as successful even when a branch failed
    #[serde(default)]
    pub continue_on_branch_failure: bool,
    /// Prefix for per-branch merge variables (`{prefix}_{i}`)
    #[serde(default)]
    pub output_variable_prefix: String,
}

fn default_true() -> bool {
    true
}

/// Layout position for editors; presentation metadata only, never read by
/// execution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// A single node in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique identifier within the workflow
    pub step_id: StepId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Position in the legacy linear ordering; also the start-step tiebreaker
    #[serde(default)]
    pub order: u32,
    /// Kind of step
    #[serde(default, rename = "type")]
    pub step_type: StepType,
    /// Prompt template with `{{var}}` tokens
    #[serde(default)]
    pub prompt_template: String,
    /// Variable name this step's output is stored under
    #[serde(default)]
    pub output_variable: Option<String>,
    /// Unconditional successor (also the conditional default)
    #[serde(default)]
    pub next_step_id: Option<StepId>,
    /// Guarded successors, evaluated in order (conditional steps only)
    #[serde(default)]
    pub conditional_branches: Vec<ConditionalBranch>,
    /// Retry/fallback policy
    #[serde(default)]
    pub error_handling: Option<ErrorHandlingConfig>,
    /// Loop bounds and exit condition (loop steps only)
    #[serde(default)]
    pub loop_config: Option<LoopConfig>,
    /// Branch fan-out configuration (parallel steps only)
    #[serde(default)]
    pub parallel_config: Option<ParallelConfig>,
    /// Entry point of the workflow
    #[serde(default)]
    pub is_start_step: bool,
    /// Terminal step of the workflow
    #[serde(default)]
    pub is_end_step: bool,
    /// Editor layout position
    #[serde(default)]
    pub position: Option<Position>,
}

impl Step {
    /// Create a new standard step with empty configuration
    pub fn new(step_id: StepId, name: impl Into<String>, order: u32) -> Self {
        Self {
            step_id,
            name: name.into(),
            order,
            step_type: StepType::Standard,
            prompt_template: String::new(),
            output_variable: None,
            next_step_id: None,
            conditional_branches: Vec::new(),
            error_handling: None,
            loop_config: None,
            parallel_config: None,
            is_start_step: false,
            is_end_step: false,
            position: None,
        }
    }

    /// Retry/fallback policy for this step, falling back to defaults
    pub fn error_handling_or_default(&self) -> ErrorHandlingConfig {
        self.error_handling.clone().unwrap_or_default()
    }
}
