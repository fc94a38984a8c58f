//! Test helper functions for workflow module
//!
//! Shared builders and mock generators to reduce duplication across workflow
//! tests.

#![cfg(test)]

use crate::workflow::{
    ErrorHandlingConfig, Generation, Generator, GeneratorError, GeneratorResult,
    GeneratorSettings, ParallelConfig, Step, StepId, StepResult, StepStatus, Workflow, WorkflowId,
    WorkflowName,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Test helper to create a standard step named after its id
pub fn create_step(id: &str, order: u32) -> Step {
    let mut step = Step::new(StepId::from(id), id, order);
    step.prompt_template = format!("Run {id}");
    step
}

/// Test helper to create a step flagged as the workflow start
pub fn create_start_step(id: &str, order: u32) -> Step {
    let mut step = create_step(id, order);
    step.is_start_step = true;
    step
}

/// Test helper to mark a step as a workflow end
pub fn end_step(mut step: Step) -> Step {
    step.is_end_step = true;
    step
}

/// Test helper to create a workflow from pre-built steps
pub fn create_workflow(name: &str, steps: Vec<Step>) -> Workflow {
    let mut workflow = Workflow::new(WorkflowId::new(name), WorkflowName::new(name));
    workflow.steps = steps;
    workflow
}

/// Test helper to create a start-to-end linear workflow from step ids
pub fn create_linear_workflow(ids: &[&str]) -> Workflow {
    let mut steps: Vec<Step> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| create_step(id, i as u32))
        .collect();
    for i in 0..steps.len().saturating_sub(1) {
        steps[i].next_step_id = Some(StepId::from(ids[i + 1]));
    }
    if let Some(first) = steps.first_mut() {
        first.is_start_step = true;
    }
    if let Some(last) = steps.last_mut() {
        last.is_end_step = true;
    }
    create_workflow("test-workflow", steps)
}

/// Test helper for an error-handling config with a fallback step
pub fn error_handling_with_fallback(fallback_id: &str) -> ErrorHandlingConfig {
    ErrorHandlingConfig {
        fallback_step_id: Some(StepId::from(fallback_id)),
        ..ErrorHandlingConfig::default()
    }
}

/// Test helper for a parallel config over the given branch ids
pub fn parallel_config(branch_ids: &[&str]) -> ParallelConfig {
    ParallelConfig {
        branch_step_ids: branch_ids.iter().map(|id| StepId::from(*id)).collect(),
        wait_for_all: true,
        continue_on_branch_failure: false,
        output_variable_prefix: String::new(),
    }
}

/// Test helper for a finalized successful result
pub fn successful_result(step_id: &str, output: &str, tokens_used: u32) -> StepResult {
    StepResult {
        output: output.to_string(),
        success: true,
        tokens_used,
        status: StepStatus::Success,
        ..StepResult::pending(StepId::from(step_id), 0, step_id)
    }
}

/// Test helper for a finalized failed result
pub fn failed_result(step_id: &str, error: &str) -> StepResult {
    StepResult {
        error: Some(error.to_string()),
        status: StepStatus::Failed,
        ..StepResult::pending(StepId::from(step_id), 0, step_id)
    }
}

/// How a [`MockGenerator`] answers one request
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with fixed content and token count
    Ok(&'static str, u32),
    /// Fail with a provider error
    Err(&'static str),
    /// Succeed by echoing the prompt back, one token per word
    Echo,
}

impl MockResponse {
    fn resolve(&self, prompt: &str) -> GeneratorResult<Generation> {
        match self {
            MockResponse::Ok(content, tokens_used) => Ok(Generation {
                content: content.to_string(),
                tokens_used: *tokens_used,
            }),
            MockResponse::Err(message) => Err(GeneratorError::Provider(message.to_string())),
            MockResponse::Echo => Ok(Generation {
                content: prompt.to_string(),
                tokens_used: prompt.split_whitespace().count() as u32,
            }),
        }
    }
}

/// Scripted generation capability for tests.
///
/// Resolution order per call: the next scripted response if any remain, then
/// the first prompt-substring rule that matches, then the default response.
pub struct MockGenerator {
    script: Mutex<VecDeque<MockResponse>>,
    rules: Vec<(&'static str, MockResponse)>,
    default: MockResponse,
    calls: AtomicU32,
}

impl MockGenerator {
    /// Generator that echoes every prompt back
    pub fn echo() -> Self {
        Self::with_default(MockResponse::Echo)
    }

    /// Generator that always succeeds with fixed content
    pub fn always(content: &'static str, tokens_used: u32) -> Self {
        Self::with_default(MockResponse::Ok(content, tokens_used))
    }

    /// Generator that always fails
    pub fn failing(message: &'static str) -> Self {
        Self::with_default(MockResponse::Err(message))
    }

    /// Generator that answers from a script, then falls back to echo
    pub fn scripted(responses: Vec<MockResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            ..Self::with_default(MockResponse::Echo)
        }
    }

    fn with_default(default: MockResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            default,
            calls: AtomicU32::new(0),
        }
    }

    /// Answer prompts containing `needle` with `response` (unless a scripted
    /// response is pending)
    pub fn with_rule(mut self, needle: &'static str, response: MockResponse) -> Self {
        self.rules.push((needle, response));
        self
    }

    /// Number of generation calls made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _settings: &GeneratorSettings,
    ) -> GeneratorResult<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.script.lock().unwrap().pop_front() {
            return response.resolve(prompt);
        }
        for (needle, response) in &self.rules {
            if prompt.contains(needle) {
                return response.resolve(prompt);
            }
        }
        self.default.resolve(prompt)
    }
}
