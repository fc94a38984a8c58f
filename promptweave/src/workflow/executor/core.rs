//! Core traversal logic

use super::{Flow, TraversalStop, RESULT_CHANNEL_CAPACITY};
use crate::workflow::{
    ExecutionContext, Generator, GeneratorSettings, Step, StepGraph, StepId, StepResult,
    StepStatus, StepType, Workflow, WorkflowName,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Executes workflows against a text-generation capability.
///
/// The executor is cheap to clone and safe to share; each call to
/// [`execute`](Self::execute) spawns an independent traversal task.
#[derive(Clone)]
pub struct WorkflowExecutor {
    generator: Arc<dyn Generator>,
    settings: GeneratorSettings,
}

impl WorkflowExecutor {
    /// Create an executor with default generation settings
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            settings: GeneratorSettings::default(),
        }
    }

    /// Create an executor with explicit generation settings
    pub fn with_settings(generator: Arc<dyn Generator>, settings: GeneratorSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Execute a workflow, streaming results as steps finish.
    ///
    /// The returned receiver yields one `StepResult` per executed step (plus
    /// loop iterations and parallel branches) in completion order and closes
    /// when the run ends. The stream is finite and non-restartable. Dropping
    /// the receiver stops the traversal at the next emission; cancelling the
    /// token stops it at the next dispatch or retry wait.
    pub fn execute(
        &self,
        workflow: Workflow,
        initial_input: impl Into<String>,
        cancellation: CancellationToken,
    ) -> mpsc::Receiver<StepResult> {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let traversal = Traversal {
            generator: self.generator.clone(),
            settings: self.settings.clone(),
            workflow_name: workflow.name.clone(),
            graph: Arc::new(StepGraph::new(workflow.steps)),
            tx,
        };
        let context = ExecutionContext::new(initial_input, cancellation);

        tokio::spawn(async move {
            traversal.run(context).await;
        });

        rx
    }

    /// Execute a workflow and collect every result.
    ///
    /// Convenience for callers that do not need live progress.
    pub async fn execute_collect(
        &self,
        workflow: Workflow,
        initial_input: impl Into<String>,
        cancellation: CancellationToken,
    ) -> Vec<StepResult> {
        let mut rx = self.execute(workflow, initial_input, cancellation);
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }
}

/// One in-flight run: the graph, the capability and the result stream.
/// Cloned into parallel branch tasks.
#[derive(Clone)]
pub(crate) struct Traversal {
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) settings: GeneratorSettings,
    pub(crate) workflow_name: WorkflowName,
    pub(crate) graph: Arc<StepGraph>,
    pub(crate) tx: mpsc::Sender<StepResult>,
}

impl Traversal {
    async fn run(&self, mut context: ExecutionContext) {
        tracing::info!(workflow = %self.workflow_name, "starting workflow execution");

        if self.graph.is_empty() {
            // Contract violation: short-circuit with a single failed result.
            let mut result = StepResult::pending(
                StepId::from("workflow"),
                0,
                self.workflow_name.as_str(),
            );
            result.status = StepStatus::Failed;
            result.error = Some("Workflow contains no steps".to_string());
            let _ = self.emit(result).await;
            return;
        }

        let Some(start) = self.graph.start_step() else {
            return;
        };

        match self.traverse_from(start.step_id.clone(), &mut context).await {
            Ok(()) => {
                tracing::info!(workflow = %self.workflow_name, "workflow execution finished")
            }
            Err(TraversalStop::Cancelled) => {
                tracing::info!(workflow = %self.workflow_name, "workflow execution cancelled")
            }
            Err(TraversalStop::ReceiverClosed) => {
                tracing::debug!(workflow = %self.workflow_name, "result stream dropped, stopping")
            }
        }
    }

    /// Walk the graph from `start`, dispatching by step type, until the path
    /// ends or the run aborts.
    async fn traverse_from(
        &self,
        start: StepId,
        context: &mut ExecutionContext,
    ) -> Result<(), TraversalStop> {
        let mut current = Some(start);

        while let Some(step_id) = current {
            if context.cancellation.is_cancelled() {
                return Err(TraversalStop::Cancelled);
            }

            let Some(step) = self.graph.get(&step_id) else {
                tracing::warn!(step = %step_id, "traversal reached unknown step id, stopping path");
                break;
            };

            // Cycle guard: a non-loop step already visited on this path is
            // skipped without emitting a result.
            if step.step_type != StepType::Loop && !context.visited_steps.insert(step_id.clone())
            {
                tracing::debug!(step = %step_id, "skipping already-visited step");
                break;
            }

            context.current_step_id = Some(step_id.clone());
            tracing::debug!(
                step = %step_id,
                step_type = step.step_type.as_str(),
                "dispatching step"
            );

            current = match step.step_type {
                StepType::Loop => self.run_loop_step(step, context).await?,
                StepType::Parallel => self.run_parallel_step(step, context).await?,
                StepType::Standard | StepType::Conditional => {
                    self.run_prompt_step(step, context).await?
                }
            };
        }

        Ok(())
    }

    /// Execute a standard or conditional step and decide where to go next
    async fn run_prompt_step(&self, step: &Step, context: &mut ExecutionContext) -> Flow {
        let result = self.execute_step_with_retry(step, context).await?;
        let next = self.continuation_after(step, &result);
        self.emit(result).await?;
        Ok(next)
    }

    /// The shared success/failure continuation rule.
    ///
    /// Success: conditional steps take the first branch whose condition
    /// holds (a matched branch without a target falls back to the default),
    /// otherwise `next_step_id`. Failure: the fallback step if configured,
    /// else `next_step_id` when continue-on-error is set, else stop.
    pub(crate) fn continuation_after(&self, step: &Step, result: &StepResult) -> Option<StepId> {
        if result.success {
            if step.step_type == StepType::Conditional {
                for branch in &step.conditional_branches {
                    if branch.condition.evaluate(&result.output, Some(result)) {
                        tracing::debug!(
                            step = %step.step_id,
                            branch = %branch.label,
                            "conditional branch matched"
                        );
                        return branch
                            .next_step_id
                            .clone()
                            .or_else(|| step.next_step_id.clone());
                    }
                }
                tracing::debug!(step = %step.step_id, "no conditional branch matched, using default");
            }
            return step.next_step_id.clone();
        }

        let handling = step.error_handling_or_default();
        if let Some(fallback) = handling.fallback_step_id {
            if fallback != step.step_id {
                tracing::info!(step = %step.step_id, fallback = %fallback, "taking fallback step");
                return Some(fallback);
            }
        }
        if handling.continue_on_error {
            tracing::info!(step = %step.step_id, "continuing past failed step");
            return step.next_step_id.clone();
        }
        None
    }

    /// Execute a loop step: the same step re-executed up to the iteration cap
    async fn run_loop_step(&self, step: &Step, context: &mut ExecutionContext) -> Flow {
        let Some(config) = step.loop_config.clone() else {
            // Misconfigured loop; validation reports this. Run it once.
            tracing::warn!(step = %step.step_id, "loop step without loop config, running once");
            return self.run_prompt_step(step, context).await;
        };

        let mut total_tokens: u64 = 0;

        for iteration in 1..=config.max_iterations {
            if context.cancellation.is_cancelled() {
                return Err(TraversalStop::Cancelled);
            }

            context
                .variables
                .insert(config.loop_variable.clone(), iteration.to_string());
            context.variables.insert(
                format!("{}_iteration", step.step_id),
                iteration.to_string(),
            );
            context
                .loop_counters
                .insert(step.step_id.clone(), iteration);
            // Loop steps bypass the cycle guard across iterations.
            context.visited_steps.remove(&step.step_id);

            let mut result = self.execute_step_with_retry(step, context).await?;
            result.name = format!("{} (Iteration {})", step.name, iteration);

            total_tokens += u64::from(result.tokens_used);
            context.variables.insert(
                format!("{}_total_tokens", step.step_id),
                total_tokens.to_string(),
            );

            let iteration_result = result.clone();
            self.emit(result).await?;

            if !iteration_result.success {
                tracing::info!(step = %step.step_id, iteration, "loop iteration failed, exiting loop");
                break;
            }
            if let Some(exit) = &config.exit_condition {
                if exit.evaluate(&iteration_result.output, Some(&iteration_result)) {
                    tracing::debug!(step = %step.step_id, iteration, "loop exit condition satisfied");
                    break;
                }
            }
        }

        Ok(step.next_step_id.clone())
    }

    /// Send one result to the caller
    pub(crate) async fn emit(&self, result: StepResult) -> Result<(), TraversalStop> {
        self.tx
            .send(result)
            .await
            .map_err(|_| TraversalStop::ReceiverClosed)
    }
}
