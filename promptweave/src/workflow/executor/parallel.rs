//! Parallel branch fork/join coordination
//!
//! Each branch gets a forked context and runs exactly its one step as an
//! independent task; the coordinator joins on every branch before merging, so
//! a failing branch never cancels its siblings.

use super::core::Traversal;
use super::{Flow, TraversalStop, COMBINED_OUTPUT_SEPARATOR, DEFAULT_PARALLEL_PREFIX};
use crate::workflow::{ExecutionContext, Step, StepId, StepResult, StepStatus};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Outcome of a single branch: its result plus the forked context its
/// variables are merged back from (absent when the branch never ran).
struct BranchOutcome {
    result: Result<StepResult, TraversalStop>,
    context: Option<ExecutionContext>,
}

impl Traversal {
    /// Execute a parallel step: fork, fan out, join, merge
    pub(crate) async fn run_parallel_step(&self, step: &Step, context: &mut ExecutionContext) -> Flow {
        let started = Instant::now();

        let branch_ids: Vec<StepId> = step
            .parallel_config
            .as_ref()
            .map(|c| c.branch_step_ids.clone())
            .unwrap_or_default();

        if branch_ids.is_empty() {
            tracing::warn!(step = %step.step_id, "parallel step has no branches");
            let mut result = StepResult::pending(step.step_id.clone(), step.order, &step.name);
            result.status = StepStatus::Failed;
            result.error = Some("Parallel step has no branch steps configured".to_string());
            result.duration_ms = started.elapsed().as_millis() as u64;
            context.record_result(result.clone());
            self.emit(result).await?;
            return Ok(None);
        }

        let continue_on_branch_failure = step
            .parallel_config
            .as_ref()
            .map(|c| c.continue_on_branch_failure)
            .unwrap_or(false);
        let prefix = step
            .parallel_config
            .as_ref()
            .map(|c| c.output_variable_prefix.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PARALLEL_PREFIX.to_string());

        tracing::info!(
            step = %step.step_id,
            branches = branch_ids.len(),
            "forking parallel branches"
        );

        let handles = self.spawn_branches(&branch_ids, context);
        let outcomes = join_all_branches(handles).await;

        self.merge_branches(step, context, outcomes, &prefix, continue_on_branch_failure, started)
            .await
    }

    /// Fork a context per branch and spawn one single-step task each.
    /// Branch ids that do not resolve become ready failed outcomes.
    fn spawn_branches(
        &self,
        branch_ids: &[StepId],
        context: &ExecutionContext,
    ) -> Vec<Result<JoinHandle<BranchOutcome>, BranchOutcome>> {
        branch_ids
            .iter()
            .map(|branch_id| {
                let Some(branch_step) = self.graph.get(branch_id) else {
                    let mut result = StepResult::pending(branch_id.clone(), 0, branch_id.as_str());
                    result.status = StepStatus::Failed;
                    result.error = Some(format!("Branch step '{branch_id}' not found"));
                    return Err(BranchOutcome {
                        result: Ok(result),
                        context: None,
                    });
                };

                let branch_step = branch_step.clone();
                let mut branch_context = context.fork();
                let traversal = self.clone();
                Ok(tokio::spawn(async move {
                    let result = traversal
                        .execute_step_with_retry(&branch_step, &mut branch_context)
                        .await;
                    BranchOutcome {
                        result,
                        context: Some(branch_context),
                    }
                }))
            })
            .collect()
    }

    /// Emit branch results, merge branch contexts and synthesize the parallel
    /// step's own result.
    async fn merge_branches(
        &self,
        step: &Step,
        context: &mut ExecutionContext,
        outcomes: Vec<BranchOutcome>,
        prefix: &str,
        continue_on_branch_failure: bool,
        started: Instant,
    ) -> Flow {
        let branch_count = outcomes.len();
        let mut all_succeeded = true;
        let mut failed_count = 0usize;
        let mut outputs = Vec::new();
        let mut total_tokens: u64 = 0;
        let mut cancelled = false;

        for (i, outcome) in outcomes.into_iter().enumerate() {
            let index = i + 1;
            let mut result = match outcome.result {
                Ok(result) => result,
                Err(TraversalStop::Cancelled) => {
                    cancelled = true;
                    continue;
                }
                Err(TraversalStop::ReceiverClosed) => return Err(TraversalStop::ReceiverClosed),
            };

            result.name = format!("{} (Branch {})", result.name, index);

            if result.success {
                if !result.output.is_empty() {
                    outputs.push(result.output.clone());
                }
            } else {
                all_succeeded = false;
                failed_count += 1;
            }
            total_tokens += u64::from(result.tokens_used);

            // Defined merge: per-branch output and token count under the
            // configured prefix.
            context
                .variables
                .insert(format!("{prefix}_{index}"), result.output.clone());
            context.variables.insert(
                format!("{prefix}_{index}_tokens"),
                result.tokens_used.to_string(),
            );
            if let Some(branch_context) = outcome.context {
                context.merge_variables_first_writer_wins(branch_context.variables);
            }
            context.record_result(result.clone());

            self.emit(result).await?;
        }

        // All branches have joined; a cancellation observed in any of them
        // now aborts the run.
        if cancelled {
            return Err(TraversalStop::Cancelled);
        }

        let overall_success = all_succeeded || continue_on_branch_failure;
        let combined = outputs.join(COMBINED_OUTPUT_SEPARATOR);

        if overall_success {
            context.previous_output = combined.clone();
            if let Some(variable) = &step.output_variable {
                if !variable.is_empty() {
                    context.variables.insert(variable.clone(), combined.clone());
                }
            }
        }

        let synthesized = StepResult {
            step_id: step.step_id.clone(),
            order: step.order,
            name: step.name.clone(),
            input: String::new(),
            output: combined,
            success: overall_success,
            error: (!overall_success)
                .then(|| format!("{failed_count} of {branch_count} branches failed")),
            duration_ms: started.elapsed().as_millis() as u64,
            tokens_used: total_tokens.min(u64::from(u32::MAX)) as u32,
            retry_count: 0,
            status: if overall_success {
                StepStatus::Success
            } else {
                StepStatus::Failed
            },
            completed_at: chrono::Utc::now(),
        };
        context.record_result(synthesized.clone());
        self.emit(synthesized).await?;

        tracing::info!(
            step = %step.step_id,
            failed = failed_count,
            success = overall_success,
            "parallel branches joined"
        );

        Ok(if overall_success {
            step.next_step_id.clone()
        } else {
            None
        })
    }
}

/// Join every branch in configuration order. Panicked branches become failed
/// outcomes rather than poisoning the run.
async fn join_all_branches(
    handles: Vec<Result<JoinHandle<BranchOutcome>, BranchOutcome>>,
) -> Vec<BranchOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle {
            Ok(join_handle) => match join_handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "parallel branch task failed to join");
                    let mut result = StepResult::pending(StepId::from("branch"), 0, "branch");
                    result.status = StepStatus::Failed;
                    result.error = Some(format!("Branch task failed: {join_error}"));
                    outcomes.push(BranchOutcome {
                        result: Ok(result),
                        context: None,
                    });
                }
            },
            Err(ready) => outcomes.push(ready),
        }
    }
    outcomes
}
