//! Single-step execution: prompt rendering, generation, retry with backoff

use super::core::Traversal;
use super::TraversalStop;
use crate::workflow::template::render_prompt;
use crate::workflow::{ExecutionContext, Step, StepResult, StepStatus};
use std::time::{Duration, Instant};

/// Delay before retry number `attempt` (0-based): the base delay, doubled per
/// attempt when exponential backoff is enabled.
pub(crate) fn retry_delay(base_ms: u64, exponential: bool, attempt: u32) -> Duration {
    let millis = if exponential {
        base_ms.saturating_mul(1u64 << attempt.min(31))
    } else {
        base_ms
    };
    Duration::from_millis(millis)
}

impl Traversal {
    /// Render the step's prompt, invoke the generator and apply the retry
    /// policy. Mutates the context on success. Generation failures are
    /// captured into a failed result and never propagate; the only abort is
    /// cancellation during a retry wait, which ends the whole run without
    /// emitting anything for this step.
    pub(crate) async fn execute_step_with_retry(
        &self,
        step: &Step,
        context: &mut ExecutionContext,
    ) -> Result<StepResult, TraversalStop> {
        let handling = step.error_handling_or_default();
        let prompt = render_prompt(&step.prompt_template, context);
        let started = Instant::now();
        let mut last_error = String::new();

        for attempt in 0..=handling.max_retries {
            if attempt > 0 {
                let delay = retry_delay(
                    handling.retry_delay_ms,
                    handling.use_exponential_backoff,
                    attempt - 1,
                );
                tracing::debug!(
                    step = %step.step_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "waiting before retry"
                );
                tokio::select! {
                    _ = context.cancellation.cancelled() => {
                        return Err(TraversalStop::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self.generator.generate(&prompt, &self.settings).await {
                Ok(generation) => {
                    let result = self.finalize_success(
                        step,
                        context,
                        prompt,
                        generation.content,
                        generation.tokens_used,
                        attempt,
                        started,
                    );
                    return Ok(result);
                }
                Err(error) => {
                    last_error = error.to_string();
                    tracing::warn!(
                        step = %step.step_id,
                        attempt,
                        error = %last_error,
                        "step generation attempt failed"
                    );
                }
            }
        }

        Ok(self.finalize_failure(step, context, prompt, last_error, &handling, started))
    }

    #[allow(clippy::too_many_arguments)]
    fn finalize_success(
        &self,
        step: &Step,
        context: &mut ExecutionContext,
        prompt: String,
        output: String,
        tokens_used: u32,
        attempt: u32,
        started: Instant,
    ) -> StepResult {
        context.previous_output = output.clone();
        if let Some(variable) = &step.output_variable {
            if !variable.is_empty() {
                context.variables.insert(variable.clone(), output.clone());
            }
        }
        // Legacy positional variable: step N's output as `step{N}` (1-based).
        context
            .variables
            .insert(format!("step{}", step.order + 1), output.clone());

        let result = StepResult {
            step_id: step.step_id.clone(),
            order: step.order,
            name: step.name.clone(),
            input: prompt,
            output,
            success: true,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
            tokens_used,
            retry_count: attempt,
            status: StepStatus::Success,
            completed_at: chrono::Utc::now(),
        };
        context.record_result(result.clone());
        result
    }

    fn finalize_failure(
        &self,
        step: &Step,
        context: &mut ExecutionContext,
        prompt: String,
        mut error: String,
        handling: &crate::workflow::ErrorHandlingConfig,
        started: Instant,
    ) -> StepResult {
        if let Some(fallback) = &handling.fallback_step_id {
            error.push_str(&format!(" (falling back to step '{fallback}')"));
        }

        let result = StepResult {
            step_id: step.step_id.clone(),
            order: step.order,
            name: step.name.clone(),
            input: prompt,
            output: String::new(),
            success: false,
            error: Some(error),
            duration_ms: started.elapsed().as_millis() as u64,
            tokens_used: 0,
            retry_count: handling.max_retries,
            status: StepStatus::Failed,
            completed_at: chrono::Utc::now(),
        };
        context.record_result(result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_fixed() {
        assert_eq!(retry_delay(1000, false, 0), Duration::from_millis(1000));
        assert_eq!(retry_delay(1000, false, 3), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_delay_exponential() {
        // With a 1000ms base, successive waits are 1000ms then 2000ms.
        assert_eq!(retry_delay(1000, true, 0), Duration::from_millis(1000));
        assert_eq!(retry_delay(1000, true, 1), Duration::from_millis(2000));
        assert_eq!(retry_delay(1000, true, 2), Duration::from_millis(4000));
    }

    #[test]
    fn test_retry_delay_saturates() {
        // Huge attempt counts must not overflow.
        let delay = retry_delay(u64::MAX / 2, true, 63);
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }
}
