//! Static workflow validation
//!
//! A structural pass run before execution. Errors block the run; warnings are
//! advisory. Cycle detection for parallel steps only covers direct one-hop
//! back-edges into the parallel step; longer cycles through intermediate
//! steps are not caught here and rely on the runtime visited-set guard.

use crate::validation::ValidationReport;
use crate::workflow::{ConditionType, LoopConfig, Step, StepGraph, StepId, StepType, Workflow};
use std::collections::HashSet;

/// Iteration caps above this, combined with an always-true exit condition,
/// usually mean the loop exits on the first success unintentionally.
const HIGH_ITERATION_THRESHOLD: u32 = 20;

/// Validates workflow structure before execution
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Run every static check against the workflow
    pub fn validate(workflow: &Workflow) -> ValidationReport {
        let mut report = ValidationReport::new();

        if workflow.steps.is_empty() {
            report.error("Workflow must contain at least one step");
            return report;
        }

        Self::check_start_steps(workflow, &mut report);
        Self::check_duplicate_ids(workflow, &mut report);

        let graph = StepGraph::from_workflow(workflow);
        Self::check_reachability(&graph, &mut report);

        for step in &workflow.steps {
            Self::check_references(step, &graph, &mut report);
            match step.step_type {
                StepType::Standard => Self::check_standard_step(step, &mut report),
                StepType::Conditional => Self::check_conditional_step(step, &mut report),
                StepType::Loop => Self::check_loop_step(step, &mut report),
                StepType::Parallel => Self::check_parallel_step(step, &graph, &mut report),
            }
        }

        report
    }

    fn check_start_steps(workflow: &Workflow, report: &mut ValidationReport) {
        let start_count = workflow.steps.iter().filter(|s| s.is_start_step).count();
        match start_count {
            0 => report.error("No step is marked as the start step"),
            1 => {}
            n => report.error(format!(
                "Workflow has multiple start steps ({n}); exactly one step must be marked as start"
            )),
        }
    }

    fn check_duplicate_ids(workflow: &Workflow, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for step in &workflow.steps {
            if !seen.insert(&step.step_id) {
                report.error(format!("Duplicate step id: '{}'", step.step_id));
            }
        }
    }

    fn check_reachability(graph: &StepGraph, report: &mut ValidationReport) {
        for step in graph.unreachable_steps() {
            if step.is_end_step {
                report.error(format!(
                    "End step '{}' is not reachable from the start step",
                    step.step_id
                ));
            } else {
                report.error(format!(
                    "Step '{}' is not reachable from the start step",
                    step.step_id
                ));
            }
        }
    }

    fn check_references(step: &Step, graph: &StepGraph, report: &mut ValidationReport) {
        if let Some(next) = &step.next_step_id {
            if !graph.contains(next) {
                report.error(format!(
                    "Step '{}' references non-existent next step: '{}'",
                    step.step_id, next
                ));
            }
        }

        for branch in &step.conditional_branches {
            if let Some(target) = &branch.next_step_id {
                if !graph.contains(target) {
                    report.error(format!(
                        "Step '{}' branch '{}' references non-existent step: '{}'",
                        step.step_id, branch.label, target
                    ));
                }
            }
        }

        if let Some(handling) = &step.error_handling {
            if let Some(fallback) = &handling.fallback_step_id {
                if fallback == &step.step_id {
                    report.error(format!(
                        "Step '{}' uses itself as its fallback step",
                        step.step_id
                    ));
                } else if !graph.contains(fallback) {
                    report.error(format!(
                        "Step '{}' references non-existent fallback step: '{}'",
                        step.step_id, fallback
                    ));
                }
            }
        }
    }

    fn check_standard_step(step: &Step, report: &mut ValidationReport) {
        if !step.is_end_step && step.next_step_id.is_none() && step.conditional_branches.is_empty()
        {
            report.warning(format!(
                "Step '{}' has no next step and is not marked as an end step (dead end)",
                step.step_id
            ));
        }
    }

    fn check_conditional_step(step: &Step, report: &mut ValidationReport) {
        if step.conditional_branches.is_empty() {
            if step.next_step_id.is_none() {
                report.error(format!(
                    "Conditional step '{}' has no branches and no default next step",
                    step.step_id
                ));
            }
            return;
        }

        for branch in &step.conditional_branches {
            if branch.next_step_id.is_none() && step.next_step_id.is_none() {
                report.error(format!(
                    "Conditional step '{}' branch '{}' has no target and the step has no default next step",
                    step.step_id, branch.label
                ));
            }
        }

        if step.next_step_id.is_none() {
            report.warning(format!(
                "Conditional step '{}' has no default next step; unmatched outputs end the traversal",
                step.step_id
            ));
        }
    }

    fn check_loop_step(step: &Step, report: &mut ValidationReport) {
        let Some(config) = &step.loop_config else {
            report.error(format!(
                "Loop step '{}' is missing its loop configuration",
                step.step_id
            ));
            return;
        };

        if config.max_iterations < 1 {
            report.error(format!(
                "Loop step '{}' must allow at least one iteration",
                step.step_id
            ));
        }

        Self::check_exit_condition(step, config, report);
    }

    fn check_exit_condition(step: &Step, config: &LoopConfig, report: &mut ValidationReport) {
        let Some(condition) = &config.exit_condition else {
            report.error(format!(
                "Loop step '{}' has no exit condition",
                step.step_id
            ));
            return;
        };

        if condition.condition_type.requires_comparison_value()
            && condition.comparison_value.trim().is_empty()
        {
            report.error(format!(
                "Loop step '{}' exit condition of type {:?} requires a comparison value",
                step.step_id, condition.condition_type
            ));
        }

        if condition.condition_type == ConditionType::Regex
            && regex::Regex::new(&condition.comparison_value).is_err()
        {
            report.error(format!(
                "Loop step '{}' exit condition has an invalid regex pattern: '{}'",
                step.step_id, condition.comparison_value
            ));
        }

        if config.max_iterations > HIGH_ITERATION_THRESHOLD
            && condition.condition_type == ConditionType::Success
            && condition.comparison_value.trim().is_empty()
        {
            report.warning(format!(
                "Loop step '{}' allows {} iterations but exits on any successful iteration; the cap is likely never reached",
                step.step_id, config.max_iterations
            ));
        }
    }

    fn check_parallel_step(step: &Step, graph: &StepGraph, report: &mut ValidationReport) {
        let Some(config) = &step.parallel_config else {
            report.error(format!(
                "Parallel step '{}' is missing its parallel configuration",
                step.step_id
            ));
            return;
        };

        if config.branch_step_ids.is_empty() {
            report.error(format!(
                "Parallel step '{}' has no branch steps",
                step.step_id
            ));
            return;
        }

        if config.branch_step_ids.len() == 1 {
            report.warning(format!(
                "Parallel step '{}' has only one branch; a standard step would do",
                step.step_id
            ));
        }

        let mut seen = HashSet::new();
        for branch_id in &config.branch_step_ids {
            if !seen.insert(branch_id) {
                report.error(format!(
                    "Parallel step '{}' lists branch step '{}' more than once",
                    step.step_id, branch_id
                ));
            }
        }

        for branch_id in &config.branch_step_ids {
            Self::check_parallel_branch(step, branch_id, graph, report);
        }
    }

    fn check_parallel_branch(
        step: &Step,
        branch_id: &StepId,
        graph: &StepGraph,
        report: &mut ValidationReport,
    ) {
        if branch_id.is_blank() {
            report.error(format!(
                "Parallel step '{}' has an empty branch step id",
                step.step_id
            ));
            return;
        }

        if branch_id == &step.step_id {
            report.error(format!(
                "Parallel step '{}' references itself as a branch",
                step.step_id
            ));
            return;
        }

        let Some(branch_step) = graph.get(branch_id) else {
            report.error(format!(
                "Parallel step '{}' references non-existent branch step: '{}'",
                step.step_id, branch_id
            ));
            return;
        };

        // One-hop cycle check only: a branch pointing straight back at the
        // parallel step would re-dispatch it on merge.
        let points_back = branch_step.next_step_id.as_ref() == Some(&step.step_id)
            || branch_step
                .conditional_branches
                .iter()
                .any(|b| b.next_step_id.as_ref() == Some(&step.step_id));
        if points_back {
            report.error(format!(
                "Branch step '{}' points back at parallel step '{}' (cycle)",
                branch_id, step.step_id
            ));
        }
    }
}
