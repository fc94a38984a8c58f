//! Best-effort repair of legacy and malformed workflow definitions
//!
//! Pre-graph workflows were plain ordered lists: no start flag, no explicit
//! links, sometimes blank or duplicated step ids. This pass normalizes such
//! definitions in place so the validator and executor can treat every
//! workflow as a graph.

use crate::workflow::{Position, StepId, Workflow};
use std::collections::HashSet;
use ulid::Ulid;

/// Horizontal coordinate for auto-assigned layout positions
const DEFAULT_POSITION_X: f64 = 250.0;
/// Vertical coordinate of the first auto-positioned step
const DEFAULT_POSITION_Y: f64 = 100.0;
/// Vertical spacing between auto-positioned steps
const POSITION_Y_SPACING: f64 = 150.0;

/// Repair a workflow definition in place.
///
/// Fixes applied: fresh unique ids for blank/duplicate step ids (the first
/// occurrence of a duplicate keeps its id, so existing references still
/// resolve), start-step election by lowest `order`, sequential linking of
/// steps without a successor, end marking of the last unlinked step, and
/// default layout positions. Layout positions are presentation metadata only.
pub fn migrate_workflow(workflow: &mut Workflow) {
    if workflow.steps.is_empty() {
        return;
    }

    assign_unique_ids(workflow);
    normalize_blank_references(workflow);
    elect_start_step(workflow);
    link_sequential_steps(workflow);
    assign_default_positions(workflow);
}

fn fresh_step_id() -> StepId {
    StepId::new(format!("step-{}", Ulid::new().to_string().to_lowercase()))
}

fn assign_unique_ids(workflow: &mut Workflow) {
    let mut seen = HashSet::new();
    for step in &mut workflow.steps {
        if step.step_id.is_blank() || !seen.insert(step.step_id.clone()) {
            let replacement = fresh_step_id();
            tracing::debug!(
                old_id = %step.step_id,
                new_id = %replacement,
                "assigning fresh step id during migration"
            );
            step.step_id = replacement.clone();
            seen.insert(replacement);
        }
    }
}

fn normalize_blank_references(workflow: &mut Workflow) {
    for step in &mut workflow.steps {
        if step
            .next_step_id
            .as_ref()
            .map(|id| id.is_blank())
            .unwrap_or(false)
        {
            step.next_step_id = None;
        }
    }
}

fn elect_start_step(workflow: &mut Workflow) {
    if workflow.steps.iter().any(|s| s.is_start_step) {
        return;
    }
    if let Some(index) = workflow
        .steps
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| s.order)
        .map(|(i, _)| i)
    {
        tracing::debug!(
            step_id = %workflow.steps[index].step_id,
            "electing start step by lowest order"
        );
        workflow.steps[index].is_start_step = true;
    }
}

/// Indices into `workflow.steps`, sorted by `order` (stable on ties)
fn order_sorted_indices(workflow: &Workflow) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..workflow.steps.len()).collect();
    indices.sort_by_key(|&i| workflow.steps[i].order);
    indices
}

fn link_sequential_steps(workflow: &mut Workflow) {
    let sorted = order_sorted_indices(workflow);

    for window in sorted.windows(2) {
        let (current, successor) = (window[0], window[1]);
        if workflow.steps[current].next_step_id.is_none() {
            let successor_id = workflow.steps[successor].step_id.clone();
            workflow.steps[current].next_step_id = Some(successor_id);
        }
    }

    // The last step in order with no outgoing link is the workflow's end.
    if let Some(&last) = sorted.last() {
        if workflow.steps[last].next_step_id.is_none() {
            workflow.steps[last].is_end_step = true;
        }
    }
}

fn assign_default_positions(workflow: &mut Workflow) {
    let sorted = order_sorted_indices(workflow);
    for (row, &index) in sorted.iter().enumerate() {
        if workflow.steps[index].position.is_none() {
            workflow.steps[index].position = Some(Position {
                x: DEFAULT_POSITION_X,
                y: DEFAULT_POSITION_Y + POSITION_Y_SPACING * row as f64,
            });
        }
    }
}
