//! Step graph arena and reachability analysis
//!
//! Steps are stored in a vector with a step-id to index map built once after
//! load/migration, so traversal and validation resolve edges without
//! rescanning the step list.

use crate::workflow::{Step, StepId, Workflow};
use std::collections::{HashMap, HashSet, VecDeque};

/// Indexed view over a workflow's steps
#[derive(Debug, Clone)]
pub struct StepGraph {
    steps: Vec<Step>,
    index: HashMap<StepId, usize>,
}

impl StepGraph {
    /// Build a graph from a list of steps. On duplicate ids the first
    /// occurrence wins, matching the migration repair rule.
    pub fn new(steps: Vec<Step>) -> Self {
        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            index.entry(step.step_id.clone()).or_insert(i);
        }
        Self { steps, index }
    }

    /// Build a graph from a workflow definition
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self::new(workflow.steps.clone())
    }

    /// Whether the graph has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// All steps, in authored order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Look up a step by id
    pub fn get(&self, id: &StepId) -> Option<&Step> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    /// Whether a step with this id exists
    pub fn contains(&self, id: &StepId) -> bool {
        self.index.contains_key(id)
    }

    /// The entry step: the one flagged `is_start_step`, otherwise the step
    /// with the lowest `order`.
    pub fn start_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.is_start_step)
            .or_else(|| self.steps.iter().min_by_key(|s| s.order))
    }

    /// Every step id a step can hand control to: its successor, conditional
    /// branch targets, parallel branch steps and the fallback step.
    pub fn outgoing_edges(step: &Step) -> Vec<&StepId> {
        let mut edges = Vec::new();
        if let Some(next) = &step.next_step_id {
            edges.push(next);
        }
        for branch in &step.conditional_branches {
            if let Some(target) = &branch.next_step_id {
                edges.push(target);
            }
        }
        if let Some(parallel) = &step.parallel_config {
            edges.extend(parallel.branch_step_ids.iter());
        }
        if let Some(handling) = &step.error_handling {
            if let Some(fallback) = &handling.fallback_step_id {
                edges.push(fallback);
            }
        }
        edges
    }

    /// All step ids reachable from `from` via any edge kind (BFS)
    pub fn reachable_from(&self, from: &StepId) -> HashSet<StepId> {
        let mut reachable = HashSet::new();
        let mut to_visit = VecDeque::new();
        to_visit.push_back(from.clone());

        while let Some(step_id) = to_visit.pop_front() {
            if !reachable.insert(step_id.clone()) {
                continue;
            }
            if let Some(step) = self.get(&step_id) {
                for edge in Self::outgoing_edges(step) {
                    if !reachable.contains(edge) {
                        to_visit.push_back(edge.clone());
                    }
                }
            }
        }

        reachable
    }

    /// Steps not reachable from the start step
    pub fn unreachable_steps(&self) -> Vec<&Step> {
        let Some(start) = self.start_step() else {
            return Vec::new();
        };
        let reachable = self.reachable_from(&start.step_id);
        self.steps
            .iter()
            .filter(|s| !reachable.contains(&s.step_id))
            .collect()
    }
}
