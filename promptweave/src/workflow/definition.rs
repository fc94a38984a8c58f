//! Main workflow type

use crate::workflow::Step;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when creating workflow-related types
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Workflow name cannot be empty or whitespace only
    #[error("Workflow name cannot be empty or whitespace only")]
    EmptyWorkflowName,
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Unique identifier for workflows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new workflow ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkflowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable workflow name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowName(String);

impl WorkflowName {
    /// Create a new workflow name
    ///
    /// # Panics
    /// Panics if the name is empty or whitespace only. For non-panicking creation,
    /// use `try_new` instead.
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name).expect("Workflow name cannot be empty or whitespace only")
    }

    /// Create a new workflow name, returning an error for invalid input
    pub fn try_new(name: impl Into<String>) -> WorkflowResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::EmptyWorkflowName);
        }
        Ok(Self(name))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkflowName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Main workflow representation: an ordered collection of steps forming a
/// directed graph via `next_step_id` / branch / fallback references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Workflow identifier
    pub id: WorkflowId,
    /// Workflow name
    pub name: WorkflowName,
    /// All steps in the workflow, in authored order
    pub steps: Vec<Step>,
    /// Category metadata for organizing workflows
    #[serde(default)]
    pub category: Option<String>,
}

impl Workflow {
    /// Create a new empty workflow
    pub fn new(id: WorkflowId, name: WorkflowName) -> Self {
        Self {
            id,
            name,
            steps: Vec::new(),
            category: None,
        }
    }

    /// Add a step to the workflow
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_helpers::*;

    #[test]
    fn test_workflow_name_try_new() {
        assert!(WorkflowName::try_new("Review pipeline").is_ok());
        assert!(WorkflowName::try_new("").is_err());
        assert!(WorkflowName::try_new("   ").is_err());
    }

    #[test]
    #[should_panic(expected = "Workflow name cannot be empty or whitespace only")]
    fn test_workflow_name_new_panics_on_empty() {
        WorkflowName::new("");
    }

    #[test]
    fn test_workflow_creation() {
        let mut workflow = Workflow::new(WorkflowId::new("wf-1"), WorkflowName::new("Test"));
        workflow.add_step(create_step("a", 0));

        assert_eq!(workflow.id.as_str(), "wf-1");
        assert_eq!(workflow.steps.len(), 1);
        assert!(workflow.category.is_none());
    }

    #[test]
    fn test_workflow_serialization_round_trip() {
        let mut workflow = Workflow::new(WorkflowId::new("wf-1"), WorkflowName::new("Test"));
        workflow.category = Some("analysis".to_string());
        workflow.add_step(create_start_step("a", 0));

        let serialized = serde_json::to_string(&workflow).unwrap();
        let deserialized: Workflow = serde_json::from_str(&serialized).unwrap();

        assert_eq!(workflow, deserialized);
    }
}
