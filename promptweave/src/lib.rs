//! # Promptweave
//!
//! A graph-based orchestrator for multi-step AI prompt pipelines.
//!
//! Promptweave executes workflow definitions: directed graphs of typed steps
//! (standard, conditional, loop, parallel) whose prompt templates are
//! rendered by `{{var}}` substitution and sent to a pluggable
//! text-generation capability. Results stream back per step as the graph is
//! traversed, with retry/backoff, fallback steps, bounded loops and
//! fan-out/fan-in concurrency handled by the engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use promptweave::workflow::{
//!     migrate_workflow, Generation, Generator, GeneratorResult, GeneratorSettings, Workflow,
//!     WorkflowExecutor, WorkflowValidator,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct MyProvider;
//!
//! #[async_trait::async_trait]
//! impl Generator for MyProvider {
//!     async fn generate(
//!         &self,
//!         prompt: &str,
//!         _settings: &GeneratorSettings,
//!     ) -> GeneratorResult<Generation> {
//!         // Call your model provider here.
//!         Ok(Generation { content: prompt.to_string(), tokens_used: 0 })
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workflow: Workflow = serde_json::from_str(
//!     r#"{"id": "demo", "name": "Demo", "steps": [
//!         {"stepId": "draft", "order": 0, "promptTemplate": "Summarize: {{input}}"}
//!     ]}"#,
//! )?;
//!
//! // Repair legacy definitions, then check the graph before running it.
//! migrate_workflow(&mut workflow);
//! let report = WorkflowValidator::validate(&workflow);
//! assert!(report.is_valid(), "{:?}", report.errors);
//!
//! let executor = WorkflowExecutor::new(Arc::new(MyProvider));
//! let mut results = executor.execute(workflow, "initial input", CancellationToken::new());
//! while let Some(result) = results.recv().await {
//!     println!("{}: {}", result.name, result.output);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Validation report types
pub mod validation;

/// Workflow model, validation, migration and execution
pub mod workflow;

// Re-export core types
pub use validation::{ValidationLevel, ValidationReport};
pub use workflow::{
    migrate_workflow, Condition, ConditionOperator, ConditionType, ExecutionContext, Generation,
    Generator, GeneratorError, GeneratorResult, GeneratorSettings, Step, StepId, StepResult,
    StepStatus, StepType, Workflow, WorkflowExecutor, WorkflowId, WorkflowName, WorkflowValidator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
