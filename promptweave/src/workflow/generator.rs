//! The text-generation capability seam
//!
//! The engine treats generation as a black-box request/response capability.
//! Vendor-specific HTTP clients implement [`Generator`] outside this crate.
//! Implementations must be safe to call concurrently; parallel branches
//! invoke the same generator at once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a generation capability can surface.
///
/// The executor never lets these escape: they are captured into failed
/// [`StepResult`](crate::workflow::StepResult)s and handled by traversal
/// policy.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The provider rejected or failed the request
    #[error("Generation failed: {0}")]
    Provider(String),
    /// The request did not complete in time
    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// The provider throttled the request
    #[error("Rate limit reached: {0}")]
    RateLimit(String),
}

/// Result type for generator operations
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Settings forwarded opaquely to the generation capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSettings {
    /// Model identifier, provider-specific
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// A successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The generated text
    pub content: String,
    /// Tokens consumed by the request
    pub tokens_used: u32,
}

/// Trait for text-generation capabilities
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for a fully rendered prompt
    async fn generate(
        &self,
        prompt: &str,
        settings: &GeneratorSettings,
    ) -> GeneratorResult<Generation>;
}
