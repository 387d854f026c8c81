//! Claimgate LLM Provider Layer
//!
//! Implementations of the `CompletionService` trait from `claimgate-domain`,
//! plus the structured-output parser every pipeline stage uses to read JSON
//! out of free-form model text.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use claimgate_llm::MockProvider;
//! use claimgate_domain::{CompletionRequest, CompletionService};
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.complete(&CompletionRequest::new("test prompt")).unwrap();
//! assert_eq!(result.text, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;
pub mod structured;

use claimgate_domain::CollaboratorError;
use thiserror::Error;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use structured::{
    extract_json_value, extract_json_value_with_key, parse_structured, ParseError, Strategy,
};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Communication(msg) => CollaboratorError::Unavailable(msg),
            LlmError::InvalidResponse(msg) => CollaboratorError::InvalidResponse(msg),
            LlmError::RateLimitExceeded => CollaboratorError::Failed("rate limit exceeded".to_string()),
            LlmError::ModelNotAvailable(model) => {
                CollaboratorError::Failed(format!("model not available: {}", model))
            }
            LlmError::Other(msg) => CollaboratorError::Failed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_maps_to_collaborator_error() {
        let err: CollaboratorError = LlmError::Communication("refused".to_string()).into();
        assert_eq!(err, CollaboratorError::Unavailable("refused".to_string()));

        let err: CollaboratorError = LlmError::ModelNotAvailable("llama3".to_string()).into();
        assert!(err.to_string().contains("llama3"));
    }
}
