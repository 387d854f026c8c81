//! Pipeline error types

use thiserror::Error;

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Mining produced no claims
    #[error("No claims were mined; refusing to write an article without claims")]
    NoClaims,

    /// Retrieval found no sources for any claim
    #[error("No sources were retrieved; refusing to write an article without evidence")]
    NoSources,

    /// The run was aborted
    #[error("Run aborted during {0}")]
    Aborted(String),

    /// Completion service error
    #[error("LLM error: {0}")]
    Completion(String),

    /// Model output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run log could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<claimgate_domain::CollaboratorError> for PipelineError {
    fn from(e: claimgate_domain::CollaboratorError) -> Self {
        PipelineError::Completion(e.to_string())
    }
}

impl From<claimgate_llm::ParseError> for PipelineError {
    fn from(e: claimgate_llm::ParseError) -> Self {
        PipelineError::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(e: toml::ser::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl PipelineError {
    /// Whether the run stopped because it had nothing to build on
    pub fn is_fatal_input(&self) -> bool {
        matches!(self, PipelineError::NoClaims | PipelineError::NoSources)
    }
}
