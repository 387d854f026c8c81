//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Completion service error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Judge output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<claimgate_domain::CollaboratorError> for GatekeeperError {
    fn from(e: claimgate_domain::CollaboratorError) -> Self {
        GatekeeperError::Llm(e.to_string())
    }
}

impl From<claimgate_llm::ParseError> for GatekeeperError {
    fn from(e: claimgate_llm::ParseError) -> Self {
        GatekeeperError::Parse(e.to_string())
    }
}
