//! Error types for retrieval

use claimgate_domain::CollaboratorError;
use thiserror::Error;

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur during retrieval
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// No search tool is registered
    #[error("No search tool registered")]
    NoTools,

    /// HTTP communication failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// The search service answered with something unreadable
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RetrievalError::InvalidResponse(e.to_string())
        } else {
            RetrievalError::Http(e.to_string())
        }
    }
}

impl From<RetrievalError> for CollaboratorError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Http(msg) => CollaboratorError::Unavailable(msg),
            RetrievalError::InvalidResponse(msg) => CollaboratorError::InvalidResponse(msg),
            other => CollaboratorError::Failed(other.to_string()),
        }
    }
}
