//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the pipeline and
//! infrastructure. Implementations live in other crates (claimgate-llm,
//! claimgate-retrieval) or in tests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure reported by a collaborator
///
/// Collaborators must report failures this way instead of returning empty
/// or undefined output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The service could not be reached
    Unavailable(String),

    /// The call timed out
    Timeout(String),

    /// The service answered with an error
    Failed(String),

    /// The answer could not be interpreted
    InvalidResponse(String),
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::Unavailable(msg) => write!(f, "service unavailable: {}", msg),
            CollaboratorError::Timeout(msg) => write!(f, "timed out: {}", msg),
            CollaboratorError::Failed(msg) => write!(f, "call failed: {}", msg),
            CollaboratorError::InvalidResponse(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

impl std::error::Error for CollaboratorError {}

/// A tool offered to the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name
    pub name: String,

    /// What the tool does
    pub description: String,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,

    /// Arguments as JSON
    pub arguments: serde_json::Value,
}

/// Token counts of one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u64,

    /// Generated tokens
    pub output: u64,
}

impl TokenUsage {
    /// Sum of input and output
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input += rhs.input;
        self.output += rhs.output;
    }
}

/// Input to a completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system instructions
    pub system: Option<String>,

    /// Tools the model may call
    pub tools: Vec<ToolSpec>,
}

impl CompletionRequest {
    /// A plain prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Attach system instructions
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Output of a completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Generated text
    pub text: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// A text-only completion
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Trait for language-model completion
///
/// Implemented by the infrastructure layer (claimgate-llm)
pub trait CompletionService: Send + Sync {
    /// Run one completion
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError>;

    /// Model identifier, for the run log
    fn model_name(&self) -> &str;
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title
    pub title: String,

    /// Result URL
    pub url: String,

    /// Snippet or summary
    #[serde(default)]
    pub snippet: String,
}

/// Trait for search tools
///
/// Implemented by the infrastructure layer (claimgate-retrieval). Calling
/// `search` repeatedly with the same query must be safe.
pub trait SearchTool: Send + Sync {
    /// Stable tool identifier
    fn id(&self) -> &str;

    /// Run a query
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, CollaboratorError>;
}

impl<T: CompletionService + ?Sized> CompletionService for std::sync::Arc<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        (**self).complete(request)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
