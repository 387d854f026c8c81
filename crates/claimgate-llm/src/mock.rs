//! Scriptable mock completion service
//!
//! Replies are chosen in this order:
//! 1. the first rule whose needle occurs in the prompt (rules persist)
//! 2. the next entry of the FIFO queue
//! 3. the default response

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use claimgate_domain::{
    CollaboratorError, Completion, CompletionRequest, CompletionService, TokenUsage,
};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(String),
}

#[derive(Debug, Default)]
struct Script {
    rules: Vec<(String, Reply)>,
    queue: VecDeque<Reply>,
    prompts: Vec<String>,
}

/// Mock completion provider for deterministic testing
///
/// Clones share the same script and call history.
///
/// # Examples
///
/// ```
/// use claimgate_llm::MockProvider;
/// use claimgate_domain::{CompletionRequest, CompletionService};
///
/// let mut provider = MockProvider::default();
/// provider.add_response("outline", r#"{"claims": []}"#);
/// provider.push_response("first queued");
///
/// let reply = provider.complete(&CompletionRequest::new("build the outline")).unwrap();
/// assert_eq!(reply.text, r#"{"claims": []}"#);
/// let reply = provider.complete(&CompletionRequest::new("anything")).unwrap();
/// assert_eq!(reply.text, "first queued");
/// let reply = provider.complete(&CompletionRequest::new("anything")).unwrap();
/// assert_eq!(reply.text, "Default mock response");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    script: Arc<Mutex<Script>>,
}

impl MockProvider {
    /// Create a MockProvider with a fixed fallback response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Set the reported model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reply with `response` whenever the prompt contains `needle`
    pub fn add_response(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .rules
            .push((needle.into(), Reply::Text(response.into())));
    }

    /// Fail whenever the prompt contains `needle`
    pub fn add_error(&mut self, needle: impl Into<String>) {
        self.lock()
            .rules
            .push((needle.into(), Reply::Error("Mock error".to_string())));
    }

    /// Queue a response for the next unmatched call
    pub fn push_response(&mut self, response: impl Into<String>) {
        self.lock().queue.push_back(Reply::Text(response.into()));
    }

    /// Queue a failure for the next unmatched call
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.lock().queue.push_back(Reply::Error(message.into()));
    }

    /// Number of completion calls made
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Forget the call history
    pub fn reset_call_count(&self) {
        self.lock().prompts.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl CompletionService for MockProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        let mut script = self.lock();
        script.prompts.push(request.prompt.clone());

        let matched = script
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());
        let reply = matched
            .or_else(|| script.queue.pop_front())
            .unwrap_or_else(|| Reply::Text(self.default_response.clone()));

        match reply {
            Reply::Text(text) => {
                let usage = TokenUsage {
                    input: request.prompt.split_whitespace().count() as u64,
                    output: text.split_whitespace().count() as u64,
                };
                Ok(Completion {
                    text,
                    usage,
                    tool_calls: Vec::new(),
                })
            }
            Reply::Error(msg) => Err(CollaboratorError::Failed(msg)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
