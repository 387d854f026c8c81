//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama generate endpoint
//! - Configurable endpoint, model and timeout
//! - Retry logic with exponential backoff
//! - Token counts taken from Ollama's eval counters
//!
//! # Examples
//!
//! ```no_run
//! use claimgate_llm::OllamaProvider;
//! use claimgate_domain::{CompletionRequest, CompletionService};
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! let reply = provider.complete(&CompletionRequest::new("Say hello")).unwrap();
//! println!("{}", reply.text);
//! ```

use std::time::Duration;

use claimgate_domain::{
    CollaboratorError, Completion, CompletionRequest, CompletionService, TokenUsage,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::RuntimeFlavor;
use tracing::{debug, warn};

use crate::LlmError;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests; long-form writing needs minutes
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a provider against [`DEFAULT_ENDPOINT`]
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.client = build_client(secs);
        self
    }

    /// Run one completion against the Ollama API
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - Model is not available
    /// - Network communication fails
    /// - Response format is invalid
    pub async fn generate(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed = response.json::<OllamaGenerateResponse>().await.map_err(|e| {
                        LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                    })?;
                    debug!(model = %self.model, chars = parsed.response.len(), "ollama completion");
                    return Ok(Completion {
                        text: parsed.response,
                        usage: TokenUsage {
                            input: parsed.prompt_eval_count.unwrap_or(0),
                            output: parsed.eval_count.unwrap_or(0),
                        },
                        tool_calls: Vec::new(),
                    });
                }
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Err(LlmError::ModelNotAvailable(self.model.clone()));
                }
                Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    last_error = Some(LlmError::RateLimitExceeded);
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(LlmError::Communication(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!(attempt = attempts, ?delay, "ollama request failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl OllamaProvider {
    fn generate_on_own_runtime(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?
            .block_on(self.generate(request))
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl CompletionService for OllamaProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        let result = match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.generate(request)))
            }
            // A current-thread runtime cannot be blocked from its own thread
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.generate_on_own_runtime(request))
                    .join()
                    .unwrap_or_else(|_| Err(LlmError::Other("completion thread panicked".to_string())))
            }),
            Err(_) => self.generate_on_own_runtime(request),
        };
        result.map_err(CollaboratorError::from)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.1");
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model_name(), "llama3.1");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "mistral");
    }

    #[test]
    fn test_ollama_provider_with_max_retries() {
        let provider = OllamaProvider::default_endpoint("llama3.1").with_max_retries(0);
        assert_eq!(provider.max_retries, 1);
        let provider = provider.with_max_retries(5);
        assert_eq!(provider.max_retries, 5);
    }

    #[test]
    fn test_request_body_omits_missing_system() {
        let body = OllamaGenerateRequest {
            model: "m",
            prompt: "p",
            system: None,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Port 9 (discard) is not an Ollama server
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1").with_max_retries(1);

        let result = provider.generate(&CompletionRequest::new("test")).await;
        match result {
            Err(LlmError::Communication(_)) => {}
            other => panic!("Expected Communication error, got {:?}", other.map(|c| c.text)),
        }
    }

    #[test]
    fn test_sync_complete_reports_failure() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1").with_max_retries(1);
        let err = provider.complete(&CompletionRequest::new("test")).unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_sync_complete_inside_current_thread_runtime() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1").with_max_retries(1);
        let err = provider.complete(&CompletionRequest::new("test")).unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_complete_inside_multi_thread_runtime() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1").with_max_retries(1);
        let err = provider.complete(&CompletionRequest::new("test")).unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::default_endpoint("llama3.1");
        if let Ok(reply) = provider.generate(&CompletionRequest::new("Say 'hello'")).await {
            assert!(!reply.text.is_empty());
        }
    }
}
