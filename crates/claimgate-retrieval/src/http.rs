//! Generic HTTP search adapter
//!
//! Posts `{"query": ..., "max_results": ...}` to an endpoint and accepts
//! either a bare array of `{title, url, snippet}` objects or an object with a
//! `results` array. Any search backend can be put behind a small proxy that
//! speaks this shape.

use std::time::Duration;

use claimgate_domain::{CollaboratorError, SearchHit, SearchTool};
use serde::{Deserialize, Serialize};
use tokio::runtime::RuntimeFlavor;
use tracing::debug;

use crate::error::{Result, RetrievalError};

/// Default timeout for search requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<SearchHit>),
    Wrapped { results: Vec<SearchHit> },
}

impl SearchResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchResponse::Bare(hits) => hits,
            SearchResponse::Wrapped { results } => results,
        }
    }
}

/// Search tool speaking JSON over HTTP
pub struct HttpSearchTool {
    id: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSearchTool {
    /// Create a tool posting to `endpoint`
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            api_key: None,
            client,
        }
    }

    /// Send a bearer token with every request
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Run a query against the endpoint
    pub async fn query(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest { query, max_results });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RetrievalError::Http(format!("HTTP {}: {}", status, error_text)));
        }

        let hits = response.json::<SearchResponse>().await?.into_hits();
        debug!(tool = %self.id, query, hits = hits.len(), "search completed");
        Ok(hits
            .into_iter()
            .filter(|h| !h.url.trim().is_empty())
            .take(max_results)
            .collect())
    }
}

impl HttpSearchTool {
    fn query_on_own_runtime(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RetrievalError::Http(format!("Failed to start runtime: {}", e)))?
            .block_on(self.query(query, max_results))
    }
}

impl SearchTool for HttpSearchTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn search(&self, query: &str, max_results: usize) -> std::result::Result<Vec<SearchHit>, CollaboratorError> {
        let result = match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.query(query, max_results)))
            }
            // A current-thread runtime cannot be blocked from its own thread
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.query_on_own_runtime(query, max_results))
                    .join()
                    .unwrap_or_else(|_| Err(RetrievalError::Http("search thread panicked".to_string())))
            }),
            Err(_) => self.query_on_own_runtime(query, max_results),
        };
        result.map_err(CollaboratorError::from)
    }
}
