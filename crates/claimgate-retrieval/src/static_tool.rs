//! In-memory search tool
//!
//! Answers queries from a fixed table. Used by tests and offline runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use claimgate_domain::{CollaboratorError, SearchHit, SearchTool};

#[derive(Debug, Default)]
struct Table {
    by_query: HashMap<String, Vec<SearchHit>>,
    failing: Vec<String>,
    fallback: Vec<SearchHit>,
    queries: Vec<String>,
}

/// Search tool backed by a query → hits table
///
/// Queries are matched exactly first, then by substring. Clones share the
/// same table and query log.
#[derive(Debug, Clone)]
pub struct StaticSearchTool {
    id: String,
    table: Arc<Mutex<Table>>,
}

impl StaticSearchTool {
    /// Create an empty tool
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            table: Arc::new(Mutex::new(Table::default())),
        }
    }

    /// Answer `query` (or queries containing it) with `hits`
    pub fn add_hits(&mut self, query: impl Into<String>, hits: Vec<SearchHit>) {
        self.lock().by_query.insert(query.into(), hits);
    }

    /// Fail every query containing `needle`
    pub fn add_failure(&mut self, needle: impl Into<String>) {
        self.lock().failing.push(needle.into());
    }

    /// Hits returned when no entry matches
    pub fn set_fallback(&mut self, hits: Vec<SearchHit>) {
        self.lock().fallback = hits;
    }

    /// Queries received, in call order
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SearchTool for StaticSearchTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        let mut table = self.lock();
        table.queries.push(query.to_string());

        if table.failing.iter().any(|needle| query.contains(needle.as_str())) {
            return Err(CollaboratorError::Failed(format!("{} failed for '{}'", self.id, query)));
        }

        let hits = table
            .by_query
            .get(query)
            .or_else(|| {
                table
                    .by_query
                    .iter()
                    .find(|(key, _)| query.contains(key.as_str()))
                    .map(|(_, hits)| hits)
            })
            .unwrap_or(&table.fallback);
        Ok(hits.iter().take(max_results).cloned().collect())
    }
}

/// Convenience constructor for a hit
pub fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}
