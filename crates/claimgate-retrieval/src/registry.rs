//! Tool registry
//!
//! Built once at startup and passed by reference to the components that
//! search. Tests inject a registry of fakes.

use std::fmt;
use std::sync::Arc;

use claimgate_domain::SearchTool;
use serde::{Deserialize, Serialize};

/// Kind of search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Peer-reviewed papers and studies
    Academic,
    /// Preprint servers
    Preprint,
    /// News and press releases
    News,
    /// Public procurement and government sources
    Government,
    /// Developer and user discussions
    Community,
    /// Encyclopedias
    Encyclopedic,
    /// General web search
    Web,
}

impl ToolCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Academic => "academic",
            ToolCategory::Preprint => "preprint",
            ToolCategory::News => "news",
            ToolCategory::Government => "government",
            ToolCategory::Community => "community",
            ToolCategory::Encyclopedic => "encyclopedic",
            ToolCategory::Web => "web",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Entry {
    category: ToolCategory,
    tool: Arc<dyn SearchTool>,
}

/// Search tools by category
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; the first tool of a category is the one resolved
    pub fn register(&mut self, category: ToolCategory, tool: Arc<dyn SearchTool>) {
        self.entries.push(Entry { category, tool });
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_tool(mut self, category: ToolCategory, tool: Arc<dyn SearchTool>) -> Self {
        self.register(category, tool);
        self
    }

    /// Tool for a category, falling back to web search, then to any tool
    pub fn resolve(&self, category: ToolCategory) -> Option<Arc<dyn SearchTool>> {
        self.find(category)
            .or_else(|| self.find(ToolCategory::Web))
            .or_else(|| self.entries.first().map(|e| Arc::clone(&e.tool)))
    }

    /// Tool by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn SearchTool>> {
        self.entries
            .iter()
            .find(|e| e.tool.id() == id)
            .map(|e| Arc::clone(&e.tool))
    }

    /// Registered (tool id, category) pairs
    pub fn tools(&self) -> Vec<(String, ToolCategory)> {
        self.entries
            .iter()
            .map(|e| (e.tool.id().to_string(), e.category))
            .collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tool is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, category: ToolCategory) -> Option<Arc<dyn SearchTool>> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| Arc::clone(&e.tool))
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools())
            .finish()
    }
}
