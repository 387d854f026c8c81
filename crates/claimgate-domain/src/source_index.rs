//! Run-global source index
//!
//! Maps each source URL to a citation number. Numbers are handed out in
//! insertion order starting at 1 and are never reassigned, so later inserts
//! (from gap research) only ever extend the index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evidence::{normalize_url, Source};

/// A source together with its citation number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Citation number, 1-based
    pub number: u32,

    /// The first source seen with this URL
    pub source: Source,
}

/// URL → stable citation number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceIndex {
    entries: Vec<IndexedSource>,
    #[serde(skip)]
    by_url: HashMap<String, u32>,
}

impl SourceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, returning its number
    ///
    /// A URL that is already indexed keeps its existing number.
    pub fn insert(&mut self, source: &Source) -> u32 {
        let key = normalize_url(&source.url);
        if let Some(&number) = self.by_url.get(&key) {
            return number;
        }
        let number = self.entries.len() as u32 + 1;
        self.by_url.insert(key, number);
        self.entries.push(IndexedSource {
            number,
            source: source.clone(),
        });
        number
    }

    /// Number assigned to a URL
    pub fn number_for(&self, url: &str) -> Option<u32> {
        self.by_url.get(&normalize_url(url)).copied()
    }

    /// Entry by citation number
    pub fn get(&self, number: u32) -> Option<&IndexedSource> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i as usize))
    }

    /// Whether a number was handed out
    pub fn contains(&self, number: u32) -> bool {
        number >= 1 && (number as usize) <= self.entries.len()
    }

    /// All entries ordered by number
    pub fn entries(&self) -> &[IndexedSource] {
        &self.entries
    }

    /// Number of indexed sources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the URL lookup after deserialization
    pub fn reindex(&mut self) {
        self.by_url = self
            .entries
            .iter()
            .map(|e| (normalize_url(&e.source.url), e.number))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::fixtures::source;

    #[test]
    fn test_insert_is_stable() {
        let mut index = SourceIndex::new();
        let a = source(1, "https://a.org/x", None);
        let b = source(2, "https://b.org/y", None);

        assert_eq!(index.insert(&a), 1);
        assert_eq!(index.insert(&b), 2);
        assert_eq!(index.insert(&source(3, "https://a.org/x/", None)), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.number_for("https://b.org/y"), Some(2));
        assert_eq!(index.get(1).map(|e| e.source.title.as_str()), Some("Title 1"));
        assert!(index.get(0).is_none());
    }

    #[test]
    fn test_append_never_renumbers() {
        let mut index = SourceIndex::new();
        for n in 1..=3 {
            index.insert(&source(n, &format!("https://s{}.org", n), None));
        }
        let before: Vec<_> = index.entries().iter().map(|e| (e.number, e.source.url.clone())).collect();

        index.insert(&source(9, "https://new.org", None));
        let after: Vec<_> = index.entries().iter().map(|e| (e.number, e.source.url.clone())).collect();

        assert_eq!(&after[..3], &before[..]);
        assert_eq!(after[3].0, 4);
        assert!(index.contains(4));
        assert!(!index.contains(5));
    }

    #[test]
    fn test_reindex_after_deserialize() {
        let mut index = SourceIndex::new();
        index.insert(&source(1, "https://a.org", None));
        let json = serde_json::to_string(&index).unwrap();
        let mut restored: SourceIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.number_for("https://a.org"), None);
        restored.reindex();
        assert_eq!(restored.number_for("https://a.org"), Some(1));
    }
}
