//! Question brief and term map produced by the normalizer

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default article length in pages
pub const DEFAULT_TARGET_PAGES: u32 = 12;

/// How strongly recent sources should be preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessPriority {
    /// Fast-moving topic, prefer the newest material
    High,

    /// Balanced
    #[default]
    Medium,

    /// Stable topic, age matters little
    Low,
}

impl FreshnessPriority {
    /// Parse a priority, accepting a few common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "hoch" => Some(FreshnessPriority::High),
            "medium" | "mittel" | "normal" => Some(FreshnessPriority::Medium),
            "low" | "niedrig" => Some(FreshnessPriority::Low),
            _ => None,
        }
    }
}

/// The normalized research question
///
/// Created once at the start of a run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBrief {
    /// The question reduced to its core
    pub core_question: String,

    /// The question exactly as asked
    pub original_question: String,

    /// Intended readership
    pub audience: String,

    /// Writing register
    pub tone: String,

    /// Target length in pages
    pub target_pages: u32,

    /// Date the article is written "as of"
    pub as_of_date: NaiveDate,

    /// Recency preference for sources
    pub freshness_priority: FreshnessPriority,

    /// Topics that must be covered
    pub scope_in: BTreeSet<String>,

    /// Topics that must not be covered
    pub scope_out: BTreeSet<String>,

    /// Whether the topic spans several language areas
    pub international: bool,
}

impl QuestionBrief {
    /// Build the minimal brief used when normalization fails
    pub fn minimal(question: &str, as_of_date: NaiveDate) -> Self {
        let question = question.trim();
        Self {
            core_question: question.to_string(),
            original_question: question.to_string(),
            audience: "general".to_string(),
            tone: "neutral".to_string(),
            target_pages: DEFAULT_TARGET_PAGES,
            as_of_date,
            freshness_priority: FreshnessPriority::Medium,
            scope_in: BTreeSet::new(),
            scope_out: BTreeSet::new(),
            international: false,
        }
    }
}

/// Terminology map used to build retrieval queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermMap {
    /// Canonical terms, in order of importance
    pub canonical_terms: Vec<String>,

    /// Synonyms per canonical term
    pub synonyms: BTreeMap<String, Vec<String>>,

    /// Keywords that indicate an off-topic result
    pub negative_keywords: Vec<String>,

    /// Free-text notes on resolved ambiguities
    pub disambiguation_notes: String,

    /// Ready-made query variants per canonical term
    pub search_variants: BTreeMap<String, Vec<String>>,
}

impl TermMap {
    /// A map with a single canonical term and no variants
    pub fn single(term: impl Into<String>) -> Self {
        Self {
            canonical_terms: vec![term.into()],
            ..Default::default()
        }
    }

    /// The term itself followed by its synonyms and variants, deduplicated
    pub fn all_search_terms(&self, term: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut terms = Vec::new();

        let candidates = std::iter::once(term)
            .chain(self.synonyms.get(term).into_iter().flatten().map(String::as_str))
            .chain(
                self.search_variants
                    .get(term)
                    .into_iter()
                    .flatten()
                    .map(String::as_str),
            );

        for candidate in candidates {
            let candidate = candidate.trim();
            if !candidate.is_empty() && seen.insert(candidate.to_lowercase()) {
                terms.push(candidate.to_string());
            }
        }
        terms
    }

    /// Search variants for a term (empty if none)
    pub fn variants(&self, term: &str) -> &[String] {
        self.search_variants
            .get(term)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Canonical terms that occur in `text`, case-insensitively
    pub fn terms_in<'a>(&'a self, text: &str) -> Vec<&'a str> {
        let lower = text.to_lowercase();
        self.canonical_terms
            .iter()
            .filter(|t| !t.trim().is_empty() && lower.contains(&t.to_lowercase()))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> TermMap {
        let mut map = TermMap::single("Copilot");
        map.synonyms.insert(
            "Copilot".to_string(),
            vec!["GitHub Copilot".to_string(), "copilot".to_string()],
        );
        map.search_variants.insert(
            "Copilot".to_string(),
            vec!["Copilot adoption study".to_string(), "GitHub Copilot".to_string()],
        );
        map
    }

    #[test]
    fn test_all_search_terms_dedup_preserves_order() {
        let terms = sample_map().all_search_terms("Copilot");
        assert_eq!(
            terms,
            vec!["Copilot", "GitHub Copilot", "Copilot adoption study"]
        );
    }

    #[test]
    fn test_terms_in_text() {
        let map = sample_map();
        assert_eq!(map.terms_in("How good is copilot at Rust?"), vec!["Copilot"]);
        assert!(map.terms_in("unrelated").is_empty());
    }

    #[test]
    fn test_minimal_brief_defaults() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let brief = QuestionBrief::minimal("  What is RAG?  ", date);
        assert_eq!(brief.core_question, "What is RAG?");
        assert_eq!(brief.audience, "general");
        assert_eq!(brief.tone, "neutral");
        assert_eq!(brief.target_pages, DEFAULT_TARGET_PAGES);
        assert_eq!(brief.freshness_priority, FreshnessPriority::Medium);
    }

    #[test]
    fn test_freshness_parse() {
        assert_eq!(FreshnessPriority::parse("Hoch"), Some(FreshnessPriority::High));
        assert_eq!(FreshnessPriority::parse("low"), Some(FreshnessPriority::Low));
        assert_eq!(FreshnessPriority::parse("?"), None);
    }
}
