//! Configuration for planning and retrieval

use serde::{Deserialize, Serialize};

use crate::registry::ToolCategory;

/// Extra keyword routing rule supplied through configuration
///
/// Configured rules are ranked above the built-in ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRuleConfig {
    /// Category to route to
    pub category: ToolCategory,

    /// Any of these keywords selects the category
    pub keywords: Vec<String>,
}

/// Retrieval limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results requested per query
    pub results_per_query: usize,

    /// Hard cap on accepted sources per claim
    pub max_sources_per_claim: usize,

    /// Cap on queries per claim after enrichment
    pub max_queries_per_claim: usize,

    /// Term-map variants substituted per canonical term
    pub max_variants_per_term: usize,

    /// Below this many sources in total the run is flagged
    pub warn_min_total_sources: usize,

    /// Additional routing rules
    pub extra_rules: Vec<KeywordRuleConfig>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            results_per_query: 5,
            max_sources_per_claim: 6,
            max_queries_per_claim: 5,
            max_variants_per_term: 2,
            warn_min_total_sources: 3,
            extra_rules: Vec::new(),
        }
    }
}

impl RetrievalConfig {
    /// Fewer queries and sources, for quick runs
    pub fn quick() -> Self {
        Self {
            results_per_query: 3,
            max_sources_per_claim: 3,
            max_queries_per_claim: 2,
            max_variants_per_term: 1,
            ..Default::default()
        }
    }

    /// More queries and sources per claim
    pub fn thorough() -> Self {
        Self {
            results_per_query: 8,
            max_sources_per_claim: 10,
            max_queries_per_claim: 8,
            max_variants_per_term: 3,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.results_per_query == 0 {
            return Err("results_per_query must be at least 1".to_string());
        }
        if self.max_sources_per_claim == 0 {
            return Err("max_sources_per_claim must be at least 1".to_string());
        }
        if self.max_queries_per_claim == 0 {
            return Err("max_queries_per_claim must be at least 1".to_string());
        }
        if let Some(rule) = self.extra_rules.iter().find(|r| r.keywords.is_empty()) {
            return Err(format!("routing rule for {:?} has no keywords", rule.category));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.results_per_query, 5);
        assert_eq!(config.max_sources_per_claim, 6);
        assert_eq!(config.max_queries_per_claim, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(RetrievalConfig::quick().validate().is_ok());
        assert!(RetrievalConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = RetrievalConfig {
            max_sources_per_claim: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetrievalConfig {
            extra_rules: vec![KeywordRuleConfig {
                category: ToolCategory::News,
                keywords: vec![],
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_with_rules() {
        let config: RetrievalConfig = toml::from_str(
            r#"
            max_sources_per_claim = 4

            [[extra_rules]]
            category = "government"
            keywords = ["tender", "ausschreibung"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_sources_per_claim, 4);
        assert_eq!(config.results_per_query, 5);
        assert_eq!(config.extra_rules[0].category, ToolCategory::Government);
    }
}
