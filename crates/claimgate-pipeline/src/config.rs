//! Pipeline configuration
//!
//! One TOML document with a table per phase:
//!
//! ```toml
//! [mining]
//! min_total_claims = 15
//! min_c_claims = 5
//!
//! [revision]
//! max_iterations = 2
//! ```

use claimgate_domain::{AgentRole, ModelTier, RegisterMinimums};
use claimgate_gatekeeper::RatingConfig;
use claimgate_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Query normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Language the question is usually asked in (ISO 639-1)
    pub native_language: String,

    /// Fewest search variants per canonical term
    pub min_variants: usize,

    /// Most search variants per canonical term
    pub max_variants: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            native_language: "en".to_string(),
            min_variants: 3,
            max_variants: 5,
        }
    }
}

/// Claim mining minimums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Minimum number of claims demanded from the miner
    pub min_total_claims: usize,

    /// Minimum number of C-class claims
    pub min_c_claims: usize,

    /// Minimum queries per B/C retrieval ticket
    pub min_queries_per_claim: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_total_claims: 15,
            min_c_claims: 5,
            min_queries_per_claim: 2,
        }
    }
}

impl MiningConfig {
    /// Register minimums derived from this configuration
    pub fn minimums(&self) -> RegisterMinimums {
        RegisterMinimums {
            min_total: self.min_total_claims,
            min_c: self.min_c_claims,
        }
    }
}

/// Editorial review thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Articles shorter than this fail review
    pub min_words: usize,

    /// Required citations per 1000 words
    pub min_citation_density: f64,

    /// Required distinct cited sources (capped by the index size)
    pub min_distinct_sources: usize,

    /// Ask the model for a verdict; otherwise only deterministic checks run
    pub use_judgment: bool,

    /// Article characters sent to the reviewer
    pub max_article_chars: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_words: 1500,
            min_citation_density: 2.0,
            min_distinct_sources: 3,
            use_judgment: true,
            max_article_chars: 15_000,
        }
    }
}

/// Review loop limits and the regression guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    /// Rewrites allowed after the first draft
    pub max_iterations: usize,

    /// Follow-up queries per gap claim
    pub max_gap_queries: usize,

    /// A rewrite shorter than this share of the previous draft is discarded
    pub min_ratio: f64,

    /// A rewrite below this many words is discarded if the previous draft was longer
    pub min_words: usize,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            max_gap_queries: 3,
            min_ratio: 0.3,
            min_words: 500,
        }
    }
}

/// Model tier per agent role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Query normalizer
    pub normalizer: ModelTier,
    /// Claim miner
    pub miner: ModelTier,
    /// Evidence rater
    pub rater: ModelTier,
    /// Claim-bounded writer
    pub writer: ModelTier,
    /// Editorial reviewer
    pub reviewer: ModelTier,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            normalizer: ModelTier::Budget,
            miner: ModelTier::Premium,
            rater: ModelTier::Budget,
            writer: ModelTier::Premium,
            reviewer: ModelTier::Premium,
        }
    }
}

impl AgentsConfig {
    /// Every role on the same tier
    pub fn uniform(tier: ModelTier) -> Self {
        Self {
            normalizer: tier,
            miner: tier,
            rater: tier,
            writer: tier,
            reviewer: tier,
        }
    }

    /// Tier for a role
    pub fn tier_for(&self, role: AgentRole) -> ModelTier {
        match role {
            AgentRole::Normalizer => self.normalizer,
            AgentRole::Miner => self.miner,
            AgentRole::Rater => self.rater,
            AgentRole::Writer => self.writer,
            AgentRole::Reviewer => self.reviewer,
        }
    }
}

/// Configuration for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Phase 1
    pub normalizer: NormalizerConfig,
    /// Phase 2
    pub mining: MiningConfig,
    /// Phases 3 and 4
    pub retrieval: RetrievalConfig,
    /// Phase 5 and the gate
    pub rating: RatingConfig,
    /// Phase 7 checks
    pub review: ReviewConfig,
    /// Phase 7 loop
    pub revision: RevisionConfig,
    /// Role to tier mapping
    pub agents: AgentsConfig,
}

impl PipelineConfig {
    /// Small articles, one rewrite at most
    pub fn quick() -> Self {
        Self {
            mining: MiningConfig {
                min_total_claims: 8,
                min_c_claims: 2,
                ..Default::default()
            },
            retrieval: RetrievalConfig::quick(),
            review: ReviewConfig {
                min_words: 800,
                ..Default::default()
            },
            revision: RevisionConfig {
                max_iterations: 1,
                max_gap_queries: 2,
                ..Default::default()
            },
            agents: AgentsConfig::uniform(ModelTier::Budget),
            ..Default::default()
        }
    }

    /// More claims, more sources, longer articles
    pub fn thorough() -> Self {
        Self {
            mining: MiningConfig {
                min_total_claims: 20,
                min_c_claims: 7,
                min_queries_per_claim: 3,
            },
            retrieval: RetrievalConfig::thorough(),
            review: ReviewConfig {
                min_words: 2500,
                min_distinct_sources: 5,
                ..Default::default()
            },
            revision: RevisionConfig {
                max_iterations: 3,
                max_gap_queries: 5,
                ..Default::default()
            },
            agents: AgentsConfig::uniform(ModelTier::Premium),
            ..Default::default()
        }
    }

    /// Preset by name: `default`, `quick` or `thorough`
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "quick" => Some(Self::quick()),
            "thorough" => Some(Self::thorough()),
            _ => None,
        }
    }

    /// Validate every section
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.normalizer.min_variants == 0 || self.normalizer.min_variants > self.normalizer.max_variants {
            return Err(format!(
                "normalizer: need 0 < min_variants <= max_variants, got {} and {}",
                self.normalizer.min_variants, self.normalizer.max_variants
            ));
        }
        if self.mining.min_c_claims > self.mining.min_total_claims {
            return Err("mining: min_c_claims cannot exceed min_total_claims".to_string());
        }
        if self.mining.min_queries_per_claim == 0 {
            return Err("mining: min_queries_per_claim must be at least 1".to_string());
        }
        self.retrieval
            .validate()
            .map_err(|e| format!("retrieval: {}", e))?;
        self.rating.validate().map_err(|e| format!("rating: {}", e))?;
        if self.review.min_citation_density < 0.0 {
            return Err("review: min_citation_density must not be negative".to_string());
        }
        if self.review.max_article_chars == 0 {
            return Err("review: max_article_chars must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.revision.min_ratio) {
            return Err(format!(
                "revision: min_ratio must be between 0.0 and 1.0, got {}",
                self.revision.min_ratio
            ));
        }
        Ok(())
    }

    /// Load from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate().map_err(PipelineError::Config)?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
