//! Gatekeeper configuration

use serde::{Deserialize, Serialize};

/// Configuration for rating and gating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Minimum rating total (0–15) for a source to count
    pub min_score: u8,

    /// Ask the model to rate sources; otherwise use class-based ratings
    pub use_judgment: bool,

    /// Sources sent to the judge per call
    pub max_sources_per_call: usize,

    /// Block claims whose sources the judge flagged as contradictory
    pub block_conflicts: bool,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            min_score: 10,
            use_judgment: true,
            max_sources_per_call: 10,
            block_conflicts: true,
        }
    }
}

impl RatingConfig {
    /// Create a lenient configuration (lower bar, conflicts tolerated)
    pub fn lenient() -> Self {
        Self {
            min_score: 8,
            block_conflicts: false,
            ..Default::default()
        }
    }

    /// Create a strict configuration
    pub fn strict() -> Self {
        Self {
            min_score: 12,
            ..Default::default()
        }
    }

    /// Class-based ratings only; no model calls
    pub fn offline() -> Self {
        Self {
            use_judgment: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_score > 15 {
            return Err(format!("min_score must be 0-15, got {}", self.min_score));
        }
        if self.max_sources_per_call == 0 {
            return Err("max_sources_per_call must be at least 1".to_string());
        }
        Ok(())
    }
}
