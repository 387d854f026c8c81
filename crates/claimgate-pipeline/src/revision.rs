//! Revision instructions and the regression guard

use claimgate_domain::{ReviewReport, SuggestedAction};

use crate::config::RevisionConfig;

/// Words in a text, split on whitespace
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Why a rewrite was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regression {
    /// Shorter than the allowed share of the previous draft
    Ratio {
        /// Words before
        previous: usize,
        /// Words after
        revised: usize,
    },

    /// Fell below the word floor the previous draft had cleared
    Floor {
        /// Words before
        previous: usize,
        /// Words after
        revised: usize,
    },
}

impl std::fmt::Display for Regression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regression::Ratio { previous, revised } => {
                write!(f, "revision shrank from {} to {} words", previous, revised)
            }
            Regression::Floor { previous, revised } => {
                write!(f, "revision fell to {} words (previous {})", revised, previous)
            }
        }
    }
}

/// Rejects rewrites that lose most of the article
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevisionGuard {
    min_ratio: f64,
    min_words: usize,
}

impl RevisionGuard {
    /// Guard with explicit limits
    pub fn new(min_ratio: f64, min_words: usize) -> Self {
        Self { min_ratio, min_words }
    }

    /// Guard from the revision settings
    pub fn from_config(config: &RevisionConfig) -> Self {
        Self::new(config.min_ratio, config.min_words)
    }

    /// Check a rewrite against the draft it replaces
    pub fn check(&self, previous: &str, revised: &str) -> Result<(), Regression> {
        let previous = word_count(previous);
        let revised = word_count(revised);
        if (revised as f64) < self.min_ratio * previous as f64 {
            return Err(Regression::Ratio { previous, revised });
        }
        if revised < self.min_words && previous >= self.min_words {
            return Err(Regression::Floor { previous, revised });
        }
        Ok(())
    }
}

impl Default for RevisionGuard {
    fn default() -> Self {
        Self::from_config(&RevisionConfig::default())
    }
}

/// Turn a review into writer instructions
///
/// Research issues are left out; gap research adds its own lines.
pub fn instructions(report: &ReviewReport) -> Vec<String> {
    let mut out: Vec<String> = report
        .issues
        .iter()
        .filter(|issue| issue.action == SuggestedAction::Revise)
        .map(|issue| match &issue.claim_id {
            Some(id) => format!("{} (concerns claim: {})", issue.description, id),
            None => issue.description.clone(),
        })
        .collect();

    out.extend(
        report
            .unanchored_statements
            .iter()
            .map(|s| format!("Remove or explicitly hedge this unsupported statement: \"{}\"", s)),
    );

    if out.is_empty() {
        out.push("Tighten the wording; keep all sections and citations.".to_string());
    }
    out
}
