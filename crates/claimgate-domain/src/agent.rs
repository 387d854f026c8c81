//! Agent roles and model tiers

use serde::{Deserialize, Serialize};

/// Pipeline stage that issues completion calls
///
/// Used to pick a model tier and to label run-log steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Turns the raw question into a brief and term map
    Normalizer,

    /// Mines the outline and claim register
    Miner,

    /// Scores evidence packs
    Rater,

    /// Writes and revises the article
    Writer,

    /// Reviews drafts and names gap claims
    Reviewer,
}

impl AgentRole {
    /// All roles, in pipeline order
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Normalizer,
        AgentRole::Miner,
        AgentRole::Rater,
        AgentRole::Writer,
        AgentRole::Reviewer,
    ];

    /// Get the role name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Normalizer => "normalizer",
            AgentRole::Miner => "miner",
            AgentRole::Rater => "rater",
            AgentRole::Writer => "writer",
            AgentRole::Reviewer => "reviewer",
        }
    }

    /// Parse a role from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "normalizer" => Some(AgentRole::Normalizer),
            "miner" => Some(AgentRole::Miner),
            "rater" => Some(AgentRole::Rater),
            "writer" => Some(AgentRole::Writer),
            "reviewer" | "editor" => Some(AgentRole::Reviewer),
            _ => None,
        }
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid agent role: {}", s))
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model tier a role runs on
///
/// - Premium: strongest model, used for mining, writing and reviewing
/// - Budget: cheaper model for normalization and rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Highest quality model
    Premium,

    /// Cheaper, faster model
    Budget,
}

impl ModelTier {
    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Premium => "premium",
            ModelTier::Budget => "budget",
        }
    }

    /// Parse a tier from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "premium" => Some(ModelTier::Premium),
            "budget" => Some(ModelTier::Budget),
            _ => None,
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid model tier: {}", s))
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_round_trip() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(AgentRole::parse("Editor"), Some(AgentRole::Reviewer));
        assert!("planner".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("PREMIUM".parse::<ModelTier>(), Ok(ModelTier::Premium));
        assert_eq!(ModelTier::parse(" budget "), Some(ModelTier::Budget));
        assert!(ModelTier::parse("gold").is_none());
    }
}
