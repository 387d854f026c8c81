//! Tool routing
//!
//! A ranked list of rules maps a claim to a [`ToolCategory`]. The first rule
//! with a matching predicate wins; when none matches, the router's default
//! category is used.

use claimgate_domain::{Claim, ClaimType};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::KeywordRuleConfig;
use crate::registry::ToolCategory;

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern is valid"));

/// Alphanumeric keywords up to this length must match a whole word
const WORD_MATCH_MAX_LEN: usize = 3;

#[derive(Debug, Clone)]
enum Keyword {
    Substring(String),
    Word(Regex),
}

impl Keyword {
    fn new(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return None;
        }
        let short_word = keyword.chars().count() <= WORD_MATCH_MAX_LEN
            && keyword.chars().all(char::is_alphanumeric);
        if short_word {
            let pattern = format!(r"\b{}\b", regex::escape(&keyword));
            // Escaped input always compiles; a failure falls back to substring matching
            match Regex::new(&pattern) {
                Ok(re) => return Some(Keyword::Word(re)),
                Err(_) => return Some(Keyword::Substring(keyword)),
            }
        }
        Some(Keyword::Substring(keyword))
    }

    fn matches(&self, lower: &str) -> bool {
        match self {
            Keyword::Substring(s) => lower.contains(s.as_str()),
            Keyword::Word(re) => re.is_match(lower),
        }
    }
}

/// Condition over a claim
#[derive(Debug, Clone)]
pub enum Predicate {
    /// The claim text contains any of the keywords
    AnyKeyword(Vec<String>),
    /// The claim has one of these types
    ClaimTypeIs(Vec<ClaimType>),
    /// The claim text mentions a year (1900–2099)
    ContainsYear,
}

#[derive(Debug, Clone)]
enum CompiledPredicate {
    AnyKeyword(Vec<Keyword>),
    ClaimTypeIs(Vec<ClaimType>),
    ContainsYear,
}

impl CompiledPredicate {
    fn compile(predicate: Predicate) -> Self {
        match predicate {
            Predicate::AnyKeyword(words) => {
                CompiledPredicate::AnyKeyword(words.iter().filter_map(|w| Keyword::new(w)).collect())
            }
            Predicate::ClaimTypeIs(types) => CompiledPredicate::ClaimTypeIs(types),
            Predicate::ContainsYear => CompiledPredicate::ContainsYear,
        }
    }

    fn matches(&self, lower: &str, claim_type: ClaimType) -> bool {
        match self {
            CompiledPredicate::AnyKeyword(words) => words.iter().any(|k| k.matches(lower)),
            CompiledPredicate::ClaimTypeIs(types) => types.contains(&claim_type),
            CompiledPredicate::ContainsYear => YEAR_TOKEN.is_match(lower),
        }
    }
}

/// Category selected when any predicate matches
#[derive(Debug, Clone)]
pub struct RoutingRule {
    category: ToolCategory,
    predicates: Vec<CompiledPredicate>,
}

impl RoutingRule {
    /// Create a rule
    pub fn new(category: ToolCategory, predicates: Vec<Predicate>) -> Self {
        Self {
            category,
            predicates: predicates.into_iter().map(CompiledPredicate::compile).collect(),
        }
    }

    /// Shorthand for a keyword-only rule
    pub fn keywords<I, S>(category: ToolCategory, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            category,
            vec![Predicate::AnyKeyword(keywords.into_iter().map(Into::into).collect())],
        )
    }

    /// Category of this rule
    pub fn category(&self) -> ToolCategory {
        self.category
    }

    fn matches(&self, lower: &str, claim_type: ClaimType) -> bool {
        self.predicates.iter().any(|p| p.matches(lower, claim_type))
    }
}

/// Ranked rule list
#[derive(Debug, Clone)]
pub struct ToolRouter {
    rules: Vec<RoutingRule>,
    default: ToolCategory,
}

impl ToolRouter {
    /// Router with explicit rules
    pub fn new(rules: Vec<RoutingRule>, default: ToolCategory) -> Self {
        Self { rules, default }
    }

    /// Built-in rules plus configured ones ranked first
    pub fn with_config_rules(extra: &[KeywordRuleConfig]) -> Self {
        let builtin = Self::default();
        let mut rules: Vec<RoutingRule> = extra
            .iter()
            .map(|r| RoutingRule::keywords(r.category, r.keywords.iter().cloned()))
            .collect();
        rules.extend(builtin.rules);
        Self::new(rules, builtin.default)
    }

    /// Prepend a rule so it outranks the existing ones
    pub fn push_front(&mut self, rule: RoutingRule) {
        self.rules.insert(0, rule);
    }

    /// Category for a claim
    pub fn route(&self, claim: &Claim) -> ToolCategory {
        let lower = claim.claim_text.to_lowercase();
        let category = self
            .rules
            .iter()
            .find(|r| r.matches(&lower, claim.claim_type))
            .map(|r| r.category)
            .unwrap_or(self.default);
        debug!(claim = %claim.claim_id, %category, "routed claim");
        category
    }

    /// Category for a free-text query (no claim type available)
    pub fn route_text(&self, text: &str, claim_type: ClaimType) -> ToolCategory {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&lower, claim_type))
            .map(|r| r.category)
            .unwrap_or(self.default)
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        let rules = vec![
            RoutingRule::new(
                ToolCategory::Academic,
                vec![
                    Predicate::AnyKeyword(
                        [
                            "study", "studies", "research", "paper", "survey", "meta-analysis",
                            "percent", "%", "peer-reviewed", "studie", "forschung", "prozent",
                        ]
                        .map(String::from)
                        .to_vec(),
                    ),
                    Predicate::ClaimTypeIs(vec![ClaimType::Quantitative]),
                ],
            ),
            RoutingRule::keywords(
                ToolCategory::Preprint,
                ["ai", "ki", "llm", "gpt", "machine learning", "neural", "transformer"],
            ),
            RoutingRule::new(
                ToolCategory::News,
                vec![
                    Predicate::AnyKeyword(
                        [
                            "release", "released", "version", "announced", "launch", "current",
                            "latest", "aktuell", "neu",
                        ]
                        .map(String::from)
                        .to_vec(),
                    ),
                    Predicate::ContainsYear,
                    Predicate::ClaimTypeIs(vec![ClaimType::Temporal]),
                ],
            ),
            RoutingRule::keywords(
                ToolCategory::Government,
                [
                    "agency", "public sector", "regulation", "procurement", "ministry",
                    "tender", "behörde", "öffentlich",
                ],
            ),
            RoutingRule::new(
                ToolCategory::Community,
                vec![
                    Predicate::AnyKeyword(
                        [
                            "experience", "compared", "comparison", "versus", "vs",
                            "alternative", "erfahrung", "vergleich",
                        ]
                        .map(String::from)
                        .to_vec(),
                    ),
                    Predicate::ClaimTypeIs(vec![ClaimType::Comparison]),
                ],
            ),
            RoutingRule::new(
                ToolCategory::Encyclopedic,
                vec![Predicate::ClaimTypeIs(vec![ClaimType::Definition])],
            ),
        ];
        Self::new(rules, ToolCategory::Web)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimgate_domain::{ClaimId, EvidenceClass, RetrievalTicket};

    fn claim(text: &str, claim_type: ClaimType) -> Claim {
        Claim::new(
            ClaimId::from_index(1),
            text,
            claim_type,
            EvidenceClass::B,
            Some(RetrievalTicket::with_queries([text])),
            1,
        )
    }

    #[test]
    fn test_scientific_language_routes_academic() {
        let router = ToolRouter::default();
        let c = claim("A 2023 study found a 55 percent speed-up", ClaimType::Effect);
        assert_eq!(router.route(&c), ToolCategory::Academic);
        let c = claim("Adoption sits at a third of teams", ClaimType::Quantitative);
        assert_eq!(router.route(&c), ToolCategory::Academic);
    }

    #[test]
    fn test_release_and_year_route_news() {
        let router = ToolRouter::default();
        let c = claim("Version 2 was released in March", ClaimType::Mechanism);
        assert_eq!(router.route(&c), ToolCategory::News);
        let c = claim("The feature shipped in 2024", ClaimType::Mechanism);
        assert_eq!(router.route(&c), ToolCategory::News);
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        let router = ToolRouter::default();
        // "vs" inside "canvas" and "ai" inside "maintain" must not match
        let c = claim("Teams maintain canvas workflows", ClaimType::Effect);
        assert_eq!(router.route(&c), ToolCategory::Web);
        let c = claim("Rust vs Go for services", ClaimType::Effect);
        assert_eq!(router.route(&c), ToolCategory::Community);
        let c = claim("Most AI assistants suggest code", ClaimType::Effect);
        assert_eq!(router.route(&c), ToolCategory::Preprint);
    }

    #[test]
    fn test_definition_routes_encyclopedic_and_default_web() {
        let router = ToolRouter::default();
        let c = claim("Retrieval-augmented generation combines search with generation", ClaimType::Definition);
        assert_eq!(router.route(&c), ToolCategory::Encyclopedic);
        let c = claim("Teams document their workflows", ClaimType::Normative);
        assert_eq!(router.route(&c), ToolCategory::Web);
    }

    #[test]
    fn test_rule_order_is_ranked() {
        let router = ToolRouter::default();
        // matches both academic ("study") and community ("comparison"); academic ranks first
        let c = claim("A comparison study of editors", ClaimType::Comparison);
        assert_eq!(router.route(&c), ToolCategory::Academic);
    }

    #[test]
    fn test_config_rules_outrank_builtin() {
        let router = ToolRouter::with_config_rules(&[KeywordRuleConfig {
            category: ToolCategory::Government,
            keywords: vec!["study".to_string()],
        }]);
        let c = claim("A study of tenders", ClaimType::Effect);
        assert_eq!(router.route(&c), ToolCategory::Government);
    }

    #[test]
    fn test_push_front_and_route_text() {
        let mut router = ToolRouter::new(vec![], ToolCategory::Web);
        assert_eq!(router.route_text("anything", ClaimType::Effect), ToolCategory::Web);
        router.push_front(RoutingRule::keywords(ToolCategory::News, ["launch"]));
        assert_eq!(router.route_text("Launch date", ClaimType::Effect), ToolCategory::News);
    }
}
