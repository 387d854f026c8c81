//! Evidence planner
//!
//! Turns every B/C claim that still needs evidence into a [`RetrievalPlan`]:
//! a tool category, an ordered query list enriched with term-map variants,
//! and the claim's own stop thresholds.

use std::collections::BTreeSet;

use claimgate_domain::{Claim, ClaimId, ClaimRegister, TermMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::registry::ToolCategory;
use crate::routing::ToolRouter;

/// Retrieval instructions for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    /// Claim being researched
    pub claim_id: ClaimId,

    /// Tool category chosen by the router
    pub category: ToolCategory,

    /// Queries, in execution order
    pub queries: Vec<String>,

    /// Effective minimum number of sources
    pub min_sources: u32,

    /// Hard cap on accepted sources
    pub max_sources: usize,

    /// Domains whose results are rejected
    pub excluded_domains: Vec<String>,
}

/// Builds retrieval plans
#[derive(Debug, Clone)]
pub struct EvidencePlanner {
    router: ToolRouter,
    config: RetrievalConfig,
}

impl EvidencePlanner {
    /// Create a planner
    pub fn new(router: ToolRouter, config: RetrievalConfig) -> Self {
        Self { router, config }
    }

    /// Planner with the built-in router and configured extra rules
    pub fn from_config(config: RetrievalConfig) -> Self {
        let router = ToolRouter::with_config_rules(&config.extra_rules);
        Self::new(router, config)
    }

    /// The router in use
    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Plans for all B/C claims that are pending or insufficient
    pub fn plan(&self, register: &ClaimRegister) -> Vec<RetrievalPlan> {
        register
            .claims_needing_evidence()
            .map(|claim| self.plan_claim(claim, register.term_map()))
            .collect()
    }

    /// Plan for one claim
    ///
    /// A claim without ticket queries is searched by its own text.
    pub fn plan_claim(&self, claim: &Claim, terms: &TermMap) -> RetrievalPlan {
        let ticket = claim.retrieval_ticket();
        let mut base: Vec<String> = ticket
            .map(|t| {
                t.queries
                    .iter()
                    .filter(|q| !q.trim().is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if base.is_empty() {
            base.push(claim.claim_text.clone());
        }

        let queries = enrich_queries(
            &base,
            terms,
            self.config.max_variants_per_term,
            self.config.max_queries_per_claim,
        );
        let category = self.router.route(claim);
        debug!(claim = %claim.claim_id, %category, queries = queries.len(), "planned retrieval");

        RetrievalPlan {
            claim_id: claim.claim_id.clone(),
            category,
            queries,
            min_sources: claim.min_sources(),
            max_sources: self.config.max_sources_per_claim,
            excluded_domains: ticket.map(|t| t.excluded_domains.clone()).unwrap_or_default(),
        }
    }
}

/// Original queries first, then term-substituted variants, deduplicated
///
/// For every canonical term found in a query, up to `max_variants` of its
/// search variants replace it. The result holds at most `max_queries`.
pub fn enrich_queries(
    queries: &[String],
    terms: &TermMap,
    max_variants: usize,
    max_queries: usize,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut push = |q: String, out: &mut Vec<String>| {
        let q = q.trim().to_string();
        if !q.is_empty() && seen.insert(q.to_lowercase()) {
            out.push(q);
        }
    };

    for query in queries {
        push(query.clone(), &mut out);
    }

    for query in queries {
        for term in terms.terms_in(query) {
            for variant in terms.variants(term).iter().take(max_variants) {
                push(replace_case_insensitive(query, term, variant), &mut out);
            }
        }
    }

    out.truncate(max_queries.max(1));
    out
}

fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; only splice when offsets line up
    if lower.len() != haystack.len() {
        return haystack.replace(needle, replacement);
    }
    match lower.find(&needle_lower) {
        Some(start) => {
            let end = start + needle_lower.len();
            format!("{}{}{}", &haystack[..start], replacement, &haystack[end..])
        }
        None => haystack.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use claimgate_domain::{
        ClaimStatus, ClaimType, EvidenceClass, Outline, QuestionBrief, RegisterMinimums,
        RetrievalTicket,
    };

    fn terms() -> TermMap {
        let mut map = TermMap::single("Copilot");
        map.search_variants.insert(
            "Copilot".to_string(),
            vec![
                "GitHub Copilot".to_string(),
                "Copilot Enterprise".to_string(),
                "AI pair programmer".to_string(),
            ],
        );
        map
    }

    fn claim(n: usize, class: EvidenceClass, queries: &[&str]) -> Claim {
        let ticket = (!queries.is_empty()).then(|| RetrievalTicket {
            excluded_domains: vec!["pinterest.com".to_string()],
            ..RetrievalTicket::with_queries(queries.iter().copied())
        });
        Claim::new(
            ClaimId::from_index(n),
            format!("Copilot claim {}", n),
            ClaimType::Effect,
            class,
            ticket,
            1,
        )
    }

    #[test]
    fn test_enrich_queries_substitutes_variants() {
        let queries = vec!["copilot productivity study".to_string(), "Copilot survey".to_string()];
        let enriched = enrich_queries(&queries, &terms(), 2, 5);
        assert_eq!(
            enriched,
            vec![
                "copilot productivity study",
                "Copilot survey",
                "GitHub Copilot productivity study",
                "Copilot Enterprise productivity study",
                "GitHub Copilot survey",
            ]
        );
    }

    #[test]
    fn test_enrich_queries_without_terms_keeps_originals() {
        let queries = vec!["rust".to_string(), "RUST".to_string()];
        assert_eq!(enrich_queries(&queries, &TermMap::default(), 2, 5), vec!["rust"]);
    }

    #[test]
    fn test_plan_covers_only_claims_needing_evidence() {
        let brief = QuestionBrief::minimal("q", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut register = ClaimRegister::new(
            brief,
            terms(),
            Outline::default(),
            vec![
                claim(1, EvidenceClass::A, &[]),
                claim(2, EvidenceClass::B, &["Copilot study"]),
                claim(3, EvidenceClass::C, &["q1", "q2"]),
                claim(4, EvidenceClass::C, &["q3"]),
            ],
            RegisterMinimums::default(),
        );
        register.set_status(&ClaimId::from_index(4), ClaimStatus::Fulfilled);

        let planner = EvidencePlanner::from_config(RetrievalConfig::default());
        let plans = planner.plan(&register);
        let ids: Vec<_> = plans.iter().map(|p| p.claim_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["C-02", "C-03"]);
        assert_eq!(plans[0].min_sources, 1);
        assert_eq!(plans[0].category, ToolCategory::Web);
        assert_eq!(plans[0].queries[0], "Copilot study");
        assert_eq!(plans[1].min_sources, 2);
        assert_eq!(plans[1].queries, vec!["q1", "q2"]);
        assert_eq!(plans[1].excluded_domains, vec!["pinterest.com"]);
        assert_eq!(plans[1].max_sources, 6);
    }

    #[test]
    fn test_missing_ticket_falls_back_to_claim_text() {
        let planner = EvidencePlanner::from_config(RetrievalConfig::default());
        let plan = planner.plan_claim(&claim(5, EvidenceClass::B, &[]), &TermMap::default());
        assert_eq!(plan.queries, vec!["Copilot claim 5"]);
        assert!(plan.excluded_domains.is_empty());
    }

    #[test]
    fn test_replace_case_insensitive() {
        assert_eq!(replace_case_insensitive("copilot rocks", "Copilot", "X"), "X rocks");
        assert_eq!(replace_case_insensitive("none here", "Copilot", "X"), "none here");
    }
}
