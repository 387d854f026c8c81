//! Gap research
//!
//! Follow-up retrieval for the claims a reviewer named. Each claim gets a
//! few extra queries against a single tool; new sources are appended to
//! its pack, never replacing what is already there.

use std::collections::{BTreeMap, BTreeSet};

use claimgate_domain::{
    ClaimId, ClaimRegister, Component, EvidencePack, ProgressEvent, ProgressSink, ReviewReport,
};
use claimgate_retrieval::{EvidencePlanner, Retriever};
use serde_json::json;
use tracing::{debug, info};

/// What one gap-research pass found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapOutcome {
    /// New sources per researched claim
    pub new_sources: BTreeMap<ClaimId, usize>,

    /// Queries issued
    pub queries: usize,
}

impl GapOutcome {
    /// Total new sources
    pub fn total_new(&self) -> usize {
        self.new_sources.values().sum()
    }

    /// Claims that gained at least one source
    pub fn enriched(&self) -> Vec<ClaimId> {
        self.new_sources
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Bounded follow-up retrieval
pub struct GapResearcher<'a> {
    retriever: &'a Retriever,
    planner: &'a EvidencePlanner,
    max_queries: usize,
    max_new_per_query: usize,
}

impl<'a> GapResearcher<'a> {
    /// Create a researcher issuing at most `max_queries` queries per claim
    pub fn new(
        retriever: &'a Retriever,
        planner: &'a EvidencePlanner,
        max_queries: usize,
        max_new_per_query: usize,
    ) -> Self {
        Self {
            retriever,
            planner,
            max_queries,
            max_new_per_query,
        }
    }

    /// Queries for one claim: the reviewer's suggestions first, then the plan
    pub fn queries_for(&self, claim_id: &ClaimId, register: &ClaimRegister, report: &ReviewReport) -> Vec<String> {
        let Some(claim) = register.claim(claim_id) else {
            return Vec::new();
        };
        let suggested = report
            .issues
            .iter()
            .filter(|i| i.claim_id.as_ref() == Some(claim_id))
            .filter_map(|i| i.research_query.clone());
        let planned = self.planner.plan_claim(claim, register.term_map()).queries;

        let mut seen = BTreeSet::new();
        suggested
            .chain(planned)
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
            .take(self.max_queries)
            .collect()
    }

    /// Research every gap claim of the report
    pub fn research(
        &self,
        report: &ReviewReport,
        register: &ClaimRegister,
        packs: &mut BTreeMap<ClaimId, EvidencePack>,
        sink: &dyn ProgressSink,
    ) -> GapOutcome {
        let mut outcome = GapOutcome::default();

        for claim_id in &report.gap_claims {
            let Some(claim) = register.claim(claim_id) else {
                continue;
            };
            let queries = self.queries_for(claim_id, register, report);
            let category = self.planner.router().route(claim);
            sink.emit(
                ProgressEvent::status(
                    Component::GapResearch,
                    format!("{}: {} follow-up queries via {}", claim_id, queries.len(), category),
                )
                .with_payload(json!({"claim_id": claim_id, "queries": queries, "tool": category})),
            );

            let pack = packs
                .entry(claim_id.clone())
                .or_insert_with(|| EvidencePack::new(claim_id.clone()));
            let excluded = claim
                .retrieval_ticket()
                .map(|t| t.excluded_domains.as_slice())
                .unwrap_or_default();
            let mut added = 0;
            for query in &queries {
                added += self
                    .retriever
                    .follow_up(pack, query, category, excluded, self.max_new_per_query, sink);
            }
            outcome.queries += queries.len();
            if added > 0 {
                pack.notes.push(format!("gap research added {} sources", added));
            }
            debug!(claim = %claim_id, added, "gap research for claim done");
            outcome.new_sources.insert(claim_id.clone(), added);
        }

        info!(
            claims = outcome.new_sources.len(),
            queries = outcome.queries,
            new_sources = outcome.total_new(),
            "gap research complete"
        );
        outcome
    }
}
