//! Targeted retriever
//!
//! Executes a [`RetrievalPlan`] query by query, strictly in order, so the
//! stop conditions can skip the remaining queries:
//!
//! - accepted sources ≥ the claim's `min_sources` (checked before each query)
//! - accepted sources ≥ the per-claim cap (checked for every hit)
//! - queries exhausted
//!
//! A failing tool call costs that query's results and nothing else.

use std::collections::BTreeMap;
use std::sync::Arc;

use claimgate_domain::{
    ClaimId, ClaimRegister, ClaimStatus, Component, EventKind, EvidencePack, ProgressEvent,
    ProgressSink, SearchHit, Source,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::classify::{host_in, publisher_from_url, SourceClassifier};
use crate::config::RetrievalConfig;
use crate::planner::RetrievalPlan;
use crate::registry::{ToolCategory, ToolRegistry};

/// Executes retrieval plans against the registered tools
#[derive(Debug, Clone)]
pub struct Retriever {
    registry: Arc<ToolRegistry>,
    classifier: SourceClassifier,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with the default classifier
    pub fn new(registry: Arc<ToolRegistry>, config: RetrievalConfig) -> Self {
        Self::with_classifier(registry, SourceClassifier::default(), config)
    }

    /// Create a retriever with a custom classifier
    pub fn with_classifier(
        registry: Arc<ToolRegistry>,
        classifier: SourceClassifier,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            registry,
            classifier,
            config,
        }
    }

    /// Execute one plan
    pub fn retrieve(&self, plan: &RetrievalPlan, sink: &dyn ProgressSink) -> EvidencePack {
        let mut pack = EvidencePack::new(plan.claim_id.clone());
        pack.status = ClaimStatus::InProgress;
        let min_sources = plan.min_sources as usize;

        for query in &plan.queries {
            if pack.sources.len() >= min_sources || pack.sources.len() >= plan.max_sources {
                break;
            }
            let room = plan.max_sources - pack.sources.len();
            self.run_query(&mut pack, query, plan.category, &plan.excluded_domains, room, sink);
        }

        pack.status = if pack.sources.len() >= min_sources {
            ClaimStatus::Fulfilled
        } else {
            ClaimStatus::Insufficient
        };
        pack.notes.push(format!(
            "found {} of {} required sources",
            pack.sources.len(),
            plan.min_sources
        ));
        debug!(claim = %plan.claim_id, sources = pack.sources.len(), status = pack.status.as_str(), "retrieval finished");
        sink.emit(
            ProgressEvent::status(
                Component::Retriever,
                format!(
                    "{}: {} of {} sources",
                    plan.claim_id,
                    pack.sources.len(),
                    plan.min_sources
                ),
            )
            .with_payload(json!({
                "claim_id": plan.claim_id,
                "found": pack.sources.len(),
                "required": plan.min_sources,
                "status": pack.status,
            })),
        );
        pack
    }

    /// Execute all plans, writing each claim's status into the register
    pub fn retrieve_all(
        &self,
        register: &mut ClaimRegister,
        plans: &[RetrievalPlan],
        sink: &dyn ProgressSink,
    ) -> BTreeMap<ClaimId, EvidencePack> {
        let mut packs = BTreeMap::new();
        for plan in plans {
            register.set_status(&plan.claim_id, ClaimStatus::InProgress);
            let pack = self.retrieve(plan, sink);
            register.set_status(&plan.claim_id, pack.status);
            packs.insert(plan.claim_id.clone(), pack);
        }
        let total: usize = packs.values().map(|p| p.sources.len()).sum();
        info!(claims = packs.len(), sources = total, "retrieval complete");
        packs
    }

    /// Run a single follow-up query, appending up to `max_new` new sources
    ///
    /// URLs already in the pack and hosts in `excluded` are skipped.
    /// Returns the number added.
    pub fn follow_up(
        &self,
        pack: &mut EvidencePack,
        query: &str,
        category: ToolCategory,
        excluded: &[String],
        max_new: usize,
        sink: &dyn ProgressSink,
    ) -> usize {
        let before = pack.sources.len();
        self.run_query(pack, query, category, excluded, max_new, sink);
        pack.sources.len() - before
    }

    /// Run one query; accept at most `room` new sources
    fn run_query(
        &self,
        pack: &mut EvidencePack,
        query: &str,
        category: ToolCategory,
        excluded: &[String],
        room: usize,
        sink: &dyn ProgressSink,
    ) {
        let tool = match self.registry.resolve(category) {
            Some(tool) => tool,
            None => {
                warn!(%category, "no search tool registered");
                sink.emit(ProgressEvent::error(
                    Component::Retriever,
                    format!("no search tool available for '{}'", query),
                ));
                return;
            }
        };

        sink.emit(
            ProgressEvent::new(
                EventKind::ToolCall,
                Component::Retriever,
                format!("{}: {}", tool.id(), query),
            )
            .with_payload(json!({"claim_id": pack.claim_id, "tool": tool.id(), "query": query})),
        );

        let hits = match tool.search(query, self.config.results_per_query) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(tool = tool.id(), query, error = %e, "search failed");
                sink.emit(
                    ProgressEvent::error(Component::Retriever, format!("{} failed: {}", tool.id(), e))
                        .with_payload(json!({"claim_id": pack.claim_id, "query": query})),
                );
                return;
            }
        };

        let received = hits.len();
        let mut accepted = 0;
        for hit in hits {
            if accepted >= room {
                break;
            }
            if hit.url.trim().is_empty() || host_in(&hit.url, excluded) || pack.contains_url(&hit.url) {
                continue;
            }
            let source = self.to_source(&pack.claim_id, pack.sources.len() + 1, hit);
            pack.sources.push(source);
            accepted += 1;
        }

        sink.emit(
            ProgressEvent::new(
                EventKind::ToolResult,
                Component::Retriever,
                format!("{} results, {} accepted", received, accepted),
            )
            .with_payload(json!({
                "claim_id": pack.claim_id,
                "tool": tool.id(),
                "received": received,
                "accepted": accepted,
            })),
        );
    }

    fn to_source(&self, claim_id: &ClaimId, n: usize, hit: SearchHit) -> Source {
        let title = if hit.title.trim().is_empty() {
            hit.url.clone()
        } else {
            hit.title.trim().to_string()
        };
        Source {
            source_id: format!("S-{}-{:03}", claim_id, n),
            title,
            publisher: publisher_from_url(&hit.url),
            author: None,
            date: None,
            source_class: self.classifier.classify(&hit.url),
            extract: Source::bounded_extract(&hit.snippet),
            supports_claims: [claim_id.clone()].into_iter().collect(),
            rating: None,
            rating_note: None,
            url: hit.url,
        }
    }
}
