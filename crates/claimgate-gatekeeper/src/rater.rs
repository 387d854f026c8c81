//! Evidence rating
//!
//! Every source in a non-empty pack leaves the rater with a rating. Judged
//! ratings come from the completion service; sources the judge skipped, and
//! whole batches whose call or parse failed, get the class-based fallback.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use claimgate_domain::{
    Claim, ClaimId, ClaimRegister, Component, CompletionRequest, CompletionService, EventKind,
    EvidencePack, ProgressEvent, ProgressSink, Source, SourceClass, SourceRating, TokenUsage,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::RatingConfig;
use crate::error::GatekeeperError;
use crate::prompt::{build_rating_prompt, SYSTEM};

/// Class-based rating used when judgment is unavailable
///
/// Primary sources score high on authority and low on independence,
/// tertiary sources the other way round.
pub fn fallback_rating(class: SourceClass) -> SourceRating {
    match class {
        SourceClass::Primary => SourceRating::new(3, 1, 2, 3, 1),
        SourceClass::Secondary => SourceRating::new(2, 2, 2, 2, 2),
        SourceClass::Tertiary => SourceRating::new(1, 3, 2, 1, 1),
    }
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
    #[serde(default)]
    ratings: Vec<JudgedRating>,
    #[serde(default)]
    conflict: bool,
}

#[derive(Debug, Deserialize)]
struct JudgedRating {
    source_id: String,
    #[serde(default)]
    authority: f64,
    #[serde(default)]
    independence: f64,
    #[serde(default)]
    recency: f64,
    #[serde(default)]
    specificity: f64,
    #[serde(default)]
    consensus: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

impl JudgedRating {
    fn to_rating(&self) -> SourceRating {
        let r = |v: f64| v.round() as i64;
        SourceRating::new(
            r(self.authority),
            r(self.independence),
            r(self.recency),
            r(self.specificity),
            r(self.consensus),
        )
    }
}

/// Counters from a rating pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingSummary {
    /// Sources rated by the judge
    pub judged: usize,

    /// Sources rated by the class fallback
    pub fallback: usize,

    /// Judge calls that failed or could not be parsed
    pub failed_calls: usize,

    /// Packs the judge flagged as contradictory
    pub conflicts: usize,

    /// Tokens spent on judge calls
    pub usage: TokenUsage,
}

impl RatingSummary {
    /// Add another summary's counts to this one
    pub fn absorb(&mut self, other: RatingSummary) {
        self.judged += other.judged;
        self.fallback += other.fallback;
        self.failed_calls += other.failed_calls;
        self.conflicts += other.conflicts;
        self.usage += other.usage;
    }
}

/// Rates evidence packs
pub struct EvidenceRater {
    service: Option<Arc<dyn CompletionService>>,
    config: RatingConfig,
}

impl EvidenceRater {
    /// Rater that consults the completion service
    pub fn new(service: Arc<dyn CompletionService>, config: RatingConfig) -> Self {
        Self {
            service: Some(service),
            config,
        }
    }

    /// Rater that only uses class-based ratings
    pub fn offline(config: RatingConfig) -> Self {
        Self {
            service: None,
            config,
        }
    }

    /// Model used for judgment, if any
    pub fn model_name(&self) -> Option<&str> {
        self.judge().map(|s| s.model_name())
    }

    /// Rate all packs of the register's claims
    pub fn rate_all(
        &self,
        register: &ClaimRegister,
        packs: &mut BTreeMap<ClaimId, EvidencePack>,
        sink: &dyn ProgressSink,
    ) -> RatingSummary {
        let mut summary = RatingSummary::default();
        for (claim_id, pack) in packs.iter_mut() {
            match register.claim(claim_id) {
                Some(claim) => summary.absorb(self.rate_pack(claim, pack, sink)),
                None => warn!(claim = %claim_id, "pack without claim, skipping rating"),
            }
        }
        info!(
            judged = summary.judged,
            fallback = summary.fallback,
            failed_calls = summary.failed_calls,
            "rating complete"
        );
        summary
    }

    /// Rate one pack in place
    ///
    /// Only unrated sources are sent to the judge, so packs grown by gap
    /// research keep their earlier ratings.
    pub fn rate_pack(
        &self,
        claim: &Claim,
        pack: &mut EvidencePack,
        sink: &dyn ProgressSink,
    ) -> RatingSummary {
        let mut summary = RatingSummary::default();
        let pending: Vec<usize> = pack
            .sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.rating.is_none())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return summary;
        }

        for batch in pending.chunks(self.config.max_sources_per_call.max(1)) {
            let judged = match self.judge() {
                Some(service) => {
                    let sources: Vec<&Source> = batch.iter().map(|&i| &pack.sources[i]).collect();
                    match self.call_judge(service, claim, &sources, sink) {
                        Ok((response, usage)) => {
                            summary.usage += usage;
                            Some(response)
                        }
                        Err(e) => {
                            warn!(claim = %claim.claim_id, error = %e, "judge failed, using class ratings");
                            summary.failed_calls += 1;
                            sink.emit(
                                ProgressEvent::error(
                                    Component::Rater,
                                    format!("{}: rating fell back to source class ({})", claim.claim_id, e),
                                )
                                .with_payload(json!({"claim_id": claim.claim_id})),
                            );
                            None
                        }
                    }
                }
                None => None,
            };

            let by_id: HashMap<&str, &JudgedRating> = judged
                .as_ref()
                .map(|r| r.ratings.iter().map(|j| (j.source_id.as_str(), j)).collect())
                .unwrap_or_default();

            for &i in batch {
                let source = &mut pack.sources[i];
                match by_id.get(source.source_id.as_str()) {
                    Some(j) => {
                        source.rating = Some(j.to_rating());
                        source.rating_note = j.reasoning.clone();
                        summary.judged += 1;
                    }
                    None => {
                        source.rating = Some(fallback_rating(source.source_class));
                        source.rating_note = Some("rated by source class".to_string());
                        summary.fallback += 1;
                    }
                }
            }

            if judged.as_ref().map(|r| r.conflict).unwrap_or(false) && !pack.conflict {
                pack.conflict = true;
                summary.conflicts += 1;
                pack.notes.push("judge flagged contradicting sources".to_string());
            }
        }

        let qualifying = pack.qualifying_sources(self.config.min_score).count();
        debug!(claim = %claim.claim_id, qualifying, total = pack.sources.len(), "pack rated");
        sink.emit(
            ProgressEvent::status(
                Component::Rater,
                format!(
                    "{}: {} of {} sources reach {}",
                    claim.claim_id,
                    qualifying,
                    pack.sources.len(),
                    self.config.min_score
                ),
            )
            .with_payload(json!({
                "claim_id": claim.claim_id,
                "qualifying": qualifying,
                "judged": summary.judged,
                "fallback": summary.fallback,
            })),
        );
        summary
    }

    fn judge(&self) -> Option<&dyn CompletionService> {
        if !self.config.use_judgment {
            return None;
        }
        self.service.as_deref()
    }

    fn call_judge(
        &self,
        service: &dyn CompletionService,
        claim: &Claim,
        sources: &[&Source],
        sink: &dyn ProgressSink,
    ) -> Result<(JudgeResponse, TokenUsage), GatekeeperError> {
        let request =
            CompletionRequest::new(build_rating_prompt(claim, sources)).with_system(SYSTEM);
        sink.emit(ProgressEvent::new(
            EventKind::ToolCall,
            Component::Rater,
            format!("rating {} sources for {}", sources.len(), claim.claim_id),
        ));
        let completion = service.complete(&request)?;
        let response: JudgeResponse = claimgate_llm::parse_structured(&completion.text)?;
        Ok((response, completion.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimgate_domain::{ClaimType, CollectingSink, EvidenceClass};
    use claimgate_llm::MockProvider;

    fn claim() -> Claim {
        Claim::new(
            ClaimId::from_index(1),
            "Rust adoption doubled",
            ClaimType::Quantitative,
            EvidenceClass::C,
            None,
            1,
        )
    }

    fn source(n: usize, class: SourceClass) -> Source {
        Source {
            source_id: format!("S-C-01-{:03}", n),
            title: format!("t{}", n),
            publisher: format!("p{}", n),
            author: None,
            date: None,
            url: format!("https://s{}.org", n),
            source_class: class,
            extract: String::new(),
            supports_claims: Default::default(),
            rating: None,
            rating_note: None,
        }
    }

    fn pack(classes: &[SourceClass]) -> EvidencePack {
        let mut pack = EvidencePack::new(ClaimId::from_index(1));
        pack.sources = classes.iter().enumerate().map(|(i, c)| source(i + 1, *c)).collect();
        pack
    }

    #[test]
    fn test_fallback_totals() {
        assert_eq!(fallback_rating(SourceClass::Primary).total(), 10);
        assert_eq!(fallback_rating(SourceClass::Secondary).total(), 10);
        assert_eq!(fallback_rating(SourceClass::Tertiary).total(), 8);
        let primary = fallback_rating(SourceClass::Primary);
        let tertiary = fallback_rating(SourceClass::Tertiary);
        assert!(primary.authority() > tertiary.authority());
        assert!(primary.independence() < tertiary.independence());
    }

    #[test]
    fn test_judged_ratings_applied_and_missing_fall_back() {
        let provider = MockProvider::new(
            r#"```json
{"ratings": [{"source_id": "S-C-01-001", "authority": 3, "independence": 3, "recency": 2.6, "specificity": 9, "consensus": 2, "reasoning": "official"}], "conflict": false}
```"#,
        );
        let rater = EvidenceRater::new(Arc::new(provider), RatingConfig::default());
        let mut p = pack(&[SourceClass::Secondary, SourceClass::Tertiary]);

        let summary = rater.rate_pack(&claim(), &mut p, &CollectingSink::new());

        assert_eq!(summary.judged, 1);
        assert_eq!(summary.fallback, 1);
        assert_eq!(p.sources[0].rating.unwrap().total(), 3 + 3 + 3 + 3 + 2);
        assert_eq!(p.sources[0].rating_note.as_deref(), Some("official"));
        assert_eq!(p.sources[1].rating, Some(fallback_rating(SourceClass::Tertiary)));
        assert!(!p.conflict);
    }

    #[test]
    fn test_unparsable_judge_falls_back_for_whole_pack() {
        let provider = MockProvider::new("I think these sources are fine.");
        let rater = EvidenceRater::new(Arc::new(provider), RatingConfig::default());
        let mut p = pack(&[SourceClass::Primary, SourceClass::Secondary]);
        let sink = CollectingSink::new();

        let summary = rater.rate_pack(&claim(), &mut p, &sink);

        assert_eq!(summary.failed_calls, 1);
        assert_eq!(summary.fallback, 2);
        assert!(p.sources.iter().all(|s| s.rating.is_some()));
        assert_eq!(sink.of_kind(EventKind::Error).len(), 1);
        assert!(p.is_fulfilled(2, 10));
    }

    #[test]
    fn test_completion_failure_falls_back() {
        let mut provider = MockProvider::default();
        provider.push_error("down");
        let rater = EvidenceRater::new(Arc::new(provider), RatingConfig::default());
        let mut p = pack(&[SourceClass::Tertiary]);

        let summary = rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(summary.failed_calls, 1);
        assert_eq!(p.sources[0].rating.unwrap().total(), 8);
    }

    #[test]
    fn test_conflict_flag_recorded() {
        let provider = MockProvider::new(r#"{"ratings": [], "conflict": true}"#);
        let rater = EvidenceRater::new(Arc::new(provider), RatingConfig::default());
        let mut p = pack(&[SourceClass::Secondary]);

        let summary = rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert!(p.conflict);
        assert_eq!(summary.conflicts, 1);
    }

    #[test]
    fn test_offline_and_disabled_judgment_make_no_calls() {
        let provider = MockProvider::new("{}");
        let config = RatingConfig {
            use_judgment: false,
            ..Default::default()
        };
        let rater = EvidenceRater::new(Arc::new(provider.clone()), config);
        let mut p = pack(&[SourceClass::Primary]);
        rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(provider.call_count(), 0);
        assert!(rater.model_name().is_none());

        let rater = EvidenceRater::offline(RatingConfig::default());
        let mut p = pack(&[SourceClass::Secondary]);
        let summary = rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(summary.fallback, 1);
    }

    #[test]
    fn test_already_rated_sources_are_kept() {
        let provider = MockProvider::new(r#"{"ratings": []}"#);
        let rater = EvidenceRater::new(Arc::new(provider.clone()), RatingConfig::default());
        let mut p = pack(&[SourceClass::Secondary, SourceClass::Secondary]);
        p.sources[0].rating = Some(SourceRating::new(3, 3, 3, 3, 3));

        rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(p.sources[0].rating.unwrap().total(), 15);
        assert_eq!(provider.call_count(), 1);
        assert!(!provider.prompts()[0].contains("S-C-01-001"));

        // nothing left to rate: no further call
        rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_batches_respect_max_sources_per_call() {
        let provider = MockProvider::new(r#"{"ratings": []}"#);
        let config = RatingConfig {
            max_sources_per_call: 2,
            ..Default::default()
        };
        let rater = EvidenceRater::new(Arc::new(provider.clone()), config);
        let mut p = pack(&[SourceClass::Secondary; 5]);
        rater.rate_pack(&claim(), &mut p, &CollectingSink::new());
        assert_eq!(provider.call_count(), 3);
    }
}
