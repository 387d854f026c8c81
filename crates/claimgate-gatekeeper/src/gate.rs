//! The evidence gate
//!
//! Decides, per claim, whether the writer may present it as fact and records
//! the outcome in the claim register.

use std::collections::BTreeMap;

use claimgate_domain::{
    Claim, ClaimId, ClaimRegister, ClaimStatus, Component, EvidencePack, ProgressEvent,
    ProgressSink,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::RatingConfig;

/// Gate outcome for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Claim the decision applies to
    pub claim_id: ClaimId,

    /// Whether the writer may use the claim
    pub usable: bool,

    /// Status written to the register
    pub status: ClaimStatus,

    /// Sources that reached the minimum score
    pub qualifying: usize,

    /// Sources the claim requires
    pub required: u32,
}

/// Result of a gate pass over the register
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    /// One decision per claim, in register order
    pub decisions: Vec<GateDecision>,
}

impl GateReport {
    /// Ids of usable claims
    pub fn usable(&self) -> Vec<ClaimId> {
        self.ids_where(|d| d.usable)
    }

    /// Ids of claims left without enough evidence
    pub fn insufficient(&self) -> Vec<ClaimId> {
        self.ids_where(|d| d.status == ClaimStatus::Insufficient)
    }

    /// Ids of claims blocked by contradicting sources
    pub fn conflicts(&self) -> Vec<ClaimId> {
        self.ids_where(|d| d.status == ClaimStatus::Conflict)
    }

    /// Decision for a claim
    pub fn decision(&self, id: &ClaimId) -> Option<&GateDecision> {
        self.decisions.iter().find(|d| &d.claim_id == id)
    }

    fn ids_where(&self, pred: impl Fn(&GateDecision) -> bool) -> Vec<ClaimId> {
        self.decisions
            .iter()
            .filter(|d| pred(d))
            .map(|d| d.claim_id.clone())
            .collect()
    }
}

/// Applies the minimum-evidence rule
#[derive(Debug, Clone)]
pub struct EvidenceGate {
    config: RatingConfig,
}

impl EvidenceGate {
    /// Create a gate from rating configuration
    pub fn new(config: RatingConfig) -> Self {
        Self { config }
    }

    /// Minimum rating total a source needs to count
    pub fn min_score(&self) -> u8 {
        self.config.min_score
    }

    /// Whether a claim may be used by the writer
    ///
    /// A-class claims always pass. B and C claims need a fulfilled pack,
    /// and a pack the judge flagged as contradictory blocks the claim when
    /// `block_conflicts` is set.
    pub fn is_usable(&self, claim: &Claim, pack: Option<&EvidencePack>) -> bool {
        if !claim.needs_evidence() {
            return true;
        }
        match pack {
            Some(pack) => {
                pack.is_fulfilled(claim.min_sources(), self.config.min_score)
                    && !(self.config.block_conflicts && pack.conflict)
            }
            None => false,
        }
    }

    /// Gate every claim, updating register statuses and pack statuses
    pub fn apply(
        &self,
        register: &mut ClaimRegister,
        packs: &mut BTreeMap<ClaimId, EvidencePack>,
        sink: &dyn ProgressSink,
    ) -> GateReport {
        let mut report = GateReport::default();

        for claim in register.claims() {
            let pack = packs.get(&claim.claim_id);
            let usable = self.is_usable(claim, pack);
            let qualifying = pack
                .map(|p| p.qualifying_sources(self.config.min_score).count())
                .unwrap_or(0);
            let status = if !claim.needs_evidence() {
                claim.status
            } else if usable {
                ClaimStatus::Fulfilled
            } else if self.config.block_conflicts && pack.map(|p| p.conflict).unwrap_or(false) {
                ClaimStatus::Conflict
            } else {
                ClaimStatus::Insufficient
            };
            debug!(claim = %claim.claim_id, usable, qualifying, required = claim.min_sources(), "gate");
            report.decisions.push(GateDecision {
                claim_id: claim.claim_id.clone(),
                usable,
                status,
                qualifying,
                required: claim.min_sources(),
            });
        }

        for decision in &report.decisions {
            register.set_status(&decision.claim_id, decision.status);
            if let Some(pack) = packs.get_mut(&decision.claim_id) {
                pack.status = decision.status;
            }
        }

        let usable = report.decisions.iter().filter(|d| d.usable).count();
        let insufficient = report.insufficient();
        let conflicts = report.conflicts();
        info!(
            usable,
            insufficient = insufficient.len(),
            conflicts = conflicts.len(),
            "evidence gate applied"
        );
        sink.emit(
            ProgressEvent::status(
                Component::Gate,
                format!(
                    "{} of {} claims usable, {} insufficient, {} in conflict",
                    usable,
                    report.decisions.len(),
                    insufficient.len(),
                    conflicts.len()
                ),
            )
            .with_payload(json!({
                "usable": usable,
                "insufficient": insufficient,
                "conflict": conflicts,
            })),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rater::fallback_rating;
    use chrono::NaiveDate;
    use claimgate_domain::{
        ClaimType, CollectingSink, EvidenceClass, Outline, QuestionBrief, RegisterMinimums,
        RetrievalTicket, Source, SourceClass, SourceRating, TermMap,
    };

    fn claim(n: usize, class: EvidenceClass) -> Claim {
        let ticket = class
            .needs_evidence()
            .then(|| RetrievalTicket::with_queries(["q1", "q2"]));
        Claim::new(
            ClaimId::from_index(n),
            format!("claim {}", n),
            ClaimType::Effect,
            class,
            ticket,
            1,
        )
    }

    fn rated(n: usize, rating: SourceRating) -> Source {
        Source {
            source_id: format!("S-{:03}", n),
            title: format!("t{}", n),
            publisher: format!("p{}", n),
            author: None,
            date: None,
            url: format!("https://s{}.org/a", n),
            source_class: SourceClass::Secondary,
            extract: String::new(),
            supports_claims: Default::default(),
            rating: Some(rating),
            rating_note: None,
        }
    }

    fn pack(id: usize, ratings: &[SourceRating]) -> EvidencePack {
        let mut pack = EvidencePack::new(ClaimId::from_index(id));
        pack.sources = ratings.iter().enumerate().map(|(i, r)| rated(i, *r)).collect();
        pack
    }

    fn register(claims: Vec<Claim>) -> ClaimRegister {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        ClaimRegister::new(
            QuestionBrief::minimal("q", date),
            TermMap::single("q"),
            Outline::default(),
            claims,
            RegisterMinimums::default(),
        )
    }

    #[test]
    fn test_a_class_always_usable() {
        let gate = EvidenceGate::new(RatingConfig::default());
        assert!(gate.is_usable(&claim(1, EvidenceClass::A), None));
    }

    #[test]
    fn test_c_class_needs_two_qualifying_sources() {
        let gate = EvidenceGate::new(RatingConfig::default());
        let c = claim(1, EvidenceClass::C);
        let good = fallback_rating(SourceClass::Secondary);
        let weak = fallback_rating(SourceClass::Tertiary);

        assert!(!gate.is_usable(&c, None));
        assert!(!gate.is_usable(&c, Some(&pack(1, &[good, weak]))));
        assert!(gate.is_usable(&c, Some(&pack(1, &[good, good]))));
    }

    #[test]
    fn test_conflict_blocks_when_configured() {
        let good = fallback_rating(SourceClass::Primary);
        let mut p = pack(1, &[good]);
        p.conflict = true;
        let b = claim(1, EvidenceClass::B);

        assert!(!EvidenceGate::new(RatingConfig::default()).is_usable(&b, Some(&p)));
        assert!(EvidenceGate::new(RatingConfig::lenient()).is_usable(&b, Some(&p)));
    }

    #[test]
    fn test_apply_writes_statuses() {
        let mut reg = register(vec![
            claim(1, EvidenceClass::A),
            claim(2, EvidenceClass::B),
            claim(3, EvidenceClass::C),
            claim(4, EvidenceClass::B),
        ]);
        let good = fallback_rating(SourceClass::Secondary);
        let mut packs = BTreeMap::new();
        packs.insert(ClaimId::from_index(2), pack(2, &[good]));
        packs.insert(ClaimId::from_index(3), pack(3, &[good]));
        let mut conflicted = pack(4, &[good]);
        conflicted.conflict = true;
        packs.insert(ClaimId::from_index(4), conflicted);
        let sink = CollectingSink::new();

        let report = EvidenceGate::new(RatingConfig::default()).apply(&mut reg, &mut packs, &sink);

        assert_eq!(report.usable(), vec![ClaimId::from_index(1), ClaimId::from_index(2)]);
        assert_eq!(report.insufficient(), vec![ClaimId::from_index(3)]);
        assert_eq!(report.conflicts(), vec![ClaimId::from_index(4)]);

        let status = |n| reg.claim(&ClaimId::from_index(n)).unwrap().status;
        assert_eq!(status(1), ClaimStatus::Pending);
        assert_eq!(status(2), ClaimStatus::Fulfilled);
        assert_eq!(status(3), ClaimStatus::Insufficient);
        assert_eq!(status(4), ClaimStatus::Conflict);
        assert_eq!(packs[&ClaimId::from_index(3)].status, ClaimStatus::Insufficient);
        assert_eq!(sink.events().len(), 1);

        let d = report.decision(&ClaimId::from_index(3)).unwrap();
        assert_eq!(d.qualifying, 1);
        assert_eq!(d.required, 2);
    }

    #[test]
    fn test_missing_pack_is_insufficient() {
        let mut reg = register(vec![claim(1, EvidenceClass::B)]);
        let mut packs = BTreeMap::new();
        let report = EvidenceGate::new(RatingConfig::default()).apply(
            &mut reg,
            &mut packs,
            &claimgate_domain::NullSink,
        );
        assert_eq!(report.insufficient().len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn lowering_min_score_never_blocks_a_usable_claim(
                totals in proptest::collection::vec(0i64..=3, 0..8),
                high in 0u8..=15,
                drop in 0u8..=15,
            ) {
                let ratings: Vec<SourceRating> =
                    totals.iter().map(|&v| SourceRating::new(v, v, v, v, v)).collect();
                let p = pack(1, &ratings);
                let c = claim(1, EvidenceClass::C);
                let low = high.saturating_sub(drop);
                let strict = EvidenceGate::new(RatingConfig { min_score: high, ..Default::default() });
                let loose = EvidenceGate::new(RatingConfig { min_score: low, ..Default::default() });
                if strict.is_usable(&c, Some(&p)) {
                    prop_assert!(loose.is_usable(&c, Some(&p)));
                }
            }
        }
    }
}
