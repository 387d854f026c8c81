//! Phase 2: claim mining
//!
//! Produces the outline and the claim register. Model output is read
//! leniently, then the register discipline is enforced mechanically: every
//! B/C claim leaves this phase with a ticket holding at least
//! `min_queries_per_claim` queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use claimgate_domain::{
    Claim, ClaimId, ClaimRegister, ClaimType, Component, CompletionRequest, CompletionService,
    EvidenceClass, Outline, OutlineSection, ProgressEvent, ProgressSink, QuestionBrief,
    RetrievalTicket, SourceClass, TermMap, TokenUsage,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::MiningConfig;
use crate::error::{PipelineError, Result};
use crate::prompt::{miner_prompt, MINER_SYSTEM};

/// Output of the miner
#[derive(Debug, Clone)]
pub struct MinedClaims {
    /// The register, possibly empty
    pub register: ClaimRegister,

    /// Tokens spent
    pub usage: TokenUsage,
}

/// The claim miner
pub struct ClaimMiner {
    service: Arc<dyn CompletionService>,
    config: MiningConfig,
}

impl ClaimMiner {
    /// Create a miner
    pub fn new(service: Arc<dyn CompletionService>, config: MiningConfig) -> Self {
        Self { service, config }
    }

    /// Mine claims for a normalized question
    ///
    /// Completion and parse failures are returned. An empty register is not
    /// an error here; the orchestrator decides what to do with it.
    pub fn mine(&self, brief: &QuestionBrief, terms: &TermMap, sink: &dyn ProgressSink) -> Result<MinedClaims> {
        sink.emit(ProgressEvent::status(Component::Miner, "mining claims"));

        let request = CompletionRequest::new(miner_prompt(brief, terms, &self.config)).with_system(MINER_SYSTEM);
        let completion = self.service.complete(&request).map_err(|e| {
            sink.emit(ProgressEvent::error(Component::Miner, format!("completion failed: {}", e)));
            PipelineError::from(e)
        })?;
        let (value, strategy) = claimgate_llm::extract_json_value_with_key(&completion.text, "claims")
            .map_err(|e| {
                sink.emit(ProgressEvent::error(Component::Miner, format!("unparsable claim register: {}", e)));
                PipelineError::from(e)
            })?;
        debug!(?strategy, "miner output parsed");

        let register = self.build_register(&value, brief, terms)?;
        let validation = register.validate();
        let counts = validation.counts;
        info!(
            total = counts.total,
            a = counts.a,
            b = counts.b,
            c = counts.c,
            valid = validation.valid,
            "claim register built"
        );
        let payload = serde_json::to_value(&validation)?;
        if validation.valid {
            sink.emit(
                ProgressEvent::status(
                    Component::Miner,
                    format!("{} claims (A {}, B {}, C {})", counts.total, counts.a, counts.b, counts.c),
                )
                .with_payload(payload),
            );
        } else {
            let issues: Vec<String> = validation.issues.iter().map(ToString::to_string).collect();
            warn!(issues = ?issues, "claim register has issues");
            sink.emit(
                ProgressEvent::error(Component::Miner, format!("claim register issues: {}", issues.join("; ")))
                    .with_payload(payload),
            );
        }

        Ok(MinedClaims {
            register,
            usage: completion.usage,
        })
    }

    fn build_register(&self, value: &Value, brief: &QuestionBrief, terms: &TermMap) -> Result<ClaimRegister> {
        let claims_value = value
            .get("claims")
            .ok_or_else(|| PipelineError::Parse("miner output has no \"claims\" field".to_string()))?;
        let items = claims_value
            .as_array()
            .ok_or_else(|| PipelineError::Parse("\"claims\" is not a list".to_string()))?;

        let outline = parse_outline(value.get("outline"));
        let mut claims: Vec<Claim> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| parse_claim(i, item))
            .map(|claim| self.complete_ticket(claim, terms))
            .collect();
        dedupe_ids(&mut claims);

        Ok(ClaimRegister::new(
            brief.clone(),
            terms.clone(),
            outline,
            claims,
            self.config.minimums(),
        ))
    }

    /// Give B/C claims a ticket with enough queries
    fn complete_ticket(&self, mut claim: Claim, terms: &TermMap) -> Claim {
        if !claim.needs_evidence() {
            return claim;
        }
        let mut ticket = claim.retrieval_ticket().cloned().unwrap_or_default();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        ticket.queries = ticket
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
            .collect();

        let want = self.config.min_queries_per_claim;
        if ticket.queries.len() < want {
            let term = terms
                .terms_in(&claim.claim_text)
                .first()
                .map(|t| t.to_string())
                .or_else(|| terms.canonical_terms.first().cloned());
            let variants = term
                .as_deref()
                .map(|t| terms.variants(t).to_vec())
                .unwrap_or_default();
            let candidates = std::iter::once(claim.claim_text.clone()).chain(variants);
            for candidate in candidates {
                if ticket.queries.len() >= want {
                    break;
                }
                let candidate = candidate.trim().to_string();
                if !candidate.is_empty() && seen.insert(candidate.to_lowercase()) {
                    ticket.queries.push(candidate);
                }
            }
            debug!(claim = %claim.claim_id, queries = ticket.queries.len(), "ticket topped up");
        }
        claim.set_retrieval_ticket(Some(ticket));
        claim
    }
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn as_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn as_strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Accepts `{"sections": [...]}` or a bare list
fn parse_outline(value: Option<&Value>) -> Outline {
    let sections = match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(obj @ Value::Object(_)) => obj
            .get("sections")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };
    let sections = sections
        .iter()
        .enumerate()
        .map(|(i, s)| OutlineSection {
            number: as_u32(s.get("number")).unwrap_or(i as u32 + 1),
            title: as_string(s.get("title")).unwrap_or_else(|| format!("Section {}", i + 1)),
            goal: as_string(s.get("goal")).unwrap_or_default(),
            expected_claim_ids: as_strings(s.get("expected_claim_ids"))
                .iter()
                .filter_map(|id| ClaimId::parse(id).ok())
                .collect(),
            estimated_pages: s
                .get("estimated_pages")
                .and_then(Value::as_f64)
                .map(|p| p as f32)
                .unwrap_or(1.0),
        })
        .collect();
    Outline::new(sections)
}

fn parse_ticket(value: &Value) -> Option<RetrievalTicket> {
    if value.is_null() {
        return None;
    }
    if let Ok(ticket) = serde_json::from_value::<RetrievalTicket>(value.clone()) {
        return Some(ticket);
    }
    // Loose shape: keep what can be read
    Some(RetrievalTicket {
        queries: as_strings(value.get("queries")),
        preferred_domains: as_strings(value.get("preferred_domains")),
        excluded_domains: as_strings(value.get("excluded_domains")),
        min_sources: as_u32(value.get("min_sources")).unwrap_or(0),
        acceptance_criteria: as_string(value.get("acceptance_criteria")).unwrap_or_default(),
        ..Default::default()
    })
}

/// Give every repeated claim id the next number nobody uses
///
/// The first claim carrying an id keeps it; later ones are renumbered,
/// starting from their own position.
fn dedupe_ids(claims: &mut [Claim]) {
    let used: BTreeSet<ClaimId> = claims.iter().map(|c| c.claim_id.clone()).collect();
    let mut assigned = BTreeSet::new();
    for (position, claim) in claims.iter_mut().enumerate() {
        if assigned.insert(claim.claim_id.clone()) {
            continue;
        }
        let mut n = position + 1;
        let fresh = loop {
            let candidate = ClaimId::from_index(n);
            if !used.contains(&candidate) && !assigned.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        warn!(duplicate = %claim.claim_id, new_id = %fresh, "duplicate claim id renumbered");
        claim.claim_id = fresh.clone();
        assigned.insert(fresh);
    }
}

/// Read one claim; unknown types become definitions, unknown classes B
fn parse_claim(position: usize, value: &Value) -> Option<Claim> {
    let text = as_string(value.get("claim_text").or_else(|| value.get("text")))?;
    let claim_id = as_string(value.get("claim_id"))
        .and_then(|id| ClaimId::parse(&id).ok())
        .unwrap_or_else(|| ClaimId::from_index(position + 1));
    let claim_type = as_string(value.get("claim_type"))
        .and_then(|t| ClaimType::parse(&t))
        .unwrap_or(ClaimType::Definition);
    let class = as_string(value.get("evidence_class"))
        .and_then(|c| EvidenceClass::parse(&c))
        .unwrap_or(EvidenceClass::B);
    let ticket = value.get("retrieval_ticket").and_then(parse_ticket);
    let section_id = as_u32(value.get("section_id")).unwrap_or(0);

    let mut claim = Claim::new(claim_id, text, claim_type, class, ticket, section_id);
    claim.freshness_required = value
        .get("freshness_required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    claim.recency_days = as_u32(value.get("recency_days"));
    claim.required_source_classes = as_strings(value.get("required_source_classes"))
        .iter()
        .filter_map(|c| match c.to_lowercase().as_str() {
            "primary" => Some(SourceClass::Primary),
            "secondary" => Some(SourceClass::Secondary),
            "tertiary" => Some(SourceClass::Tertiary),
            _ => None,
        })
        .collect();
    claim.dependencies = as_strings(value.get("dependencies"))
        .iter()
        .filter_map(|id| ClaimId::parse(id).ok())
        .collect();
    Some(claim)
}
