//! Phase 7: editorial review
//!
//! Two halves feed one report. Deterministic checks measure length,
//! citations and structure. A model judgment checks coverage and
//! unanchored statements. The verdicts are fused so that a deterministic
//! critical issue can never be approved away, and an unreadable judgment
//! never keeps the loop spinning.

use std::collections::BTreeSet;
use std::sync::Arc;

use claimgate_domain::{
    ClaimId, ClaimRegister, Component, CompletionRequest, CompletionService, IssueKind, IssueSeverity,
    ProgressEvent, ProgressSink, ReviewIssue, ReviewReport, SuggestedAction, TokenUsage, Verdict,
};
use claimgate_gatekeeper::GateReport;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bibliography::{citation_count, cited_numbers};
use crate::config::ReviewConfig;
use crate::prompt::{reviewer_prompt, REVIEWER_SYSTEM};
use crate::revision::word_count;

static LIMITATIONS_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^#{1,6}\s*(limitations|caveats)\b").expect("limitations pattern is valid"));

static SUMMARY_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^#{1,6}\s*(executive summary|summary|tl;dr)\b").expect("summary pattern is valid")
});

/// Confidence reported when the judgment could not be read
pub const FALLBACK_CONFIDENCE: f32 = 0.4;

/// Confidence of a review made without the model
pub const DETERMINISTIC_CONFIDENCE: f32 = 0.5;

/// Length, citation and structure checks
pub fn deterministic_issues(article: &str, index_size: usize, config: &ReviewConfig) -> Vec<ReviewIssue> {
    let mut issues = Vec::new();
    let words = word_count(article);

    if words < config.min_words {
        issues.push(ReviewIssue::new(
            IssueKind::WordCount,
            IssueSeverity::Critical,
            format!(
                "The article has {} words; expand it to at least {} words without adding unsupported facts",
                words, config.min_words
            ),
        ));
    }

    if !LIMITATIONS_HEADING.is_match(article) {
        issues.push(ReviewIssue::new(
            IssueKind::MissingSection,
            IssueSeverity::Critical,
            "Add a '## Limitations' section naming what the evidence does not cover",
        ));
    }

    if !SUMMARY_HEADING.is_match(article) {
        issues.push(ReviewIssue::new(
            IssueKind::MissingSection,
            IssueSeverity::High,
            "Open the article with a '## Executive Summary' section",
        ));
    }

    if index_size > 0 && words > 0 {
        let density = citation_count(article) as f64 * 1000.0 / words as f64;
        if density < config.min_citation_density {
            issues.push(ReviewIssue::new(
                IssueKind::CitationDensity,
                IssueSeverity::High,
                format!(
                    "Citation density is {:.1} per 1000 words; cite the listed sources at least {:.1} times per 1000 words",
                    density, config.min_citation_density
                ),
            ));
        }

        let target = config.min_distinct_sources.min(index_size);
        let distinct = cited_numbers(article).len();
        if distinct < target {
            issues.push(ReviewIssue::new(
                IssueKind::CitationDiversity,
                IssueSeverity::Medium,
                format!("Only {} distinct sources are cited; use at least {}", distinct, target),
            ));
        }
    }

    issues
}

/// The model's part of a review
#[derive(Debug, Clone, PartialEq)]
struct Judgment {
    verdict: Verdict,
    confidence: f32,
    claims_in_text: Option<usize>,
    unanchored: Vec<String>,
    issues: Vec<ReviewIssue>,
    gap_claims: Vec<ClaimId>,
    summary: String,
}

fn strings(value: Option<&Value>) -> Vec<String> {
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

fn parse_severity(s: &str) -> IssueSeverity {
    match s.trim().to_lowercase().as_str() {
        "critical" | "blocker" | "fatal" => IssueSeverity::Critical,
        "high" | "major" | "severe" => IssueSeverity::High,
        "low" | "minor" | "trivial" => IssueSeverity::Low,
        _ => IssueSeverity::Medium,
    }
}

fn parse_issue(value: &Value) -> Option<ReviewIssue> {
    let description = ["description", "message", "issue"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|d| !d.is_empty())?;
    let kind = value
        .get("kind")
        .or_else(|| value.get("type"))
        .and_then(|k| serde_json::from_value::<IssueKind>(k.clone()).ok())
        .unwrap_or(IssueKind::Other);
    let severity = value
        .get("severity")
        .and_then(Value::as_str)
        .map(parse_severity)
        .unwrap_or_default();

    let mut issue = ReviewIssue::new(kind, severity, description);
    issue.claim_id = value
        .get("claim_id")
        .and_then(Value::as_str)
        .and_then(|id| ClaimId::parse(id).ok());
    issue.location = value.get("location").and_then(Value::as_str).map(str::to_string);
    issue.research_query = value
        .get("research_query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);
    issue.action = match value.get("action").and_then(Value::as_str) {
        Some(a) if a.trim().eq_ignore_ascii_case("research") => SuggestedAction::Research,
        _ => SuggestedAction::Revise,
    };
    Some(issue)
}

/// Verdict as a string, or the `{passed, needs_gap_loop}` object shape
fn parse_verdict(value: &Value) -> Option<Verdict> {
    if let Some(verdict) = value.get("verdict").and_then(Value::as_str).and_then(Verdict::parse) {
        return Some(verdict);
    }
    let shape = value.get("verdict").filter(|v| v.is_object()).unwrap_or(value);
    let flag = |key: &str| shape.get(key).and_then(Value::as_bool);
    match (flag("needs_gap_loop"), flag("passed")) {
        (Some(true), _) => Some(Verdict::Research),
        (_, Some(true)) => Some(Verdict::Approved),
        (_, Some(false)) | (Some(false), None) => Some(Verdict::Revise),
        (None, None) => None,
    }
}

fn parse_judgment(text: &str) -> Option<Judgment> {
    let (value, _) = claimgate_llm::extract_json_value_with_key(text, "verdict").ok()?;
    let verdict = parse_verdict(&value)?;
    let shape = value.get("verdict").filter(|v| v.is_object()).unwrap_or(&value);

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.7);
    let issues = value
        .get("issues")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_issue).collect())
        .unwrap_or_default();
    let gap_claims = strings(shape.get("gap_claims").or_else(|| value.get("gap_claims")))
        .iter()
        .filter_map(|id| ClaimId::parse(id).ok())
        .collect();
    let summary = shape
        .get("summary")
        .or_else(|| value.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Judgment {
        verdict,
        confidence,
        claims_in_text: value.get("claims_in_text").and_then(Value::as_u64).map(|n| n as usize),
        unanchored: strings(value.get("unanchored_statements")),
        issues,
        gap_claims,
        summary,
    })
}

/// Combine the judgment with the deterministic findings
///
/// Returns the final verdict and the gap claims it acts on.
fn fuse(
    judged: Verdict,
    deterministic: &[ReviewIssue],
    gap_candidates: Vec<ClaimId>,
    register: &ClaimRegister,
) -> (Verdict, Vec<ClaimId>) {
    let critical = deterministic.iter().any(|i| i.severity == IssueSeverity::Critical);
    let mut seen = BTreeSet::new();
    let gaps: Vec<ClaimId> = gap_candidates
        .into_iter()
        .filter(|id| register.claim(id).map(|c| c.needs_evidence()).unwrap_or(false))
        .filter(|id| seen.insert(id.clone()))
        .collect();

    match judged {
        Verdict::Approved if critical => (Verdict::Revise, Vec::new()),
        Verdict::Research if gaps.is_empty() => (Verdict::Revise, Vec::new()),
        Verdict::Research => (Verdict::Research, gaps),
        other => (other, Vec::new()),
    }
}

/// The editorial reviewer
pub struct EditorialReviewer {
    service: Option<Arc<dyn CompletionService>>,
    config: ReviewConfig,
}

impl EditorialReviewer {
    /// Create a reviewer; judgment follows `config.use_judgment`
    pub fn new(service: Arc<dyn CompletionService>, config: ReviewConfig) -> Self {
        let service = config.use_judgment.then_some(service);
        Self { service, config }
    }

    /// Reviewer that only runs the deterministic checks
    pub fn deterministic(config: ReviewConfig) -> Self {
        Self { service: None, config }
    }

    /// Review an article against the register and the gate outcome
    pub fn review(
        &self,
        article: &str,
        register: &ClaimRegister,
        gate: &GateReport,
        index_size: usize,
        sink: &dyn ProgressSink,
    ) -> (ReviewReport, TokenUsage) {
        sink.emit(ProgressEvent::status(Component::Reviewer, "reviewing draft"));
        let deterministic = deterministic_issues(article, index_size, &self.config);
        debug!(issues = deterministic.len(), "deterministic checks done");

        let c_claims: Vec<&ClaimId> = register.c_claims().map(|c| &c.claim_id).collect();
        let c_with_evidence = c_claims
            .iter()
            .filter(|id| gate.decision(id).map(|d| d.usable).unwrap_or(false))
            .count();
        let usable = gate.usable().len();

        let (judgment, usage) = match &self.service {
            Some(service) => self.judge(service.as_ref(), article, register, gate, sink),
            None => (None, TokenUsage::default()),
        };

        let (judged, confidence) = match &judgment {
            Some(j) => (j.verdict, j.confidence),
            None if self.service.is_some() => (Verdict::Approved, FALLBACK_CONFIDENCE),
            None => (Verdict::Approved, DETERMINISTIC_CONFIDENCE),
        };
        let gap_candidates: Vec<ClaimId> = judgment
            .iter()
            .flat_map(|j| {
                j.gap_claims.iter().cloned().chain(
                    j.issues
                        .iter()
                        .filter(|i| i.action == SuggestedAction::Research)
                        .filter_map(|i| i.claim_id.clone()),
                )
            })
            .collect();
        let (verdict, gap_claims) = fuse(judged, &deterministic, gap_candidates, register);

        let (claims_in_text, unanchored, judged_issues, summary) = match judgment {
            Some(j) => (
                j.claims_in_text.map(|n| n.min(register.len())).unwrap_or(usable),
                j.unanchored,
                j.issues,
                j.summary,
            ),
            None => (usable, Vec::new(), Vec::new(), String::new()),
        };

        let mut issues = deterministic;
        issues.extend(judged_issues);

        let report = ReviewReport {
            total_claims: register.len(),
            claims_in_text,
            c_claims_total: c_claims.len(),
            c_claims_with_evidence: c_with_evidence,
            issues,
            unanchored_statements: unanchored,
            verdict,
            confidence,
            gap_claims,
            summary,
        };

        info!(
            verdict = report.verdict.as_str(),
            judged = judged.as_str(),
            confidence = report.confidence,
            issues = report.issues.len(),
            gaps = report.gap_claims.len(),
            "review complete"
        );
        let payload = serde_json::to_value(&report).unwrap_or(Value::Null);
        sink.emit(
            ProgressEvent::status(
                Component::Reviewer,
                format!("verdict {} ({} issues)", report.verdict.as_str(), report.issues.len()),
            )
            .with_payload(payload),
        );
        (report, usage)
    }

    fn judge(
        &self,
        service: &dyn CompletionService,
        article: &str,
        register: &ClaimRegister,
        gate: &GateReport,
        sink: &dyn ProgressSink,
    ) -> (Option<Judgment>, TokenUsage) {
        let c_status: Vec<String> = register
            .c_claims()
            .map(|c| match gate.decision(&c.claim_id) {
                Some(d) => format!(
                    "- {}: {} ({} of {} qualifying sources)",
                    c.claim_id,
                    d.status.as_str(),
                    d.qualifying,
                    d.required
                ),
                None => format!("- {}: {}", c.claim_id, c.status.as_str()),
            })
            .collect();
        let unusable: Vec<String> = register
            .claims()
            .iter()
            .filter(|c| !gate.decision(&c.claim_id).map(|d| d.usable).unwrap_or(false))
            .map(|c| c.claim_id.to_string())
            .collect();

        let truncated = truncate_chars(article, self.config.max_article_chars);
        let prompt = reviewer_prompt(truncated, register, &c_status, &unusable);
        let request = CompletionRequest::new(prompt).with_system(REVIEWER_SYSTEM);

        match service.complete(&request) {
            Ok(completion) => {
                let judgment = parse_judgment(&completion.text);
                if judgment.is_none() {
                    warn!("review verdict unreadable, treating as approved");
                    sink.emit(ProgressEvent::error(
                        Component::Reviewer,
                        "could not read the review verdict; treating the draft as approved",
                    ));
                }
                (judgment, completion.usage)
            }
            Err(e) => {
                warn!(error = %e, "review call failed, treating as approved");
                sink.emit(ProgressEvent::error(
                    Component::Reviewer,
                    format!("review call failed: {}; treating the draft as approved", e),
                ));
                (None, TokenUsage::default())
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use claimgate_domain::{
        Claim, ClaimStatus, ClaimType, CollectingSink, EventKind, EvidenceClass, Outline, QuestionBrief,
        RegisterMinimums, RetrievalTicket, TermMap,
    };
    use claimgate_gatekeeper::GateDecision;
    use claimgate_llm::MockProvider;

    fn register() -> ClaimRegister {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let ticket = || Some(RetrievalTicket::with_queries(["q1", "q2"]));
        let claims = vec![
            Claim::new(ClaimId::from_index(1), "background", ClaimType::Definition, EvidenceClass::A, None, 1),
            Claim::new(ClaimId::from_index(2), "detail", ClaimType::Mechanism, EvidenceClass::B, ticket(), 1),
            Claim::new(ClaimId::from_index(3), "figure", ClaimType::Quantitative, EvidenceClass::C, ticket(), 1),
        ];
        ClaimRegister::new(
            QuestionBrief::minimal("q", date),
            TermMap::single("q"),
            Outline::default(),
            claims,
            RegisterMinimums { min_total: 1, min_c: 1 },
        )
    }

    fn gate() -> GateReport {
        let d = |n, usable, status| GateDecision {
            claim_id: ClaimId::from_index(n),
            usable,
            status,
            qualifying: if usable { 2 } else { 0 },
            required: 2,
        };
        GateReport {
            decisions: vec![
                d(1, true, ClaimStatus::Pending),
                d(2, true, ClaimStatus::Fulfilled),
                d(3, false, ClaimStatus::Insufficient),
            ],
        }
    }

    fn config() -> ReviewConfig {
        ReviewConfig {
            min_words: 20,
            min_citation_density: 50.0,
            min_distinct_sources: 2,
            ..Default::default()
        }
    }

    /// 35 words, 3 citations to 2 sources, both required headings
    fn good_article() -> String {
        "## Executive Summary\nRust adoption keeps growing across industry teams [1].\n\
         ## Adoption\nSurveys show steady growth in professional use over recent years [2] and more [1].\n\
         ## Limitations\nFigures for some regions remain unverified.\n"
            .to_string()
    }

    fn reviewer(response: &str) -> (EditorialReviewer, MockProvider) {
        let provider = MockProvider::new(response);
        (EditorialReviewer::new(Arc::new(provider.clone()), config()), provider)
    }

    #[test]
    fn test_deterministic_checks_on_good_article() {
        assert!(deterministic_issues(&good_article(), 2, &config()).is_empty());
    }

    #[test]
    fn test_deterministic_checks_flag_short_unstructured_text() {
        let issues = deterministic_issues("Too short [1].", 5, &config());
        let kinds: Vec<(IssueKind, IssueSeverity)> = issues.iter().map(|i| (i.kind, i.severity)).collect();
        assert!(kinds.contains(&(IssueKind::WordCount, IssueSeverity::Critical)));
        assert!(kinds.contains(&(IssueKind::MissingSection, IssueSeverity::Critical)));
        assert!(kinds.contains(&(IssueKind::MissingSection, IssueSeverity::High)));
        assert!(kinds.contains(&(IssueKind::CitationDiversity, IssueSeverity::Medium)));
    }

    #[test]
    fn test_diversity_target_capped_by_index_size() {
        let cfg = ReviewConfig {
            min_distinct_sources: 5,
            ..config()
        };
        let issues = deterministic_issues(&good_article(), 2, &cfg);
        assert!(issues.iter().all(|i| i.kind != IssueKind::CitationDiversity));
    }

    #[test]
    fn test_approved_judgment_is_kept() {
        let (reviewer, _) = reviewer(r#"{"verdict": "approved", "confidence": 0.9, "claims_in_text": 7, "issues": []}"#);
        let (report, _) = reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(report.verdict, Verdict::Approved);
        assert_eq!(report.confidence, 0.9);
        assert_eq!(report.claims_in_text, 3);
        assert_eq!(report.c_claims_total, 1);
        assert_eq!(report.c_claims_with_evidence, 0);
    }

    #[test]
    fn test_critical_deterministic_issue_overrides_approval() {
        let (reviewer, _) = reviewer(r#"{"verdict": "approved", "confidence": 0.95}"#);
        let article = good_article().replace("## Limitations", "## Outlook");
        let (report, _) = reviewer.review(&article, &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(report.verdict, Verdict::Revise);
        assert!(report.has_critical());
    }

    #[test]
    fn test_unreadable_verdict_falls_back_to_approved() {
        let (reviewer, _) = reviewer("Looks fine to me overall!");
        let sink = CollectingSink::new();
        let (report, _) = reviewer.review(&good_article(), &register(), &gate(), 2, &sink);
        assert_eq!(report.verdict, Verdict::Approved);
        assert_eq!(report.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(sink.of_kind(EventKind::Error).len(), 1);
    }

    #[test]
    fn test_research_without_valid_gaps_becomes_revise() {
        let (reviewer, _) = reviewer(r#"{"verdict": "research", "gap_claims": ["C-01", "C-99"]}"#);
        let (report, _) = reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(report.verdict, Verdict::Revise);
        assert!(report.gap_claims.is_empty());
    }

    #[test]
    fn test_research_keeps_evidence_claims_and_issue_claims() {
        let (reviewer, _) = reviewer(
            r#"Here you go:
```json
{"verdict": "research", "confidence": 0.6, "gap_claims": ["C-03", "C-03"],
 "issues": [{"kind": "evidence", "severity": "major", "description": "C-02 thin", "claim_id": "C-02",
             "action": "research", "research_query": "rust detail source"},
            {"kind": "tone", "severity": "minor", "description": "too casual"}],
 "unanchored_statements": ["Everybody uses Rust"]}
```"#,
        );
        let (report, _) = reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(report.verdict, Verdict::Research);
        assert_eq!(report.gap_claims, vec![ClaimId::from_index(3), ClaimId::from_index(2)]);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].severity, IssueSeverity::High);
        assert_eq!(report.issues[0].research_query.as_deref(), Some("rust detail source"));
        assert_eq!(report.issues[1].kind, IssueKind::Other);
        assert_eq!(report.issues[1].severity, IssueSeverity::Low);
        assert_eq!(report.unanchored_statements, vec!["Everybody uses Rust".to_string()]);
    }

    #[test]
    fn test_object_shaped_verdict() {
        let (reviewer, _) = reviewer(
            r#"{"verdict": {"passed": false, "needs_gap_loop": true, "gap_claims": ["C-02"], "summary": "needs more"}}"#,
        );
        let (report, _) = reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(report.verdict, Verdict::Research);
        assert_eq!(report.gap_claims, vec![ClaimId::from_index(2)]);
        assert_eq!(report.summary, "needs more");
    }

    #[test]
    fn test_deterministic_mode_makes_no_call() {
        let provider = MockProvider::new(r#"{"verdict": "research"}"#);
        let cfg = ReviewConfig {
            use_judgment: false,
            ..config()
        };
        let reviewer = EditorialReviewer::new(Arc::new(provider.clone()), cfg);
        let (report, usage) = reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        assert_eq!(provider.call_count(), 0);
        assert_eq!(report.verdict, Verdict::Approved);
        assert_eq!(report.confidence, DETERMINISTIC_CONFIDENCE);
        assert_eq!(usage.total(), 0);
    }

    #[test]
    fn test_article_truncated_for_judgment() {
        let (reviewer, provider) = reviewer(r#"{"verdict": "approved"}"#);
        let reviewer = EditorialReviewer {
            config: ReviewConfig {
                max_article_chars: 10,
                ..config()
            },
            ..reviewer
        };
        reviewer.review(&good_article(), &register(), &gate(), 2, &CollectingSink::new());
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("## Executi\n"));
        assert!(!prompt.contains("Limitations\nFigures"));
    }
}
