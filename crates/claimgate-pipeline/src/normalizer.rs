//! Phase 1: query normalization
//!
//! Turns the raw question into a [`QuestionBrief`] and a [`TermMap`]. The
//! phase never fails the run: unparsable or missing model output degrades to
//! a minimal brief and a term map built from the question itself.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use claimgate_domain::{
    Component, CompletionRequest, CompletionService, FreshnessPriority, ProgressEvent,
    ProgressSink, QuestionBrief, TermMap, TokenUsage, DEFAULT_TARGET_PAGES,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::NormalizerConfig;
use crate::error::{PipelineError, Result};
use crate::prompt::{normalizer_prompt, NORMALIZER_SYSTEM};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when",
    "where", "which", "who", "why", "with", "der", "die", "das", "ein", "eine", "und", "ist",
    "was", "wie", "welche", "fuer", "für", "mit", "von", "im",
];

const FILLER_SUFFIXES: &[&str] = &["overview", "explained", "latest developments"];

/// Output of the normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// The research brief
    pub brief: QuestionBrief,

    /// The terminology map, with the variant contract enforced
    pub term_map: TermMap,

    /// Tokens spent
    pub usage: TokenUsage,

    /// True when the fallback brief was used
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
struct NormalizerRecord {
    question_brief: BriefRecord,
    term_map: TermMapRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BriefRecord {
    core_question: Option<String>,
    audience: Option<String>,
    tone: Option<String>,
    target_pages: Option<Value>,
    as_of_date: Option<String>,
    freshness_priority: Option<String>,
    scope_in: Vec<String>,
    scope_out: Vec<String>,
    international: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TermMapRecord {
    canonical_terms: Vec<String>,
    synonyms: BTreeMap<String, Vec<String>>,
    negative_keywords: Vec<String>,
    disambiguation_notes: Value,
    search_variants: BTreeMap<String, Vec<String>>,
}

/// The query normalizer
pub struct QueryNormalizer {
    service: Arc<dyn CompletionService>,
    config: NormalizerConfig,
}

impl QueryNormalizer {
    /// Create a normalizer
    pub fn new(service: Arc<dyn CompletionService>, config: NormalizerConfig) -> Self {
        Self { service, config }
    }

    /// Normalize a question
    pub fn normalize(&self, question: &str, today: NaiveDate, sink: &dyn ProgressSink) -> NormalizedQuery {
        sink.emit(ProgressEvent::status(
            Component::Normalizer,
            "analysing the question and building the term map",
        ));

        let mut usage = TokenUsage::default();
        let parsed = self.call(question, today, &mut usage);

        let (brief, raw_terms, degraded) = match parsed {
            Ok(record) => {
                let brief = brief_from_record(record.question_brief, question, today);
                (brief, terms_from_record(record.term_map), false)
            }
            Err(e) => {
                warn!(error = %e, "normalization failed, using minimal brief");
                sink.emit(ProgressEvent::error(
                    Component::Normalizer,
                    format!("normalization failed, continuing with the question as asked: {}", e),
                ));
                (QuestionBrief::minimal(question, today), TermMap::default(), true)
            }
        };

        let term_map = enforce_contract(&brief, raw_terms, &self.config);
        let variant_count: usize = term_map.search_variants.values().map(Vec::len).sum();
        info!(
            terms = term_map.canonical_terms.len(),
            variants = variant_count,
            degraded,
            "question normalized"
        );
        sink.emit(
            ProgressEvent::status(
                Component::Normalizer,
                format!(
                    "term map ready: {} terms, {} negative keywords",
                    term_map.canonical_terms.len(),
                    term_map.negative_keywords.len()
                ),
            )
            .with_payload(json!({
                "canonical_terms": term_map.canonical_terms,
                "search_variants": variant_count,
                "degraded": degraded,
            })),
        );

        NormalizedQuery {
            brief,
            term_map,
            usage,
            degraded,
        }
    }

    fn call(&self, question: &str, today: NaiveDate, usage: &mut TokenUsage) -> Result<NormalizerRecord> {
        let request = CompletionRequest::new(normalizer_prompt(question, today, self.config.max_variants))
            .with_system(NORMALIZER_SYSTEM);
        let completion = self.service.complete(&request).map_err(PipelineError::from)?;
        *usage += completion.usage;
        debug!(chars = completion.text.len(), "normalizer response");
        Ok(claimgate_llm::parse_structured(&completion.text)?)
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn brief_from_record(record: BriefRecord, question: &str, today: NaiveDate) -> QuestionBrief {
    let target_pages = match record.target_pages {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.round() as u32),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
    .filter(|&p| p > 0)
    .unwrap_or(DEFAULT_TARGET_PAGES);

    let as_of_date = record
        .as_of_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or(today);

    let clean = |items: Vec<String>| -> BTreeSet<String> {
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };

    QuestionBrief {
        core_question: non_blank(record.core_question).unwrap_or_else(|| question.trim().to_string()),
        original_question: question.trim().to_string(),
        audience: non_blank(record.audience).unwrap_or_else(|| "general".to_string()),
        tone: non_blank(record.tone).unwrap_or_else(|| "neutral".to_string()),
        target_pages,
        as_of_date,
        freshness_priority: record
            .freshness_priority
            .as_deref()
            .and_then(FreshnessPriority::parse)
            .unwrap_or_default(),
        scope_in: clean(record.scope_in),
        scope_out: clean(record.scope_out),
        international: record.international,
    }
}

fn terms_from_record(record: TermMapRecord) -> TermMap {
    let disambiguation_notes = match record.disambiguation_notes {
        Value::String(s) => s,
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    TermMap {
        canonical_terms: record.canonical_terms,
        synonyms: record.synonyms,
        negative_keywords: record.negative_keywords,
        disambiguation_notes,
        search_variants: record.search_variants,
    }
}

/// Longest run of consecutive non-stopword tokens in the question
pub(crate) fn fallback_term(question: &str) -> String {
    let mut best: Vec<&str> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let tokens = question
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty());
    for token in tokens {
        if STOPWORDS.contains(&token.to_lowercase().as_str()) {
            run.clear();
            continue;
        }
        run.push(token);
        if run.join(" ").chars().count() > best.join(" ").chars().count() {
            best = run.clone();
        }
    }
    if best.is_empty() {
        question.trim().to_string()
    } else {
        best.join(" ")
    }
}

fn push_unique(list: &mut Vec<String>, seen: &mut BTreeSet<String>, candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || !seen.insert(candidate.to_lowercase()) {
        return false;
    }
    list.push(candidate.to_string());
    true
}

fn needs_english_variant(brief: &QuestionBrief, variants: &[String], config: &NormalizerConfig) -> bool {
    if !brief.international {
        return false;
    }
    if !brief.original_question.is_ascii() {
        return !variants.iter().any(|v| v.is_ascii());
    }
    !config.native_language.eq_ignore_ascii_case("en")
}

/// Enforce the term map contract
///
/// - at least one canonical term
/// - `min_variants..=max_variants` search variants per canonical term
/// - an English variant for international topics asked in another language
pub(crate) fn enforce_contract(brief: &QuestionBrief, mut terms: TermMap, config: &NormalizerConfig) -> TermMap {
    let mut seen = BTreeSet::new();
    let mut canonical = Vec::new();
    for term in std::mem::take(&mut terms.canonical_terms) {
        push_unique(&mut canonical, &mut seen, &term);
    }
    if canonical.is_empty() {
        canonical.push(fallback_term(&brief.original_question));
    }

    let mut variants_by_term = BTreeMap::new();
    for term in &canonical {
        let mut seen = BTreeSet::new();
        let mut variants = Vec::new();
        for v in terms.search_variants.get(term).into_iter().flatten() {
            push_unique(&mut variants, &mut seen, v);
        }

        let synonyms = terms.synonyms.get(term).cloned().unwrap_or_default();
        let fillers = synonyms
            .iter()
            .cloned()
            .chain([term.clone(), brief.core_question.clone()])
            .chain(FILLER_SUFFIXES.iter().map(|s| format!("{} {}", term, s)));
        for candidate in fillers {
            if variants.len() >= config.min_variants {
                break;
            }
            push_unique(&mut variants, &mut seen, &candidate);
        }
        variants.truncate(config.max_variants);

        if needs_english_variant(brief, &variants, config) {
            let english = format!("{} overview", term);
            if !seen.contains(&english.to_lowercase()) {
                if variants.len() >= config.max_variants {
                    variants.pop();
                }
                variants.push(english);
            }
        }
        variants_by_term.insert(term.clone(), variants);
    }

    terms.canonical_terms = canonical;
    terms.search_variants = variants_by_term;
    terms
}
