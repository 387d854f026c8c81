//! Prompts for the model-backed phases

use claimgate_domain::{ClaimRegister, QuestionBrief, TermMap};
use chrono::NaiveDate;

use crate::config::MiningConfig;

pub(crate) const NORMALIZER_SYSTEM: &str = "You are a research librarian. You turn a question \
into a precise research brief and a terminology map for searching. Answer with JSON only.";

pub(crate) const MINER_SYSTEM: &str = "You plan evidence-based articles. You break a question \
into checkable claims and decide how much evidence each claim needs. Answer with JSON only.";

pub(crate) const WRITER_SYSTEM: &str = "You write long-form, citation-backed articles in \
Markdown. You only state as fact what the provided claims allow.";

pub(crate) const REVIEWER_SYSTEM: &str = "You are an exacting editor. You check articles for \
claim coverage, evidence and unsupported statements. Answer with JSON only.";

/// One claim as the writer sees it
#[derive(Debug, Clone)]
pub(crate) struct WriterClaim<'a> {
    pub id: &'a str,
    pub class: &'a str,
    pub text: &'a str,
    pub section: u32,
    pub citations: Vec<u32>,
}

/// Inputs shared by draft and revision prompts
#[derive(Debug, Clone)]
pub(crate) struct WriterContext<'a> {
    pub register: &'a ClaimRegister,
    pub usable: Vec<WriterClaim<'a>>,
    pub unusable: Vec<WriterClaim<'a>>,
    /// `[n] publisher (year): title` lines
    pub sources: Vec<String>,
}

pub(crate) fn normalizer_prompt(question: &str, today: NaiveDate, max_variants: usize) -> String {
    format!(
        r#"Analyse the question below and produce a research brief and a term map.

QUESTION: {question}

TODAY: {today}

Rules:
- give every canonical term 3 to {max_variants} search variants
- if the topic spans several language areas set "international" and include English variants
- list negative keywords for known confusions (terms that lead to wrong hits)
- write disambiguation notes for every ambiguous term
- state clearly what is in scope and what is out of scope

Respond with:
```json
{{
  "question_brief": {{
    "core_question": "...",
    "audience": "...",
    "tone": "...",
    "target_pages": 12,
    "as_of_date": "{today}",
    "freshness_priority": "high|medium|low",
    "scope_in": ["..."],
    "scope_out": ["..."],
    "international": false
  }},
  "term_map": {{
    "canonical_terms": ["..."],
    "synonyms": {{"term": ["..."]}},
    "negative_keywords": ["..."],
    "disambiguation_notes": "...",
    "search_variants": {{"term": ["..."]}}
  }}
}}
```"#
    )
}

pub(crate) fn miner_prompt(brief: &QuestionBrief, terms: &TermMap, config: &MiningConfig) -> String {
    let join = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "not defined".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let variants = terms
        .search_variants
        .iter()
        .map(|(term, v)| format!("- {}: {}", term, v.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Create an outline and a claim register for the article below.

BRIEF
- core question: {core}
- audience: {audience}
- tone: {tone}
- target pages: {pages}
- freshness: {freshness:?}
- as of: {as_of}
- in scope: {scope_in}
- out of scope: {scope_out}

TERM MAP (build the queries from these)
- canonical terms: {canonical}
- negative keywords (exclude): {negative}
- disambiguation: {notes}
- search variants:
{variants}

A claim is one checkable assertion of type definition, mechanism, comparison,
effect, quantitative, temporal or normative. Evidence classes:
- A: stable background knowledge, no source needed
- B: specialist detail, one good source
- C: volatile facts, figures, recent events; at least two independent sources

Hard requirements:
- at least {min_total} claims
- at least {min_c} claims of class C
- every B and C claim carries a retrieval_ticket with at least {min_queries} queries
  drawn from the search variants
- every claim belongs to an outline section

Respond with:
```json
{{
  "outline": {{
    "sections": [
      {{"number": 1, "title": "...", "goal": "...", "expected_claim_ids": ["C-01"], "estimated_pages": 1.0}}
    ]
  }},
  "claims": [
    {{
      "claim_id": "C-01",
      "claim_text": "...",
      "claim_type": "definition",
      "evidence_class": "B",
      "section_id": 1,
      "freshness_required": false,
      "recency_days": null,
      "required_source_classes": ["primary"],
      "retrieval_ticket": {{
        "queries": ["...", "..."],
        "preferred_domains": [],
        "excluded_domains": [],
        "min_sources": 1,
        "independence_rule": "different_publishers",
        "primary_required": false,
        "acceptance_criteria": "..."
      }}
    }}
  ]
}}
```"#,
        core = brief.core_question,
        audience = brief.audience,
        tone = brief.tone,
        pages = brief.target_pages,
        freshness = brief.freshness_priority,
        as_of = brief.as_of_date,
        scope_in = join(&brief.scope_in),
        scope_out = join(&brief.scope_out),
        canonical = terms.canonical_terms.join(", "),
        negative = terms.negative_keywords.join(", "),
        notes = terms.disambiguation_notes,
        variants = variants,
        min_total = config.min_total_claims,
        min_c = config.min_c_claims,
        min_queries = config.min_queries_per_claim,
    )
}

fn claim_line(claim: &WriterClaim<'_>) -> String {
    let mut line = format!("- {} [{}] (section {}): {}", claim.id, claim.class, claim.section, claim.text);
    if !claim.citations.is_empty() {
        let refs: Vec<String> = claim.citations.iter().map(|n| format!("[{}]", n)).collect();
        line.push_str(&format!(" -> cite {}", refs.join("")));
    }
    line
}

fn context_block(ctx: &WriterContext<'_>) -> String {
    let brief = ctx.register.brief();
    let outline = ctx
        .register
        .outline()
        .sections
        .iter()
        .map(|s| format!("{}. {} ({})", s.number, s.title, s.goal))
        .collect::<Vec<_>>()
        .join("\n");
    let usable = ctx.usable.iter().map(claim_line).collect::<Vec<_>>().join("\n");
    let unusable = if ctx.unusable.is_empty() {
        "none".to_string()
    } else {
        ctx.unusable.iter().map(claim_line).collect::<Vec<_>>().join("\n")
    };
    let sources = if ctx.sources.is_empty() {
        "none".to_string()
    } else {
        ctx.sources.join("\n")
    };

    format!(
        r#"QUESTION
{question}

AUDIENCE: {audience}
TONE: {tone}
TARGET PAGES: {pages}
AS OF: {as_of}

OUTLINE (keep this order)
{outline}

USABLE CLAIMS (may be stated as fact, with the listed citations)
{usable}

UNSUPPORTED CLAIMS (omit, or hedge explicitly as unverified; never state as fact, never cite)
{unusable}

SOURCES
{sources}"#,
        question = brief.core_question,
        audience = brief.audience,
        tone = brief.tone,
        pages = brief.target_pages,
        as_of = brief.as_of_date,
    )
}

const WRITER_RULES: &str = r#"RULES
- start with the heading: ## Executive Summary
- then one level-2 section per outline entry, in outline order
- end with the heading: ## Limitations, naming what the evidence does not cover
- cite with the source numbers only, e.g. [1] or [2][3]; never invent numbers
- never mention claim ids such as C-01 in the text
- do not add a reference list; it is appended automatically"#;

pub(crate) fn writer_prompt(ctx: &WriterContext<'_>) -> String {
    format!(
        "Write the article.\n\n{}\n\n{}\n\nWrite the article now:",
        context_block(ctx),
        WRITER_RULES
    )
}

pub(crate) fn revision_prompt(ctx: &WriterContext<'_>, previous: &str, instructions: &[String]) -> String {
    let list = instructions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Revise the article below. Fix exactly the listed points and change nothing else. \
Return the complete revised article, not a summary and not a diff.\n\n\
INSTRUCTIONS\n{}\n\n{}\n\n{}\n\nARTICLE\n{}",
        list,
        context_block(ctx),
        WRITER_RULES,
        previous
    )
}

pub(crate) fn reviewer_prompt(
    article: &str,
    register: &ClaimRegister,
    c_claim_status: &[String],
    unusable: &[String],
) -> String {
    let claims = register
        .claims()
        .iter()
        .map(|c| format!("- {} [{}]: {}", c.claim_id, c.evidence_class().as_str(), c.claim_text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Review the article below.

ARTICLE
{article}

CLAIM REGISTER
{claims}

C-CLAIM EVIDENCE STATUS
{c_status}

CLAIMS WITHOUT SUFFICIENT EVIDENCE
{unusable}

Check claim coverage, that C claims are backed by citations, statements that no
claim supports, contradictions, then style.

Verdicts:
- approved: ready to publish
- revise: fixable by rewriting
- research: specific claims need more evidence; list them in gap_claims

Respond with:
```json
{{
  "verdict": "approved|revise|research",
  "confidence": 0.8,
  "claims_in_text": 12,
  "unanchored_statements": ["..."],
  "issues": [
    {{"kind": "coverage|evidence|unanchored|contradiction|style", "severity": "low|medium|high|critical", "description": "...", "claim_id": "C-07", "action": "revise|research", "research_query": "..."}}
  ],
  "gap_claims": ["C-07"],
  "summary": "..."
}}
```"#,
        c_status = if c_claim_status.is_empty() {
            "none".to_string()
        } else {
            c_claim_status.join("\n")
        },
        unusable = if unusable.is_empty() {
            "none".to_string()
        } else {
            unusable.join(", ")
        },
    )
}
