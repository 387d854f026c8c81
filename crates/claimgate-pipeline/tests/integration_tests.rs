//! End-to-end runs of the pipeline against a scripted model and a static
//! search table.

use std::sync::Arc;

use chrono::NaiveDate;
use claimgate_domain::{ClaimId, ClaimStatus, CollectingSink, Component, ProgressEvent, ProgressSink, Verdict};
use claimgate_llm::MockProvider;
use claimgate_pipeline::bibliography::{cited_numbers, entry_numbers, REFERENCES_HEADING};
use claimgate_pipeline::{
    AbortHandle, LogRecord, ModelSet, Orchestrator, PipelineConfig, PipelineError, RunLog, RunStatus, StepStatus,
};
use claimgate_retrieval::static_tool::hit;
use claimgate_retrieval::{StaticSearchTool, ToolCategory, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;

const QUESTION: &str = "How far has solar power spread in Europe?";

const NORMALIZED: &str = r#"{
  "question_brief": {
    "core_question": "How far has solar power spread in Europe?",
    "audience": "general readers",
    "tone": "neutral",
    "target_pages": 4,
    "freshness_priority": "high",
    "scope_in": ["installed capacity"],
    "scope_out": ["wind power"],
    "international": false
  },
  "term_map": {
    "canonical_terms": ["photovoltaics"],
    "synonyms": {"photovoltaics": ["PV"]},
    "negative_keywords": ["solar wind"],
    "disambiguation_notes": "electricity generation only",
    "search_variants": {"photovoltaics": ["PV capacity", "solar panels", "solar parks"]}
  }
}"#;

fn claim_json(n: usize) -> serde_json::Value {
    let id = format!("C-{:02}", n);
    let (class, key) = match n {
        1..=10 => ("A", None),
        11..=14 => ("B", Some(format!("kw-b{}", n))),
        _ => ("C", Some(format!("kw-c{}", n))),
    };
    let ticket = key.map(|key| {
        json!({
            "queries": [format!("{} installed", key), format!("{} growth", key)],
            "min_sources": 1
        })
    });
    json!({
        "claim_id": id,
        "claim_text": format!("Statement number {} about the topic", n),
        "claim_type": if class == "C" { "quantitative" } else { "definition" },
        "evidence_class": class,
        "section_id": 1 + (n % 3),
        "retrieval_ticket": ticket
    })
}

fn mined() -> String {
    let claims: Vec<_> = (1..=16).map(claim_json).collect();
    json!({
        "outline": {"sections": [
            {"number": 1, "title": "Background", "goal": "context"},
            {"number": 2, "title": "Capacity", "goal": "numbers"},
            {"number": 3, "title": "Outlook", "goal": "trends"}
        ]},
        "claims": claims
    })
    .to_string()
}

fn article(citations: &str, filler: usize) -> String {
    let body = vec!["solar"; filler].join(" ");
    format!(
        "## Executive Summary\n\nSolar capacity grew quickly {citations}.\n\n## Capacity\n\n{body}\n\n\
## Limitations\n\nSome figures are estimates [3].\n"
    )
}

fn approved() -> String {
    json!({"verdict": "approved", "confidence": 0.9, "claims_in_text": 15, "issues": [], "gap_claims": []}).to_string()
}

fn search_tool() -> StaticSearchTool {
    let mut tool = StaticSearchTool::new("web");
    for n in 11..=14 {
        tool.add_hits(
            format!("kw-b{}", n),
            vec![hit(&format!("Report {}", n), &format!("https://stats{}.org/report", n), "capacity")],
        );
    }
    tool.add_hits(
        "kw-c15",
        vec![
            hit("Agency data", "https://agency.eu/data", "GW installed"),
            hit("Trade body", "https://tradebody.org/market", "GW installed"),
        ],
    );
    tool
}

fn provider(draft: &str) -> MockProvider {
    let mut mock = MockProvider::new("").with_model("mock-premium");
    mock.add_response("Create an outline and a claim register", mined());
    mock.add_response("Write the article.", draft);
    mock
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.mining.min_c_claims = 2;
    config.rating.use_judgment = false;
    config.review.min_words = 40;
    config.revision.min_words = 20;
    config
}

fn orchestrator(mock: MockProvider, tool: StaticSearchTool, config: PipelineConfig) -> Orchestrator {
    let registry = ToolRegistry::new().with_tool(ToolCategory::Web, Arc::new(tool));
    let mut budget = MockProvider::new("").with_model("mock-budget");
    budget.add_response("Analyse the question", NORMALIZED);
    Orchestrator::new(ModelSet::tiered(Arc::new(mock), Arc::new(budget)), Arc::new(registry), config)
        .with_as_of_date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
}

fn last_status(records: &[LogRecord]) -> RunStatus {
    match records.last() {
        Some(LogRecord::RunFinished { status, .. }) => *status,
        other => panic!("log does not end with run_finished: {:?}", other),
    }
}

#[test]
fn test_full_run_with_one_insufficient_claim() {
    let dir = TempDir::new().unwrap();
    let mut mock = provider(&article("[1][2] and [4][5][6], plus [9]", 80));
    mock.push_response(approved());
    let prompts = mock.clone();
    let orchestrator = orchestrator(mock, search_tool(), config()).with_log_dir(dir.path());

    let outcome = orchestrator.run(QUESTION, &CollectingSink::new()).unwrap();

    let summary = &outcome.summary;
    assert_eq!(summary.total_claims, 16);
    assert_eq!((summary.class_a, summary.class_b, summary.class_c), (10, 4, 2));
    assert_eq!(summary.insufficient, 1);
    assert_eq!(summary.fulfilled, 5);
    assert_eq!(summary.indexed_sources, 6);
    assert_eq!(summary.iterations, 0);
    assert_eq!(summary.verdict, Verdict::Approved);
    assert!(summary.passed);
    assert_eq!(
        outcome.claim_register.claim(&ClaimId::from_index(16)).unwrap().status,
        ClaimStatus::Insufficient
    );
    assert_eq!(
        outcome.claim_register.claim(&ClaimId::from_index(1)).unwrap().status,
        ClaimStatus::Pending
    );

    // the writer saw C-16 only as unsupported
    let draft_prompt = prompts
        .prompts()
        .into_iter()
        .find(|p| p.contains("Write the article."))
        .unwrap();
    let (usable, unsupported) = draft_prompt.split_once("UNSUPPORTED CLAIMS").unwrap();
    assert!(!usable.contains("C-16"));
    assert!(unsupported.contains("C-16"));

    // unknown [9] was dropped; bibliography lists exactly the cited sources
    let (body, bibliography) = outcome.article.split_once(REFERENCES_HEADING).unwrap();
    let cited = cited_numbers(body);
    assert_eq!(cited, [1, 2, 3, 4, 5, 6].into_iter().collect());
    assert_eq!(entry_numbers(&outcome.article), cited);
    assert!(bibliography.contains("https://agency.eu/data"));
    assert_eq!(summary.cited_sources, 6);

    let path = outcome.run_log_path.unwrap();
    let records = RunLog::read(&path).unwrap();
    assert_eq!(last_status(&records), RunStatus::Completed);
    let writer_model = records.iter().find_map(|r| match r {
        LogRecord::StepStarted { info, .. } if info.component == Component::Writer => info.model.clone(),
        _ => None,
    });
    assert_eq!(writer_model.as_deref(), Some("mock-premium"));
}

#[test]
fn test_no_claims_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut mock = MockProvider::new("");
    mock.add_response("Create an outline", r#"{"outline": {"sections": []}, "claims": []}"#);
    let prompts = mock.clone();
    let orchestrator = orchestrator(mock, search_tool(), config()).with_log_dir(dir.path());

    let err = orchestrator.run(QUESTION, &CollectingSink::new()).unwrap_err();
    assert!(matches!(err, PipelineError::NoClaims));
    assert!(err.is_fatal_input());
    assert!(!prompts.prompts().iter().any(|p| p.contains("Write the article.")));

    let log = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
    let records = RunLog::read(&log).unwrap();
    assert_eq!(last_status(&records), RunStatus::Error);
    assert!(records.iter().any(|r| matches!(
        r,
        LogRecord::StepFinished { status: StepStatus::Error, error: Some(e), .. } if e.contains("No claims")
    )));
}

#[test]
fn test_no_sources_is_fatal() {
    let mock = provider(&article("[1]", 80));
    let orchestrator = orchestrator(mock, StaticSearchTool::new("web"), config());

    let err = orchestrator.run(QUESTION, &CollectingSink::new()).unwrap_err();
    assert!(matches!(err, PipelineError::NoSources));
}

#[test]
fn test_collapsed_revision_keeps_previous_draft() {
    let long = article("[1][2][3][4][5][6]", 3000);
    let mut mock = provider(&long);
    mock.add_response("Revise the article", article("[1]", 190));
    mock.add_response(
        "Review the article",
        json!({"verdict": "revise", "issues": [{"kind": "style", "severity": "low", "description": "Shorten the intro", "action": "revise"}]})
            .to_string(),
    );
    let sink = CollectingSink::new();
    let orchestrator = orchestrator(mock, search_tool(), config());

    let outcome = orchestrator.run(QUESTION, &sink).unwrap();

    assert_eq!(outcome.summary.iterations, 0);
    assert!(outcome.summary.article_words >= 3000);
    assert!(outcome.article.starts_with(&long[..40]));
    assert!(sink
        .events()
        .iter()
        .any(|e| e.component == Component::Orchestrator && e.message.starts_with("revision discarded")));
}

#[test]
fn test_gap_research_extends_index_without_renumbering() {
    let mut tool = search_tool();
    tool.add_hits(
        "gap-c16",
        vec![
            hit("Grid operator", "https://gridop.eu/solar", "new data"),
            hit("Statistics office", "https://statoffice.eu/pv", "new data"),
        ],
    );
    let mut mock = provider(&article("[1][2][3][4][5][6]", 80));
    mock.add_response("Revise the article", article("[1][2][3][4][5][6] and now [7][8]", 90));
    mock.push_response(
        json!({
            "verdict": "research",
            "confidence": 0.8,
            "issues": [{"kind": "evidence", "severity": "high", "description": "C-16 needs data",
                        "claim_id": "C-16", "action": "research", "research_query": "gap-c16 figures"}],
            "gap_claims": ["C-16"]
        })
        .to_string(),
    );
    mock.push_response(approved());
    let prompts = mock.clone();
    let orchestrator = orchestrator(mock, tool, config());

    let outcome = orchestrator.run(QUESTION, &CollectingSink::new()).unwrap();

    let index = &outcome.source_index;
    assert_eq!(index.number_for("https://stats11.org/report"), Some(1));
    assert_eq!(index.number_for("https://tradebody.org/market"), Some(6));
    assert_eq!(index.number_for("https://gridop.eu/solar"), Some(7));
    assert_eq!(index.number_for("https://statoffice.eu/pv"), Some(8));
    assert_eq!(
        outcome.claim_register.claim(&ClaimId::from_index(16)).unwrap().status,
        ClaimStatus::Fulfilled
    );
    assert_eq!(outcome.summary.insufficient, 0);
    assert_eq!(outcome.summary.iterations, 1);
    assert!(outcome.summary.passed);

    let revise_prompt = prompts
        .prompts()
        .into_iter()
        .find(|p| p.contains("Revise the article"))
        .unwrap();
    assert!(revise_prompt.contains("New evidence supports claim C-16"));
    assert!(revise_prompt.contains("cite [7][8]"));
    assert_eq!(entry_numbers(&outcome.article).len(), 8);
}

struct AbortOnGate(AbortHandle);

impl ProgressSink for AbortOnGate {
    fn emit(&self, event: ProgressEvent) {
        if event.component == Component::Gate {
            self.0.abort();
        }
    }
}

#[test]
fn test_abort_stops_at_next_step() {
    let dir = TempDir::new().unwrap();
    let mock = provider(&article("[1]", 80));
    let prompts = mock.clone();
    let orchestrator = orchestrator(mock, search_tool(), config()).with_log_dir(dir.path());
    let sink = AbortOnGate(orchestrator.abort_handle());

    let err = orchestrator.run(QUESTION, &sink).unwrap_err();
    assert!(matches!(err, PipelineError::Aborted(ref step) if step == "build source index"));
    assert!(!prompts.prompts().iter().any(|p| p.contains("Write the article.")));

    let log = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
    let records = RunLog::read(&log).unwrap();
    assert_eq!(last_status(&records), RunStatus::Aborted);
    assert!(records
        .iter()
        .any(|r| matches!(r, LogRecord::StepFinished { status: StepStatus::Aborted, .. })));
}

#[tokio::test]
async fn test_spawn_streams_events() {
    let mut mock = provider(&article("[1][2][3][4][5][6]", 80));
    mock.push_response(approved());
    let orchestrator = Arc::new(orchestrator(mock, search_tool(), config()));

    let (mut events, handle) = orchestrator.spawn(QUESTION);
    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }
    let outcome = handle.await.unwrap().unwrap();

    assert!(outcome.summary.passed);
    assert_eq!(received.first().unwrap().message, "run started");
    assert_eq!(received.last().unwrap().message, "run completed");
    assert!(received.iter().any(|e| e.component == Component::Retriever));
}
