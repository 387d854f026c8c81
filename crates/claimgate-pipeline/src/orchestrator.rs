//! Phase sequencing
//!
//! The orchestrator runs the phases in order, one run-log step each:
//!
//! 1. normalize the question
//! 2. mine claims (none is fatal)
//! 3. plan and retrieve evidence (no sources at all is fatal)
//! 4. rate sources and gate claims
//! 5. build the source index
//! 6. write, then review and revise within the iteration budget
//! 7. append the bibliography
//!
//! An [`AbortHandle`] is checked before every step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use claimgate_domain::{
    AgentRole, ClaimId, ClaimRegister, ClaimStatus, Component, CompletionService, EvidencePack, EventKind, ModelTier,
    ProgressEvent, ProgressSink, ReviewReport, SourceIndex, TokenUsage, Verdict,
};
use claimgate_gatekeeper::{EvidenceGate, EvidenceRater, GateReport, RatingSummary};
use claimgate_retrieval::{EvidencePlanner, Retriever, ToolRegistry};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bibliography::{self, cited_numbers, index_sources};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::gap::GapResearcher;
use crate::miner::ClaimMiner;
use crate::normalizer::QueryNormalizer;
use crate::reviewer::EditorialReviewer;
use crate::revision::{self, word_count, RevisionGuard};
use crate::run_log::{LoggingSink, RunLog, RunStatus, StepInfo, StepStatus};
use crate::writer::{ClaimWriter, WritingInput};

/// Completion services by tier
#[derive(Clone)]
pub struct ModelSet {
    premium: Arc<dyn CompletionService>,
    budget: Arc<dyn CompletionService>,
}

impl ModelSet {
    /// One model for every tier
    pub fn single(service: Arc<dyn CompletionService>) -> Self {
        Self {
            premium: Arc::clone(&service),
            budget: service,
        }
    }

    /// Separate premium and budget models
    pub fn tiered(premium: Arc<dyn CompletionService>, budget: Arc<dyn CompletionService>) -> Self {
        Self { premium, budget }
    }

    /// Service for a tier
    pub fn for_tier(&self, tier: ModelTier) -> Arc<dyn CompletionService> {
        match tier {
            ModelTier::Premium => Arc::clone(&self.premium),
            ModelTier::Budget => Arc::clone(&self.budget),
        }
    }
}

/// Cooperative cancellation flag
///
/// Clones share the flag. The running pipeline checks it before each step.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request the run to stop
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress sink backed by a tokio channel
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Wrap a sender
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Numbers describing a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Claims in the register
    pub total_claims: usize,
    /// Class A claims
    pub class_a: usize,
    /// Class B claims
    pub class_b: usize,
    /// Class C claims
    pub class_c: usize,
    /// Claims with enough evidence
    pub fulfilled: usize,
    /// Claims without enough evidence
    pub insufficient: usize,
    /// Claims with contradicting sources
    pub conflict: usize,
    /// Sources retrieved over all packs
    pub total_sources: usize,
    /// Sources in the citation index
    pub indexed_sources: usize,
    /// Sources cited in the article
    pub cited_sources: usize,
    /// Article words, without bibliography
    pub article_words: usize,
    /// Article characters, with bibliography
    pub article_chars: usize,
    /// Accepted rewrites
    pub iterations: usize,
    /// Final verdict
    pub verdict: Verdict,
    /// Whether the last review approved the article
    pub passed: bool,
    /// Tokens over all model calls
    pub tokens: TokenUsage,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Run id, shared with the run log
    pub run_id: String,
    /// Final article including the bibliography
    pub article: String,
    /// Summary numbers
    pub summary: RunSummary,
    /// Last review
    pub review: ReviewReport,
    /// Register with final statuses
    pub claim_register: ClaimRegister,
    /// Evidence by claim
    pub evidence_packs: BTreeMap<ClaimId, EvidencePack>,
    /// Citation numbers
    pub source_index: SourceIndex,
    /// Run log file, if one was written
    pub run_log_path: Option<PathBuf>,
}

/// Runs the pipeline for one question at a time
pub struct Orchestrator {
    models: ModelSet,
    registry: Arc<ToolRegistry>,
    config: PipelineConfig,
    log_dir: Option<PathBuf>,
    as_of: Option<NaiveDate>,
    abort: AbortHandle,
}

impl Orchestrator {
    /// Create an orchestrator; runs are logged in memory only
    pub fn new(models: ModelSet, registry: Arc<ToolRegistry>, config: PipelineConfig) -> Self {
        Self {
            models,
            registry,
            config,
            log_dir: None,
            as_of: None,
            abort: AbortHandle::default(),
        }
    }

    /// Write run logs into `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Fix the date the question is read against
    pub fn with_as_of_date(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Handle for aborting runs of this orchestrator
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Effective configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline, blocking until it ends
    ///
    /// Callable from plain threads and from inside a tokio runtime; from
    /// async code prefer [`Orchestrator::spawn`], which keeps the caller's
    /// executor free while the pipeline blocks.
    pub fn run(&self, question: &str, sink: &dyn ProgressSink) -> Result<RunOutcome> {
        let config = serde_json::to_value(&self.config)?;
        let log = match &self.log_dir {
            Some(dir) => RunLog::create(dir, question, config)?,
            None => RunLog::in_memory(question, config),
        };
        let sink = LoggingSink::new(&log, sink);
        info!(run_id = log.run_id(), "run started");
        sink.emit(
            ProgressEvent::status(Component::Orchestrator, "run started")
                .with_payload(json!({"run_id": log.run_id(), "question": question})),
        );

        let steps = Steps {
            log: &log,
            sink: &sink,
            abort: &self.abort,
        };
        let result = self.execute(question, &steps);

        match &result {
            Ok(outcome) => {
                info!(
                    claims = outcome.summary.total_claims,
                    cited = outcome.summary.cited_sources,
                    verdict = outcome.summary.verdict.as_str(),
                    "run completed"
                );
                sink.emit(
                    ProgressEvent::status(Component::Orchestrator, "run completed")
                        .with_payload(serde_json::to_value(&outcome.summary).unwrap_or_default()),
                );
                log.finish_run(RunStatus::Completed, None);
            }
            Err(e @ PipelineError::Aborted(_)) => {
                warn!(error = %e, "run aborted");
                sink.emit(ProgressEvent::error(Component::Orchestrator, e.to_string()));
                log.finish_run(RunStatus::Aborted, Some(e.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "run failed");
                sink.emit(ProgressEvent::error(Component::Orchestrator, e.to_string()));
                log.finish_run(RunStatus::Error, Some(e.to_string()));
            }
        }

        result.map(|mut outcome| {
            outcome.run_log_path = log.path().map(Path::to_path_buf);
            outcome
        })
    }

    /// Run on a blocking thread, streaming events through a channel
    ///
    /// Must be called from within a tokio runtime. The channel closes when
    /// the run ends.
    pub fn spawn(
        self: Arc<Self>,
        question: impl Into<String>,
    ) -> (UnboundedReceiver<ProgressEvent>, JoinHandle<Result<RunOutcome>>) {
        let question = question.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || {
            let sink = ChannelSink::new(tx);
            self.run(&question, &sink)
        });
        (rx, handle)
    }

    fn agent(&self, role: AgentRole, component: Component, action: &str) -> (Arc<dyn CompletionService>, StepInfo) {
        let tier = self.config.agents.tier_for(role);
        let service = self.models.for_tier(tier);
        let info = StepInfo::new(component, action).with_agent(role, tier, Some(service.model_name().to_string()));
        (service, info)
    }

    fn execute(&self, question: &str, steps: &Steps<'_>) -> Result<RunOutcome> {
        let config = &self.config;
        let today = self.as_of.unwrap_or_else(|| Utc::now().date_naive());

        let (service, info) = self.agent(AgentRole::Normalizer, Component::Normalizer, "normalize question");
        let normalized = steps.run(info, |sink| {
            let normalized = QueryNormalizer::new(service, config.normalizer.clone()).normalize(question, today, sink);
            let details = json!({
                "terms": normalized.term_map.canonical_terms.len(),
                "degraded": normalized.degraded,
            });
            let usage = normalized.usage;
            Ok((normalized, usage, details))
        })?;

        let (service, info) = self.agent(AgentRole::Miner, Component::Miner, "mine claims");
        let mut register = steps.run(info, |sink| {
            let mined =
                ClaimMiner::new(service, config.mining.clone()).mine(&normalized.brief, &normalized.term_map, sink)?;
            if mined.register.is_empty() {
                return Err(PipelineError::NoClaims);
            }
            let counts = mined.register.counts();
            let details = json!({"claims": counts.total, "a": counts.a, "b": counts.b, "c": counts.c});
            Ok((mined.register, mined.usage, details))
        })?;

        let planner = EvidencePlanner::from_config(config.retrieval.clone());
        let retriever = Retriever::new(Arc::clone(&self.registry), config.retrieval.clone());
        let mut packs = steps.run(StepInfo::new(Component::Retriever, "plan and retrieve evidence"), |sink| {
            let plans = planner.plan(&register);
            sink.emit(ProgressEvent::status(
                Component::Planner,
                format!("{} claims need evidence", plans.len()),
            ));
            let packs = retriever.retrieve_all(&mut register, &plans, sink);
            let total = total_sources(&packs);
            if total == 0 {
                return Err(PipelineError::NoSources);
            }
            if total < config.retrieval.warn_min_total_sources {
                warn!(total, "very few sources retrieved");
                sink.emit(
                    ProgressEvent::status(Component::Orchestrator, format!("only {} sources retrieved", total))
                        .with_payload(json!({"warning": "few_sources", "sources": total})),
                );
            }
            Ok((packs, TokenUsage::default(), json!({"plans": plans.len(), "sources": total})))
        })?;

        let (service, info) = self.agent(AgentRole::Rater, Component::Rater, "rate sources");
        let rater = EvidenceRater::new(service, config.rating.clone());
        steps.run(info, |sink| {
            let summary = rater.rate_all(&register, &mut packs, sink);
            Ok(((), summary.usage, rating_details(&summary)))
        })?;

        let gate = EvidenceGate::new(config.rating.clone());
        let min_score = gate.min_score();
        let mut gate_report = steps.run(StepInfo::new(Component::Gate, "gate claims"), |sink| {
            let report = gate.apply(&mut register, &mut packs, sink);
            let details = gate_details(&report);
            Ok((report, TokenUsage::default(), details))
        })?;

        let mut index = SourceIndex::new();
        steps.run(StepInfo::new(Component::Bibliography, "build source index"), |sink| {
            let added = index_sources(&mut index, &register, &packs, &gate_report, min_score);
            sink.emit(ProgressEvent::status(
                Component::Bibliography,
                format!("{} sources indexed", added),
            ));
            Ok(((), TokenUsage::default(), json!({"indexed": added})))
        })?;

        let (service, writer_info) = self.agent(AgentRole::Writer, Component::Writer, "write draft");
        let writer = ClaimWriter::new(service);
        let mut article = steps.run(writer_info.clone(), |sink| {
            let input = WritingInput {
                register: &register,
                packs: &packs,
                gate: &gate_report,
                index: &index,
                min_score,
            };
            let draft = writer.draft(&input, sink)?;
            let details = json!({"words": word_count(&draft.text)});
            Ok((draft.text, draft.usage, details))
        })?;

        let (service, reviewer_info) = self.agent(AgentRole::Reviewer, Component::Reviewer, "review draft");
        let reviewer = EditorialReviewer::new(service, config.review.clone());
        let guard = RevisionGuard::from_config(&config.revision);
        let max_iterations = config.revision.max_iterations;
        let mut rewrites = 0;
        let mut round = 0;

        let review = loop {
            let info = StepInfo {
                action: format!("review round {}", round + 1),
                ..reviewer_info.clone()
            };
            let report = steps.run(info, |sink| {
                let (report, usage) = reviewer.review(&article, &register, &gate_report, index.len(), sink);
                let details = json!({
                    "verdict": report.verdict,
                    "confidence": report.confidence,
                    "issues": report.issues.len(),
                    "gap_claims": report.gap_claims,
                });
                Ok((report, usage, details))
            })?;
            if report.passed() || round >= max_iterations {
                break report;
            }
            round += 1;

            let mut instructions = revision::instructions(&report);
            if report.verdict == Verdict::Research {
                let extra = steps.run(StepInfo::new(Component::GapResearch, "research gap claims"), |sink| {
                    let researcher = GapResearcher::new(
                        &retriever,
                        &planner,
                        config.revision.max_gap_queries,
                        config.retrieval.results_per_query,
                    );
                    let outcome = researcher.research(&report, &register, &mut packs, sink);

                    let mut rating = RatingSummary::default();
                    for id in outcome.enriched() {
                        if let (Some(claim), Some(pack)) = (register.claim(&id), packs.get_mut(&id)) {
                            rating.absorb(rater.rate_pack(claim, pack, sink));
                        }
                    }
                    gate_report = gate.apply(&mut register, &mut packs, sink);
                    let added = index_sources(&mut index, &register, &packs, &gate_report, min_score);

                    let input = WritingInput {
                        register: &register,
                        packs: &packs,
                        gate: &gate_report,
                        index: &index,
                        min_score,
                    };
                    let lines = gap_instructions(&report.gap_claims, &input);
                    let details = json!({
                        "queries": outcome.queries,
                        "new_sources": outcome.total_new(),
                        "indexed": added,
                    });
                    Ok((lines, rating.usage, details))
                })?;
                instructions.extend(extra);
            }

            let info = StepInfo {
                action: format!("revise draft {}", round),
                ..writer_info.clone()
            };
            let revised = steps.run(info, |sink| {
                let input = WritingInput {
                    register: &register,
                    packs: &packs,
                    gate: &gate_report,
                    index: &index,
                    min_score,
                };
                let draft = writer.revise(&input, &article, &instructions, sink)?;
                let details = json!({
                    "instructions": instructions.len(),
                    "words_before": word_count(&article),
                    "words_after": word_count(&draft.text),
                });
                Ok((draft.text, draft.usage, details))
            });

            let discarded = match revised {
                Ok(text) => match guard.check(&article, &text) {
                    Ok(()) => {
                        article = text;
                        rewrites += 1;
                        continue;
                    }
                    Err(regression) => regression.to_string(),
                },
                Err(e @ PipelineError::Aborted(_)) => return Err(e),
                Err(e) => e.to_string(),
            };
            warn!(reason = %discarded, "revision discarded, keeping previous draft");
            steps.sink.emit(
                ProgressEvent::new(
                    EventKind::Error,
                    Component::Orchestrator,
                    format!("revision discarded: {}", discarded),
                )
                .with_payload(json!({"revision_discarded": true, "reason": discarded})),
            );
            break report;
        };

        let assembled = steps.run(StepInfo::new(Component::Bibliography, "append bibliography"), |sink| {
            let assembled = bibliography::assemble(&article, &index);
            let cited = cited_numbers(&article).len();
            sink.emit(ProgressEvent::status(
                Component::Bibliography,
                format!("{} of {} indexed sources cited", cited, index.len()),
            ));
            Ok((assembled, TokenUsage::default(), json!({"cited": cited})))
        })?;

        let summary = summarize(
            &register,
            &packs,
            &index,
            &article,
            &assembled,
            rewrites,
            &review,
            steps.log.total_usage(),
        );
        Ok(RunOutcome {
            run_id: steps.log.run_id().to_string(),
            article: assembled,
            summary,
            review,
            claim_register: register,
            evidence_packs: packs,
            source_index: index,
            run_log_path: None,
        })
    }
}

/// Runs closures as logged, abortable steps
struct Steps<'a> {
    log: &'a RunLog,
    sink: &'a dyn ProgressSink,
    abort: &'a AbortHandle,
}

impl Steps<'_> {
    fn run<T>(
        &self,
        info: StepInfo,
        body: impl FnOnce(&dyn ProgressSink) -> Result<(T, TokenUsage, Value)>,
    ) -> Result<T> {
        let action = info.action.clone();
        let handle = self.log.start_step(info);
        if self.abort.is_aborted() {
            self.log.finish_step(
                handle,
                StepStatus::Aborted,
                TokenUsage::default(),
                Some("aborted".to_string()),
                Value::Null,
            );
            return Err(PipelineError::Aborted(action));
        }

        match body(self.sink) {
            Ok((value, tokens, details)) => {
                self.log.finish_step(handle, StepStatus::Success, tokens, None, details);
                Ok(value)
            }
            Err(e) => {
                self.log
                    .finish_step(handle, StepStatus::Error, TokenUsage::default(), Some(e.to_string()), Value::Null);
                Err(e)
            }
        }
    }
}

fn total_sources(packs: &BTreeMap<ClaimId, EvidencePack>) -> usize {
    packs.values().map(|p| p.sources.len()).sum()
}

fn rating_details(summary: &RatingSummary) -> Value {
    json!({
        "judged": summary.judged,
        "fallback": summary.fallback,
        "failed_calls": summary.failed_calls,
        "conflicts": summary.conflicts,
    })
}

fn gate_details(report: &GateReport) -> Value {
    json!({
        "usable": report.usable().len(),
        "insufficient": report.insufficient(),
        "conflict": report.conflicts(),
    })
}

/// Writer instructions for claims that went through gap research
fn gap_instructions(gap_claims: &[ClaimId], input: &WritingInput<'_>) -> Vec<String> {
    gap_claims
        .iter()
        .filter_map(|id| {
            let claim = input.register.claim(id)?;
            let usable = input.gate.decision(id).map(|d| d.usable).unwrap_or(false);
            let line = if usable {
                let refs: String = input
                    .citations_for(id)
                    .iter()
                    .map(|n| format!("[{}]", n))
                    .collect();
                format!(
                    "New evidence supports claim {}: \"{}\". Work it in and cite {}.",
                    id, claim.claim_text, refs
                )
            } else {
                format!(
                    "Claim {} still lacks sufficient evidence: leave it out or mark it as unverified.",
                    id
                )
            };
            Some(line)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn summarize(
    register: &ClaimRegister,
    packs: &BTreeMap<ClaimId, EvidencePack>,
    index: &SourceIndex,
    body: &str,
    assembled: &str,
    iterations: usize,
    review: &ReviewReport,
    tokens: TokenUsage,
) -> RunSummary {
    let counts = register.counts();
    RunSummary {
        total_claims: counts.total,
        class_a: counts.a,
        class_b: counts.b,
        class_c: counts.c,
        fulfilled: register.count_status(ClaimStatus::Fulfilled),
        insufficient: register.count_status(ClaimStatus::Insufficient),
        conflict: register.count_status(ClaimStatus::Conflict),
        total_sources: total_sources(packs),
        indexed_sources: index.len(),
        cited_sources: cited_numbers(body).into_iter().filter(|n| index.contains(*n)).count(),
        article_words: word_count(body),
        article_chars: assembled.chars().count(),
        iterations,
        verdict: review.verdict,
        passed: review.passed(),
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimgate_llm::MockProvider;

    #[test]
    fn test_model_set_routes_tiers() {
        let premium: Arc<dyn CompletionService> = Arc::new(MockProvider::new("").with_model("big"));
        let budget: Arc<dyn CompletionService> = Arc::new(MockProvider::new("").with_model("small"));
        let models = ModelSet::tiered(premium, budget);
        assert_eq!(models.for_tier(ModelTier::Premium).model_name(), "big");
        assert_eq!(models.for_tier(ModelTier::Budget).model_name(), "small");

        let single = ModelSet::single(Arc::new(MockProvider::new("").with_model("one")));
        assert_eq!(single.for_tier(ModelTier::Budget).model_name(), "one");
    }

    #[test]
    fn test_abort_handle_is_shared() {
        let handle = AbortHandle::default();
        let clone = handle.clone();
        assert!(!handle.is_aborted());
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.emit(ProgressEvent::status(Component::Writer, "one"));
        assert_eq!(rx.try_recv().unwrap().message, "one");
        drop(rx);
        sink.emit(ProgressEvent::status(Component::Writer, "two"));
    }

    #[test]
    fn test_gap_instructions_cite_new_sources() {
        use claimgate_domain::{
            Claim, ClaimType, EvidenceClass, Outline, QuestionBrief, RegisterMinimums, RetrievalTicket, Source,
            SourceClass, SourceRating, TermMap,
        };
        use claimgate_gatekeeper::GateDecision;
        use std::collections::BTreeSet;

        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let claims = vec![
            Claim::new(
                ClaimId::from_index(1),
                "Usage doubled",
                ClaimType::Effect,
                EvidenceClass::B,
                Some(RetrievalTicket::with_queries(["usage"])),
                1,
            ),
            Claim::new(
                ClaimId::from_index(2),
                "Costs fell",
                ClaimType::Effect,
                EvidenceClass::B,
                Some(RetrievalTicket::with_queries(["costs"])),
                1,
            ),
        ];
        let register = ClaimRegister::new(
            QuestionBrief::minimal("q", date),
            TermMap::default(),
            Outline::default(),
            claims,
            RegisterMinimums { min_total: 1, min_c: 0 },
        );
        let source = Source {
            source_id: "S-C-01-001".to_string(),
            title: "Report".to_string(),
            publisher: "stats.org".to_string(),
            author: None,
            date: None,
            url: "https://stats.org/r".to_string(),
            source_class: SourceClass::Primary,
            extract: String::new(),
            supports_claims: BTreeSet::new(),
            rating: Some(SourceRating::new(3, 3, 2, 2, 2)),
            rating_note: None,
        };
        let mut pack = EvidencePack::new(ClaimId::from_index(1));
        pack.sources.push(source.clone());
        let packs: BTreeMap<_, _> = [(ClaimId::from_index(1), pack)].into_iter().collect();
        let gate = GateReport {
            decisions: vec![
                GateDecision {
                    claim_id: ClaimId::from_index(1),
                    usable: true,
                    status: ClaimStatus::Fulfilled,
                    qualifying: 1,
                    required: 1,
                },
                GateDecision {
                    claim_id: ClaimId::from_index(2),
                    usable: false,
                    status: ClaimStatus::Insufficient,
                    qualifying: 0,
                    required: 1,
                },
            ],
        };
        let mut index = SourceIndex::new();
        index.insert(&source);
        let input = WritingInput {
            register: &register,
            packs: &packs,
            gate: &gate,
            index: &index,
            min_score: 7,
        };

        let lines = gap_instructions(&[ClaimId::from_index(1), ClaimId::from_index(2)], &input);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("cite [1]"));
        assert!(lines[1].contains("C-02 still lacks"));
    }
}
