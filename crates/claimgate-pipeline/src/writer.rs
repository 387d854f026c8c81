//! Phase 6: claim-bounded writing
//!
//! The writer only sees usable claims as statable facts, each with the
//! citation numbers it may use. Whatever the model returns is cleaned up
//! before anyone else sees it:
//!
//! - claim-id anchors such as `(C-01)` are stripped
//! - citations whose number is not in the source index are dropped
//! - a reference list appended by the model is removed

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use claimgate_domain::{
    ClaimId, ClaimRegister, Component, CompletionRequest, CompletionService, EvidencePack, ProgressEvent,
    ProgressSink, SourceIndex, TokenUsage,
};
use claimgate_gatekeeper::GateReport;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::bibliography::CITATION_GROUP;
use crate::error::{PipelineError, Result};
use crate::prompt::{revision_prompt, writer_prompt, WriterClaim, WriterContext, WRITER_SYSTEM};

static CLAIM_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[\(\[]\s*[Cc]-\d+(?:\s*[,;/]\s*[Cc]-\d+)*\s*[\)\]]").expect("valid regex")
});

static BIBLIOGRAPHY_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(#{1,6})\s*(references|bibliography|sources|works cited|literature|literaturverzeichnis|quellen|quellenverzeichnis)\s*:?\s*$",
    )
    .expect("valid regex")
});

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s").expect("valid regex"));

/// Everything the writer needs to know about the evidence
#[derive(Debug, Clone, Copy)]
pub struct WritingInput<'a> {
    /// Register after gating
    pub register: &'a ClaimRegister,

    /// Evidence packs by claim
    pub packs: &'a BTreeMap<ClaimId, EvidencePack>,

    /// Gate decisions
    pub gate: &'a GateReport,

    /// Citation numbers
    pub index: &'a SourceIndex,

    /// Minimum score for a source to be citable
    pub min_score: u8,
}

impl<'a> WritingInput<'a> {
    /// Citation numbers a usable claim may use, ascending
    pub fn citations_for(&self, claim_id: &ClaimId) -> Vec<u32> {
        let numbers: BTreeSet<u32> = self
            .packs
            .get(claim_id)
            .map(|pack| {
                pack.qualifying_sources(self.min_score)
                    .filter_map(|s| self.index.number_for(&s.url))
                    .collect()
            })
            .unwrap_or_default();
        numbers.into_iter().collect()
    }

    fn context(&self) -> WriterContext<'a> {
        let mut usable = Vec::new();
        let mut unusable = Vec::new();
        for claim in self.register.claims() {
            let is_usable = self
                .gate
                .decision(&claim.claim_id)
                .map(|d| d.usable)
                .unwrap_or(!claim.needs_evidence());
            let entry = WriterClaim {
                id: claim.claim_id.as_str(),
                class: claim.evidence_class().as_str(),
                text: &claim.claim_text,
                section: claim.section_id,
                citations: Vec::new(),
            };
            if is_usable {
                usable.push(WriterClaim {
                    citations: self.citations_for(&claim.claim_id),
                    ..entry
                });
            } else {
                unusable.push(entry);
            }
        }

        let sources = self
            .index
            .entries()
            .iter()
            .map(|e| {
                let year = e.source.year().unwrap_or("n.d.");
                format!("[{}] {} ({}): {}", e.number, e.source.publisher, year, e.source.title)
            })
            .collect();

        WriterContext {
            register: self.register,
            usable,
            unusable,
            sources,
        }
    }
}

/// Output of one writer call
#[derive(Debug, Clone)]
pub struct Draft {
    /// Sanitized article body, without bibliography
    pub text: String,

    /// Tokens spent
    pub usage: TokenUsage,
}

/// The claim-bounded writer
pub struct ClaimWriter {
    service: Arc<dyn CompletionService>,
}

impl ClaimWriter {
    /// Create a writer
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Write the first draft
    pub fn draft(&self, input: &WritingInput<'_>, sink: &dyn ProgressSink) -> Result<Draft> {
        sink.emit(ProgressEvent::status(Component::Writer, "writing first draft"));
        let prompt = writer_prompt(&input.context());
        self.call(prompt, input.index, sink)
    }

    /// Rewrite `previous`, fixing only the listed points
    pub fn revise(
        &self,
        input: &WritingInput<'_>,
        previous: &str,
        instructions: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<Draft> {
        sink.emit(ProgressEvent::status(
            Component::Writer,
            format!("revising ({} instructions)", instructions.len()),
        ));
        let prompt = revision_prompt(&input.context(), previous, instructions);
        self.call(prompt, input.index, sink)
    }

    fn call(&self, prompt: String, index: &SourceIndex, sink: &dyn ProgressSink) -> Result<Draft> {
        let request = CompletionRequest::new(prompt).with_system(WRITER_SYSTEM);
        let completion = self.service.complete(&request).map_err(|e| {
            sink.emit(ProgressEvent::error(Component::Writer, format!("completion failed: {}", e)));
            PipelineError::from(e)
        })?;

        let text = sanitize(&completion.text, index);
        if text.trim().is_empty() {
            sink.emit(ProgressEvent::error(Component::Writer, "writer returned an empty article"));
            return Err(PipelineError::Completion("writer returned an empty article".to_string()));
        }
        let words = crate::revision::word_count(&text);
        info!(words, "article written");
        sink.emit(ProgressEvent::status(Component::Writer, format!("{} words", words)));
        Ok(Draft {
            text,
            usage: completion.usage,
        })
    }
}

/// Enforce the writing contract on model output
pub fn sanitize(text: &str, index: &SourceIndex) -> String {
    let text = strip_code_fence(text);
    let text = strip_bibliography(text);
    let text = CLAIM_ANCHOR.replace_all(&text, "");
    let text = CITATION_GROUP.replace_all(&text, |caps: &Captures<'_>| {
        let kept: Vec<&str> = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|n| n.parse::<u32>().map(|n| index.contains(n)).unwrap_or(false))
            .collect();
        if kept.is_empty() {
            debug!(citation = &caps[0], "dropping unknown citation");
            String::new()
        } else {
            format!("{}[{}]", &caps[1], kept.join(", "))
        }
    });

    let mut out = text.trim_end().to_string();
    out.push('\n');
    out
}

/// Some models wrap the whole article in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the info string (```markdown)
    body.split_once('\n').map(|(_, body)| body).unwrap_or(body)
}

fn strip_bibliography(text: &str) -> String {
    let mut out = Vec::new();
    let mut skipping: Option<usize> = None;
    for line in text.lines() {
        if let Some(level) = skipping {
            match HEADING.captures(line) {
                Some(caps) if caps[1].len() <= level => skipping = None,
                _ => continue,
            }
        }
        if let Some(caps) = BIBLIOGRAPHY_HEADING.captures(line.trim()) {
            skipping = Some(caps[1].len());
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}
