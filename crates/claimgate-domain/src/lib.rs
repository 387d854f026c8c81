//! Claimgate Domain Layer
//!
//! This crate contains the data model shared by every stage of the
//! evidence-gated claim pipeline, together with the trait interfaces for the
//! external collaborators (completion service, search tools) and the progress
//! event types.
//!
//! ## Key Concepts
//!
//! - **Claim**: a single checkable assertion slated for the article
//! - **Evidence class**: A (background), B (source recommended), C (source mandatory)
//! - **Retrieval ticket**: the search plan attached to a B/C claim
//! - **Evidence pack**: the retrieved and rated sources for one claim
//! - **Source index**: stable URL → citation number mapping for one run
//!
//! ## Architecture
//!
//! - Pure data and invariants only, no I/O
//! - Collaborators are reached through the traits in [`traits`]
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod brief;
pub mod claim;
pub mod event;
pub mod evidence;
pub mod outline;
pub mod register;
pub mod review;
pub mod source_index;
pub mod traits;

// Re-exports for convenience
pub use agent::{AgentRole, ModelTier};
pub use brief::{FreshnessPriority, QuestionBrief, TermMap, DEFAULT_TARGET_PAGES};
pub use claim::{
    Claim, ClaimId, ClaimStatus, ClaimType, EvidenceClass, IndependenceRule, RetrievalTicket,
};
pub use event::{CollectingSink, Component, EventKind, NullSink, ProgressEvent, ProgressSink};
pub use evidence::{EvidencePack, Source, SourceClass, SourceRating, MAX_EXTRACT_CHARS};
pub use outline::{Outline, OutlineSection};
pub use register::{ClaimRegister, ClassCounts, RegisterIssue, RegisterMinimums, RegisterValidation};
pub use review::{IssueKind, IssueSeverity, ReviewIssue, ReviewReport, SuggestedAction, Verdict};
pub use source_index::{IndexedSource, SourceIndex};
pub use traits::{
    CollaboratorError, Completion, CompletionRequest, CompletionService, SearchHit, SearchTool,
    TokenUsage, ToolCall, ToolSpec,
};
