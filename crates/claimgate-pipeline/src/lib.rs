//! Claimgate Pipeline
//!
//! Turns a research question into a cited long-form article. Every claim the
//! article may make is mined up front, and only claims whose evidence passes
//! the gate reach the writer.
//!
//! # Flow
//!
//! ```text
//! question → QueryNormalizer → ClaimMiner → EvidencePlanner/Retriever
//!          → EvidenceRater → EvidenceGate → source index
//!          → ClaimWriter ⇄ EditorialReviewer (+ GapResearcher)
//!          → article + bibliography
//! ```
//!
//! The [`Orchestrator`] sequences the phases and records each one in a
//! [`RunLog`]. Model calls go through [`claimgate_domain::CompletionService`],
//! searches through the tools in a [`claimgate_retrieval::ToolRegistry`].
//!
//! # Examples
//!
//! ```
//! use claimgate_pipeline::{PipelineConfig, RevisionGuard};
//!
//! let config = PipelineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let guard = RevisionGuard::from_config(&config.revision);
//! let long = vec!["word"; 3000].join(" ");
//! let short = vec!["word"; 200].join(" ");
//! assert!(guard.check(&long, &short).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bibliography;
pub mod config;
pub mod error;
pub mod gap;
pub mod miner;
pub mod normalizer;
pub mod orchestrator;
mod prompt;
pub mod reviewer;
pub mod revision;
pub mod run_log;
pub mod writer;

pub use config::{
    AgentsConfig, MiningConfig, NormalizerConfig, PipelineConfig, ReviewConfig, RevisionConfig,
};
pub use error::{PipelineError, Result};
pub use gap::{GapOutcome, GapResearcher};
pub use miner::{ClaimMiner, MinedClaims};
pub use normalizer::{NormalizedQuery, QueryNormalizer};
pub use orchestrator::{AbortHandle, ChannelSink, ModelSet, Orchestrator, RunOutcome, RunSummary};
pub use reviewer::EditorialReviewer;
pub use revision::{Regression, RevisionGuard};
pub use run_log::{LogRecord, LoggingSink, RunLog, RunStatus, StepInfo, StepStatus};
pub use writer::{ClaimWriter, Draft, WritingInput};
