//! Claimgate Gatekeeper
//!
//! Rates evidence and decides which claims the writer may use.
//!
//! The Gatekeeper provides:
//! - Source rating on five 0–3 dimensions, judged by a model or derived from
//!   the source class when judgment is unavailable
//! - The evidence gate: a B/C claim is usable only when enough of its sources
//!   reach the minimum score; A-class claims always pass
//!
//! # Examples
//!
//! ```
//! use claimgate_gatekeeper::{EvidenceGate, RatingConfig};
//!
//! let gate = EvidenceGate::new(RatingConfig::default());
//! assert_eq!(gate.min_score(), 10);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod prompt;
mod rater;

pub use config::RatingConfig;
pub use error::GatekeeperError;
pub use gate::{EvidenceGate, GateDecision, GateReport};
pub use rater::{fallback_rating, EvidenceRater, RatingSummary};
