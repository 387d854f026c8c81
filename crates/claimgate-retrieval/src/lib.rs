//! Claimgate Retrieval
//!
//! Plans and executes targeted retrieval for B/C claims.
//!
//! # Architecture
//!
//! ```text
//! ClaimRegister → EvidencePlanner → RetrievalPlan (per claim)
//!                       ↓ ToolRouter picks a ToolCategory
//!               Retriever → ToolRegistry → SearchTool
//!                       ↓ SourceClassifier labels each hit
//!                  EvidencePack (per claim)
//! ```
//!
//! Tool selection and source classification are ranked rule lists, so new
//! tools or domains are added as data instead of new branches.

#![warn(missing_docs)]

pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod planner;
pub mod registry;
pub mod retriever;
pub mod routing;
pub mod static_tool;

pub use classify::{host_of, publisher_from_url, ClassRule, SourceClassifier};
pub use config::{KeywordRuleConfig, RetrievalConfig};
pub use error::{RetrievalError, Result};
pub use http::HttpSearchTool;
pub use planner::{EvidencePlanner, RetrievalPlan};
pub use registry::{ToolCategory, ToolRegistry};
pub use retriever::Retriever;
pub use routing::{Predicate, RoutingRule, ToolRouter};
pub use static_tool::StaticSearchTool;
