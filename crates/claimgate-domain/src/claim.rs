//! Claim module - the unit of evidence gating
//!
//! A claim's evidence class determines how many independent sources must
//! support it before the writer may use it. The derived `min_sources` is kept
//! private and recomputed every time the class or the ticket changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a claim in the form `C-NN`
///
/// Stable for the whole run; never shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(String);

impl ClaimId {
    /// Build the id for the claim at 1-based position `n`
    ///
    /// # Examples
    ///
    /// ```
    /// use claimgate_domain::ClaimId;
    ///
    /// assert_eq!(ClaimId::from_index(3).as_str(), "C-03");
    /// assert_eq!(ClaimId::from_index(112).as_str(), "C-112");
    /// ```
    pub fn from_index(n: usize) -> Self {
        Self(format!("C-{:02}", n))
    }

    /// Parse an id, accepting `C-<digits>` in any case
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("C-")
            .or_else(|| trimmed.strip_prefix("c-"))
            .ok_or_else(|| format!("Invalid claim id: {}", s))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid claim id: {}", s));
        }
        Ok(Self(format!("C-{}", digits)))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sourcing requirement of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceClass {
    /// Stable background knowledge, no source needed
    A,

    /// Source recommended
    B,

    /// Source mandatory, at least two
    C,
}

impl EvidenceClass {
    /// Derive the effective minimum source count from a declared value
    ///
    /// A→0, B→max(1, declared), C→max(2, declared).
    pub fn min_sources(&self, declared: u32) -> u32 {
        match self {
            EvidenceClass::A => 0,
            EvidenceClass::B => declared.max(1),
            EvidenceClass::C => declared.max(2),
        }
    }

    /// Whether claims of this class need retrieval
    pub fn needs_evidence(&self) -> bool {
        !matches!(self, EvidenceClass::A)
    }

    /// Get the class letter
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceClass::A => "A",
            EvidenceClass::B => "B",
            EvidenceClass::C => "C",
        }
    }

    /// Parse a class letter
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(EvidenceClass::A),
            "B" => Some(EvidenceClass::B),
            "C" => Some(EvidenceClass::C),
            _ => None,
        }
    }
}

/// Kind of assertion a claim makes
///
/// Classification only; it never changes control flow beyond tool routing hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// What something is
    Definition,
    /// How something works
    Mechanism,
    /// How two things differ
    Comparison,
    /// What something causes
    Effect,
    /// A number, share or measurement
    #[serde(alias = "quant")]
    Quantitative,
    /// When something happened or will happen
    Temporal,
    /// What should be done
    Normative,
}

impl ClaimType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Definition => "definition",
            ClaimType::Mechanism => "mechanism",
            ClaimType::Comparison => "comparison",
            ClaimType::Effect => "effect",
            ClaimType::Quantitative => "quantitative",
            ClaimType::Temporal => "temporal",
            ClaimType::Normative => "normative",
        }
    }

    /// Parse a type name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "definition" => Some(ClaimType::Definition),
            "mechanism" => Some(ClaimType::Mechanism),
            "comparison" => Some(ClaimType::Comparison),
            "effect" => Some(ClaimType::Effect),
            "quantitative" | "quant" => Some(ClaimType::Quantitative),
            "temporal" => Some(ClaimType::Temporal),
            "normative" => Some(ClaimType::Normative),
            _ => None,
        }
    }
}

/// Evidence state of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Not yet researched
    #[default]
    Pending,
    /// Retrieval running
    InProgress,
    /// Enough qualifying sources
    Fulfilled,
    /// Not enough qualifying sources; a terminal, honest state
    Insufficient,
    /// Sources contradict each other
    Conflict,
}

impl ClaimStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::InProgress => "in_progress",
            ClaimStatus::Fulfilled => "fulfilled",
            ClaimStatus::Insufficient => "insufficient",
            ClaimStatus::Conflict => "conflict",
        }
    }
}

/// How independent the sources for one claim must be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndependenceRule {
    /// Sources must come from different publishers
    #[default]
    DifferentPublishers,
    /// Any sources count
    Any,
}

/// Search plan attached to a B/C claim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalTicket {
    /// Queries to run, in order
    pub queries: Vec<String>,

    /// Domains to prefer
    pub preferred_domains: Vec<String>,

    /// Domains whose results are rejected
    pub excluded_domains: Vec<String>,

    /// Declared minimum; the effective value is derived by the evidence class
    pub min_sources: u32,

    /// Independence requirement
    pub independence_rule: IndependenceRule,

    /// Whether a primary source is required
    pub primary_required: bool,

    /// Maximum age of sources in days
    pub recency_days: Option<u32>,

    /// Free-text acceptance criteria
    pub acceptance_criteria: String,
}

impl RetrievalTicket {
    /// A ticket with the given queries and defaults otherwise
    pub fn with_queries<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether the ticket contains at least one non-blank query
    pub fn has_queries(&self) -> bool {
        self.queries.iter().any(|q| !q.trim().is_empty())
    }
}

/// A single checkable assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ClaimRecord")]
pub struct Claim {
    /// Unique id, `C-NN`
    pub claim_id: ClaimId,

    /// The assertion text
    pub claim_text: String,

    /// Kind of assertion
    pub claim_type: ClaimType,

    /// Outline section this claim belongs to
    pub section_id: u32,

    /// Current evidence state
    pub status: ClaimStatus,

    /// Whether recent sources are required
    pub freshness_required: bool,

    /// Maximum source age in days, if any
    pub recency_days: Option<u32>,

    /// Source classes the claim must be backed by
    pub required_source_classes: Vec<crate::SourceClass>,

    /// Claims this claim builds upon
    pub dependencies: Vec<ClaimId>,

    evidence_class: EvidenceClass,
    min_sources: u32,
    retrieval_ticket: Option<RetrievalTicket>,
}

impl Claim {
    /// Create a claim; `min_sources` is derived from the class and ticket
    pub fn new(
        claim_id: ClaimId,
        claim_text: impl Into<String>,
        claim_type: ClaimType,
        evidence_class: EvidenceClass,
        retrieval_ticket: Option<RetrievalTicket>,
        section_id: u32,
    ) -> Self {
        let mut claim = Self {
            claim_id,
            claim_text: claim_text.into(),
            claim_type,
            section_id,
            status: ClaimStatus::Pending,
            freshness_required: false,
            recency_days: None,
            required_source_classes: Vec::new(),
            dependencies: Vec::new(),
            evidence_class,
            min_sources: 0,
            retrieval_ticket,
        };
        claim.derive_min_sources();
        claim
    }

    /// Evidence class
    pub fn evidence_class(&self) -> EvidenceClass {
        self.evidence_class
    }

    /// Effective minimum number of qualifying sources
    pub fn min_sources(&self) -> u32 {
        self.min_sources
    }

    /// Retrieval ticket, if any
    pub fn retrieval_ticket(&self) -> Option<&RetrievalTicket> {
        self.retrieval_ticket.as_ref()
    }

    /// Change the evidence class, recomputing `min_sources`
    pub fn set_evidence_class(&mut self, class: EvidenceClass) {
        self.evidence_class = class;
        self.derive_min_sources();
    }

    /// Replace the retrieval ticket, recomputing `min_sources`
    pub fn set_retrieval_ticket(&mut self, ticket: Option<RetrievalTicket>) {
        self.retrieval_ticket = ticket;
        self.derive_min_sources();
    }

    /// Whether the claim must go through retrieval
    pub fn needs_evidence(&self) -> bool {
        self.evidence_class.needs_evidence()
    }

    fn derive_min_sources(&mut self) {
        let declared = self
            .retrieval_ticket
            .as_ref()
            .map(|t| t.min_sources)
            .unwrap_or(0);
        self.min_sources = self.evidence_class.min_sources(declared);
    }
}

/// Wire shape of a claim; `min_sources` on input is ignored
#[derive(Deserialize)]
struct ClaimRecord {
    claim_id: ClaimId,
    claim_text: String,
    claim_type: ClaimType,
    section_id: u32,
    #[serde(default)]
    status: ClaimStatus,
    #[serde(default)]
    freshness_required: bool,
    #[serde(default)]
    recency_days: Option<u32>,
    #[serde(default)]
    required_source_classes: Vec<crate::SourceClass>,
    #[serde(default)]
    dependencies: Vec<ClaimId>,
    evidence_class: EvidenceClass,
    #[serde(default)]
    retrieval_ticket: Option<RetrievalTicket>,
}

impl From<ClaimRecord> for Claim {
    fn from(record: ClaimRecord) -> Self {
        let mut claim = Claim::new(
            record.claim_id,
            record.claim_text,
            record.claim_type,
            record.evidence_class,
            record.retrieval_ticket,
            record.section_id,
        );
        claim.status = record.status;
        claim.freshness_required = record.freshness_required;
        claim.recency_days = record.recency_days;
        claim.required_source_classes = record.required_source_classes;
        claim.dependencies = record.dependencies;
        claim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(class: EvidenceClass, declared: u32) -> Claim {
        let ticket = RetrievalTicket {
            min_sources: declared,
            ..RetrievalTicket::with_queries(["q"])
        };
        Claim::new(
            ClaimId::from_index(1),
            "text",
            ClaimType::Effect,
            class,
            Some(ticket),
            1,
        )
    }

    #[test]
    fn test_claim_id_parse() {
        assert_eq!(ClaimId::parse("C-07").unwrap().as_str(), "C-07");
        assert_eq!(ClaimId::parse(" c-12 ").unwrap().as_str(), "C-12");
        assert!(ClaimId::parse("C-").is_err());
        assert!(ClaimId::parse("X-01").is_err());
        assert!(ClaimId::parse("C-1a").is_err());
    }

    #[test]
    fn test_min_sources_derivation() {
        assert_eq!(claim(EvidenceClass::A, 5).min_sources(), 0);
        assert_eq!(claim(EvidenceClass::B, 0).min_sources(), 1);
        assert_eq!(claim(EvidenceClass::B, 3).min_sources(), 3);
        assert_eq!(claim(EvidenceClass::C, 1).min_sources(), 2);
        assert_eq!(claim(EvidenceClass::C, 4).min_sources(), 4);
    }

    #[test]
    fn test_min_sources_recomputed_on_class_change() {
        let mut c = claim(EvidenceClass::A, 0);
        assert_eq!(c.min_sources(), 0);
        c.set_evidence_class(EvidenceClass::C);
        assert_eq!(c.min_sources(), 2);
        c.set_evidence_class(EvidenceClass::B);
        assert_eq!(c.min_sources(), 1);
        c.set_retrieval_ticket(None);
        assert_eq!(c.min_sources(), 1);
    }

    #[test]
    fn test_deserialize_ignores_declared_min_sources() {
        let json = r#"{
            "claim_id": "C-02",
            "claim_text": "Adoption rose to 40%",
            "claim_type": "quant",
            "evidence_class": "C",
            "section_id": 2,
            "min_sources": 0,
            "retrieval_ticket": {"queries": ["adoption rate survey"], "min_sources": 1}
        }"#;
        let c: Claim = serde_json::from_str(json).unwrap();
        assert_eq!(c.claim_type, ClaimType::Quantitative);
        assert_eq!(c.min_sources(), 2);
        assert_eq!(c.status, ClaimStatus::Pending);
    }

    #[test]
    fn test_ticket_has_queries() {
        assert!(!RetrievalTicket::with_queries(["  "]).has_queries());
        assert!(RetrievalTicket::with_queries(["a", ""]).has_queries());
        assert!(!RetrievalTicket::default().has_queries());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn class_strategy() -> impl Strategy<Value = EvidenceClass> {
        prop_oneof![
            Just(EvidenceClass::A),
            Just(EvidenceClass::B),
            Just(EvidenceClass::C)
        ]
    }

    proptest! {
        /// Property: min_sources always respects the class floor
        #[test]
        fn test_min_sources_floor(class in class_strategy(), declared in 0u32..20, next in class_strategy()) {
            let ticket = RetrievalTicket { min_sources: declared, ..Default::default() };
            let mut c = Claim::new(ClaimId::from_index(1), "t", ClaimType::Effect, class, Some(ticket), 1);
            c.set_evidence_class(next);
            match c.evidence_class() {
                EvidenceClass::A => prop_assert_eq!(c.min_sources(), 0),
                EvidenceClass::B => prop_assert!(c.min_sources() >= 1),
                EvidenceClass::C => prop_assert!(c.min_sources() >= 2),
            }
        }
    }
}
