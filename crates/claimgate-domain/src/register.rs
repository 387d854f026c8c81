//! Claim register - the brief, term map, outline and claim set of one run
//!
//! Everything except per-claim status is read-only once the register is
//! built. [`ClaimRegister::validate`] reports on the claim discipline without
//! touching state.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::brief::{QuestionBrief, TermMap};
use crate::claim::{Claim, ClaimId, ClaimStatus, EvidenceClass};
use crate::outline::Outline;

/// Configured claim minimums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMinimums {
    /// Minimum number of claims
    pub min_total: usize,

    /// Minimum number of C-class claims
    pub min_c: usize,
}

impl Default for RegisterMinimums {
    fn default() -> Self {
        Self {
            min_total: 15,
            min_c: 5,
        }
    }
}

/// Claim counts by evidence class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    /// All claims
    pub total: usize,
    /// A-class claims
    pub a: usize,
    /// B-class claims
    pub b: usize,
    /// C-class claims
    pub c: usize,
}

/// A problem found by [`ClaimRegister::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RegisterIssue {
    /// Fewer claims than configured
    TooFewClaims {
        /// Claims found
        found: usize,
        /// Claims required
        required: usize,
    },

    /// Fewer C-class claims than configured
    TooFewCClaims {
        /// C claims found
        found: usize,
        /// C claims required
        required: usize,
    },

    /// A B/C claim has no ticket or a ticket without queries
    MissingTicket {
        /// Offending claim
        claim_id: ClaimId,
    },

    /// Two claims share an id
    DuplicateId {
        /// Duplicated id
        claim_id: ClaimId,
    },

    /// A claim points at a section that is not in the outline
    UnknownSection {
        /// Offending claim
        claim_id: ClaimId,
        /// Section number it references
        section_id: u32,
    },
}

impl fmt::Display for RegisterIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterIssue::TooFewClaims { found, required } => {
                write!(f, "only {} claims (minimum {})", found, required)
            }
            RegisterIssue::TooFewCClaims { found, required } => {
                write!(f, "only {} C claims (minimum {})", found, required)
            }
            RegisterIssue::MissingTicket { claim_id } => {
                write!(f, "{} needs a retrieval ticket with queries", claim_id)
            }
            RegisterIssue::DuplicateId { claim_id } => write!(f, "duplicate claim id {}", claim_id),
            RegisterIssue::UnknownSection {
                claim_id,
                section_id,
            } => write!(f, "{} references unknown section {}", claim_id, section_id),
        }
    }
}

/// Result of [`ClaimRegister::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterValidation {
    /// True when no issue was found
    pub valid: bool,

    /// All issues, in discovery order
    pub issues: Vec<RegisterIssue>,

    /// Claim counts by class
    pub counts: ClassCounts,
}

/// The brief, terms, outline and claims of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRegister {
    brief: QuestionBrief,
    term_map: TermMap,
    outline: Outline,
    claims: Vec<Claim>,
    minimums: RegisterMinimums,
}

impl ClaimRegister {
    /// Assemble a register
    pub fn new(
        brief: QuestionBrief,
        term_map: TermMap,
        outline: Outline,
        claims: Vec<Claim>,
        minimums: RegisterMinimums,
    ) -> Self {
        Self {
            brief,
            term_map,
            outline,
            claims,
            minimums,
        }
    }

    /// The question brief
    pub fn brief(&self) -> &QuestionBrief {
        &self.brief
    }

    /// The term map
    pub fn term_map(&self) -> &TermMap {
        &self.term_map
    }

    /// The outline
    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// All claims, in mining order
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Configured minimums
    pub fn minimums(&self) -> RegisterMinimums {
        self.minimums
    }

    /// Number of claims
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the register has no claims
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Look up a claim
    pub fn claim(&self, id: &ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| &c.claim_id == id)
    }

    /// Update a claim's status; returns false for unknown ids
    ///
    /// This is the only mutation the register allows after mining.
    pub fn set_status(&mut self, id: &ClaimId, status: ClaimStatus) -> bool {
        match self.claims.iter_mut().find(|c| &c.claim_id == id) {
            Some(claim) => {
                claim.status = status;
                true
            }
            None => false,
        }
    }

    /// B/C claims that are pending or insufficient
    pub fn claims_needing_evidence(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(|c| {
            c.needs_evidence()
                && matches!(c.status, ClaimStatus::Pending | ClaimStatus::Insufficient)
        })
    }

    /// C-class claims
    pub fn c_claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims
            .iter()
            .filter(|c| c.evidence_class() == EvidenceClass::C)
    }

    /// Claims assigned to a section
    pub fn claims_in_section(&self, section: u32) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(move |c| c.section_id == section)
    }

    /// Claims with a given status
    pub fn count_status(&self, status: ClaimStatus) -> usize {
        self.claims.iter().filter(|c| c.status == status).count()
    }

    /// Claim counts by class
    pub fn counts(&self) -> ClassCounts {
        let mut counts = ClassCounts {
            total: self.claims.len(),
            ..Default::default()
        };
        for claim in &self.claims {
            match claim.evidence_class() {
                EvidenceClass::A => counts.a += 1,
                EvidenceClass::B => counts.b += 1,
                EvidenceClass::C => counts.c += 1,
            }
        }
        counts
    }

    /// Check the claim discipline without mutating anything
    pub fn validate(&self) -> RegisterValidation {
        let counts = self.counts();
        let mut issues = Vec::new();

        if counts.total < self.minimums.min_total {
            issues.push(RegisterIssue::TooFewClaims {
                found: counts.total,
                required: self.minimums.min_total,
            });
        }
        if counts.c < self.minimums.min_c {
            issues.push(RegisterIssue::TooFewCClaims {
                found: counts.c,
                required: self.minimums.min_c,
            });
        }

        let mut seen = BTreeSet::new();
        for claim in &self.claims {
            if !seen.insert(&claim.claim_id) {
                issues.push(RegisterIssue::DuplicateId {
                    claim_id: claim.claim_id.clone(),
                });
            }

            let has_ticket = claim
                .retrieval_ticket()
                .map(|t| t.has_queries())
                .unwrap_or(false);
            if claim.needs_evidence() && !has_ticket {
                issues.push(RegisterIssue::MissingTicket {
                    claim_id: claim.claim_id.clone(),
                });
            }

            if !self.outline.is_empty() && self.outline.section(claim.section_id).is_none() {
                issues.push(RegisterIssue::UnknownSection {
                    claim_id: claim.claim_id.clone(),
                    section_id: claim.section_id,
                });
            }
        }

        RegisterValidation {
            valid: issues.is_empty(),
            issues,
            counts,
        }
    }
}
