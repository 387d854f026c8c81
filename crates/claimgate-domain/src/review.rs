//! Review verdicts and reports

use serde::{Deserialize, Serialize};

use crate::claim::ClaimId;

/// Outcome of one review pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The draft is accepted
    Approved,
    /// Rewrite with the listed issues
    Revise,
    /// Research the gap claims, then rewrite
    Research,
}

impl Verdict {
    /// Get the verdict name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Revise => "revise",
            Verdict::Research => "research",
        }
    }

    /// Parse a verdict, accepting a few synonyms
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approved" | "approve" | "accept" | "accepted" | "pass" | "passed" => {
                Some(Verdict::Approved)
            }
            "revise" | "revision" | "rewrite" => Some(Verdict::Revise),
            "research" | "gap" | "gap_research" => Some(Verdict::Research),
            _ => None,
        }
    }
}

/// Severity of a review issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Cosmetic
    Low,
    /// Worth fixing
    #[default]
    Medium,
    /// Must be fixed
    High,
    /// Blocks approval
    Critical,
}

/// Category of a review issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Article shorter than required
    WordCount,
    /// Too few citations per thousand words
    CitationDensity,
    /// Too few distinct sources cited
    CitationDiversity,
    /// A required section is missing
    MissingSection,
    /// Statement without evidence
    Unanchored,
    /// Planned claims missing from the text
    Coverage,
    /// Claim lacks evidence
    Evidence,
    /// Statements contradict each other
    Contradiction,
    /// Wording and structure
    Style,
    /// Anything else
    #[serde(other)]
    Other,
}

/// What the reviewer wants done about an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    /// Fix in a rewrite
    #[default]
    Revise,
    /// Needs more evidence
    Research,
}

/// A single finding of the reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewIssue {
    /// Category
    pub kind: IssueKind,

    /// Severity
    #[serde(default)]
    pub severity: IssueSeverity,

    /// Human-readable description
    pub description: String,

    /// Claim the issue concerns, if any
    #[serde(default)]
    pub claim_id: Option<ClaimId>,

    /// Where in the article, if known
    #[serde(default)]
    pub location: Option<String>,

    /// Suggested follow-up
    #[serde(default)]
    pub action: SuggestedAction,

    /// Query to run when the action is research
    #[serde(default)]
    pub research_query: Option<String>,
}

impl ReviewIssue {
    /// A revise-issue with no claim or location attached
    pub fn new(kind: IssueKind, severity: IssueSeverity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            claim_id: None,
            location: None,
            action: SuggestedAction::Revise,
            research_query: None,
        }
    }
}

/// Result of reviewing one draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// Claims in the register
    pub total_claims: usize,

    /// Claims the reviewer found in the text
    pub claims_in_text: usize,

    /// C-class claims in the register
    pub c_claims_total: usize,

    /// C-class claims with fulfilled evidence
    pub c_claims_with_evidence: usize,

    /// All findings
    pub issues: Vec<ReviewIssue>,

    /// Candidate hallucinations
    pub unanchored_statements: Vec<String>,

    /// Final verdict after fusing deterministic and judged checks
    pub verdict: Verdict,

    /// Confidence in the verdict, 0.0–1.0
    pub confidence: f32,

    /// Claims that need more evidence
    pub gap_claims: Vec<ClaimId>,

    /// Short summary from the reviewer
    pub summary: String,
}

impl ReviewReport {
    /// Share of register claims present in the text (0.0 without claims)
    pub fn claim_coverage_rate(&self) -> f64 {
        if self.total_claims == 0 {
            return 0.0;
        }
        self.claims_in_text as f64 / self.total_claims as f64
    }

    /// Share of C claims with evidence (1.0 without C claims)
    pub fn c_claim_evidence_rate(&self) -> f64 {
        if self.c_claims_total == 0 {
            return 1.0;
        }
        self.c_claims_with_evidence as f64 / self.c_claims_total as f64
    }

    /// Number of unanchored statements
    pub fn hallucination_count(&self) -> usize {
        self.unanchored_statements.len()
    }

    /// Whether any issue is critical
    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Critical)
    }

    /// Whether the draft was approved
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Approved
    }
}
