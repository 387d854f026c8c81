//! Sources, ratings and evidence packs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::claim::{ClaimId, ClaimStatus};

/// Upper bound on a source extract, in characters
pub const MAX_EXTRACT_CHARS: usize = 500;

/// Highest value of a single rating dimension
pub const MAX_DIMENSION: u8 = 3;

/// Provenance class of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceClass {
    /// Vendor documentation, official statistics, standards bodies
    Primary,
    /// Research, analysts, established press
    Secondary,
    /// Forums, blogs, aggregators
    Tertiary,
}

impl SourceClass {
    /// Get the class name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClass::Primary => "primary",
            SourceClass::Secondary => "secondary",
            SourceClass::Tertiary => "tertiary",
        }
    }
}

/// Five-dimensional source rating, each dimension 0–3
///
/// Values are clamped on construction; the total is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RatingRecord")]
pub struct SourceRating {
    authority: u8,
    independence: u8,
    recency: u8,
    specificity: u8,
    consensus: u8,
}

impl SourceRating {
    /// Create a rating, clamping every dimension into 0–3
    pub fn new(authority: i64, independence: i64, recency: i64, specificity: i64, consensus: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, MAX_DIMENSION as i64) as u8;
        Self {
            authority: clamp(authority),
            independence: clamp(independence),
            recency: clamp(recency),
            specificity: clamp(specificity),
            consensus: clamp(consensus),
        }
    }

    /// Sum of all dimensions (0–15)
    pub fn total(&self) -> u8 {
        self.authority + self.independence + self.recency + self.specificity + self.consensus
    }

    /// Authority of the publisher
    pub fn authority(&self) -> u8 {
        self.authority
    }

    /// Independence from the subject
    pub fn independence(&self) -> u8 {
        self.independence
    }

    /// Recency
    pub fn recency(&self) -> u8 {
        self.recency
    }

    /// Specificity to the claim
    pub fn specificity(&self) -> u8 {
        self.specificity
    }

    /// Agreement with other sources
    pub fn consensus(&self) -> u8 {
        self.consensus
    }
}

#[derive(Deserialize)]
struct RatingRecord {
    #[serde(default)]
    authority: i64,
    #[serde(default)]
    independence: i64,
    #[serde(default)]
    recency: i64,
    #[serde(default)]
    specificity: i64,
    #[serde(default)]
    consensus: i64,
}

impl From<RatingRecord> for SourceRating {
    fn from(r: RatingRecord) -> Self {
        SourceRating::new(r.authority, r.independence, r.recency, r.specificity, r.consensus)
    }
}

/// A retrieved source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Per-claim id, `S-<claim>-NNN`
    pub source_id: String,

    /// Title of the page or document
    pub title: String,

    /// Publisher, usually derived from the host
    pub publisher: String,

    /// Author, when known
    pub author: Option<String>,

    /// Publication date as reported, when known
    pub date: Option<String>,

    /// Canonical URL
    pub url: String,

    /// Provenance class
    pub source_class: SourceClass,

    /// Short paraphrase, at most [`MAX_EXTRACT_CHARS`] characters
    pub extract: String,

    /// Claims this source supports
    pub supports_claims: BTreeSet<ClaimId>,

    /// Rating, once the rater has run
    pub rating: Option<SourceRating>,

    /// Rater's note, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_note: Option<String>,
}

impl Source {
    /// Truncate text to the extract bound on a char boundary
    pub fn bounded_extract(text: &str) -> String {
        let text = text.trim();
        match text.char_indices().nth(MAX_EXTRACT_CHARS) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        }
    }

    /// Year of publication, when the date starts with one
    pub fn year(&self) -> Option<&str> {
        let date = self.date.as_deref()?.trim();
        let year = date.get(..4)?;
        year.chars().all(|c| c.is_ascii_digit()).then_some(year)
    }

    /// Whether the rating meets `min_score`
    pub fn qualifies(&self, min_score: u8) -> bool {
        self.rating.map(|r| r.total() >= min_score).unwrap_or(false)
    }
}

/// Sources retrieved for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    /// Claim the pack belongs to
    pub claim_id: ClaimId,

    /// Accepted sources, in retrieval order
    pub sources: Vec<Source>,

    /// Evidence status after retrieval or gating
    pub status: ClaimStatus,

    /// Free-form notes
    pub notes: Vec<String>,

    /// Set when the judge found the sources contradicting each other
    #[serde(default)]
    pub conflict: bool,
}

impl EvidencePack {
    /// An empty, pending pack
    pub fn new(claim_id: ClaimId) -> Self {
        Self {
            claim_id,
            sources: Vec::new(),
            status: ClaimStatus::Pending,
            notes: Vec::new(),
            conflict: false,
        }
    }

    /// True iff at least `min_sources` sources are rated `min_score` or higher
    pub fn is_fulfilled(&self, min_sources: u32, min_score: u8) -> bool {
        self.qualifying_sources(min_score).count() >= min_sources as usize
    }

    /// Sources whose rating meets `min_score`
    pub fn qualifying_sources(&self, min_score: u8) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(move |s| s.qualifies(min_score))
    }

    /// Distinct publishers divided by source count (0.0 when empty)
    pub fn independence_score(&self) -> f64 {
        if self.sources.is_empty() {
            return 0.0;
        }
        let publishers: BTreeSet<String> = self
            .sources
            .iter()
            .map(|s| s.publisher.trim().to_lowercase())
            .collect();
        publishers.len() as f64 / self.sources.len() as f64
    }

    /// Whether a source with this URL is already in the pack
    pub fn contains_url(&self, url: &str) -> bool {
        let key = normalize_url(url);
        self.sources.iter().any(|s| normalize_url(&s.url) == key)
    }
}

/// URL key used for deduplication: trimmed, without trailing slash or fragment
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split('#').next().unwrap_or(url);
    url.trim_end_matches('/').to_string()
}
