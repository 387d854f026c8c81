//! Article outline

use serde::{Deserialize, Serialize};

use crate::claim::ClaimId;

/// One section of the planned article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Section number, 1-based
    pub number: u32,

    /// Heading
    pub title: String,

    /// What the section must achieve
    #[serde(default)]
    pub goal: String,

    /// Claims expected to appear in this section
    #[serde(default)]
    pub expected_claim_ids: Vec<ClaimId>,

    /// Planned length in pages
    #[serde(default = "default_section_pages")]
    pub estimated_pages: f32,
}

fn default_section_pages() -> f32 {
    1.0
}

/// Ordered list of sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline {
    /// Sections in reading order
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Create an outline from sections
    pub fn new(sections: Vec<OutlineSection>) -> Self {
        Self { sections }
    }

    /// Sum of the sections' estimated pages
    pub fn total_estimated_pages(&self) -> f32 {
        self.sections.iter().map(|s| s.estimated_pages).sum()
    }

    /// Look up a section by number
    pub fn section(&self, number: u32) -> Option<&OutlineSection> {
        self.sections.iter().find(|s| s.number == number)
    }

    /// Whether the outline has no sections
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
