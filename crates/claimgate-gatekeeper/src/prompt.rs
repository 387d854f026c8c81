//! Judge prompt

use claimgate_domain::{Claim, Source};

/// System instructions for the rating judge
pub(crate) const SYSTEM: &str = "You are an evidence auditor. You rate how well sources support a \
single factual claim. Answer with JSON only.";

/// Build the rating prompt for one claim and a batch of its sources
pub(crate) fn build_rating_prompt(claim: &Claim, sources: &[&Source]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Rate each source for the claim below.\n\n");
    prompt.push_str(&format!("CLAIM: {}\n\n", claim.claim_text));
    prompt.push_str("SOURCES:\n");
    for source in sources {
        prompt.push_str(&format!(
            "- id: {}\n  title: {}\n  publisher: {}\n  class: {}\n  url: {}\n  extract: {}\n",
            source.source_id,
            source.title,
            source.publisher,
            source.source_class.as_str(),
            source.url,
            source.extract
        ));
    }
    prompt.push_str(
        r#"
Score every source on five dimensions, each an integer from 0 to 3:
- authority: standing of the publisher on this subject
- independence: distance from the subject (3 = no commercial interest)
- recency: how current the information is
- specificity: how directly the source addresses the claim
- consensus: agreement with the other sources

Set "conflict" to true only if the sources contradict each other on the claim.

Respond with:
{"ratings": [{"source_id": "...", "authority": 0, "independence": 0, "recency": 0, "specificity": 0, "consensus": 0, "reasoning": "..."}], "conflict": false}
"#,
    );
    prompt
}
