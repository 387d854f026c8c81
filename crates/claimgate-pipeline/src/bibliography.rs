//! Source index construction and bibliography assembly

use std::collections::{BTreeMap, BTreeSet};

use claimgate_domain::{ClaimId, ClaimRegister, EvidencePack, SourceIndex};
use claimgate_gatekeeper::GateReport;
use once_cell::sync::Lazy;
use regex::Regex;

/// `[n]` or `[n, m]`, with the preceding space captured separately
pub(crate) static CITATION_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s?)\[(\d+(?:\s*,\s*\d+)*)\]").expect("citation pattern is valid"));

static ENTRY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+)\]\s").expect("entry pattern is valid"));

/// Heading of the assembled reference list
pub const REFERENCES_HEADING: &str = "## References";

/// Add the qualifying sources of usable claims to the index
///
/// Claims are visited in register order, so the first pass numbers sources
/// by first use. Already indexed URLs keep their number. Returns how many
/// sources were new.
pub fn index_sources(
    index: &mut SourceIndex,
    register: &ClaimRegister,
    packs: &BTreeMap<ClaimId, EvidencePack>,
    gate: &GateReport,
    min_score: u8,
) -> usize {
    let before = index.len();
    for claim in register.claims() {
        let usable = gate.decision(&claim.claim_id).map(|d| d.usable).unwrap_or(false);
        if !usable || !claim.needs_evidence() {
            continue;
        }
        if let Some(pack) = packs.get(&claim.claim_id) {
            for source in pack.qualifying_sources(min_score) {
                index.insert(source);
            }
        }
    }
    index.len() - before
}

fn citations(text: &str) -> impl Iterator<Item = u32> + '_ {
    CITATION_GROUP.captures_iter(text).flat_map(|caps| {
        caps.get(2)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split(',')
            .filter_map(|n| n.trim().parse::<u32>().ok())
            .collect::<Vec<_>>()
    })
}

/// Distinct citation numbers used in `text`
pub fn cited_numbers(text: &str) -> BTreeSet<u32> {
    citations(text).collect()
}

/// Total citations in `text`; `[1, 2]` counts twice
pub fn citation_count(text: &str) -> usize {
    citations(text).count()
}

/// Render the reference list for the cited numbers present in the index
///
/// Returns an empty string when nothing is cited.
pub fn render(index: &SourceIndex, cited: &BTreeSet<u32>) -> String {
    let lines: Vec<String> = cited
        .iter()
        .filter_map(|&n| index.get(n))
        .map(|entry| {
            let source = &entry.source;
            let who = source
                .author
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(&source.publisher);
            format!(
                "[{}] {} ({}). {}. {}",
                entry.number,
                who,
                source.year().unwrap_or("n.d."),
                source.title.trim_end_matches('.'),
                source.url
            )
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }
    format!("{}\n\n{}\n", REFERENCES_HEADING, lines.join("\n"))
}

/// Append the reference list to an article body
pub fn assemble(article: &str, index: &SourceIndex) -> String {
    let body = article.trim_end();
    let references = render(index, &cited_numbers(body));
    if references.is_empty() {
        format!("{}\n", body)
    } else {
        format!("{}\n\n{}", body, references)
    }
}

/// Entry numbers of the reference list in an assembled article
pub fn entry_numbers(assembled: &str) -> BTreeSet<u32> {
    let Some((_, references)) = assembled.split_once(REFERENCES_HEADING) else {
        return BTreeSet::new();
    };
    references
        .lines()
        .filter_map(|line| ENTRY_LINE.captures(line.trim()))
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use claimgate_domain::{
        Claim, ClaimStatus, ClaimType, EvidenceClass, Outline, QuestionBrief, RegisterMinimums, RetrievalTicket,
        Source, SourceClass, SourceRating, TermMap,
    };
    use claimgate_gatekeeper::GateDecision;
    use proptest::prelude::*;

    fn source(n: usize, score: i64) -> Source {
        Source {
            source_id: format!("S-{}", n),
            title: format!("Study {}.", n),
            publisher: format!("site{}.org", n),
            author: None,
            date: Some("2024".to_string()),
            url: format!("https://site{}.org/study", n),
            source_class: SourceClass::Primary,
            extract: String::new(),
            supports_claims: BTreeSet::new(),
            rating: Some(SourceRating::new(score, score, score, score, score)),
            rating_note: None,
        }
    }

    fn index_of(n: usize) -> SourceIndex {
        let mut index = SourceIndex::new();
        for i in 1..=n {
            index.insert(&source(i, 3));
        }
        index
    }

    #[test]
    fn test_cited_numbers_and_count() {
        let text = "A [1]. B [2, 3]. C [1][3]. Link [docs](https://x.org) and year [2024a].";
        assert_eq!(cited_numbers(text), [1, 2, 3].into_iter().collect());
        assert_eq!(citation_count(text), 5);
    }

    #[test]
    fn test_render_uses_author_or_publisher() {
        let mut index = SourceIndex::new();
        let mut with_author = source(1, 3);
        with_author.author = Some("Jane Doe".to_string());
        index.insert(&with_author);
        let mut undated = source(2, 3);
        undated.date = None;
        index.insert(&undated);

        let cited = [1, 2].into_iter().collect();
        let rendered = render(&index, &cited);
        assert_eq!(
            rendered,
            "## References\n\n\
             [1] Jane Doe (2024). Study 1. https://site1.org/study\n\
             [2] site2.org (n.d.). Study 2. https://site2.org/study\n"
        );
    }

    #[test]
    fn test_assemble_lists_only_cited_sources() {
        let assembled = assemble("Body cites [2] and [4].\n", &index_of(5));
        assert_eq!(entry_numbers(&assembled), [2, 4].into_iter().collect());
        assert!(!assembled.contains("site1.org"));
    }

    #[test]
    fn test_assemble_without_citations_has_no_reference_list() {
        let assembled = assemble("Nothing cited here.", &index_of(3));
        assert_eq!(assembled, "Nothing cited here.\n");
    }

    #[test]
    fn test_index_sources_skips_unusable_and_unqualified() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let ticket = || Some(RetrievalTicket::with_queries(["q"]));
        let claims = vec![
            Claim::new(ClaimId::from_index(1), "one", ClaimType::Effect, EvidenceClass::B, ticket(), 1),
            Claim::new(ClaimId::from_index(2), "two", ClaimType::Effect, EvidenceClass::C, ticket(), 1),
        ];
        let register = ClaimRegister::new(
            QuestionBrief::minimal("q", date),
            TermMap::single("q"),
            Outline::default(),
            claims,
            RegisterMinimums { min_total: 1, min_c: 0 },
        );

        let mut first = EvidencePack::new(ClaimId::from_index(1));
        first.sources = vec![source(1, 3), source(2, 1)];
        let mut second = EvidencePack::new(ClaimId::from_index(2));
        second.sources = vec![source(3, 3)];
        let packs: BTreeMap<_, _> = [(ClaimId::from_index(1), first), (ClaimId::from_index(2), second)]
            .into_iter()
            .collect();
        let gate = GateReport {
            decisions: vec![
                GateDecision {
                    claim_id: ClaimId::from_index(1),
                    usable: true,
                    status: ClaimStatus::Fulfilled,
                    qualifying: 1,
                    required: 1,
                },
                GateDecision {
                    claim_id: ClaimId::from_index(2),
                    usable: false,
                    status: ClaimStatus::Insufficient,
                    qualifying: 1,
                    required: 2,
                },
            ],
        };

        let mut index = SourceIndex::new();
        assert_eq!(index_sources(&mut index, &register, &packs, &gate, 10), 1);
        assert_eq!(index.number_for("https://site1.org/study"), Some(1));
        assert_eq!(index.number_for("https://site3.org/study"), None);
        // idempotent
        assert_eq!(index_sources(&mut index, &register, &packs, &gate, 10), 0);
    }

    proptest! {
        #[test]
        fn bibliography_matches_citations_both_ways(
            size in 1usize..12,
            cited in proptest::collection::vec(1u32..15, 0..10),
        ) {
            let index = index_of(size);
            let body = cited
                .iter()
                .filter(|&&n| index.contains(n))
                .map(|n| format!("Fact [{}].", n))
                .collect::<Vec<_>>()
                .join(" ");
            let assembled = assemble(&body, &index);

            let in_text = cited_numbers(&body);
            prop_assert_eq!(entry_numbers(&assembled), in_text);
        }
    }
}
