//! Source classification by URL
//!
//! Ranked host-pattern rules decide whether a hit is a primary, secondary or
//! tertiary source. Hosts that match no rule are secondary.

use claimgate_domain::SourceClass;

/// Host patterns that map to a source class
///
/// Pattern forms:
/// - `.gov`: host ends with the suffix
/// - `docs.`: host starts with the prefix
/// - `example.org`: host equals it or is a subdomain of it
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRule {
    /// Class assigned on match
    pub class: SourceClass,

    /// Host patterns
    pub patterns: Vec<String>,
}

impl ClassRule {
    /// Create a rule
    pub fn new<I, S>(class: SourceClass, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, host: &str) -> bool {
        self.patterns.iter().any(|p| host_matches(host, p))
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        return false;
    }
    if pattern.starts_with('.') {
        host.ends_with(&pattern)
    } else if pattern.ends_with('.') {
        host.starts_with(&pattern)
    } else {
        host == pattern || host.ends_with(&format!(".{}", pattern))
    }
}

/// Ranked URL classifier
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    rules: Vec<ClassRule>,
    default: SourceClass,
}

impl SourceClassifier {
    /// Classifier with explicit rules
    pub fn new(rules: Vec<ClassRule>, default: SourceClass) -> Self {
        Self { rules, default }
    }

    /// Prepend a rule so it outranks the existing ones
    pub fn push_front(&mut self, rule: ClassRule) {
        self.rules.insert(0, rule);
    }

    /// Class of a URL
    pub fn classify(&self, url: &str) -> SourceClass {
        let host = match host_of(url) {
            Some(host) => host,
            None => return self.default,
        };
        self.rules
            .iter()
            .find(|r| r.matches(&host))
            .map(|r| r.class)
            .unwrap_or(self.default)
    }
}

impl Default for SourceClassifier {
    fn default() -> Self {
        let rules = vec![
            ClassRule::new(
                SourceClass::Primary,
                [
                    ".gov", ".gov.uk", "bund.de", "europa.eu", "destatis.de", "oecd.org",
                    "who.int", "un.org", "iso.org", "ieee.org", "ietf.org", "w3.org",
                    "microsoft.com", "google.com", "openai.com", "anthropic.com", "github.com",
                    "aws.amazon.com", "docs.",
                ],
            ),
            ClassRule::new(
                SourceClass::Tertiary,
                [
                    "reddit.com", "medium.com", "dev.to", "news.ycombinator.com",
                    "stackoverflow.com", "quora.com", "wikipedia.org", "substack.com",
                    "blogspot.com", "wordpress.com", "x.com", "twitter.com", "linkedin.com",
                ],
            ),
            ClassRule::new(
                SourceClass::Secondary,
                [
                    "gartner.com", "forrester.com", "mckinsey.com", "arxiv.org",
                    "semanticscholar.org", "springer.com", "nature.com", "acm.org",
                    "sciencedirect.com", "heise.de", "golem.de", "techcrunch.com",
                    "theverge.com", "wired.com", "reuters.com",
                ],
            ),
        ];
        Self::new(rules, SourceClass::Secondary)
    }
}

/// Lowercased host of a URL, without `www.` and port
pub fn host_of(url: &str) -> Option<String> {
    let rest = url.trim();
    let rest = rest.split_once("://").map(|(_, r)| r).unwrap_or(rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    let host = authority.split(':').next()?.trim().to_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    (!host.is_empty() && host.contains('.')).then_some(host)
}

/// Publisher name derived from the registrable part of the host
///
/// `www.heise.de` → `Heise`, `news.bbc.co.uk` → `Bbc`.
pub fn publisher_from_url(url: &str) -> String {
    let host = match host_of(url) {
        Some(host) => host,
        None => return "Unknown".to_string(),
    };
    let labels: Vec<&str> = host.split('.').collect();
    let second_level = ["co", "com", "ac", "gov", "org", "net", "edu"];
    let name = match labels.len() {
        0 | 1 => host.as_str(),
        n if n >= 3 && second_level.contains(&labels[n - 2]) && labels[n - 1].len() == 2 => {
            labels[n - 3]
        }
        n => labels[n - 2],
    };
    title_case(name)
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether the URL's host falls under one of the domains
pub fn host_in(url: &str, domains: &[String]) -> bool {
    match host_of(url) {
        Some(host) => domains.iter().any(|d| {
            let d = d.trim().trim_start_matches("www.").to_lowercase();
            host_matches(&host, &d)
        }),
        None => false,
    }
}
