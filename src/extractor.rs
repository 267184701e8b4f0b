use crate::error::AnalysisError;
use crate::normalizer::MessageText;
use crate::rules::{Category, PatternRule, RuleSet};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use url::{Host, Url};

/// Byte range of one match in the original message, tagged with its
/// category so the consuming UI can render highlights itself instead of
/// receiving pre-built markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub offset: usize,
    pub length: usize,
    pub category: Category,
}

/// One matched scam signal. Produced fresh per request, never shared.
///
/// The weight counts once per rule regardless of how often the pattern
/// repeats; every occurrence still contributes a span.
#[derive(Debug, Clone)]
pub struct Indicator {
    pub category: Category,
    pub rule_name: String,
    /// Matched text with first-seen casing from the original message.
    pub snippet: String,
    pub weight: f64,
    description: String,
    pub spans: Vec<MatchSpan>,
}

impl Indicator {
    pub fn new(
        category: Category,
        rule_name: impl Into<String>,
        snippet: impl Into<String>,
        weight: f64,
        description: impl Into<String>,
        spans: Vec<MatchSpan>,
    ) -> Self {
        Self {
            category,
            rule_name: rule_name.into(),
            snippet: snippet.into(),
            weight,
            description: description.into(),
            spans,
        }
    }

    /// Renders the rule's description template with the matched snippet.
    pub fn explanation(&self) -> String {
        self.description.replace("{snippet}", &self.snippet)
    }

    pub fn first_offset(&self) -> usize {
        self.spans.first().map(|s| s.offset).unwrap_or(usize::MAX)
    }
}

// URL shape weights. IP-literal links outweigh shorteners, which outweigh
// softer signals like abused TLDs.
const WEIGHT_IP_LITERAL: f64 = 25.0;
const WEIGHT_ANCHOR_MISMATCH: f64 = 22.0;
const WEIGHT_SHORTENER: f64 = 18.0;
const WEIGHT_SUSPICIOUS_TLD: f64 = 12.0;
const WEIGHT_PHISHY_HOST: f64 = 12.0;

const URL_SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "ow.ly",
    "buff.ly",
    "adf.ly",
    "is.gd",
    "cutt.ly",
    "rb.gy",
    "rebrand.ly",
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "xyz", "tk", "ml", "ga", "cf", "gq", "top", "icu", "club", "info",
];

// Host tokens that mimic account or login flows on domains that are not
// the real service ("secure-paypal-login.example").
const PHISHY_HOST_KEYWORDS: &[&str] = &["secure", "verify", "login", "signin", "confirm"];

/// Runs the declarative rule table plus the URL shape analysis over a
/// message. Stateless; execution order of the categories does not affect
/// the produced indicators.
#[derive(Debug, Clone)]
pub struct IndicatorExtractor {
    rules: RuleSet,
    urls: UrlAnalyzer,
}

impl IndicatorExtractor {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            urls: UrlAnalyzer::new(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extracts indicators for all categories. A category that faults
    /// contributes zero indicators and is logged; it never aborts the
    /// request.
    pub fn extract(&self, text: &MessageText) -> Vec<Indicator> {
        let mut out = Vec::new();
        for category in Category::ALL {
            let result = match category {
                Category::SuspiciousUrl => guarded(category, || self.urls.analyze(text)),
                _ => guarded(category, || self.run_rules(text, category)),
            };
            match result {
                Ok(mut indicators) => out.append(&mut indicators),
                Err(e) => {
                    log::warn!("extractor degraded: {e}");
                }
            }
        }
        out
    }

    fn run_rules(&self, text: &MessageText, category: Category) -> Vec<Indicator> {
        let mut indicators = Vec::new();
        for rule in self.rules.rules_for(category) {
            if let Some(indicator) = match_rule(rule, text.original()) {
                indicators.push(indicator);
            }
        }
        indicators
    }
}

/// Runs one category's extraction with a panic guard. A fault inside a
/// pattern pass becomes `AnalysisError::Extraction` for that category
/// alone, so the remaining categories still run.
fn guarded<F>(category: Category, run: F) -> Result<Vec<Indicator>, AnalysisError>
where
    F: FnOnce() -> Vec<Indicator>,
{
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(run)).map_err(|payload| {
        AnalysisError::Extraction {
            category,
            detail: panic_detail(payload),
        }
    })
}

fn panic_detail(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "extractor panicked".to_string()
    }
}

/// Matches one rule against the original text. The snippet is the first
/// participating capture group when the pattern defines one, otherwise
/// the whole match; that lets a broad pattern surface a precise keyword.
fn match_rule(rule: &PatternRule, original: &str) -> Option<Indicator> {
    let mut spans = Vec::new();
    let mut snippet: Option<String> = None;

    for caps in rule.regex.captures_iter(original) {
        let m = caps
            .iter()
            .skip(1)
            .flatten()
            .next()
            .or_else(|| caps.get(0))?;
        if snippet.is_none() {
            snippet = Some(m.as_str().to_string());
        }
        spans.push(MatchSpan {
            offset: m.start(),
            length: m.len(),
            category: rule.spec.category,
        });
    }

    snippet.map(|snippet| {
        Indicator::new(
            rule.spec.category,
            rule.spec.name.clone(),
            snippet,
            rule.spec.weight,
            rule.spec.description.clone(),
            spans,
        )
    })
}

#[derive(Debug, Clone)]
struct UrlAnalyzer {
    url_regex: Regex,
    anchor_regex: Regex,
}

/// Accumulates spans for one URL shape so the shape's weight counts once
/// however many links exhibit it.
#[derive(Debug, Default)]
struct ShapeHits {
    snippet: Option<String>,
    spans: Vec<MatchSpan>,
}

impl ShapeHits {
    fn record(&mut self, snippet: &str, offset: usize, length: usize) {
        if self.snippet.is_none() {
            self.snippet = Some(snippet.to_string());
        }
        self.spans.push(MatchSpan {
            offset,
            length,
            category: Category::SuspiciousUrl,
        });
    }

    fn into_indicator(self, rule_name: &str, weight: f64, description: &str) -> Option<Indicator> {
        let snippet = self.snippet?;
        Some(Indicator::new(
            Category::SuspiciousUrl,
            rule_name,
            snippet,
            weight,
            description,
            self.spans,
        ))
    }
}

impl UrlAnalyzer {
    fn new() -> Self {
        let url_pattern = r#"(?:https?://)?(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}(?::\d+)?(?:/[^\s<>'"]*)?|https?://\d{1,3}(?:\.\d{1,3}){3}(?::\d+)?(?:/[^\s<>]*)?"#;
        Self {
            url_regex: RegexBuilder::new(url_pattern)
                .case_insensitive(true)
                .build()
                .expect("url pattern compiles"),
            anchor_regex: RegexBuilder::new(
                r#"<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>([^<]+)</a>"#,
            )
            .case_insensitive(true)
            .build()
            .expect("anchor pattern compiles"),
        }
    }

    fn analyze(&self, text: &MessageText) -> Vec<Indicator> {
        let original = text.original();

        let mut ip_hits = ShapeHits::default();
        let mut shortener_hits = ShapeHits::default();
        let mut tld_hits = ShapeHits::default();
        let mut phishy_hits = ShapeHits::default();
        let mut mismatch_hits = ShapeHits::default();

        for m in self.url_regex.find_iter(original) {
            let Some(host) = parse_host(m.as_str()) else {
                continue;
            };

            match &host {
                HostShape::Ip(addr) => {
                    ip_hits.record(addr, m.start(), m.len());
                }
                HostShape::Domain(domain) => {
                    if URL_SHORTENERS.contains(&domain.as_str()) {
                        shortener_hits.record(domain, m.start(), m.len());
                        continue;
                    }
                    if let Some(tld) = domain.rsplit('.').next() {
                        if SUSPICIOUS_TLDS.contains(&tld) {
                            tld_hits.record(domain, m.start(), m.len());
                        }
                    }
                    let has_phishy_token = domain
                        .split(['.', '-'])
                        .any(|token| PHISHY_HOST_KEYWORDS.contains(&token));
                    if has_phishy_token {
                        phishy_hits.record(domain, m.start(), m.len());
                    }
                }
            }
        }

        // Display-text-vs-href mismatch: anchor text that itself looks
        // like a link but points somewhere else.
        for caps in self.anchor_regex.captures_iter(original) {
            let (Some(href), Some(display)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let href_host = parse_host(href.as_str());
            let display_host = self
                .url_regex
                .find(display.as_str())
                .and_then(|m| parse_host(m.as_str()));
            if let (Some(h), Some(d)) = (href_host, display_host) {
                if h != d {
                    mismatch_hits.record(display.as_str().trim(), display.start(), display.len());
                }
            }
        }

        let mut indicators = Vec::new();
        indicators.extend(ip_hits.into_indicator(
            "ip-literal-url",
            WEIGHT_IP_LITERAL,
            "Suspicious URL: raw IP address link ('{snippet}') hides who runs the site",
        ));
        indicators.extend(mismatch_hits.into_indicator(
            "link-text-mismatch",
            WEIGHT_ANCHOR_MISMATCH,
            "Suspicious URL: link text '{snippet}' does not match its real destination",
        ));
        indicators.extend(shortener_hits.into_indicator(
            "url-shortener",
            WEIGHT_SHORTENER,
            "Suspicious URL: shortened link ('{snippet}') hides the destination",
        ));
        indicators.extend(tld_hits.into_indicator(
            "suspicious-tld",
            WEIGHT_SUSPICIOUS_TLD,
            "Suspicious URL: domain '{snippet}' uses a high-abuse extension",
        ));
        indicators.extend(phishy_hits.into_indicator(
            "phishy-domain",
            WEIGHT_PHISHY_HOST,
            "Suspicious URL: look-alike login wording in domain '{snippet}'",
        ));
        indicators
    }
}

#[derive(Debug, PartialEq, Eq)]
enum HostShape {
    Ip(String),
    Domain(String),
}

fn parse_host(candidate: &str) -> Option<HostShape> {
    let lower = candidate.to_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        lower
    } else {
        format!("http://{lower}")
    };
    let parsed = Url::parse(&with_scheme).ok()?;
    match parsed.host()? {
        Host::Ipv4(addr) => Some(HostShape::Ip(addr.to_string())),
        Host::Ipv6(addr) => Some(HostShape::Ip(addr.to_string())),
        Host::Domain(domain) => Some(HostShape::Domain(domain.to_string())),
    }
}
