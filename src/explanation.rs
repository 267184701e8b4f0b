use crate::extractor::{Indicator, MatchSpan};
use crate::rules::Category;
use crate::scoring::Classification;

/// Human-readable output derived from the matched indicators: ordered
/// explanations, highlight keywords and spans, and safety
/// recommendations. Purely a function of its inputs.
#[derive(Debug, Clone)]
pub struct Narrative {
    pub explanation: Vec<String>,
    pub highlighted_keywords: Vec<String>,
    pub keyword_spans: Vec<MatchSpan>,
    pub safety_recommendations: Vec<String>,
}

/// How many independent rules have to fire before the combined-signals
/// warning is added to the explanation.
const MULTI_FLAG_THRESHOLD: usize = 3;

/// Builds the narrative. `indicators` must already be sorted by category
/// priority (the engine does this); explanation order follows it.
pub fn build(indicators: &[Indicator], classification: Classification) -> Narrative {
    Narrative {
        explanation: explanations(indicators),
        highlighted_keywords: keywords(indicators),
        keyword_spans: spans(indicators),
        safety_recommendations: recommendations(indicators, classification),
    }
}

fn explanations(indicators: &[Indicator]) -> Vec<String> {
    if indicators.is_empty() {
        return vec!["No significant scam indicators detected".to_string()];
    }
    let mut lines: Vec<String> = indicators.iter().map(Indicator::explanation).collect();
    if indicators.len() >= MULTI_FLAG_THRESHOLD {
        lines.push(format!(
            "Multiple red flags: {} independent scam indicators detected together",
            indicators.len()
        ));
    }
    lines
}

/// Unique matched snippets in order of first occurrence in the original
/// text, first-seen casing preserved. Case-insensitive dedup so "URGENT"
/// and "urgent" yield one keyword.
fn keywords(indicators: &[Indicator]) -> Vec<String> {
    let mut by_offset: Vec<&Indicator> = indicators.iter().collect();
    by_offset.sort_by_key(|i| i.first_offset());

    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for indicator in by_offset {
        let folded = indicator.snippet.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(indicator.snippet.clone());
    }
    out
}

fn spans(indicators: &[Indicator]) -> Vec<MatchSpan> {
    let mut all: Vec<MatchSpan> = indicators.iter().flat_map(|i| i.spans.clone()).collect();
    all.sort_by_key(|s| (s.offset, s.length));
    all
}

fn recommendations(indicators: &[Indicator], classification: Classification) -> Vec<String> {
    let mut recs: Vec<String> = match classification {
        Classification::Scam => vec![
            "Do not respond to this message or take any action it asks for".to_string(),
            "Delete the message and block the sender".to_string(),
            "Report it as spam or fraud to your service provider".to_string(),
        ],
        Classification::Suspicious => vec![
            "Treat this message with caution".to_string(),
            "Verify the sender through an official channel before acting".to_string(),
            "Do not click links or share personal information".to_string(),
        ],
        // SAFE still gets a non-empty stay-vigilant list.
        Classification::Safe => vec![
            "No scam indicators found, but always verify unexpected requests independently"
                .to_string(),
        ],
    };

    if indicators
        .iter()
        .any(|i| i.category == Category::SensitiveData)
    {
        recs.push(
            "Never share OTPs, PINs, passwords or card security codes - no legitimate service asks for them".to_string(),
        );
    }
    if indicators
        .iter()
        .any(|i| i.category == Category::SuspiciousUrl)
    {
        recs.push(
            "Do not open shortened or unfamiliar links; type the official address yourself"
                .to_string(),
        );
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MatchSpan;

    fn indicator(
        category: Category,
        rule: &str,
        snippet: &str,
        offset: usize,
        weight: f64,
    ) -> Indicator {
        Indicator::new(
            category,
            rule,
            snippet,
            weight,
            format!("{}: '{{snippet}}'", category.label()),
            vec![MatchSpan {
                offset,
                length: snippet.len(),
                category,
            }],
        )
    }

    #[test]
    fn empty_indicators_yield_minimal_narrative() {
        let narrative = build(&[], Classification::Safe);
        assert_eq!(narrative.explanation.len(), 1);
        assert!(narrative.highlighted_keywords.is_empty());
        assert!(!narrative.safety_recommendations.is_empty());
    }

    #[test]
    fn explanations_follow_indicator_order() {
        // Engine sorts by category priority; builder must not reorder.
        let indicators = vec![
            indicator(Category::SensitiveData, "secret-mention", "OTP", 20, 30.0),
            indicator(Category::Urgency, "urgent", "urgent", 0, 10.0),
        ];
        let narrative = build(&indicators, Classification::Suspicious);
        assert!(narrative.explanation[0].starts_with("sensitive-data"));
        assert!(narrative.explanation[1].starts_with("urgency"));
    }

    #[test]
    fn keywords_are_ordered_by_first_occurrence() {
        let indicators = vec![
            indicator(Category::SensitiveData, "secret-mention", "OTP", 20, 30.0),
            indicator(Category::Urgency, "urgent", "URGENT", 0, 10.0),
        ];
        let narrative = build(&indicators, Classification::Suspicious);
        assert_eq!(narrative.highlighted_keywords, vec!["URGENT", "OTP"]);
    }

    #[test]
    fn keywords_dedup_case_insensitively_keeping_first_casing() {
        let indicators = vec![
            indicator(Category::Urgency, "urgent", "URGENT", 0, 10.0),
            indicator(Category::Urgency, "immediately", "urgent", 30, 10.0),
        ];
        let narrative = build(&indicators, Classification::Safe);
        assert_eq!(narrative.highlighted_keywords, vec!["URGENT"]);
    }

    #[test]
    fn multi_flag_warning_appears_at_three_rules() {
        let indicators = vec![
            indicator(Category::Urgency, "urgent", "urgent", 0, 10.0),
            indicator(Category::Threat, "legal-action", "lawsuit", 10, 20.0),
            indicator(Category::Financial, "claim-prize", "lottery", 20, 15.0),
        ];
        let narrative = build(&indicators, Classification::Scam);
        assert!(narrative
            .explanation
            .last()
            .unwrap()
            .starts_with("Multiple red flags"));
    }

    #[test]
    fn sensitive_data_adds_secret_warning() {
        let indicators = vec![indicator(
            Category::SensitiveData,
            "secret-mention",
            "OTP",
            0,
            30.0,
        )];
        let narrative = build(&indicators, Classification::Suspicious);
        assert!(narrative
            .safety_recommendations
            .iter()
            .any(|r| r.contains("Never share")));
    }

    #[test]
    fn spans_are_sorted_by_offset() {
        let indicators = vec![
            indicator(Category::Threat, "legal-action", "lawsuit", 40, 20.0),
            indicator(Category::Urgency, "urgent", "urgent", 5, 10.0),
        ];
        let narrative = build(&indicators, Classification::Suspicious);
        let offsets: Vec<usize> = narrative.keyword_spans.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![5, 40]);
    }

    #[test]
    fn safe_recommendations_are_never_empty() {
        let narrative = build(&[], Classification::Safe);
        assert_eq!(narrative.safety_recommendations.len(), 1);
    }
}
