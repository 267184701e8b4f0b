use crate::config::EngineConfig;
use crate::error::{AnalysisError, ConfigError};
use crate::explanation;
use crate::extractor::{IndicatorExtractor, MatchSpan};
use crate::normalizer::MessageText;
use crate::rules::RuleSet;
use crate::scoring::{self, Classification};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The complete analysis of one message. Immutable once constructed;
/// exactly one per request. `triggered_rules` and `message_hash` exist so
/// downstream aggregation can key on results without seeing message text.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    pub risk_score: f64,
    pub explanation: Vec<String>,
    pub highlighted_keywords: Vec<String>,
    pub keyword_spans: Vec<MatchSpan>,
    pub safety_recommendations: Vec<String>,
    pub triggered_rules: Vec<String>,
    pub message_hash: String,
    pub analyzed_at: DateTime<Utc>,
}

/// The stateless analysis engine: normalize, extract, aggregate,
/// classify, explain. Holds only the compiled rule table and the scoring
/// configuration; safe to share behind an `Arc` across workers.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: EngineConfig,
    extractor: IndicatorExtractor,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig, rules: RuleSet) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            extractor: IndicatorExtractor::new(rules),
        })
    }

    /// Default configuration and the compiled-in rule table.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), RuleSet::with_defaults())
            .expect("default configuration is valid")
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        self.extractor.rules()
    }

    /// Analyzes one message. Deterministic apart from the timestamp;
    /// repeated calls with the same text produce identical results.
    pub fn analyze(&self, message: &str) -> Result<AnalysisResult, AnalysisError> {
        let text = MessageText::new(message, self.config.max_message_chars)?;

        let mut indicators = self.extractor.extract(&text);
        // Presentation order is category priority, not extractor order.
        indicators.sort_by_key(|i| i.category.priority());

        let score = scoring::aggregate_score(&indicators, &self.config);
        let classification = scoring::classify(score, &indicators, &self.config);
        let narrative = explanation::build(&indicators, classification);

        log::debug!(
            "analyzed message hash={} indicators={} score={score:.2} class={classification}",
            short_hash(message),
            indicators.len(),
        );

        Ok(AnalysisResult {
            classification,
            risk_score: round2(score),
            explanation: narrative.explanation,
            highlighted_keywords: narrative.highlighted_keywords,
            keyword_spans: narrative.keyword_spans,
            safety_recommendations: narrative.safety_recommendations,
            triggered_rules: indicators.iter().map(|i| i.rule_name.clone()).collect(),
            message_hash: short_hash(message),
            analyzed_at: Utc::now(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First 16 hex characters of the SHA-256 of the raw message.
fn short_hash(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(16);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AnalysisEngine {
        AnalysisEngine::with_defaults()
    }

    fn has_keyword(result: &AnalysisResult, keyword: &str) -> bool {
        result
            .highlighted_keywords
            .iter()
            .any(|k| k.to_lowercase().contains(&keyword.to_lowercase()))
    }

    fn mentions(result: &AnalysisResult, fragment: &str) -> bool {
        result
            .explanation
            .iter()
            .any(|line| line.to_lowercase().contains(fragment))
    }

    #[test]
    fn scam_scenario_bank_suspension_with_shortener() {
        let result = engine()
            .analyze(
                "URGENT! Your bank account will be suspended in 24 hours. \
                 Click here to verify: bit.ly/xyz123",
            )
            .unwrap();

        assert_eq!(result.classification, Classification::Scam);
        assert!(result.risk_score >= 70.0);
        assert!(mentions(&result, "urgency"));
        assert!(mentions(&result, "threat"));
        assert!(mentions(&result, "shortened link"));
        assert!(has_keyword(&result, "urgent"));
        assert!(has_keyword(&result, "suspended"));
        assert!(has_keyword(&result, "bit.ly"));
    }

    #[test]
    fn suspicious_scenario_vague_account_alert() {
        let result = engine()
            .analyze(
                "Dear customer, we noticed unusual activity on your account. \
                 Please confirm your recent transaction by clicking the link below.",
            )
            .unwrap();

        assert_eq!(result.classification, Classification::Suspicious);
        assert!(result.risk_score >= 40.0 && result.risk_score < 70.0);
        assert!(!result
            .triggered_rules
            .iter()
            .any(|r| r.starts_with("secret")));
    }

    #[test]
    fn safe_scenario_shipping_notification() {
        let result = engine()
            .analyze(
                "Your order #12345 has been shipped and will arrive on Monday. \
                 Track your package at amazon.com/orders",
            )
            .unwrap();

        assert_eq!(result.classification, Classification::Safe);
        assert!(result.risk_score < 40.0);
        assert!(result.triggered_rules.is_empty());
        assert!(!result.safety_recommendations.is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            engine().analyze(""),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn otp_request_is_at_least_suspicious() {
        let result = engine().analyze("Please share your OTP to confirm").unwrap();
        assert!(result.classification >= Classification::Suspicious);
        assert!(has_keyword(&result, "otp"));
    }

    #[test]
    fn analysis_is_deterministic_modulo_timestamp() {
        let engine = engine();
        let message = "URGENT: verify your bank account at bit.ly/x now";
        let a = engine.analyze(message).unwrap();
        let b = engine.analyze(message).unwrap();

        assert_eq!(a.classification, b.classification);
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.explanation, b.explanation);
        assert_eq!(a.highlighted_keywords, b.highlighted_keywords);
        assert_eq!(a.keyword_spans, b.keyword_spans);
        assert_eq!(a.safety_recommendations, b.safety_recommendations);
        assert_eq!(a.triggered_rules, b.triggered_rules);
        assert_eq!(a.message_hash, b.message_hash);
    }

    #[test]
    fn adding_an_indicator_never_lowers_the_score() {
        let engine = engine();
        let base = engine.analyze("We noticed unusual activity today").unwrap();
        let extended = engine
            .analyze("We noticed unusual activity today, share your OTP")
            .unwrap();
        assert!(extended.risk_score >= base.risk_score);
    }

    #[test]
    fn adversarial_repetition_saturates_within_bounds() {
        let engine = engine();
        let message =
            "urgent act now you have won claim your prize share your OTP lottery ".repeat(60);
        let result = engine.analyze(&message).unwrap();
        assert!(result.risk_score <= 100.0);
        assert_eq!(result.classification, Classification::Scam);
    }

    #[test]
    fn repeated_single_keyword_stays_safe() {
        let result = engine().analyze(&"urgent ".repeat(400)).unwrap();
        assert!(result.risk_score < 40.0);
        assert_eq!(result.classification, Classification::Safe);
    }

    #[test]
    fn explanations_are_ordered_by_category_priority() {
        let result = engine()
            .analyze("urgent: share your OTP or face legal action")
            .unwrap();
        // sensitive-data first, then threat, then urgency.
        let secret_pos = result
            .triggered_rules
            .iter()
            .position(|r| r == "secret-mention")
            .unwrap();
        let threat_pos = result
            .triggered_rules
            .iter()
            .position(|r| r == "legal-action")
            .unwrap();
        let urgency_pos = result
            .triggered_rules
            .iter()
            .position(|r| r == "urgent")
            .unwrap();
        assert!(secret_pos < threat_pos);
        assert!(threat_pos < urgency_pos);
    }

    #[test]
    fn custom_config_moves_the_boundaries() {
        let strict = AnalysisEngine::new(
            EngineConfig {
                suspicious_threshold: 20.0,
                scam_threshold: 40.0,
                ..EngineConfig::default()
            },
            RuleSet::with_defaults(),
        )
        .unwrap();
        let result = strict
            .analyze("We noticed unusual activity on your account")
            .unwrap();
        // 45 points under the default curve: SCAM with the strict config.
        assert_eq!(result.classification, Classification::Scam);
    }

    #[test]
    fn message_hash_is_stable_and_short() {
        let engine = engine();
        let result = engine.analyze("hello there, how are you").unwrap();
        assert_eq!(result.message_hash.len(), 16);
        assert!(result.message_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn serialized_result_has_wire_field_names() {
        let result = engine().analyze("share your OTP now").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("classification").is_some());
        assert!(json.get("risk_score").is_some());
        assert!(json.get("explanation").is_some());
        assert!(json.get("highlighted_keywords").is_some());
        assert!(json.get("safety_recommendations").is_some());
        assert!(json.get("analyzed_at").is_some());
        assert_eq!(json["classification"], "SUSPICIOUS");
    }
}
