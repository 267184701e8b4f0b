use crate::config::EngineConfig;
use crate::extractor::Indicator;
use crate::rules::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete output label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Safe,
    Suspicious,
    Scam,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Safe => "SAFE",
            Classification::Suspicious => "SUSPICIOUS",
            Classification::Scam => "SCAM",
        };
        f.write_str(s)
    }
}

/// Sums distinct matched rule weights and applies the saturating curve
/// `100 * (1 - exp(-w / pivot))`.
///
/// Monotone in the total weight and bounded to [0, 100): adding an
/// indicator never decreases the score, and an adversarial pile of
/// matches saturates instead of overflowing. Zero matches score 0.
pub fn aggregate_score(indicators: &[Indicator], config: &EngineConfig) -> f64 {
    let total_weight: f64 = indicators.iter().map(|i| i.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let score = 100.0 * (1.0 - (-total_weight / config.saturation_pivot).exp());
    score.clamp(0.0, 100.0)
}

/// Pure function of the aggregate score and the category flags.
///
/// A sensitive-data indicator floors the result at SUSPICIOUS: one
/// unambiguous signal must never be diluted into SAFE by the curve.
pub fn classify(score: f64, indicators: &[Indicator], config: &EngineConfig) -> Classification {
    let by_score = if score >= config.scam_threshold {
        Classification::Scam
    } else if score >= config.suspicious_threshold {
        Classification::Suspicious
    } else {
        Classification::Safe
    };

    let has_sensitive = indicators
        .iter()
        .any(|i| i.category == Category::SensitiveData);
    if has_sensitive {
        by_score.max(Classification::Suspicious)
    } else {
        by_score
    }
}
