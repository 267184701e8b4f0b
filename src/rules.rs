use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six scam-signal categories, in presentation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    SensitiveData,
    Threat,
    Impersonation,
    Urgency,
    Financial,
    SuspiciousUrl,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::SensitiveData,
        Category::Threat,
        Category::Impersonation,
        Category::Urgency,
        Category::Financial,
        Category::SuspiciousUrl,
    ];

    /// Fixed presentation order: sensitive-data > threat > impersonation >
    /// urgency > financial > URL. Extractor execution order is irrelevant;
    /// explanations are always sorted by this.
    pub fn priority(self) -> u8 {
        match self {
            Category::SensitiveData => 0,
            Category::Threat => 1,
            Category::Impersonation => 2,
            Category::Urgency => 3,
            Category::Financial => 4,
            Category::SuspiciousUrl => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::SensitiveData => "sensitive-data",
            Category::Threat => "threat",
            Category::Impersonation => "impersonation",
            Category::Urgency => "urgency",
            Category::Financial => "financial",
            Category::SuspiciousUrl => "suspicious-url",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One declarative detection rule: a category, a pattern, a weight and a
/// description template. `{snippet}` in the template is replaced with the
/// matched text when explanations are rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub category: Category,
    pub name: String,
    pub pattern: String,
    pub weight: f64,
    pub description: String,
}

/// A rule with its pattern compiled. Compiled once at `RuleSet`
/// construction; only read at request time.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub spec: RuleSpec,
    pub regex: Regex,
}

/// The central rule table the generic extractor interprets.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

impl RuleSet {
    /// Compiled-in default table, mirroring the shipped rule file.
    pub fn with_defaults() -> Self {
        Self::from_specs(default_specs()).expect("built-in rule table compiles")
    }

    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: spec.name,
                    weight: spec.weight,
                });
            }
            let regex = RegexBuilder::new(&spec.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    name: spec.name.clone(),
                    source,
                })?;
            rules.push(PatternRule { spec, regex });
        }
        Ok(Self { rules })
    }

    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let file: RuleFile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_string(),
                source,
            })?;
        Self::from_specs(file.rules)
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn rules_for(&self, category: Category) -> impl Iterator<Item = &PatternRule> {
        self.rules
            .iter()
            .filter(move |r| r.spec.category == category)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn rule(category: Category, name: &str, pattern: &str, weight: f64, description: &str) -> RuleSpec {
    RuleSpec {
        category,
        name: name.to_string(),
        pattern: pattern.to_string(),
        weight,
        description: description.to_string(),
    }
}

/// The default detection table. Sensitive-data rules carry the single
/// highest per-match weight; a rule counts once no matter how often its
/// pattern repeats in one message.
pub fn default_specs() -> Vec<RuleSpec> {
    vec![
        // Sensitive-data requests. A bare mention of an unambiguous secret
        // (OTP, CVV) is enough; generic words like "password" need a
        // request verb nearby to avoid flagging routine advice.
        rule(
            Category::SensitiveData,
            "secret-mention",
            r"\b(otp|cvv|one[\s-]?time\s+(?:password|passcode|pin|code))\b",
            30.0,
            "Critical data request: mentions '{snippet}' - legitimate services never ask for one-time secrets",
        ),
        rule(
            Category::SensitiveData,
            "secret-request",
            r"\b(?:share|send|enter|provide|give|confirm|reveal|tell)\b[^.!?]{0,30}\b(pin|password|passcode|security\s+code|card\s+number)\b",
            30.0,
            "Critical data request: asks you to hand over your '{snippet}'",
        ),
        // Threat language.
        rule(
            Category::Threat,
            "account-suspension",
            r"\baccount\b[^.!?]{0,30}\b(suspended?|blocked|closed|locked|frozen|deactivated|restricted)\b",
            20.0,
            "Threat language: claims your account will be '{snippet}'",
        ),
        rule(
            Category::Threat,
            "legal-action",
            r"\blegal\s+action\b|\blawsuit\b|\barrest(?:ed)?\b|\bpolice\s+(?:case|complaint|report)\b",
            20.0,
            "Threat language: intimidation with '{snippet}'",
        ),
        rule(
            Category::Threat,
            "unusual-activity",
            r"\b(unusual|suspicious)\s+activity\b",
            15.0,
            "Threat language: vague '{snippet}' alarm, a common pretext",
        ),
        rule(
            Category::Threat,
            "service-termination",
            r"\b(?:service|access|card)\s+will\s+be\s+(terminated|disabled|suspended|blocked)\b",
            18.0,
            "Threat language: warns your service will be '{snippet}'",
        ),
        // Impersonation: a trusted entity name near a trust verb.
        rule(
            Category::Impersonation,
            "entity-verify",
            r"\b(?:your\s+)?(bank|paypal|amazon|apple|microsoft|google|netflix|government|revenue|customs|wallet\s+provider)\b[^.!?]{0,40}\b(?:verify|confirm|update|validate|secure)\b",
            15.0,
            "Impersonation: poses as '{snippet}' and asks you to verify something",
        ),
        rule(
            Category::Impersonation,
            "verify-entity",
            r"\b(?:verify|confirm|update|validate)\b[^.!?]{0,40}\b(bank|paypal|amazon|apple|microsoft|google|netflix|government|wallet)\b",
            15.0,
            "Impersonation: verification demand tied to '{snippet}'",
        ),
        rule(
            Category::Impersonation,
            "account-verification",
            r"\b(?:verify|confirm|validate|re-?activate)\b[^.!?]{0,40}\b(?:your\s+)?(account|identity|transaction|details|credentials|information)\b",
            12.0,
            "Impersonation: unsolicited request to confirm your '{snippet}'",
        ),
        rule(
            Category::Impersonation,
            "click-to-verify",
            r"\bclick\s+(?:here|below|the\s+link)\b[^.!?]{0,30}\b(?:verify|confirm|update|claim)\b",
            15.0,
            "Impersonation: '{snippet}' - verification never happens through message links",
        ),
        rule(
            Category::Impersonation,
            "official-team",
            r"\b(official\s+notice|security\s+(?:team|department|alert)|customer\s+(?:support|service)\s+team)\b",
            12.0,
            "Impersonation: unverifiable '{snippet}' authority claim",
        ),
        // Urgency. Each distinct phrase counts once, not per occurrence.
        rule(
            Category::Urgency,
            "urgent",
            r"\burgent(?:ly)?\b",
            10.0,
            "Urgency pressure: '{snippet}'",
        ),
        rule(
            Category::Urgency,
            "immediately",
            r"\bimmediately\b|\bright\s+(?:now|away)\b",
            10.0,
            "Urgency pressure: demands action '{snippet}'",
        ),
        rule(
            Category::Urgency,
            "act-now",
            r"\bact\s+now\b|\bdo\s+not\s+delay\b",
            10.0,
            "Urgency pressure: '{snippet}'",
        ),
        rule(
            Category::Urgency,
            "expiry",
            r"\bexpir(?:es?|ing|ed)\b",
            10.0,
            "Urgency pressure: artificial expiry ('{snippet}')",
        ),
        rule(
            Category::Urgency,
            "asap",
            r"\basap\b",
            10.0,
            "Urgency pressure: '{snippet}'",
        ),
        rule(
            Category::Urgency,
            "time-window",
            r"\b(?:within|in)\s+(?:the\s+next\s+)?\d+\s*(?:hours?|hrs?|minutes?|mins?|days?)\b",
            10.0,
            "Urgency pressure: artificial deadline '{snippet}'",
        ),
        rule(
            Category::Urgency,
            "final-warning",
            r"\b(?:last|final)\s+(?:chance|warning|notice|reminder)\b",
            10.0,
            "Urgency pressure: '{snippet}'",
        ),
        // Financial manipulation.
        rule(
            Category::Financial,
            "you-have-won",
            r"\b(?:you(?:\s+have)?|you've)\s+(won|been\s+selected)\b|\bcongratulations?\b[^.!?]{0,30}\b(winner|won|prize)\b",
            15.0,
            "Financial bait: unrealistic reward claim ('{snippet}')",
        ),
        rule(
            Category::Financial,
            "claim-prize",
            r"\bclaim\s+your\s+(prize|reward|gift|winnings|cash)\b|\b(lucky\s+draw|lottery|jackpot)\b",
            15.0,
            "Financial bait: prize claim ('{snippet}')",
        ),
        rule(
            Category::Financial,
            "payment-request",
            r"\b(?:send|transfer|pay|wire)\b[^.!?]{0,20}\b(money|fee|fees|charges|amount|deposit)\b|\b(processing\s+fee)\b|\b(clearance\s+charges?)\b",
            15.0,
            "Financial bait: unsolicited payment request ('{snippet}')",
        ),
        rule(
            Category::Financial,
            "investment-bait",
            r"\bguaranteed\s+(?:returns?|profits?)\b|\bdouble\s+your\s+money\b|\brisk[\s-]free\s+investment\b",
            12.0,
            "Financial bait: too-good-to-be-true offer ('{snippet}')",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_compiles() {
        let set = RuleSet::with_defaults();
        assert!(!set.is_empty());
    }

    #[test]
    fn every_pattern_category_is_represented() {
        let set = RuleSet::with_defaults();
        for category in Category::ALL {
            if category == Category::SuspiciousUrl {
                // URL shapes are handled by the URL extractor, not the table.
                continue;
            }
            assert!(
                set.rules_for(category).next().is_some(),
                "no rules for {category}"
            );
        }
    }

    #[test]
    fn sensitive_data_carries_the_highest_weight() {
        let set = RuleSet::with_defaults();
        let max_sensitive = set
            .rules_for(Category::SensitiveData)
            .map(|r| r.spec.weight)
            .fold(0.0f64, f64::max);
        for rule in set.rules() {
            assert!(rule.spec.weight <= max_sensitive, "{}", rule.spec.name);
        }
    }

    #[test]
    fn rejects_non_positive_weight() {
        let specs = vec![rule(Category::Urgency, "bad", r"\bx\b", 0.0, "x")];
        assert!(matches!(
            RuleSet::from_specs(specs),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let specs = vec![rule(Category::Urgency, "bad", r"(unclosed", 5.0, "x")];
        assert!(matches!(
            RuleSet::from_specs(specs),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn patterns_match_case_insensitively() {
        let set = RuleSet::with_defaults();
        let urgent = set
            .rules_for(Category::Urgency)
            .find(|r| r.spec.name == "urgent")
            .unwrap();
        assert!(urgent.regex.is_match("URGENT notice"));
        assert!(urgent.regex.is_match("urgent notice"));
    }

    #[test]
    fn category_priority_order_is_fixed() {
        let priorities: Vec<u8> = Category::ALL.iter().map(|c| c.priority()).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn rule_file_round_trip() {
        let yaml = "rules:\n  - category: urgency\n    name: hurry\n    pattern: '\\bhurry\\b'\n    weight: 10.0\n    description: 'Urgency pressure: {snippet}'\n";
        let file: RuleFile = serde_yaml::from_str(yaml).unwrap();
        let set = RuleSet::from_specs(file.rules).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.rules()[0].regex.is_match("Hurry up"));
    }
}
