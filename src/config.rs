use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scoring and classification constants for the analysis engine.
///
/// Everything that used to live as scattered literals in the detector is
/// collected here and passed in at engine construction, so tests can run
/// with varied thresholds without touching process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Aggregate score at or above which a message is classified SCAM.
    #[serde(default = "default_scam_threshold")]
    pub scam_threshold: f64,
    /// Aggregate score at or above which a message is classified SUSPICIOUS.
    #[serde(default = "default_suspicious_threshold")]
    pub suspicious_threshold: f64,
    /// Pivot of the saturating curve `100 * (1 - exp(-weight / pivot))`.
    /// Smaller values saturate faster.
    #[serde(default = "default_saturation_pivot")]
    pub saturation_pivot: f64,
    /// Messages longer than this are rejected before extraction.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_scam_threshold() -> f64 {
    70.0
}

fn default_suspicious_threshold() -> f64 {
    40.0
}

fn default_saturation_pivot() -> f64 {
    25.0
}

fn default_max_message_chars() -> usize {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scam_threshold: default_scam_threshold(),
            suspicious_threshold: default_suspicious_threshold(),
            saturation_pivot: default_saturation_pivot(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suspicious_threshold <= 0.0 || self.suspicious_threshold >= 100.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "suspicious_threshold must be in (0, 100), got {}",
                    self.suspicious_threshold
                ),
            });
        }
        if self.scam_threshold <= self.suspicious_threshold || self.scam_threshold >= 100.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "scam_threshold must be in (suspicious_threshold, 100), got {}",
                    self.scam_threshold
                ),
            });
        }
        if self.saturation_pivot <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "saturation_pivot must be positive, got {}",
                    self.saturation_pivot
                ),
            });
        }
        if self.max_message_chars == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_message_chars must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum number of detection records kept for analytics.
    #[serde(default = "default_analytics_capacity")]
    pub analytics_capacity: usize,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_analytics_capacity() -> usize {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            analytics_capacity: default_analytics_capacity(),
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Optional YAML rule table overriding the compiled-in defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<String>,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: AppConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_string(),
                source,
            })?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            log::info!("config file {path} not found, using built-in defaults");
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.suspicious_threshold < config.scam_threshold);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let config = EngineConfig {
            scam_threshold: 30.0,
            suspicious_threshold: 40.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_pivot() {
        let config = EngineConfig {
            saturation_pivot: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_thresholds() {
        let config = AppConfig::default();
        let yaml = config.to_yaml();
        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.engine.scam_threshold, config.engine.scam_threshold);
        assert_eq!(parsed.server.listen, config.server.listen);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed: AppConfig = serde_yaml::from_str("engine:\n  scam_threshold: 80.0\n").unwrap();
        assert_eq!(parsed.engine.scam_threshold, 80.0);
        assert_eq!(parsed.engine.suspicious_threshold, 40.0);
    }
}
