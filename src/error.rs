use crate::rules::Category;
use thiserror::Error;

/// Request-time failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The message cannot be analyzed at all. Maps to a client error at
    /// the HTTP boundary; never retried.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A single extractor category faulted (the extraction panic guard
    /// caught it). The engine logs this and continues with zero
    /// indicators for the category; it is never returned from
    /// `AnalysisEngine::analyze`.
    #[error("extraction failed for category {category}: {detail}")]
    Extraction { category: Category, detail: String },
}

impl AnalysisError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Construction-time failures: bad configuration files or rule tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{name}' must have a positive weight (got {weight})")]
    InvalidWeight { name: String, weight: f64 },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}
