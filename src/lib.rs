pub mod analytics;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod explanation;
pub mod extractor;
pub mod normalizer;
pub mod rules;
pub mod scoring;

pub use analytics::{AnalyticsTracker, StatisticsReport, ThreatIntelligenceReport};
pub use config::{AppConfig, EngineConfig, ServerConfig};
pub use engine::{AnalysisEngine, AnalysisResult};
pub use error::{AnalysisError, ConfigError};
pub use extractor::{Indicator, MatchSpan};
pub use rules::{Category, RuleSet, RuleSpec};
pub use scoring::Classification;
