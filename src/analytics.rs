use crate::engine::AnalysisResult;
use crate::scoring::Classification;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One detection, stripped of message content: only the hash, length and
/// triggered rule names are retained, so the log holds nothing to
/// anonymize.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRecord {
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    pub risk_score: f64,
    pub triggered_rules: Vec<String>,
    pub message_hash: String,
    pub message_length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionSummary {
    pub scam_count: usize,
    pub suspicious_count: usize,
    pub safe_count: usize,
    pub scam_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AverageRiskScores {
    pub overall: f64,
    pub scams_only: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternCount {
    pub pattern: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub time_period_hours: u32,
    pub total_messages_analyzed: usize,
    pub detection_summary: DetectionSummary,
    pub average_risk_scores: AverageRiskScores,
    pub top_patterns: Vec<PatternCount>,
    pub trend: Trend,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergingPattern {
    pub pattern: String,
    pub recent_count: usize,
    pub previous_count: usize,
    pub change_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatIntelligenceReport {
    pub report_generated: DateTime<Utc>,
    pub scams_last_24h: usize,
    pub scams_last_7d: usize,
    pub scam_rate_24h: f64,
    pub average_risk_score_24h: f64,
    pub top_threats: Vec<PatternCount>,
    pub emerging_threats: Vec<EmergingPattern>,
    pub trend: Trend,
    pub recommendations: Vec<String>,
}

const TOP_PATTERN_LIMIT: usize = 10;
const EMERGING_LIMIT: usize = 5;
// Growth factor over the previous window that marks a pattern emerging.
const EMERGING_GROWTH_FACTOR: f64 = 1.5;

/// Bounded rolling log of past detections. External collaborator of the
/// engine: it consumes `AnalysisResult`s and never feeds anything back
/// into classification.
#[derive(Debug)]
pub struct AnalyticsTracker {
    records: Mutex<VecDeque<DetectionRecord>>,
    capacity: usize,
}

impl AnalyticsTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, result: &AnalysisResult, message_length: usize) {
        self.push(DetectionRecord {
            timestamp: result.analyzed_at,
            classification: result.classification,
            risk_score: result.risk_score,
            triggered_rules: result.triggered_rules.clone(),
            message_hash: result.message_hash.clone(),
            message_length,
        });
    }

    fn push(&self, record: DetectionRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics over the trailing `hours` window.
    pub fn statistics(&self, hours: u32) -> StatisticsReport {
        let now = Utc::now();
        let recent = self.records_between(now - Duration::hours(hours as i64), now);
        self.statistics_for(&recent, hours, now)
    }

    fn statistics_for(
        &self,
        recent: &[DetectionRecord],
        hours: u32,
        generated_at: DateTime<Utc>,
    ) -> StatisticsReport {
        let total = recent.len();
        let scam_count = count_class(recent, Classification::Scam);
        let suspicious_count = count_class(recent, Classification::Suspicious);
        let safe_count = count_class(recent, Classification::Safe);

        let scam_percentage = if total > 0 {
            round2(scam_count as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        let overall = mean(recent.iter().map(|r| r.risk_score));
        let scams_only = mean(
            recent
                .iter()
                .filter(|r| r.classification == Classification::Scam)
                .map(|r| r.risk_score),
        );

        StatisticsReport {
            time_period_hours: hours,
            total_messages_analyzed: total,
            detection_summary: DetectionSummary {
                scam_count,
                suspicious_count,
                safe_count,
                scam_percentage,
            },
            average_risk_scores: AverageRiskScores {
                overall: round2(overall),
                scams_only: round2(scams_only),
            },
            top_patterns: top_patterns(recent, TOP_PATTERN_LIMIT),
            trend: scam_trend(recent),
            generated_at,
        }
    }

    /// Threat intelligence: the last 24 hours against the preceding 24,
    /// plus a 7-day baseline.
    pub fn threat_intelligence(&self) -> ThreatIntelligenceReport {
        let now = Utc::now();
        let last_24h = self.records_between(now - Duration::hours(24), now);
        let previous_24h =
            self.records_between(now - Duration::hours(48), now - Duration::hours(24));
        let last_7d = self.records_between(now - Duration::hours(168), now);

        let stats_24h = self.statistics_for(&last_24h, 24, now);
        let emerging = emerging_patterns(&last_24h, &previous_24h);
        let recommendations = threat_recommendations(&stats_24h, &emerging);

        ThreatIntelligenceReport {
            report_generated: now,
            scams_last_24h: stats_24h.detection_summary.scam_count,
            scams_last_7d: count_class(&last_7d, Classification::Scam),
            scam_rate_24h: stats_24h.detection_summary.scam_percentage,
            average_risk_score_24h: stats_24h.average_risk_scores.overall,
            top_threats: stats_24h.top_patterns.iter().take(5).cloned().collect(),
            emerging_threats: emerging,
            trend: stats_24h.trend,
            recommendations,
        }
    }

    fn records_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DetectionRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .filter(|r| r.timestamp > from && r.timestamp <= to)
            .cloned()
            .collect()
    }
}

fn count_class(records: &[DetectionRecord], class: Classification) -> usize {
    records
        .iter()
        .filter(|r| r.classification == class)
        .count()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rule names ranked by how often they fired in flagged messages.
fn top_patterns(records: &[DetectionRecord], limit: usize) -> Vec<PatternCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if record.classification == Classification::Safe {
            continue;
        }
        for rule in &record.triggered_rules {
            *counts.entry(rule.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<PatternCount> = counts
        .into_iter()
        .map(|(pattern, count)| PatternCount {
            pattern: pattern.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.pattern.cmp(&b.pattern)));
    ranked.truncate(limit);
    ranked
}

/// Compares scam volume between the older and newer half of the window.
fn scam_trend(records: &[DetectionRecord]) -> Trend {
    let mut scams: Vec<&DetectionRecord> = records
        .iter()
        .filter(|r| r.classification == Classification::Scam)
        .collect();
    if records.len() < 4 {
        return Trend::InsufficientData;
    }
    scams.sort_by_key(|r| r.timestamp);

    let mut ordered: Vec<&DetectionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);
    let midpoint = ordered[ordered.len() / 2].timestamp;

    let first_half = scams.iter().filter(|r| r.timestamp < midpoint).count() as f64;
    let second_half = scams.len() as f64 - first_half;

    if second_half > first_half * 1.2 {
        Trend::Increasing
    } else if second_half < first_half * 0.8 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

fn emerging_patterns(
    recent: &[DetectionRecord],
    previous: &[DetectionRecord],
) -> Vec<EmergingPattern> {
    let recent_counts = top_patterns(recent, usize::MAX);
    let previous_counts: HashMap<String, usize> = top_patterns(previous, usize::MAX)
        .into_iter()
        .map(|p| (p.pattern, p.count))
        .collect();

    let mut emerging = Vec::new();
    for entry in recent_counts {
        let previous_count = previous_counts.get(&entry.pattern).copied().unwrap_or(0);
        let is_new = previous_count == 0;
        let grew = entry.count as f64 > previous_count as f64 * EMERGING_GROWTH_FACTOR;
        if is_new || grew {
            let change_percentage = (entry.count as f64 - previous_count as f64)
                / (previous_count.max(1) as f64)
                * 100.0;
            emerging.push(EmergingPattern {
                pattern: entry.pattern,
                recent_count: entry.count,
                previous_count,
                change_percentage: round2(change_percentage),
            });
        }
    }
    emerging.sort_by(|a, b| {
        b.change_percentage
            .partial_cmp(&a.change_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    emerging.truncate(EMERGING_LIMIT);
    emerging
}

fn threat_recommendations(
    stats: &StatisticsReport,
    emerging: &[EmergingPattern],
) -> Vec<String> {
    let mut recs = Vec::new();
    if stats.detection_summary.scam_percentage > 30.0 {
        recs.push("High scam activity in the last 24 hours - increase user awareness".to_string());
    }
    if let Some(top) = emerging.first() {
        recs.push(format!(
            "Emerging pattern '{}' is growing quickly ({} recent detections)",
            top.pattern, top.recent_count
        ));
    }
    if let Some(top) = stats.top_patterns.first() {
        recs.push(format!(
            "Most frequent signal: '{}' ({} detections)",
            top.pattern, top.count
        ));
    }
    if recs.is_empty() {
        recs.push("No notable threat activity in the last 24 hours".to_string());
    }
    recs
}
