//! Core data models for the insight pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::severity::{Severity, SeverityThresholds};

/// One normalized anti-pattern finding for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub service: String,
    /// Detector label, verbatim
    pub name: String,
    pub count: u64,
    pub severity: Severity,
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
}

impl Insight {
    /// Build an insight classified with the default thresholds
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        count: u64,
        date: NaiveDate,
    ) -> Self {
        Self::classified(service, name, count, date, &SeverityThresholds::default())
    }

    pub fn classified(
        service: impl Into<String>,
        name: impl Into<String>,
        count: u64,
        date: NaiveDate,
        thresholds: &SeverityThresholds,
    ) -> Self {
        let count = count.max(1);
        Self {
            service: service.into(),
            name: name.into(),
            count,
            severity: thresholds.classify(count),
            date,
        }
    }
}

/// How a single detector fared during one refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectorOutcome {
    Succeeded { insights: usize },
    /// Valid response with no findings under the result key
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorReport {
    pub label: String,
    #[serde(flatten)]
    pub outcome: DetectorOutcome,
    pub latency_ms: u64,
}

impl DetectorReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DetectorOutcome::Failed { .. })
    }
}

/// Settled result of one full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub insights: Vec<Insight>,
    pub reports: Vec<DetectorReport>,
    pub fetched_on: NaiveDate,
}

impl RefreshOutcome {
    pub fn failed_detectors(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.label.as_str())
            .collect()
    }
}
