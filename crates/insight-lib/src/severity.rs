//! Severity classification for normalized insights
//!
//! Severity is assigned once, when an insight is created. Changing the
//! thresholds afterwards has no effect on existing insights until
//! [`reclassify`] is run over them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Insight;

/// Discrete severity of an insight's magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Fixed dataset order used by severity charts
    pub const DESCENDING: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    /// Classify a count with the default thresholds
    pub fn classify(count: u64) -> Self {
        SeverityThresholds::default().classify(count)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) for the medium and high severity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub medium: u64,
    pub high: u64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self { medium: 5, high: 10 }
    }
}

impl SeverityThresholds {
    pub fn new(medium: u64, high: u64) -> Self {
        Self { medium, high }
    }

    pub fn classify(&self, count: u64) -> Severity {
        if count >= self.high {
            Severity::High
        } else if count >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Re-run classification over existing insights after a threshold change
pub fn reclassify(insights: &[Insight], thresholds: &SeverityThresholds) -> Vec<Insight> {
    insights
        .iter()
        .map(|insight| Insight {
            severity: thresholds.classify(insight.count),
            ..insight.clone()
        })
        .collect()
}
