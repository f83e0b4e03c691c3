//! Chart projections over a filtered insight view
//!
//! Each projection is a pure function of the view and the active pattern
//! labels. An empty view always projects to an empty aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::InsightError;
use crate::filter::{distinct_patterns, distinct_services};
use crate::models::Insight;
use crate::severity::Severity;

/// Dataset colors, assigned by dataset position
const PALETTE: &[&str] = &[
    "#0d9488", "#2563eb", "#9333ea", "#db2777", "#ea580c", "#ca8a04", "#16a34a", "#0891b2",
    "#4f46e5", "#c026d3", "#dc2626", "#65a30d",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    ByServiceByPattern,
    SeverityByPattern,
    PatternDistribution,
    ByServiceByPatternRadar,
    TrendOverTime,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::ByServiceByPattern,
        ChartKind::SeverityByPattern,
        ChartKind::PatternDistribution,
        ChartKind::ByServiceByPatternRadar,
        ChartKind::TrendOverTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::ByServiceByPattern => "by-service-by-pattern",
            ChartKind::SeverityByPattern => "severity-by-pattern",
            ChartKind::PatternDistribution => "pattern-distribution",
            ChartKind::ByServiceByPatternRadar => "by-service-by-pattern-radar",
            ChartKind::TrendOverTime => "trend-over-time",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InsightError::UnknownChartKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<u64>,
    pub color: String,
}

/// Presentation-ready aggregate for one chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartAggregate {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartAggregate {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.datasets.is_empty()
    }
}

/// Project a filtered view into the aggregate for `kind`
pub fn project(view: &[Insight], kind: ChartKind, active_patterns: &[String]) -> ChartAggregate {
    if view.is_empty() {
        return ChartAggregate::default();
    }

    match kind {
        ChartKind::ByServiceByPattern | ChartKind::ByServiceByPatternRadar => {
            by_service_by_pattern(view, active_patterns)
        }
        ChartKind::SeverityByPattern => severity_by_pattern(view),
        ChartKind::PatternDistribution => pattern_distribution(view),
        ChartKind::TrendOverTime => trend_over_time(view, active_patterns),
    }
}

/// Deterministic color for the dataset at `index`
pub fn dataset_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "#dc2626",
        Severity::Medium => "#f59e0b",
        Severity::Low => "#16a34a",
    }
}

fn by_service_by_pattern(view: &[Insight], active_patterns: &[String]) -> ChartAggregate {
    let services = distinct_services(view);

    // First match wins; duplicates are an input-quality issue
    let datasets = active_patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| Dataset {
            label: pattern.clone(),
            data: services
                .iter()
                .map(|service| {
                    view.iter()
                        .find(|i| &i.service == service && &i.name == pattern)
                        .map(|i| i.count)
                        .unwrap_or(0)
                })
                .collect(),
            color: dataset_color(index).to_string(),
        })
        .collect();

    ChartAggregate {
        labels: services,
        datasets,
    }
}

fn severity_by_pattern(view: &[Insight]) -> ChartAggregate {
    let patterns = distinct_patterns(view);

    let datasets = Severity::DESCENDING
        .iter()
        .map(|severity| Dataset {
            label: severity.to_string(),
            data: patterns
                .iter()
                .map(|pattern| {
                    view.iter()
                        .filter(|i| &i.name == pattern && i.severity == *severity)
                        .count() as u64
                })
                .collect(),
            color: severity_color(*severity).to_string(),
        })
        .collect();

    ChartAggregate {
        labels: patterns,
        datasets,
    }
}

fn pattern_distribution(view: &[Insight]) -> ChartAggregate {
    let patterns = distinct_patterns(view);
    let data = patterns
        .iter()
        .map(|pattern| view.iter().filter(|i| &i.name == pattern).count() as u64)
        .collect();

    ChartAggregate {
        labels: patterns,
        datasets: vec![Dataset {
            label: "Insights".to_string(),
            data,
            color: dataset_color(0).to_string(),
        }],
    }
}

fn trend_over_time(view: &[Insight], active_patterns: &[String]) -> ChartAggregate {
    let dates: Vec<_> = view
        .iter()
        .map(|i| i.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let datasets = active_patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| Dataset {
            label: pattern.clone(),
            data: dates
                .iter()
                .map(|date| {
                    view.iter()
                        .filter(|i| i.date == *date && &i.name == pattern)
                        .map(|i| i.count)
                        .sum::<u64>()
                })
                .collect(),
            color: dataset_color(index).to_string(),
        })
        .collect();

    ChartAggregate {
        labels: dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
        datasets,
    }
}
