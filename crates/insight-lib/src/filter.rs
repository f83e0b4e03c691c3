//! Selection state and insight filtering

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::Insight;

/// Chosen services and pattern labels
///
/// An empty set places no restriction on its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub services: BTreeSet<String>,
    #[serde(default)]
    pub patterns: BTreeSet<String>,
}

impl Selection {
    pub fn new<S, P>(services: S, patterns: P) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.patterns.is_empty()
    }

    pub fn matches(&self, insight: &Insight) -> bool {
        (self.services.is_empty() || self.services.contains(&insight.service))
            && (self.patterns.is_empty() || self.patterns.contains(&insight.name))
    }

    /// Fill each still-empty set with every value observed in `insights`
    ///
    /// Returns true if anything was populated.
    pub fn populate_defaults(&mut self, insights: &[Insight]) -> bool {
        let mut populated = false;
        if self.services.is_empty() {
            self.services = distinct_services(insights).into_iter().collect();
            populated |= !self.services.is_empty();
        }
        if self.patterns.is_empty() {
            self.patterns = distinct_patterns(insights).into_iter().collect();
            populated |= !self.patterns.is_empty();
        }
        populated
    }

    /// Drop selected values that no longer occur in `insights`
    pub fn retain_known(&mut self, insights: &[Insight]) {
        let services: BTreeSet<_> = insights.iter().map(|i| i.service.as_str()).collect();
        let patterns: BTreeSet<_> = insights.iter().map(|i| i.name.as_str()).collect();
        self.services.retain(|s| services.contains(s.as_str()));
        self.patterns.retain(|p| patterns.contains(p.as_str()));
    }

    /// Selected values that do not occur in `insights`, services first
    pub fn unknown_values(&self, insights: &[Insight]) -> Vec<String> {
        let services: BTreeSet<_> = insights.iter().map(|i| i.service.as_str()).collect();
        let patterns: BTreeSet<_> = insights.iter().map(|i| i.name.as_str()).collect();
        self.services
            .iter()
            .filter(|s| !services.contains(s.as_str()))
            .chain(self.patterns.iter().filter(|p| !patterns.contains(p.as_str())))
            .cloned()
            .collect()
    }
}

/// Insights passing the selection, in their original order
pub fn filter(insights: &[Insight], selection: &Selection) -> Vec<Insight> {
    insights
        .iter()
        .filter(|insight| selection.matches(insight))
        .cloned()
        .collect()
}

/// Distinct services in first-seen order
pub fn distinct_services(insights: &[Insight]) -> Vec<String> {
    distinct(insights.iter().map(|i| i.service.as_str()))
}

/// Distinct pattern labels in first-seen order
pub fn distinct_patterns(insights: &[Insight]) -> Vec<String> {
    distinct(insights.iter().map(|i| i.name.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn insight(service: &str, name: &str, count: u64) -> Insight {
        Insight::new(
            service,
            name,
            count,
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        )
    }

    fn sample() -> Vec<Insight> {
        vec![
            insight("orders", "Chatty Services", 12),
            insight("payments", "Chatty Services", 3),
            insight("orders", "Fan-In Overload", 7),
            insight("gateway", "Improper API Gateway Usage", 1),
        ]
    }

    #[test]
    fn test_empty_selection_passes_everything() {
        let insights = sample();
        assert_eq!(filter(&insights, &Selection::default()), insights);
    }

    #[test]
    fn test_filter_by_both_dimensions() {
        let insights = sample();
        let selection = Selection::new(["orders"], ["Chatty Services"]);
        let filtered = filter(&insights, &selection);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].service, "orders");
        assert_eq!(filtered[0].count, 12);
    }

    #[test]
    fn test_filter_one_dimension() {
        let insights = sample();
        let selection = Selection::new(Vec::<String>::new(), ["Chatty Services"]);
        assert_eq!(filter(&insights, &selection).len(), 2);

        let selection = Selection::new(["orders", "gateway"], Vec::<String>::new());
        assert_eq!(filter(&insights, &selection).len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let insights = sample();
        let selections = [
            Selection::default(),
            Selection::new(["orders"], Vec::<String>::new()),
            Selection::new(["payments", "orders"], ["Chatty Services"]),
            Selection::new(["nobody"], ["nothing"]),
        ];

        for selection in &selections {
            let once = filter(&insights, selection);
            let twice = filter(&once, selection);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_superset_selection_changes_nothing() {
        let insights = sample();
        let narrow = Selection::new(["orders"], ["Chatty Services"]);
        let wide = Selection::new(["orders", "payments"], ["Chatty Services", "Fan-In Overload"]);

        let once = filter(&insights, &narrow);
        assert_eq!(filter(&once, &wide), once);
    }

    #[test]
    fn test_enlarging_selection_is_monotonic() {
        let insights = sample();
        let steps = [
            Selection::new(["orders"], ["Chatty Services"]),
            Selection::new(["orders", "payments"], ["Chatty Services"]),
            Selection::new(["orders", "payments"], ["Chatty Services", "Fan-In Overload"]),
            Selection::new(
                ["orders", "payments", "gateway"],
                ["Chatty Services", "Fan-In Overload", "Improper API Gateway Usage"],
            ),
        ];

        let sizes: Vec<_> = steps.iter().map(|s| filter(&insights, s).len()).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]), "sizes: {:?}", sizes);
        assert_eq!(*sizes.last().unwrap(), insights.len());
    }

    #[test]
    fn test_populate_defaults_only_fills_empty_sets() {
        let insights = sample();
        let mut selection = Selection::new(["orders"], Vec::<String>::new());

        assert!(selection.populate_defaults(&insights));
        assert_eq!(selection.services.len(), 1);
        assert_eq!(selection.patterns.len(), 3);

        let mut empty = Selection::default();
        assert!(!empty.populate_defaults(&[]));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_retain_known() {
        let insights = sample();
        let mut selection = Selection::new(["orders", "retired"], ["Chatty Services", "Gone"]);
        selection.retain_known(&insights);

        assert_eq!(selection, Selection::new(["orders"], ["Chatty Services"]));
    }

    #[test]
    fn test_distinct_keeps_first_seen_order() {
        let insights = sample();
        assert_eq!(
            distinct_services(&insights),
            vec!["orders", "payments", "gateway"]
        );
        assert_eq!(
            distinct_patterns(&insights),
            vec!["Chatty Services", "Fan-In Overload", "Improper API Gateway Usage"]
        );
    }

    #[test]
    fn test_unknown_values() {
        let insights = sample();
        let selection = Selection::new(["orders", "retired"], ["Gone", "Chatty Services"]);
        assert_eq!(selection.unknown_values(&insights), vec!["retired", "Gone"]);
        assert!(Selection::default().unknown_values(&insights).is_empty());
    }
}
