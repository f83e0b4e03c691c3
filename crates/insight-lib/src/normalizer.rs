//! Payload normalization
//!
//! Converts each detector's raw findings into uniform [`Insight`] records.
//! Missing or malformed fields fall back to the documented defaults (subject
//! `"Unknown"`, count `1`) instead of failing.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::catalog::{DetectorSpec, FieldPriority, UNKNOWN_SUBJECT};
use crate::detector::RawPayload;
use crate::models::Insight;
use crate::severity::SeverityThresholds;

/// Count used when no candidate field resolves
pub const DEFAULT_COUNT: u64 = 1;

/// Normalizes detector payloads for one aggregation run
///
/// The processing date is fixed at construction so that every insight
/// produced within a run carries the same stamp.
#[derive(Debug, Clone)]
pub struct Normalizer {
    today: NaiveDate,
    thresholds: SeverityThresholds,
}

impl Normalizer {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            thresholds: SeverityThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: SeverityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Normalize one detector's payload using its own field priorities
    pub fn normalize(&self, spec: &DetectorSpec, payload: &RawPayload) -> Vec<Insight> {
        self.normalize_with(spec.label, payload, &spec.fields)
    }

    pub fn normalize_with(
        &self,
        label: &str,
        payload: &RawPayload,
        fields: &FieldPriority,
    ) -> Vec<Insight> {
        match payload {
            RawPayload::Empty => Vec::new(),
            RawPayload::Sequence(items) => items
                .iter()
                .map(|item| {
                    let (service, count) = resolve_sequence_item(item, fields);
                    self.insight(service, label, count)
                })
                .collect(),
            RawPayload::Mapping(map) => map
                .iter()
                .map(|(service, detail)| {
                    let count = detail
                        .as_object()
                        .and_then(|obj| resolve_count(obj, fields.mapping_count))
                        .unwrap_or(DEFAULT_COUNT);
                    self.insight(service.clone(), label, count)
                })
                .collect(),
        }
    }

    fn insight(&self, service: String, label: &str, count: u64) -> Insight {
        Insight::classified(service, label, count, self.today, &self.thresholds)
    }
}

/// Normalize with the default field priorities and thresholds
pub fn normalize(label: &str, payload: &RawPayload, today: NaiveDate) -> Vec<Insight> {
    Normalizer::new(today).normalize_with(label, payload, &FieldPriority::default())
}

fn resolve_sequence_item(item: &Value, fields: &FieldPriority) -> (String, u64) {
    match item {
        Value::Object(obj) => {
            let service = resolve_subject(obj, fields.subject)
                .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string());
            let count = resolve_count(obj, fields.sequence_count).unwrap_or(DEFAULT_COUNT);
            (service, count)
        }
        // Some detectors list bare subject names
        Value::String(name) if !name.is_empty() => (name.clone(), DEFAULT_COUNT),
        _ => (UNKNOWN_SUBJECT.to_string(), DEFAULT_COUNT),
    }
}

/// First candidate holding a non-empty string
fn resolve_subject(obj: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|field| match obj.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// First candidate holding a positive magnitude
fn resolve_count(obj: &Map<String, Value>, candidates: &[&str]) -> Option<u64> {
    candidates
        .iter()
        .find_map(|field| obj.get(*field).and_then(magnitude))
}

/// Positive numeric value (or numeric string), floored to at least 1
fn magnitude(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if n.is_finite() && n > 0.0 {
        Some((n.floor() as u64).max(1))
    } else {
        None
    }
}
