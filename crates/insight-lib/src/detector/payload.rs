//! Raw detector payload shapes

use serde_json::{Map, Value};

/// A detector's findings, resolved once into one of the supported shapes
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawPayload {
    /// Ordered findings, each naming its subject in a field
    Sequence(Vec<Value>),
    /// Findings keyed by subject name
    Mapping(Map<String, Value>),
    /// Absent, null, or neither shape
    #[default]
    Empty,
}

impl RawPayload {
    /// Pull the findings stored under `result_key` out of a response body
    pub fn extract(body: &Value, result_key: &str) -> Self {
        body.get(result_key)
            .map(Self::from_value)
            .unwrap_or_default()
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) if !items.is_empty() => RawPayload::Sequence(items.clone()),
            Value::Object(map) if !map.is_empty() => RawPayload::Mapping(map.clone()),
            _ => RawPayload::Empty,
        }
    }
}
