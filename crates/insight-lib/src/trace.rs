//! Trace timeline adapter
//!
//! Fetches recorded spans from the trace collector and lays a single trace
//! out as timeline items grouped by calling service.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};
use url::Url;

use crate::detector::ApiClient;
use crate::error::Result;

/// Every span occupies a fixed one-second slot
const SPAN_WIDTH_SECS: i64 = 1;
const NOT_AVAILABLE: &str = "N/A";

/// One recorded inter-service call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    #[serde(deserialize_with = "lenient::string")]
    pub trace_id: String,
    pub span_id: Value,
    #[serde(deserialize_with = "lenient::string")]
    pub source: String,
    #[serde(deserialize_with = "lenient::string")]
    pub destination: String,
    #[serde(deserialize_with = "lenient::optional_string")]
    pub method: Option<String>,
    pub http_status: Option<Value>,
    #[serde(deserialize_with = "lenient::optional_string")]
    pub response: Option<String>,
    pub timestamp: Value,
}

/// Text fields the collector may send as null or as another scalar
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(optional_string(deserializer)?.unwrap_or_default())
    }

    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }
}

impl Span {
    pub fn item_id(&self) -> String {
        format!("{}-{}", self.trace_id, display(&self.span_id))
    }

    /// Start time from an RFC 3339 string or epoch milliseconds
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.timestamp {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|t| t.and_utc())
                }),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            _ => None,
        }
    }
}

/// Spans keyed by trace id
pub type TraceSet = BTreeMap<String, Vec<Span>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub content: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub group: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineGroup {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub items: Vec<TimelineItem>,
    pub groups: Vec<TimelineGroup>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lay spans out on a timeline
///
/// Repeated `{trace_id}-{span_id}` pairs keep their first occurrence.
/// Spans without a readable timestamp are skipped.
pub fn timeline(spans: &[Span]) -> Timeline {
    let mut seen = HashSet::new();
    let mut groups: Vec<TimelineGroup> = Vec::new();
    let mut items = Vec::with_capacity(spans.len());

    for span in spans {
        let id = span.item_id();
        if seen.contains(&id) {
            continue;
        }
        let Some(start) = span.started_at() else {
            warn!(span = %id, timestamp = %span.timestamp, "Skipping span without timestamp");
            continue;
        };
        seen.insert(id.clone());

        if !groups.iter().any(|g| g.id == span.source) {
            groups.push(TimelineGroup {
                id: span.source.clone(),
                content: span.source.clone(),
            });
        }

        items.push(TimelineItem {
            id,
            content: format!("{} → {}", span.source, span.destination),
            start,
            end: start + Duration::seconds(SPAN_WIDTH_SECS),
            group: span.source.clone(),
            title: format!(
                "Method: {} | Status: {} | Response: {}",
                span.method.as_deref().unwrap_or(NOT_AVAILABLE),
                span.http_status
                    .as_ref()
                    .map(display)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                span.response
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .unwrap_or(NOT_AVAILABLE),
            ),
        });
    }

    Timeline { items, groups }
}

/// Shape a `{data: {trace_id: [span]}}` response; missing data is empty
pub fn traces_from_response(body: &Value) -> Result<TraceSet> {
    match body.get("data") {
        Some(data) if !data.is_null() => Ok(serde_json::from_value(data.clone())?),
        _ => Ok(TraceSet::new()),
    }
}

/// Client for the trace collector
#[derive(Debug, Clone)]
pub struct TraceClient {
    client: ApiClient,
    path: String,
}

impl TraceClient {
    /// `traces_url` is the full collector endpoint, e.g. `http://localhost:8085/traces`
    pub fn new(traces_url: &str, timeout: StdDuration) -> Result<Self> {
        let url = Url::parse(traces_url)?;
        let client = ApiClient::with_timeout(&url.origin().ascii_serialization(), timeout)?;
        let path = url.path().trim_start_matches('/').to_string();
        Ok(Self { client, path })
    }

    pub async fn traces(&self) -> Result<TraceSet> {
        let body: Value = self.client.get(&self.path).await?;
        let traces = traces_from_response(&body)?;
        debug!(traces = traces.len(), "Fetched traces");
        Ok(traces)
    }

    /// Timeline of one trace, `None` when the collector does not know it
    pub async fn trace_timeline(&self, trace_id: &str) -> Result<Option<Timeline>> {
        let traces = self.traces().await?;
        Ok(traces.get(trace_id).map(|spans| timeline(spans)))
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => NOT_AVAILABLE.to_string(),
        other => other.to_string(),
    }
}
