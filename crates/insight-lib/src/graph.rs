//! Dependency graph adapters
//!
//! Shapes the backend's service dependency graph and weighted dependency
//! graph into the `{nodes, links}` structures consumed by graph renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::detector::ApiClient;
use crate::error::{InsightError, Result};

pub const GRAPH_PATH: &str = "api/graph";
pub const WEIGHTED_GRAPH_PATH: &str = "api/graphs/weight";

const UNKNOWN_SOURCE: &str = "Unknown Source";
const UNKNOWN_TARGET: &str = "Unknown Target";
const UNKNOWN: &str = "Unknown";

/// A service node; attributes beyond `id` pass through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    /// Objects keep every attribute; bare names become `{id}`
    fn from_value(node: &Value) -> Option<Self> {
        match node {
            Value::Object(obj) => {
                let mut extra = obj.clone();
                let id = extra.remove("id").and_then(|id| match id {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
                Some(Self { id, extra })
            }
            Value::String(s) => Some(Self {
                id: Some(s.clone()),
                extra: Map::new(),
            }),
            _ => None,
        }
    }
}

/// A call edge between two services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub method: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub calls: Option<f64>,
    pub avg_duration: Option<f64>,
    pub weight: Option<f64>,
}

/// Service dependency graph in renderer form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphData {
    /// Shape a `{graph: {nodes, links}}` response; a missing graph is empty
    pub fn from_response(body: &Value) -> Self {
        let Some(graph) = body.get("graph") else {
            warn!("Graph response carried no graph");
            return Self::default();
        };

        let nodes = array(graph, "nodes")
            .iter()
            .filter_map(|node| {
                let parsed = GraphNode::from_value(node);
                if parsed.is_none() {
                    warn!(node = %node, "Skipping graph node that is neither an object nor a name");
                }
                parsed
            })
            .collect();

        let links = array(graph, "links")
            .iter()
            .map(|link| GraphLink {
                source: text(link, "source").unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                target: text(link, "target").unwrap_or_else(|| UNKNOWN_TARGET.to_string()),
                method: text(link, "method").unwrap_or_else(|| UNKNOWN.to_string()),
                link_type: text(link, "type").unwrap_or_else(|| UNKNOWN.to_string()),
                calls: number(link, "calls"),
                avg_duration: number(link, "avg_duration"),
                weight: number(link, "weight"),
            })
            .collect();

        Self { nodes, links }
    }
}

/// Edge weighting offered by the weighted graph endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightType {
    #[default]
    #[serde(rename = "CO")]
    CoExecution,
    #[serde(rename = "Lat")]
    Latency,
    #[serde(rename = "Freq")]
    Frequency,
}

impl WeightType {
    pub fn as_param(&self) -> &'static str {
        match self {
            WeightType::CoExecution => "CO",
            WeightType::Latency => "Lat",
            WeightType::Frequency => "Freq",
        }
    }
}

impl fmt::Display for WeightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for WeightType {
    type Err = InsightError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "co" | "coexecution" | "co-execution" => Ok(WeightType::CoExecution),
            "lat" | "latency" => Ok(WeightType::Latency),
            "freq" | "frequency" => Ok(WeightType::Frequency),
            _ => Err(InsightError::UnknownWeightType(s.to_string())),
        }
    }
}

/// Time window and weighting for a weighted graph request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedGraphQuery {
    /// Microseconds since the Unix epoch
    pub start_time: Option<i64>,
    /// Microseconds since the Unix epoch
    pub end_time: Option<i64>,
    #[serde(default)]
    pub weight_type: WeightType,
}

impl WeightedGraphQuery {
    pub fn between(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        weight_type: WeightType,
    ) -> Self {
        Self {
            start_time: start.map(|t| t.timestamp_micros()),
            end_time: end.map(|t| t.timestamp_micros()),
            weight_type,
        }
    }

    /// Query parameters; absent bounds are left out entirely
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if let Some(start) = self.start_time {
            query.push(("start_time", start.to_string()));
        }
        if let Some(end) = self.end_time {
            query.push(("end_time", end.to_string()));
        }
        query.push(("weight_type", self.weight_type.as_param().to_string()));
        query
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightedGraphResponse {
    pub status: String,
    pub data: Option<WeightedGraphData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightedGraphData {
    #[serde(default)]
    pub nodes: Vec<WeightedNode>,
    #[serde(default)]
    pub edges: Vec<WeightedEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightedNode {
    pub id: String,
    pub importance: Option<f64>,
    pub dependence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightedEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRenderNode {
    pub id: String,
    pub importance: f64,
    pub dependence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRenderLink {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Weighted dependency graph in renderer form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedGraph {
    pub nodes: Vec<WeightedRenderNode>,
    pub links: Vec<WeightedRenderLink>,
}

impl TryFrom<WeightedGraphResponse> for WeightedGraph {
    type Error = InsightError;

    fn try_from(response: WeightedGraphResponse) -> Result<Self> {
        let data = match (response.status.as_str(), response.data) {
            ("success", Some(data)) => data,
            _ => {
                return Err(InsightError::Graph(
                    "Failed to fetch valid weighted dependency graph data".to_string(),
                ))
            }
        };

        if data.nodes.is_empty() && data.edges.is_empty() {
            return Err(InsightError::Graph(
                "No nodes and edges found in the weighted dependency graph".to_string(),
            ));
        }

        Ok(Self {
            nodes: data
                .nodes
                .into_iter()
                .map(|n| WeightedRenderNode {
                    id: n.id,
                    importance: n.importance.unwrap_or(0.0),
                    dependence: n.dependence.unwrap_or(0.0),
                })
                .collect(),
            links: data
                .edges
                .into_iter()
                .map(|e| WeightedRenderLink {
                    source: e.source,
                    target: e.target,
                    weight: e.weight,
                })
                .collect(),
        })
    }
}

/// Client for the graph endpoints of the analysis backend
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: ApiClient,
}

impl GraphClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn dependency_graph(&self) -> Result<GraphData> {
        let body: Value = self.client.get(GRAPH_PATH).await?;
        Ok(GraphData::from_response(&body))
    }

    pub async fn weighted_graph(&self, query: &WeightedGraphQuery) -> Result<WeightedGraph> {
        let response: WeightedGraphResponse = self
            .client
            .get_with_query(WEIGHTED_GRAPH_PATH, &query.to_query())
            .await?;
        WeightedGraph::try_from(response)
    }
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_link_defaults() {
        let body = json!({
            "graph": {
                "nodes": [{"id": "orders"}, {"id": "payments"}, "billing"],
                "links": [
                    {"source": "orders", "target": "payments", "method": "POST",
                     "type": "http", "calls": 40, "avg_duration": 12.5, "weight": 3},
                    {}
                ]
            }
        });
        let graph = GraphData::from_response(&body);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links[0].calls, Some(40.0));
        assert_eq!(graph.links[1].source, "Unknown Source");
        assert_eq!(graph.links[1].target, "Unknown Target");
        assert_eq!(graph.links[1].method, "Unknown");
        assert_eq!(graph.links[1].link_type, "Unknown");
        assert_eq!(graph.links[1].weight, None);
    }

    #[test]
    fn test_nodes_keep_their_attributes() {
        let body = json!({
            "graph": {
                "nodes": [
                    {"id": "orders", "label": "Orders", "group": 2},
                    {"label": "anonymous"},
                    "billing",
                    null
                ],
                "links": []
            }
        });
        let graph = GraphData::from_response(&body);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.nodes[0].id.as_deref(), Some("orders"));
        assert_eq!(graph.nodes[0].extra["group"], 2);
        assert_eq!(graph.nodes[1].id, None);
        assert_eq!(graph.nodes[1].extra["label"], "anonymous");
        assert_eq!(graph.nodes[2].id.as_deref(), Some("billing"));

        let rendered = serde_json::to_value(&graph.nodes).unwrap();
        assert_eq!(
            rendered,
            json!([
                {"id": "orders", "label": "Orders", "group": 2},
                {"label": "anonymous"},
                {"id": "billing"}
            ])
        );
    }

    #[test]
    fn test_missing_graph_is_empty() {
        assert_eq!(
            GraphData::from_response(&json!({"status": "error"})),
            GraphData::default()
        );
    }

    #[test]
    fn test_query_includes_only_present_bounds() {
        let query = WeightedGraphQuery {
            start_time: None,
            end_time: Some(1_700_000_000_000_000),
            weight_type: WeightType::Latency,
        };
        assert_eq!(
            query.to_query(),
            vec![
                ("end_time", "1700000000000000".to_string()),
                ("weight_type", "Lat".to_string())
            ]
        );
    }

    #[test]
    fn test_between_converts_to_micros() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let query = WeightedGraphQuery::between(Some(start), None, WeightType::Frequency);
        assert_eq!(query.start_time, Some(start.timestamp() * 1_000_000));
        assert_eq!(query.end_time, None);
    }

    #[test]
    fn test_weight_type_parsing() {
        assert_eq!("co".parse::<WeightType>().unwrap(), WeightType::CoExecution);
        assert_eq!("Latency".parse::<WeightType>().unwrap(), WeightType::Latency);
        assert_eq!("FREQ".parse::<WeightType>().unwrap(), WeightType::Frequency);
        assert!("weight".parse::<WeightType>().is_err());
    }

    #[test]
    fn test_weighted_response_validation() {
        let empty: WeightedGraphResponse =
            serde_json::from_value(json!({"status": "success", "data": {"nodes": [], "edges": []}}))
                .unwrap();
        let err = WeightedGraph::try_from(empty).unwrap_err();
        assert!(err.to_string().contains("No nodes and edges"));

        let failed: WeightedGraphResponse =
            serde_json::from_value(json!({"status": "error"})).unwrap();
        assert!(WeightedGraph::try_from(failed).is_err());

        let ok: WeightedGraphResponse = serde_json::from_value(json!({
            "status": "success",
            "data": {
                "nodes": [{"id": "orders", "importance": 0.8}, {"id": "payments"}],
                "edges": [{"source": "orders", "target": "payments", "weight": 4.5}]
            }
        }))
        .unwrap();
        let graph = WeightedGraph::try_from(ok).unwrap();
        assert_eq!(graph.nodes[0].importance, 0.8);
        assert_eq!(graph.nodes[1].dependence, 0.0);
        assert_eq!(graph.links[0].weight, 4.5);
    }

    #[tokio::test]
    async fn test_weighted_graph_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/graphs/weight")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("start_time".into(), "10".into()),
                mockito::Matcher::UrlEncoded("weight_type".into(), "Freq".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "status": "success",
                    "data": {"nodes": [{"id": "a"}], "edges": []}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let api = ApiClient::with_timeout(&server.url(), Duration::from_secs(5)).unwrap();
        let graph = GraphClient::new(api)
            .weighted_graph(&WeightedGraphQuery {
                start_time: Some(10),
                end_time: None,
                weight_type: WeightType::Frequency,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(graph.nodes.len(), 1);
    }
}
