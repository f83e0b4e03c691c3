//! Integration tests for the dashboard API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use insight_dashboard::{
    api::{create_router, AppState},
    refresh::Refresher,
};
use insight_lib::{
    catalog::{default_catalog, DetectorSpec},
    detector::{async_trait, ApiClient, DetectorClient, DetectorSource},
    error::{InsightError, Result},
    graph::GraphClient,
    health::{components, HealthRegistry},
    state::{InsightStore, RefreshMode},
    trace::TraceClient,
    StructuredLogger,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Two services with chatty and fan-in findings; bottleneck is down
struct FakeDetectors;

#[async_trait]
impl DetectorSource for FakeDetectors {
    async fn fetch(&self, spec: &DetectorSpec) -> Result<Value> {
        match spec.endpoint {
            "chatty" => Ok(json!({"services": {
                "orders": {"total_connections": 12},
                "payments": {"total_connections": 3}
            }})),
            "fan-in" => Ok(json!({"services": {"orders": {"total_upstream": 7}}})),
            "bottleneck" => Err(InsightError::Status {
                status: 500,
                body: "down".to_string(),
            }),
            _ => Ok(json!({})),
        }
    }

    async fn fetch_aggregate(&self) -> Result<Value> {
        Ok(json!({"chatty_services": {"services": {"gateway": {"total_connections": 2}}}}))
    }
}

struct TestApp {
    router: Router,
    health: HealthRegistry,
    refresher: Refresher,
}

fn setup(backend_url: &str) -> TestApp {
    let health = HealthRegistry::new();
    let refresher = Refresher::new(
        InsightStore::new(StructuredLogger::new("test")),
        DetectorClient::new(Arc::new(FakeDetectors), default_catalog()),
        health.clone(),
        RefreshMode::PerDetector,
    );
    let timeout = Duration::from_secs(5);
    let state = Arc::new(AppState::new(
        health.clone(),
        refresher.clone(),
        GraphClient::new(ApiClient::with_timeout(backend_url, timeout).unwrap()),
        TraceClient::new(&format!("{}/traces", backend_url), timeout).unwrap(),
    ));

    TestApp {
        router: create_router(state),
        health,
        refresher,
    }
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

#[tokio::test]
async fn test_readyz_before_and_after_first_refresh() {
    let app = setup("http://127.0.0.1:9");

    let (status, body) = call(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    app.refresher.refresh_once().await.unwrap();

    let (status, body) = call(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_healthz_degraded_when_detector_failed() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    let (status, body) = call(&app.router, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(
        body["components"][components::DETECTOR_CLIENT]["status"],
        "degraded"
    );
}

#[tokio::test]
async fn test_healthz_503_when_unhealthy() {
    let app = setup("http://127.0.0.1:9");
    app.health
        .set_unhealthy(components::DETECTOR_CLIENT, "aggregation failed")
        .await;

    let (status, body) = call(&app.router, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_refresh_endpoint_and_insights() {
    let app = setup("http://127.0.0.1:9");

    let (status, summary) = call(&app.router, "POST", "/api/v1/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["insights"], 3);
    assert_eq!(summary["failed"], json!(["Bottleneck Services"]));

    let (status, snapshot) = call(&app.router, "GET", "/api/v1/insights", None).await;
    assert_eq!(status, StatusCode::OK);
    let insights = snapshot["insights"].as_array().unwrap();
    assert_eq!(insights.len(), 3);

    let orders_chatty = insights
        .iter()
        .find(|i| i["service"] == "orders" && i["name"] == "Chatty Services")
        .unwrap();
    assert_eq!(orders_chatty["count"], 12);
    assert_eq!(orders_chatty["severity"], "High");
}

#[tokio::test]
async fn test_refresh_aggregate_mode() {
    let app = setup("http://127.0.0.1:9");

    let (status, summary) =
        call(&app.router, "POST", "/api/v1/refresh?mode=aggregate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["insights"], 1);
    assert_eq!(summary["detectors"], 12);
}

#[tokio::test]
async fn test_detector_reports() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    let (status, reports) = call(&app.router, "GET", "/api/v1/detectors", None).await;
    assert_eq!(status, StatusCode::OK);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 12);

    let bottleneck = reports
        .iter()
        .find(|r| r["label"] == "Bottleneck Services")
        .unwrap();
    assert_eq!(bottleneck["status"], "failed");
}

#[tokio::test]
async fn test_chart_by_kind() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    let (status, chart) =
        call(&app.router, "GET", "/api/v1/charts/severity-by-pattern", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["labels"], json!(["Fan-In Overload", "Chatty Services"]));
    assert_eq!(chart["datasets"][0]["label"], "High");

    let (status, body) = call(&app.router, "GET", "/api/v1/charts/pie", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pie"));
}

#[tokio::test]
async fn test_selection_narrows_view() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    // Defaults select everything that was loaded
    let (_, selection) = call(&app.router, "GET", "/api/v1/selection", None).await;
    assert_eq!(selection["services"], json!(["orders", "payments"]));

    let (status, selection) = call(
        &app.router,
        "PUT",
        "/api/v1/selection",
        Some(json!({"services": ["payments"], "patterns": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selection["services"], json!(["payments"]));

    let (_, snapshot) = call(&app.router, "GET", "/api/v1/insights", None).await;
    let insights = snapshot["insights"].as_array().unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0]["service"], "payments");
}

#[tokio::test]
async fn test_selection_rejects_unknown_values() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    let (status, body) = call(
        &app.router,
        "PUT",
        "/api/v1/selection",
        Some(json!({"services": ["ghost"], "patterns": ["Not A Pattern"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("ghost"));
    assert!(error.contains("Not A Pattern"));

    // The previous selection is kept
    let (_, selection) = call(&app.router, "GET", "/api/v1/selection", None).await;
    assert_eq!(selection["services"], json!(["orders", "payments"]));
}

#[tokio::test]
async fn test_graph_endpoints() {
    let mut server = mockito::Server::new_async().await;
    let _graph = server
        .mock("GET", "/api/graph")
        .with_status(200)
        .with_body(
            json!({"graph": {"nodes": [{"id": "orders"}], "links": [{"source": "orders"}]}})
                .to_string(),
        )
        .create_async()
        .await;
    let _weighted = server
        .mock("GET", "/api/graphs/weight")
        .match_query(mockito::Matcher::UrlEncoded(
            "weight_type".into(),
            "Lat".into(),
        ))
        .with_status(200)
        .with_body(json!({"status": "success", "data": {"nodes": [], "edges": []}}).to_string())
        .create_async()
        .await;

    let app = setup(&server.url());

    let (status, graph) = call(&app.router, "GET", "/api/v1/graph", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["links"][0]["target"], "Unknown Target");

    let (status, body) = call(
        &app.router,
        "GET",
        "/api/v1/graph/weighted?weight_type=Lat",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "graph unavailable: No nodes and edges found in the weighted dependency graph"
    );
}

#[tokio::test]
async fn test_trace_timeline_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let _traces = server
        .mock("GET", "/traces")
        .with_status(200)
        .with_body(
            json!({"data": {"t1": [
                {"trace_id": "t1", "span_id": 1, "source": "gateway",
                 "destination": "orders", "timestamp": "2026-10-16T10:00:00Z"},
                {"trace_id": "t1", "span_id": 1, "source": "gateway",
                 "destination": "orders", "timestamp": "2026-10-16T10:00:00Z"}
            ]}})
            .to_string(),
        )
        .create_async()
        .await;

    let app = setup(&server.url());

    let (status, timeline) = call(&app.router, "GET", "/api/v1/traces/t1/timeline", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline["items"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["groups"][0]["id"], "gateway");

    let (status, _) = call(&app.router, "GET", "/api/v1/traces/t9/timeline", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let app = setup("http://127.0.0.1:9");
    app.refresher.refresh_once().await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("insight_dashboard_insights"));
}
