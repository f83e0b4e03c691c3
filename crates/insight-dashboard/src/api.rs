//! HTTP API: insight views, charts, selection, graphs, traces, health and metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use insight_lib::{
    error::InsightError,
    filter::Selection,
    graph::{GraphClient, GraphData, WeightedGraph, WeightedGraphQuery},
    health::{components, ComponentStatus, HealthRegistry},
    projector::{ChartAggregate, ChartKind},
    state::{DashboardSnapshot, InsightStore, RefreshMode, RefreshSummary},
    trace::{Timeline, TraceClient},
    DetectorReport,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::refresh::Refresher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub refresher: Refresher,
    pub graph: GraphClient,
    pub traces: TraceClient,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        refresher: Refresher,
        graph: GraphClient,
        traces: TraceClient,
    ) -> Self {
        Self {
            health_registry,
            refresher,
            graph,
            traces,
        }
    }

    fn store(&self) -> &InsightStore {
        self.refresher.store()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a library error to an HTTP error response
fn insight_error(e: InsightError) -> ApiError {
    let status = match &e {
        InsightError::UnknownChartKind(_)
        | InsightError::UnknownWeightType(_)
        | InsightError::UnknownSelection(_) => StatusCode::BAD_REQUEST,
        InsightError::Graph(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    api_error(status, e.to_string())
}

/// 200 while operational, 503 once any component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn insights(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.store().snapshot().await)
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<ChartAggregate>, ApiError> {
    let kind: ChartKind = kind.parse().map_err(insight_error)?;
    Ok(Json(state.store().chart(kind).await))
}

async fn get_selection(State(state): State<Arc<AppState>>) -> Json<Selection> {
    Json(state.store().selection().await)
}

async fn put_selection(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<Selection>,
) -> Result<Json<Selection>, ApiError> {
    state
        .store()
        .set_selection(selection)
        .await
        .map(Json)
        .map_err(insight_error)
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    pub mode: Option<RefreshMode>,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<RefreshSummary>, ApiError> {
    let mode = params.mode.unwrap_or(state.refresher.mode());
    info!(mode = ?mode, "Refresh requested");

    state
        .refresher
        .refresh_with_mode(mode)
        .await
        .map(Json)
        .map_err(insight_error)
}

async fn detectors(State(state): State<Arc<AppState>>) -> Json<Vec<DetectorReport>> {
    Json(state.store().reports().await)
}

async fn graph(State(state): State<Arc<AppState>>) -> Result<Json<GraphData>, ApiError> {
    match state.graph.dependency_graph().await {
        Ok(graph) => {
            state.health_registry.set_healthy(components::GRAPH_CLIENT).await;
            Ok(Json(graph))
        }
        Err(e) => {
            state
                .health_registry
                .set_degraded(components::GRAPH_CLIENT, e.to_string())
                .await;
            Err(insight_error(e))
        }
    }
}

async fn weighted_graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeightedGraphQuery>,
) -> Result<Json<WeightedGraph>, ApiError> {
    state
        .graph
        .weighted_graph(&query)
        .await
        .map(Json)
        .map_err(insight_error)
}

async fn trace_timeline(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<Timeline>, ApiError> {
    match state.traces.trace_timeline(&trace_id).await {
        Ok(Some(timeline)) => Ok(Json(timeline)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Trace {} not found", trace_id),
        )),
        Err(e) => Err(insight_error(e)),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/charts/:kind", get(chart))
        .route("/api/v1/selection", get(get_selection).put(put_selection))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/detectors", get(detectors))
        .route("/api/v1/graph", get(graph))
        .route("/api/v1/graph/weighted", get(weighted_graph))
        .route("/api/v1/traces/:trace_id/timeline", get(trace_timeline))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
