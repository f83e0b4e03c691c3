//! Insight Dashboard - microservice anti-pattern insight service
//!
//! Periodically fetches every anti-pattern detector, keeps the normalized
//! insight collection in memory and serves it over a JSON API.

use anyhow::{Context, Result};
use insight_dashboard::{
    api::{self, AppState},
    config::DashboardConfig,
    refresh::{RefreshLoop, Refresher},
};
use insight_lib::{
    catalog::default_catalog,
    detector::{ApiClient, DetectorClient},
    graph::GraphClient,
    health::{components, HealthRegistry},
    state::InsightStore,
    trace::TraceClient,
    StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = DashboardConfig::load()?;
    info!(
        detector_base_url = %config.detector_base_url,
        refresh_interval_secs = config.refresh_interval_secs,
        "Dashboard configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DETECTOR_CLIENT).await;
    health_registry.register(components::INSIGHT_STORE).await;
    health_registry.register(components::GRAPH_CLIENT).await;

    let logger = StructuredLogger::new("insight-dashboard");
    let catalog = default_catalog();
    logger.log_startup(DASHBOARD_VERSION, &config.detector_base_url, catalog.len());

    let timeout = config.request_timeout();
    let detector_client = DetectorClient::http(&config.detector_base_url, timeout, catalog)
        .context("Invalid detector base URL")?
        .with_thresholds(config.thresholds())
        .with_logger(logger.clone());
    let graph_client = GraphClient::new(
        ApiClient::with_timeout(&config.detector_base_url, timeout)
            .context("Invalid detector base URL")?,
    );
    let trace_client =
        TraceClient::new(&config.traces_url, timeout).context("Invalid traces URL")?;

    let store = InsightStore::new(logger.clone());
    let refresher = Refresher::new(
        store,
        detector_client,
        health_registry.clone(),
        config.refresh_mode(),
    );

    let app_state = Arc::new(AppState::new(
        health_registry,
        refresher.clone(),
        graph_client,
        trace_client,
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let refresh_handle = tokio::spawn(
        RefreshLoop::new(refresher, config.refresh_interval()).run(shutdown_rx),
    );

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            match served {
                Ok(Err(e)) => error!(error = %e, "API server stopped"),
                Err(e) => error!(error = %e, "API server task failed"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
    }

    // Receiver may already be gone if the loop exited
    let _ = shutdown_tx.send(());
    if let Err(e) = refresh_handle.await {
        error!(error = %e, "Refresh loop task failed");
    }

    info!("Shutting down");
    Ok(())
}
