//! Periodic insight refresh
//!
//! Re-runs the detector pipeline on a fixed interval and folds every settled
//! refresh into the health registry. The first tick fires immediately, so
//! the dashboard loads as soon as the loop starts.

use chrono::Utc;
use insight_lib::detector::DetectorClient;
use insight_lib::error::Result;
use insight_lib::health::HealthRegistry;
use insight_lib::state::{InsightStore, RefreshMode, RefreshSummary};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Runs one refresh against the store and records its health
#[derive(Clone)]
pub struct Refresher {
    store: InsightStore,
    client: DetectorClient,
    health: HealthRegistry,
    mode: RefreshMode,
}

impl Refresher {
    pub fn new(
        store: InsightStore,
        client: DetectorClient,
        health: HealthRegistry,
        mode: RefreshMode,
    ) -> Self {
        Self {
            store,
            client,
            health,
            mode,
        }
    }

    pub fn store(&self) -> &InsightStore {
        &self.store
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    pub async fn refresh_once(&self) -> Result<RefreshSummary> {
        self.refresh_with_mode(self.mode).await
    }

    pub async fn refresh_with_mode(&self, mode: RefreshMode) -> Result<RefreshSummary> {
        let today = Utc::now().date_naive();
        let result = self.store.refresh(&self.client, mode, today).await;
        self.health.record_refresh(&result).await;
        result
    }
}

pub struct RefreshLoop {
    refresher: Refresher,
    period: Duration,
}

impl RefreshLoop {
    pub fn new(refresher: Refresher, period: Duration) -> Self {
        Self { refresher, period }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.period.as_secs(),
            mode = ?self.refresher.mode(),
            "Starting insight refresh loop"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    cycles += 1;
                    match self.refresher.refresh_once().await {
                        Ok(summary) => debug!(
                            cycle = cycles,
                            insights = summary.insights,
                            failed = summary.failed.len(),
                            "Refresh cycle complete"
                        ),
                        Err(e) => warn!(cycle = cycles, error = %e, "Refresh cycle failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down insight refresh loop");
                    break;
                }
            }
        }
    }
}
