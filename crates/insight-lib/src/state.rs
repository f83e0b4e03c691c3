//! Dashboard state
//!
//! `DashboardState` is the explicit state object threaded through the pure
//! filter and projection functions. `InsightStore` shares it between tasks:
//! a refresh runs the whole pipeline outside the lock and only takes the
//! write lock to swap the settled result in, so readers never observe a
//! half-updated collection paired with a newer selection. A refresh in
//! flight is tracked outside the state, so dropping one part-way leaves the
//! settled status untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::detector::DetectorClient;
use crate::error::{InsightError, Result};
use crate::filter::{distinct_patterns, distinct_services, filter, Selection};
use crate::models::{DetectorReport, Insight, RefreshOutcome};
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::projector::{project, ChartAggregate, ChartKind};

/// Lifecycle of the insight collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Last refresh aborted; the previous collection is still served
    Failed(String),
}

/// Which detector endpoint(s) a refresh reads from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// One request per detector, fetched concurrently
    #[default]
    PerDetector,
    /// A single request to the combined endpoint
    Aggregate,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    insights: Vec<Insight>,
    selection: Selection,
    defaults_applied: bool,
    status: LoadStatus,
    last_refresh: Option<DateTime<Utc>>,
    reports: Vec<DetectorReport>,
}

/// Owned, serializable view of the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub status: LoadStatus,
    pub last_refresh: Option<DateTime<Utc>>,
    pub selection: Selection,
    pub total_insights: usize,
    pub insights: Vec<Insight>,
    pub known_services: Vec<String>,
    pub known_patterns: Vec<String>,
    pub reports: Vec<DetectorReport>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn reports(&self) -> &[DetectorReport] {
        &self.reports
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// True once a refresh has settled, even if it found nothing
    pub fn has_loaded(&self) -> bool {
        self.last_refresh.is_some()
    }

    /// Replace the collection with a settled refresh result
    ///
    /// Selections are pruned to values that still occur, then each empty
    /// set is defaulted to every known value the first time data arrives.
    pub fn apply_refresh(&mut self, outcome: RefreshOutcome, at: DateTime<Utc>) {
        self.insights = outcome.insights;
        self.reports = outcome.reports;
        self.last_refresh = Some(at);
        self.status = LoadStatus::Ready;

        if self.insights.is_empty() {
            return;
        }

        self.selection.retain_known(&self.insights);
        if !self.defaults_applied {
            self.selection.populate_defaults(&self.insights);
            self.defaults_applied = true;
        }
    }

    /// Record an aggregation-level failure without touching the collection
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.status = LoadStatus::Failed(message.into());
    }

    /// Replace the selection; empty sets mean "no restriction"
    ///
    /// Once a refresh has settled, every selected value must occur in the
    /// collection. Before that any selection is accepted and gets pruned by
    /// the first refresh.
    pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
        if self.has_loaded() {
            let unknown = selection.unknown_values(&self.insights);
            if !unknown.is_empty() {
                return Err(InsightError::UnknownSelection(unknown.join(", ")));
            }
        }
        self.selection = selection;
        Ok(())
    }

    pub fn known_services(&self) -> Vec<String> {
        distinct_services(&self.insights)
    }

    pub fn known_patterns(&self) -> Vec<String> {
        distinct_patterns(&self.insights)
    }

    /// Known pattern labels in first-seen order, restricted to the selection
    pub fn active_patterns(&self) -> Vec<String> {
        self.known_patterns()
            .into_iter()
            .filter(|p| self.selection.patterns.is_empty() || self.selection.patterns.contains(p))
            .collect()
    }

    pub fn view(&self) -> Vec<Insight> {
        filter(&self.insights, &self.selection)
    }

    pub fn chart(&self, kind: ChartKind) -> ChartAggregate {
        project(&self.view(), kind, &self.active_patterns())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            status: self.status.clone(),
            last_refresh: self.last_refresh,
            selection: self.selection.clone(),
            total_insights: self.insights.len(),
            insights: self.view(),
            known_services: self.known_services(),
            known_patterns: self.known_patterns(),
            reports: self.reports.clone(),
        }
    }
}

/// Counts reported back to whoever triggered a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub insights: usize,
    pub detectors: usize,
    pub failed: Vec<String>,
}

/// Shared dashboard state for concurrent readers and a single refresher
#[derive(Clone)]
pub struct InsightStore {
    state: Arc<RwLock<DashboardState>>,
    refresh_lock: Arc<Mutex<()>>,
    in_flight: Arc<AtomicBool>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl InsightStore {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            state: Arc::new(RwLock::new(DashboardState::new())),
            refresh_lock: Arc::new(Mutex::new(())),
            in_flight: Arc::new(AtomicBool::new(false)),
            metrics: DashboardMetrics::new(),
            logger,
        }
    }

    /// Re-run the pipeline and replace the collection
    pub async fn refresh(
        &self,
        client: &DetectorClient,
        mode: RefreshMode,
        today: NaiveDate,
    ) -> Result<RefreshSummary> {
        match mode {
            RefreshMode::PerDetector => self.refresh_with(client.fetch_all(today)).await,
            RefreshMode::Aggregate => self.refresh_with(client.fetch_aggregate(today)).await,
        }
    }

    /// Settle `pipeline` and swap its result in; on error keep the stale collection
    pub async fn refresh_with<F>(&self, pipeline: F) -> Result<RefreshSummary>
    where
        F: Future<Output = Result<RefreshOutcome>>,
    {
        // A newer refresh waits for the one in flight, then supersedes it
        let _guard = self.refresh_lock.lock().await;
        let _in_flight = InFlight::mark(&self.in_flight);

        let start = Instant::now();
        let result = pipeline.await;
        let elapsed = start.elapsed();

        match result {
            Ok(outcome) => {
                self.metrics.observe_refresh_latency(elapsed.as_secs_f64());
                self.metrics.record_refresh(&outcome);
                self.logger
                    .log_refresh_completed(&outcome, elapsed.as_millis());

                let summary = RefreshSummary {
                    insights: outcome.insights.len(),
                    detectors: outcome.reports.len(),
                    failed: outcome
                        .failed_detectors()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                };

                self.state.write().await.apply_refresh(outcome, Utc::now());
                Ok(summary)
            }
            Err(e) => {
                self.metrics.inc_refresh_failures();
                let mut state = self.state.write().await;
                self.logger
                    .log_refresh_failed(&e.to_string(), state.insights().len());
                state.record_failure(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let mut snapshot = self.state.read().await.snapshot();
        if self.refreshing() {
            snapshot.status = LoadStatus::Loading;
        }
        snapshot
    }

    pub async fn chart(&self, kind: ChartKind) -> ChartAggregate {
        self.state.read().await.chart(kind)
    }

    pub async fn selection(&self) -> Selection {
        self.state.read().await.selection().clone()
    }

    pub async fn set_selection(&self, selection: Selection) -> Result<Selection> {
        let (services, patterns) = (selection.services.len(), selection.patterns.len());
        let mut state = self.state.write().await;
        state.set_selection(selection)?;
        self.logger.log_selection_changed(services, patterns);
        Ok(state.selection().clone())
    }

    pub async fn reports(&self) -> Vec<DetectorReport> {
        self.state.read().await.reports().to_vec()
    }

    pub async fn status(&self) -> LoadStatus {
        if self.refreshing() {
            return LoadStatus::Loading;
        }
        self.state.read().await.status().clone()
    }

    fn refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn has_loaded(&self) -> bool {
        self.state.read().await.has_loaded()
    }
}

/// Marks a refresh as running until dropped, however the refresh ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn mark(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
