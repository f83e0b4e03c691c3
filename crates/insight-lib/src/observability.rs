//! Observability infrastructure for the insight pipeline
//!
//! Provides:
//! - Prometheus metrics (refresh latency, per-detector latency and failures, insight count)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::RefreshOutcome;

/// Histogram buckets for network-bound latencies (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    refresh_latency_seconds: Histogram,
    detector_latency_seconds: HistogramVec,
    insights: IntGauge,
    detectors_failed: IntGauge,
    detector_failures: IntCounterVec,
    refresh_failures: IntCounter,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            refresh_latency_seconds: register_histogram!(
                "insight_dashboard_refresh_latency_seconds",
                "Time spent fetching and normalizing every detector",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register refresh_latency_seconds"),

            detector_latency_seconds: register_histogram_vec!(
                "insight_dashboard_detector_latency_seconds",
                "Time spent fetching a single detector endpoint",
                &["detector"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detector_latency_seconds"),

            insights: register_int_gauge!(
                "insight_dashboard_insights",
                "Number of insights in the current collection"
            )
            .expect("Failed to register insights"),

            detectors_failed: register_int_gauge!(
                "insight_dashboard_detectors_failed",
                "Number of detectors that failed during the last refresh"
            )
            .expect("Failed to register detectors_failed"),

            detector_failures: register_int_counter_vec!(
                "insight_dashboard_detector_failures_total",
                "Total number of failed detector fetches",
                &["detector"]
            )
            .expect("Failed to register detector_failures"),

            refresh_failures: register_int_counter!(
                "insight_dashboard_refresh_failures_total",
                "Total number of refreshes aborted at the aggregation stage"
            )
            .expect("Failed to register refresh_failures"),
        }
    }
}

/// Dashboard metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    pub fn observe_refresh_latency(&self, duration_secs: f64) {
        self.inner().refresh_latency_seconds.observe(duration_secs);
    }

    pub fn observe_detector_latency(&self, detector: &str, duration_secs: f64) {
        self.inner()
            .detector_latency_seconds
            .with_label_values(&[detector])
            .observe(duration_secs);
    }

    pub fn inc_detector_failures(&self, detector: &str) {
        self.inner()
            .detector_failures
            .with_label_values(&[detector])
            .inc();
    }

    pub fn inc_refresh_failures(&self) {
        self.inner().refresh_failures.inc();
    }

    /// Record the shape of a settled refresh
    pub fn record_refresh(&self, outcome: &RefreshOutcome) {
        self.inner().insights.set(outcome.insights.len() as i64);
        self.inner()
            .detectors_failed
            .set(outcome.failed_detectors().len() as i64);
    }
}

/// Structured logger for dashboard events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, detector_base_url: &str, detectors: usize) {
        info!(
            event = "dashboard_started",
            instance = %self.instance,
            version = %version,
            detector_base_url = %detector_base_url,
            detectors = detectors,
            "Insight dashboard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Insight dashboard shutting down"
        );
    }

    pub fn log_refresh_completed(&self, outcome: &RefreshOutcome, elapsed_ms: u128) {
        let failed = outcome.failed_detectors();
        if failed.is_empty() {
            info!(
                event = "refresh_completed",
                instance = %self.instance,
                insights = outcome.insights.len(),
                detectors = outcome.reports.len(),
                elapsed_ms = elapsed_ms,
                "Insight collection refreshed"
            );
        } else {
            warn!(
                event = "refresh_completed",
                instance = %self.instance,
                insights = outcome.insights.len(),
                detectors = outcome.reports.len(),
                failed = ?failed,
                elapsed_ms = elapsed_ms,
                "Insight collection refreshed with failed detectors"
            );
        }
    }

    pub fn log_detector_failed(&self, detector: &str, reason: &str) {
        warn!(
            event = "detector_failed",
            instance = %self.instance,
            detector = %detector,
            reason = %reason,
            "Detector fetch failed, contributing no insights"
        );
    }

    pub fn log_refresh_failed(&self, error: &str, kept_insights: usize) {
        warn!(
            event = "refresh_failed",
            instance = %self.instance,
            error = %error,
            kept_insights = kept_insights,
            "Refresh aborted, keeping previous insight collection"
        );
    }

    pub fn log_selection_changed(&self, services: usize, patterns: usize) {
        info!(
            event = "selection_changed",
            instance = %self.instance,
            services = services,
            patterns = patterns,
            "Selection updated"
        );
    }
}
