//! CLI command implementations

pub mod charts;
pub mod graph;
pub mod insights;
pub mod traces;

use chrono::Utc;
use insight_lib::{
    catalog::default_catalog,
    detector::{ApiClient, DetectorClient, DEFAULT_TIMEOUT},
    error::Result,
    graph::GraphClient,
    trace::TraceClient,
    RefreshOutcome, SeverityThresholds, StructuredLogger,
};

/// Clients for every backend the CLI talks to
pub struct Backend {
    pub detectors: DetectorClient,
    pub graph: GraphClient,
    pub traces: TraceClient,
}

impl Backend {
    pub fn new(api_url: &str, traces_url: &str, thresholds: SeverityThresholds) -> Result<Self> {
        Ok(Self {
            detectors: DetectorClient::http(api_url, DEFAULT_TIMEOUT, default_catalog())?
                .with_thresholds(thresholds)
                .with_logger(StructuredLogger::new("apd")),
            graph: GraphClient::new(ApiClient::with_timeout(api_url, DEFAULT_TIMEOUT)?),
            traces: TraceClient::new(traces_url, DEFAULT_TIMEOUT)?,
        })
    }

    /// Run the detector pipeline once
    pub async fn fetch(&self, aggregate: bool) -> Result<RefreshOutcome> {
        let today = Utc::now().date_naive();
        if aggregate {
            self.detectors.fetch_aggregate(today).await
        } else {
            self.detectors.fetch_all(today).await
        }
    }
}
