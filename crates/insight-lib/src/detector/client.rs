//! HTTP access to the analysis backend and concurrent detector fan-out

use chrono::NaiveDate;
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::{async_trait, DetectorSource, RawPayload, ANTI_PATTERN_PREFIX};
use crate::catalog::DetectorSpec;
use crate::error::{InsightError, Result};
use crate::models::{DetectorOutcome, DetectorReport, Insight, RefreshOutcome};
use crate::normalizer::Normalizer;
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::severity::SeverityThresholds;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON client for the analysis backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        // Joining relative paths only keeps the last segment with a trailing slash
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_query(path, &[]).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.base_url.join(path)?;
        debug!(url = %url, "GET");

        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Fetches detector responses from `/api/anti-patterns/*`
pub struct HttpDetectorSource {
    client: ApiClient,
}

impl HttpDetectorSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DetectorSource for HttpDetectorSource {
    async fn fetch(&self, spec: &DetectorSpec) -> Result<Value> {
        let path = format!("{}/{}", ANTI_PATTERN_PREFIX, spec.endpoint);
        self.client.get(&path).await
    }

    async fn fetch_aggregate(&self) -> Result<Value> {
        let path = format!("{}/all", ANTI_PATTERN_PREFIX);
        self.client.get(&path).await
    }
}

/// Runs every detector in the catalog and flattens the results
#[derive(Clone)]
pub struct DetectorClient {
    source: Arc<dyn DetectorSource>,
    detectors: Arc<Vec<DetectorSpec>>,
    thresholds: SeverityThresholds,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl DetectorClient {
    pub fn new(source: Arc<dyn DetectorSource>, detectors: Vec<DetectorSpec>) -> Self {
        Self {
            source,
            detectors: Arc::new(detectors),
            thresholds: SeverityThresholds::default(),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("detector-client"),
        }
    }

    /// HTTP-backed client over the given detectors
    pub fn http(base_url: &str, timeout: Duration, detectors: Vec<DetectorSpec>) -> Result<Self> {
        let api = ApiClient::with_timeout(base_url, timeout)?;
        Ok(Self::new(Arc::new(HttpDetectorSource::new(api)), detectors))
    }

    pub fn with_thresholds(mut self, thresholds: SeverityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn detectors(&self) -> &[DetectorSpec] {
        &self.detectors
    }

    /// Fetch every detector concurrently and normalize the results
    ///
    /// A failing detector contributes no insights and a `Failed` report.
    /// Only a failure to join the spawned fetches aborts the whole run.
    pub async fn fetch_all(&self, today: NaiveDate) -> Result<RefreshOutcome> {
        let handles = self.detectors.iter().cloned().map(|spec| {
            let source = Arc::clone(&self.source);
            tokio::spawn(async move {
                let start = Instant::now();
                let result = source.fetch(&spec).await;
                (spec, result, start.elapsed())
            })
        });

        let joined = join_all(handles).await;

        let normalizer = Normalizer::new(today).with_thresholds(self.thresholds);
        let mut insights = Vec::new();
        let mut reports = Vec::with_capacity(joined.len());

        for handle in joined {
            let (spec, result, elapsed) =
                handle.map_err(|e| InsightError::Aggregation(e.to_string()))?;
            self.metrics
                .observe_detector_latency(spec.label, elapsed.as_secs_f64());

            let outcome = match result {
                Ok(body) => {
                    let payload = RawPayload::extract(&body, spec.result_key);
                    collect(&normalizer, &spec, &payload, &mut insights)
                }
                Err(e) => {
                    self.metrics.inc_detector_failures(spec.label);
                    self.logger.log_detector_failed(spec.label, &e.to_string());
                    DetectorOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            reports.push(DetectorReport {
                label: spec.label.to_string(),
                outcome,
                latency_ms: elapsed.as_millis() as u64,
            });
        }

        info!(
            detectors = reports.len(),
            insights = insights.len(),
            "Fetched all detectors"
        );

        Ok(RefreshOutcome {
            insights,
            reports,
            fetched_on: today,
        })
    }

    /// Fetch the combined endpoint once and normalize every category from it
    pub async fn fetch_aggregate(&self, today: NaiveDate) -> Result<RefreshOutcome> {
        let start = Instant::now();
        let body = self.source.fetch_aggregate().await.map_err(|e| {
            warn!(error = %e, "Aggregate detector fetch failed");
            e
        })?;
        let elapsed = start.elapsed();

        let normalizer = Normalizer::new(today).with_thresholds(self.thresholds);
        let mut insights = Vec::new();
        let reports = self
            .detectors
            .iter()
            .map(|spec| {
                let payload = body
                    .get(spec.category)
                    .map(|section| RawPayload::extract(section, spec.result_key))
                    .unwrap_or_default();
                DetectorReport {
                    label: spec.label.to_string(),
                    outcome: collect(&normalizer, spec, &payload, &mut insights),
                    latency_ms: elapsed.as_millis() as u64,
                }
            })
            .collect();

        Ok(RefreshOutcome {
            insights,
            reports,
            fetched_on: today,
        })
    }
}

fn collect(
    normalizer: &Normalizer,
    spec: &DetectorSpec,
    payload: &RawPayload,
    insights: &mut Vec<Insight>,
) -> DetectorOutcome {
    let found = normalizer.normalize(spec, payload);
    if found.is_empty() {
        DetectorOutcome::Empty
    } else {
        let count = found.len();
        insights.extend(found);
        DetectorOutcome::Succeeded { insights: count }
    }
}
