//! Dashboard configuration

use anyhow::{Context, Result};
use insight_lib::state::RefreshMode;
use insight_lib::SeverityThresholds;
use serde::Deserialize;
use std::time::Duration;

/// Dashboard configuration, read from `DASHBOARD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Port for the JSON API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the anti-pattern analysis backend
    #[serde(default = "default_detector_base_url")]
    pub detector_base_url: String,

    /// Full URL of the trace collector endpoint
    #[serde(default = "default_traces_url")]
    pub traces_url: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: u64,

    #[serde(default = "default_high_threshold")]
    pub high_threshold: u64,

    /// Read every detector from the combined endpoint instead of one request each
    #[serde(default)]
    pub aggregate: bool,
}

fn default_api_port() -> u16 {
    8080
}

fn default_detector_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_traces_url() -> String {
    "http://localhost:8085/traces".to_string()
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_medium_threshold() -> u64 {
    5
}

fn default_high_threshold() -> u64 {
    10
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            detector_base_url: default_detector_base_url(),
            traces_url: default_traces_url(),
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
            aggregate: false,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DASHBOARD"))
            .build()
            .context("Failed to read dashboard environment")?;

        config
            .try_deserialize()
            .context("Invalid dashboard configuration")
    }

    pub fn thresholds(&self) -> SeverityThresholds {
        SeverityThresholds::new(self.medium_threshold, self.high_threshold)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        if self.aggregate {
            RefreshMode::Aggregate
        } else {
            RefreshMode::PerDetector
        }
    }
}
