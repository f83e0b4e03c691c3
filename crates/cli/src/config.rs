//! Configuration management for the CLI

use anyhow::{Context, Result};
use clap::ValueEnum;
use insight_lib::SeverityThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TRACES_URL: &str = "http://localhost:8085/traces";

/// CLI configuration file, `~/.config/apd/config.json`
///
/// Every field is optional; flags and environment variables take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub traces_url: Option<String>,
    /// `table` or `json`
    pub default_format: Option<String>,
    pub medium_threshold: Option<u64>,
    pub high_threshold: Option<u64>,
}

impl Config {
    /// Load the user's config file, or defaults when there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("apd").join("config.json"))
    }

    pub fn resolve_api_url(&self, flag: Option<&str>) -> String {
        flag.or(self.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
            .to_string()
    }

    pub fn resolve_traces_url(&self, flag: Option<&str>) -> String {
        flag.or(self.traces_url.as_deref())
            .unwrap_or(DEFAULT_TRACES_URL)
            .to_string()
    }

    /// Unknown format names are ignored
    pub fn default_format(&self) -> Option<OutputFormat> {
        self.default_format
            .as_deref()
            .and_then(|name| OutputFormat::from_str(name, true).ok())
    }

    pub fn thresholds(&self) -> SeverityThresholds {
        let defaults = SeverityThresholds::default();
        SeverityThresholds::new(
            self.medium_threshold.unwrap_or(defaults.medium),
            self.high_threshold.unwrap_or(defaults.high),
        )
    }
}
