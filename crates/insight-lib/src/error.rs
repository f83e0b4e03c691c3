//! Error types shared by the insight pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The join/flatten stage failed; per-detector failures never surface here.
    #[error("aggregation failed: {0}")]
    Aggregation(String),

    #[error("graph unavailable: {0}")]
    Graph(String),

    #[error("unknown chart kind '{0}'")]
    UnknownChartKind(String),

    #[error("unknown weight type '{0}'")]
    UnknownWeightType(String),

    #[error("selection names values not in the current insights: {0}")]
    UnknownSelection(String),
}

pub type Result<T> = std::result::Result<T, InsightError>;
