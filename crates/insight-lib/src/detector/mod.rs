//! Detector endpoint access
//!
//! This module provides:
//! - A thin JSON-over-HTTP client for the analysis backend
//! - The `DetectorSource` seam used to fetch raw detector responses
//! - Concurrent fan-out over every catalog entry with per-detector isolation
//! - The tagged raw payload shape consumed by the normalizer

mod client;
mod payload;

#[cfg(test)]
mod tests;

pub use client::{ApiClient, DetectorClient, HttpDetectorSource, DEFAULT_TIMEOUT};
pub use payload::RawPayload;

use crate::catalog::DetectorSpec;
use crate::error::Result;
use serde_json::Value;

pub use async_trait::async_trait;

/// Path prefix shared by every detector endpoint
pub const ANTI_PATTERN_PREFIX: &str = "api/anti-patterns";

/// Trait for fetching raw detector responses
#[async_trait]
pub trait DetectorSource: Send + Sync {
    /// Fetch the response body of a single detector
    async fn fetch(&self, spec: &DetectorSpec) -> Result<Value>;

    /// Fetch the combined response covering every detector category
    async fn fetch_aggregate(&self) -> Result<Value>;
}
