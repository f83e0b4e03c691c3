//! Insight library for microservice anti-pattern dashboards
//!
//! This crate provides the core functionality for:
//! - Fetching anti-pattern findings from independent detector endpoints
//! - Normalizing heterogeneous detector payloads into uniform insights
//! - Severity classification, selection filtering and chart projection
//! - Dependency graph and trace timeline adapters
//! - Health checks and observability

pub mod catalog;
pub mod detector;
pub mod error;
pub mod filter;
pub mod graph;
pub mod health;
pub mod models;
pub mod normalizer;
pub mod observability;
pub mod projector;
pub mod severity;
pub mod state;
pub mod trace;

pub use error::InsightError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use severity::{Severity, SeverityThresholds};
