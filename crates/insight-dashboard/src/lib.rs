//! Insight dashboard service
//!
//! Keeps a refreshed insight collection in memory and serves insights,
//! chart aggregates, dependency graphs and trace timelines over HTTP.

pub mod api;
pub mod config;
pub mod refresh;
