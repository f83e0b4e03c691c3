//! Tests for detector fan-out
//!
//! These tests verify:
//! - Per-detector failure isolation over real HTTP
//! - Aggregate endpoint normalization
//! - Join failures abort the whole aggregation

use super::*;
use crate::catalog::default_catalog;
use crate::error::InsightError;
use crate::models::DetectorOutcome;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Body each catalog detector returns in the happy path
fn detector_body(spec: &DetectorSpec) -> Value {
    match spec.endpoint {
        "fan-in" | "fan-out" | "chatty" => json!({
            spec.result_key: {format!("{}-svc", spec.endpoint): {"total_upstream": 6}}
        }),
        "knot" => json!({ "unrelated": [] }),
        _ => json!({
            spec.result_key: [{"service": format!("{}-svc", spec.endpoint), "length": 3}]
        }),
    }
}

mod http_source_tests {
    use super::*;

    #[tokio::test]
    async fn test_one_failed_detector_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        let catalog = default_catalog();
        let mut mocks = Vec::new();

        for spec in &catalog {
            let path = format!("/api/anti-patterns/{}", spec.endpoint);
            let mock = if spec.endpoint == "bottleneck" {
                server
                    .mock("GET", path.as_str())
                    .with_status(500)
                    .with_body("internal error")
                    .create_async()
                    .await
            } else {
                server
                    .mock("GET", path.as_str())
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(detector_body(spec).to_string())
                    .create_async()
                    .await
            };
            mocks.push(mock);
        }

        let client = DetectorClient::http(&server.url(), Duration::from_secs(5), catalog.clone())
            .unwrap();
        let outcome = client.fetch_all(today()).await.unwrap();

        for mock in &mocks {
            mock.assert_async().await;
        }

        assert_eq!(outcome.reports.len(), 12);
        assert_eq!(outcome.failed_detectors(), vec!["Bottleneck Services"]);
        assert!(outcome
            .insights
            .iter()
            .all(|i| i.name != "Bottleneck Services"));

        // Knot answered without its result key: empty, not failed
        let knot = outcome
            .reports
            .iter()
            .find(|r| r.label == "Knot Pattern")
            .unwrap();
        assert_eq!(knot.outcome, DetectorOutcome::Empty);

        // Ten detectors contribute exactly one insight each
        assert_eq!(outcome.insights.len(), 10);
        assert!(outcome.insights.iter().all(|i| i.date == today()));
    }

    #[tokio::test]
    async fn test_insights_follow_catalog_order() {
        let mut server = mockito::Server::new_async().await;
        let catalog: Vec<_> = default_catalog().into_iter().take(3).collect();

        let _cyclic = server
            .mock("GET", "/api/anti-patterns/cyclic")
            .with_status(200)
            .with_body(r#"{"cycles": [{"cycle": ["a", "b", "a"], "cycle_length": 3}]}"#)
            .create_async()
            .await;
        let _knot = server
            .mock("GET", "/api/anti-patterns/knot")
            .with_status(200)
            .with_body(r#"{"dense_clusters": [{"service": "orders"}]}"#)
            .create_async()
            .await;
        let _bottleneck = server
            .mock("GET", "/api/anti-patterns/bottleneck")
            .with_status(200)
            .with_body(r#"{"services": [{"service": "Service-A", "incoming_calls": 12}]}"#)
            .create_async()
            .await;

        let client = DetectorClient::http(&server.url(), Duration::from_secs(5), catalog).unwrap();
        let outcome = client.fetch_all(today()).await.unwrap();

        let names: Vec<_> = outcome.insights.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Cyclic Dependencies", "Knot Pattern", "Bottleneck Services"]
        );
        assert_eq!(outcome.insights[0].service, "Unknown");
        assert_eq!(outcome.insights[0].count, 3);
        assert_eq!(outcome.insights[2].count, 12);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_detector_failure() {
        let mut server = mockito::Server::new_async().await;
        let catalog: Vec<_> = default_catalog().into_iter().take(1).collect();

        let _cyclic = server
            .mock("GET", "/api/anti-patterns/cyclic")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = DetectorClient::http(&server.url(), Duration::from_secs(5), catalog).unwrap();
        let outcome = client.fetch_all(today()).await.unwrap();

        assert!(outcome.insights.is_empty());
        assert!(outcome.reports[0].is_failed());
    }

    #[tokio::test]
    async fn test_aggregate_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "cyclic_dependencies": {"cycles": [{"cycle": ["a", "b"], "cycle_length": 2}]},
            "bottleneck_services": {"services": ["checkout"]},
            "fan_in_overload": {"services": {
                "payments": {"upstream_services": ["a", "b"], "total_upstream": 12}
            }},
            "improper_load_balancer": {"imbalances": []}
        });
        let _all = server
            .mock("GET", "/api/anti-patterns/all")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client =
            DetectorClient::http(&server.url(), Duration::from_secs(5), default_catalog()).unwrap();
        let outcome = client.fetch_aggregate(today()).await.unwrap();

        assert_eq!(outcome.insights.len(), 3);
        assert_eq!(outcome.reports.len(), 12);
        let fan_in = outcome
            .insights
            .iter()
            .find(|i| i.name == "Fan-In Overload")
            .unwrap();
        assert_eq!(fan_in.service, "payments");
        assert_eq!(fan_in.count, 12);
        assert!(outcome.failed_detectors().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_failure_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _all = server
            .mock("GET", "/api/anti-patterns/all")
            .with_status(503)
            .create_async()
            .await;

        let client =
            DetectorClient::http(&server.url(), Duration::from_secs(5), default_catalog()).unwrap();
        let err = client.fetch_aggregate(today()).await.unwrap_err();
        assert!(matches!(err, InsightError::Status { status: 503, .. }));
    }
}

mod join_tests {
    use super::*;

    struct PanickingSource;

    #[async_trait]
    impl DetectorSource for PanickingSource {
        async fn fetch(&self, spec: &DetectorSpec) -> Result<Value> {
            if spec.endpoint == "chatty" {
                panic!("detector task crashed");
            }
            Ok(json!({}))
        }

        async fn fetch_aggregate(&self) -> Result<Value> {
            Ok(json!({}))
        }
    }

    struct StaticSource;

    #[async_trait]
    impl DetectorSource for StaticSource {
        async fn fetch(&self, spec: &DetectorSpec) -> Result<Value> {
            if spec.endpoint == "cyclic" {
                return Err(InsightError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            Ok(detector_body(spec))
        }

        async fn fetch_aggregate(&self) -> Result<Value> {
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_join_failure_aborts_aggregation() {
        let client = DetectorClient::new(Arc::new(PanickingSource), default_catalog());
        let err = tokio_test::assert_err!(client.fetch_all(today()).await);
        assert!(matches!(err, InsightError::Aggregation(_)));
    }

    #[tokio::test]
    async fn test_eleven_succeed_one_fails() {
        let client = DetectorClient::new(Arc::new(StaticSource), default_catalog());
        let outcome = tokio_test::assert_ok!(client.fetch_all(today()).await);

        assert_eq!(outcome.failed_detectors(), vec!["Cyclic Dependencies"]);
        assert!(outcome
            .insights
            .iter()
            .all(|i| i.name != "Cyclic Dependencies"));
        // knot returns no result key, the other ten contribute
        assert_eq!(outcome.insights.len(), 10);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let client = DetectorClient::new(Arc::new(StaticSource), Vec::new());
        let outcome = client.fetch_all(today()).await.unwrap();
        assert!(outcome.insights.is_empty());
        assert!(outcome.reports.is_empty());
    }
}
