//! Detector catalog
//!
//! Every anti-pattern detector the dashboard knows about, described as data.
//! The candidate field lists used to pull a subject name and a magnitude out
//! of a raw finding live here too, so the mapping can be audited in one place.

use serde::Serialize;

/// Subject fields consulted in order for array-form findings
pub const SUBJECT_FIELDS: &[&str] = &["service", "source", "api_gateway"];

/// Magnitude fields consulted in order for array-form findings
pub const SEQUENCE_COUNT_FIELDS: &[&str] = &[
    "cycle_length",
    "incoming_calls",
    "total_upstream",
    "total_downstream",
    "total_connections",
    "length",
    "total_calls",
];

/// Magnitude fields consulted in order for keyed-mapping findings
pub const MAPPING_COUNT_FIELDS: &[&str] = &[
    "total_upstream",
    "total_downstream",
    "incoming_calls",
    "total_connections",
    "length",
];

/// Subject name used when a finding carries none of the subject fields
pub const UNKNOWN_SUBJECT: &str = "Unknown";

/// Ordered candidate field names for one detector category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldPriority {
    pub subject: &'static [&'static str],
    pub sequence_count: &'static [&'static str],
    pub mapping_count: &'static [&'static str],
}

impl Default for FieldPriority {
    fn default() -> Self {
        Self {
            subject: SUBJECT_FIELDS,
            sequence_count: SEQUENCE_COUNT_FIELDS,
            mapping_count: MAPPING_COUNT_FIELDS,
        }
    }
}

/// Description of one anti-pattern detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectorSpec {
    /// Human-readable label, copied verbatim into every insight
    pub label: &'static str,
    /// Path segment under `/api/anti-patterns/`
    pub endpoint: &'static str,
    /// Key holding the findings in the single-detector response
    pub result_key: &'static str,
    /// Key of this detector's section in the aggregate response
    pub category: &'static str,
    #[serde(skip)]
    pub fields: FieldPriority,
}

impl DetectorSpec {
    pub const fn new(
        label: &'static str,
        endpoint: &'static str,
        result_key: &'static str,
        category: &'static str,
    ) -> Self {
        Self {
            label,
            endpoint,
            result_key,
            category,
            fields: FieldPriority {
                subject: SUBJECT_FIELDS,
                sequence_count: SEQUENCE_COUNT_FIELDS,
                mapping_count: MAPPING_COUNT_FIELDS,
            },
        }
    }
}

const DEFAULT_DETECTORS: &[DetectorSpec] = &[
    DetectorSpec::new("Cyclic Dependencies", "cyclic", "cycles", "cyclic_dependencies"),
    DetectorSpec::new("Knot Pattern", "knot", "dense_clusters", "knot_patterns"),
    DetectorSpec::new("Bottleneck Services", "bottleneck", "services", "bottleneck_services"),
    DetectorSpec::new("Nano Services", "nano-services", "services", "nano_services"),
    DetectorSpec::new("Long Service Chains", "long-chain", "chains", "long_service_chains"),
    DetectorSpec::new("Fan-In Overload", "fan-in", "services", "fan_in_overload"),
    DetectorSpec::new("Fan-Out Overload", "fan-out", "services", "fan_out_overload"),
    DetectorSpec::new("Chatty Services", "chatty", "services", "chatty_services"),
    DetectorSpec::new("Synchronous Call Overuse", "sync-overuse", "issues", "sync_overuse"),
    DetectorSpec::new("Improper API Gateway Usage", "api-gateway", "issues", "api_gateway_usage"),
    DetectorSpec::new("Eventual Consistency Issues", "consistency", "issues", "eventual_consistency"),
    DetectorSpec::new("Improper Load Balancer", "load-balancer", "imbalances", "improper_load_balancer"),
];

/// The detectors exposed by the analysis backend
pub fn default_catalog() -> Vec<DetectorSpec> {
    DEFAULT_DETECTORS.to_vec()
}

/// Look up a catalog entry by label (case-insensitive)
pub fn find<'a>(catalog: &'a [DetectorSpec], label: &str) -> Option<&'a DetectorSpec> {
    catalog.iter().find(|d| d.label.eq_ignore_ascii_case(label))
}
