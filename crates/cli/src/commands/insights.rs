//! Insight and detector CLI commands

use anyhow::Result;
use colored::Colorize;
use insight_lib::{
    filter::{filter, Selection},
    DetectorOutcome, Insight, RefreshOutcome,
};
use tabled::Tabled;

use super::Backend;
use crate::output::{
    color_severity, color_status, print_info, print_json, print_rows, print_success,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct InsightRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Anti-Pattern")]
    name: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Date")]
    date: String,
}

impl From<&Insight> for InsightRow {
    fn from(insight: &Insight) -> Self {
        Self {
            service: insight.service.clone(),
            name: insight.name.clone(),
            count: insight.count,
            severity: color_severity(insight.severity),
            date: insight.date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Detector")]
    label: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Insights")]
    insights: usize,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct DetectorRow {
    #[tabled(rename = "Label")]
    label: &'static str,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Result Key")]
    result_key: &'static str,
    #[tabled(rename = "Category")]
    category: &'static str,
}

/// List insights, narrowed to the given services and patterns
pub async fn list_insights(
    backend: &Backend,
    services: Vec<String>,
    patterns: Vec<String>,
    aggregate: bool,
    format: OutputFormat,
) -> Result<()> {
    let outcome = backend.fetch(aggregate).await?;
    let view = filter(&outcome.insights, &Selection::new(services, patterns));

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            warn_failed(&outcome);
            println!(
                "{} ({} of {})",
                "Anti-Pattern Insights".bold(),
                view.len(),
                outcome.insights.len()
            );
            print_rows(
                view.iter().map(InsightRow::from).collect(),
                "No insights found",
            );
        }
    }

    Ok(())
}

/// Run every detector and report per-detector outcomes
pub async fn detect(backend: &Backend, aggregate: bool, format: OutputFormat) -> Result<()> {
    let outcome = backend.fetch(aggregate).await?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => {
            let rows = outcome
                .reports
                .iter()
                .map(|report| {
                    let (status, insights, reason) = match &report.outcome {
                        DetectorOutcome::Succeeded { insights } => ("succeeded", *insights, ""),
                        DetectorOutcome::Empty => ("empty", 0, ""),
                        DetectorOutcome::Failed { reason } => ("failed", 0, reason.as_str()),
                    };
                    ReportRow {
                        label: report.label.clone(),
                        status: color_status(status),
                        insights,
                        latency: format!("{}ms", report.latency_ms),
                        reason: reason.to_string(),
                    }
                })
                .collect();
            print_rows(rows, "No detectors configured");

            let failed = outcome.failed_detectors();
            if failed.is_empty() {
                print_success(&format!(
                    "{} insights from {} detectors",
                    outcome.insights.len(),
                    outcome.reports.len()
                ));
            } else {
                print_warning(&format!(
                    "{} insights, {} of {} detectors failed",
                    outcome.insights.len(),
                    failed.len(),
                    outcome.reports.len()
                ));
            }
        }
    }

    Ok(())
}

/// List the detector catalog
pub fn list_detectors(backend: &Backend, format: OutputFormat) -> Result<()> {
    let catalog = backend.detectors.detectors();

    match format {
        OutputFormat::Json => print_json(catalog)?,
        OutputFormat::Table => {
            let rows = catalog
                .iter()
                .map(|spec| DetectorRow {
                    label: spec.label,
                    endpoint: format!("/api/anti-patterns/{}", spec.endpoint),
                    result_key: spec.result_key,
                    category: spec.category,
                })
                .collect();
            print_rows(rows, "No detectors configured");
        }
    }

    Ok(())
}

fn warn_failed(outcome: &RefreshOutcome) {
    let failed = outcome.failed_detectors();
    if !failed.is_empty() {
        print_warning(&format!(
            "{} detector(s) failed and contributed nothing: {}",
            failed.len(),
            failed.join(", ")
        ));
    }
    if outcome.insights.is_empty() && failed.is_empty() {
        print_info("Every detector answered with no findings");
    }
}
