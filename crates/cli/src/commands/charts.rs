//! Chart CLI command

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use insight_lib::{
    filter::Selection,
    projector::{ChartAggregate, ChartKind},
    state::DashboardState,
};
use tabled::{builder::Builder, settings::Style};

use super::Backend;
use crate::output::{print_info, print_json, print_warning, OutputFormat};

/// Project the current insights into one chart
pub async fn show_chart(
    backend: &Backend,
    kind: ChartKind,
    services: Vec<String>,
    patterns: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let outcome = backend.fetch(false).await?;
    let failed: Vec<String> = outcome
        .failed_detectors()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut state = DashboardState::new();
    state.apply_refresh(outcome, Utc::now());
    state.set_selection(Selection::new(services, patterns))?;
    let chart = state.chart(kind);

    match format {
        OutputFormat::Json => print_json(&chart)?,
        OutputFormat::Table => {
            if !failed.is_empty() {
                print_warning(&format!("Failed detectors: {}", failed.join(", ")));
            }
            println!("{}", kind.as_str().bold());
            if chart.is_empty() || chart.datasets.is_empty() {
                print_info("Nothing to chart for this selection");
            } else {
                println!("{}", render(&chart));
            }
        }
    }

    Ok(())
}

/// One row per label, one column per dataset
fn render(chart: &ChartAggregate) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::new()];
    header.extend(chart.datasets.iter().map(|d| d.label.clone()));
    builder.push_record(header);

    for (row, label) in chart.labels.iter().enumerate() {
        let mut record = vec![label.clone()];
        record.extend(chart.datasets.iter().map(|d| {
            d.data
                .get(row)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        builder.push_record(record);
    }

    builder.build().with(Style::rounded()).to_string()
}
