//! Trace CLI commands

use anyhow::{bail, Result};
use colored::Colorize;
use insight_lib::trace::timeline;
use tabled::Tabled;

use super::Backend;
use crate::output::{print_error, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct TraceRow {
    #[tabled(rename = "Trace ID")]
    trace_id: String,
    #[tabled(rename = "Spans")]
    spans: usize,
    #[tabled(rename = "Services")]
    services: usize,
}

#[derive(Tabled)]
struct TimelineRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Service")]
    group: String,
    #[tabled(rename = "Call")]
    content: String,
    #[tabled(rename = "Details")]
    title: String,
}

/// List recorded traces, or show one trace as a timeline
pub async fn show_traces(backend: &Backend, trace: Option<String>, format: OutputFormat) -> Result<()> {
    let traces = backend.traces.traces().await?;

    let Some(trace_id) = trace else {
        match format {
            OutputFormat::Json => print_json(&traces)?,
            OutputFormat::Table => {
                let rows = traces
                    .iter()
                    .map(|(trace_id, spans)| TraceRow {
                        trace_id: trace_id.clone(),
                        spans: spans.len(),
                        services: timeline(spans).groups.len(),
                    })
                    .collect();
                print_rows(rows, "No traces recorded");
            }
        }
        return Ok(());
    };

    let Some(spans) = traces.get(&trace_id) else {
        print_error(&format!("Trace {} not found", trace_id));
        bail!("unknown trace {}", trace_id);
    };
    let laid_out = timeline(spans);

    match format {
        OutputFormat::Json => print_json(&laid_out)?,
        OutputFormat::Table => {
            println!("{} {}", "Trace".bold(), trace_id.cyan());
            let rows = laid_out
                .items
                .into_iter()
                .map(|item| TimelineRow {
                    start: item.start.format("%H:%M:%S%.3f").to_string(),
                    group: item.group,
                    content: item.content,
                    title: item.title,
                })
                .collect();
            print_rows(rows, "Trace has no spans with timestamps");
        }
    }

    Ok(())
}
