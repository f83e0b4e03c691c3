//! Dependency graph CLI commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use insight_lib::graph::{WeightType, WeightedGraphQuery};
use tabled::Tabled;

use super::Backend;
use crate::output::{format_optional, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Type")]
    link_type: String,
    #[tabled(rename = "Calls")]
    calls: String,
    #[tabled(rename = "Avg Duration")]
    avg_duration: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

#[derive(Tabled)]
struct WeightedNodeRow {
    #[tabled(rename = "Service")]
    id: String,
    #[tabled(rename = "Importance")]
    importance: String,
    #[tabled(rename = "Dependence")]
    dependence: String,
}

#[derive(Tabled)]
struct WeightedLinkRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

/// Show the service dependency graph
pub async fn show_graph(backend: &Backend, format: OutputFormat) -> Result<()> {
    let graph = backend.graph.dependency_graph().await?;

    match format {
        OutputFormat::Json => print_json(&graph)?,
        OutputFormat::Table => {
            println!("{}", "Service Dependency Graph".bold());
            println!(
                "Services: {}  Calls: {}",
                graph.nodes.len().to_string().cyan(),
                graph.links.len().to_string().cyan()
            );
            let rows = graph
                .links
                .into_iter()
                .map(|link| LinkRow {
                    source: link.source,
                    target: link.target,
                    method: link.method,
                    link_type: link.link_type,
                    calls: format_optional(link.calls),
                    avg_duration: format_optional(link.avg_duration),
                    weight: format_optional(link.weight),
                })
                .collect();
            print_rows(rows, "No dependencies found");
        }
    }

    Ok(())
}

/// Show the weighted dependency graph for a time window
pub async fn show_weighted_graph(
    backend: &Backend,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    weight_type: WeightType,
    format: OutputFormat,
) -> Result<()> {
    let query = WeightedGraphQuery::between(start, end, weight_type);
    let graph = backend.graph.weighted_graph(&query).await?;

    match format {
        OutputFormat::Json => print_json(&graph)?,
        OutputFormat::Table => {
            println!(
                "{} ({})",
                "Weighted Dependency Graph".bold(),
                weight_type.as_param().cyan()
            );
            print_rows(
                graph
                    .nodes
                    .into_iter()
                    .map(|node| WeightedNodeRow {
                        id: node.id,
                        importance: format!("{:.3}", node.importance),
                        dependence: format!("{:.3}", node.dependence),
                    })
                    .collect(),
                "No nodes",
            );
            print_rows(
                graph
                    .links
                    .into_iter()
                    .map(|link| WeightedLinkRow {
                        source: link.source,
                        target: link.target,
                        weight: format!("{:.3}", link.weight),
                    })
                    .collect(),
                "No edges",
            );
        }
    }

    Ok(())
}
