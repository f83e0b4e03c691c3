//! Anti-Pattern Dashboard CLI
//!
//! Runs the insight pipeline once against the analysis backend and prints
//! insights, chart aggregates, detector reports, graphs and traces.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{charts, graph, insights, traces, Backend};
use insight_lib::graph::WeightType;
use insight_lib::projector::ChartKind;
use tracing_subscriber::EnvFilter;

/// Anti-Pattern Dashboard CLI
#[derive(Parser)]
#[command(name = "apd")]
#[command(author, version, about = "CLI for Microservice Anti-Pattern Insights", long_about = None)]
pub struct Cli {
    /// Analysis backend URL (can also be set via APD_API_URL env var)
    #[arg(long, env = "APD_API_URL")]
    pub api_url: Option<String>,

    /// Trace collector URL (can also be set via APD_TRACES_URL env var)
    #[arg(long, env = "APD_TRACES_URL")]
    pub traces_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List insights from every detector
    Insights {
        /// Only show these services (repeatable)
        #[arg(long, short)]
        service: Vec<String>,

        /// Only show these anti-patterns (repeatable)
        #[arg(long, short)]
        pattern: Vec<String>,

        /// Read every detector from the combined endpoint
        #[arg(long)]
        aggregate: bool,
    },

    /// Show a chart aggregate
    Chart {
        /// Chart kind (by-service-by-pattern, severity-by-pattern,
        /// pattern-distribution, by-service-by-pattern-radar, trend-over-time)
        kind: ChartKind,

        /// Only include these services (repeatable)
        #[arg(long, short)]
        service: Vec<String>,

        /// Only include these anti-patterns (repeatable)
        #[arg(long, short)]
        pattern: Vec<String>,
    },

    /// Run every detector and report how each one fared
    Detect {
        /// Read every detector from the combined endpoint
        #[arg(long)]
        aggregate: bool,
    },

    /// List the detector catalog
    Detectors,

    /// Show the service dependency graph
    Graph,

    /// Show the weighted dependency graph
    WeightedGraph {
        /// Window start (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Edge weighting: co, lat or freq
        #[arg(long, default_value = "co")]
        weight_type: WeightType,
    },

    /// List recorded traces, or lay one out as a timeline
    Traces {
        /// Trace ID to show
        #[arg(long, short)]
        trace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new("debug"))
            .init();
    }

    let file_config = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| file_config.default_format())
        .unwrap_or_default();
    let backend = Backend::new(
        &file_config.resolve_api_url(cli.api_url.as_deref()),
        &file_config.resolve_traces_url(cli.traces_url.as_deref()),
        file_config.thresholds(),
    )
    .context("Failed to set up backend clients")?;

    match cli.command {
        Commands::Insights {
            service,
            pattern,
            aggregate,
        } => {
            insights::list_insights(&backend, service, pattern, aggregate, format).await?;
        }
        Commands::Chart {
            kind,
            service,
            pattern,
        } => {
            charts::show_chart(&backend, kind, service, pattern, format).await?;
        }
        Commands::Detect { aggregate } => {
            insights::detect(&backend, aggregate, format).await?;
        }
        Commands::Detectors => {
            insights::list_detectors(&backend, format)?;
        }
        Commands::Graph => {
            graph::show_graph(&backend, format).await?;
        }
        Commands::WeightedGraph {
            start,
            end,
            weight_type,
        } => {
            graph::show_weighted_graph(&backend, start, end, weight_type, format).await?;
        }
        Commands::Traces { trace } => {
            traces::show_traces(&backend, trace, format).await?;
        }
    }

    Ok(())
}
