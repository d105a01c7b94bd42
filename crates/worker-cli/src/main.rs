//! Worker Binary Entry Point
//!
//! Reads one job request as JSON, runs it through the pipeline, and writes
//! the job result as JSON. The exit code mirrors the result status so the
//! hosting runtime can tell success from failure without parsing output.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gsplat_common::{JobRequest, JobStatus};
use gsplat_orchestrator::{Orchestrator, WorkerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gsplat-worker", about = "Gaussian Splatting training worker")]
struct Args {
    /// Path to the job request JSON; "-" reads from stdin
    #[arg(long, default_value = "-")]
    input: String,

    /// Write the job result JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let raw = if args.input == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read request from stdin")?
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read request from {}", args.input))?
    };
    let request: JobRequest =
        serde_json::from_str(&raw).context("failed to parse job request JSON")?;

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    let orchestrator = Orchestrator::new(config).context("failed to build worker")?;

    info!("Starting Gaussian Splatting worker");
    let result = orchestrator.run_job(&request).await;

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => std::fs::write(path, &json)
            .with_context(|| format!("failed to write result to {}", path.display()))?,
        None => println!("{json}"),
    }

    if result.status == JobStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}
