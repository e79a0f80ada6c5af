//! Rentval CLI
//!
//! Cleans a fetch period's raw listings, trains the per-window rent models and
//! values individual listings against them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rentval_core::{FetchPeriod, NewListing};
use rentval_trainer::{resolve_period, Pipeline, PipelineConfig, TrainingReport};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "rentval")]
#[command(author = "Rentval Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Market-window rent valuation: clean, train, predict", long_about = None)]
struct Args {
    /// Fetch period (YYYY-MM); defaults to the latest entry of the fetch history
    #[arg(long, global = true)]
    period: Option<FetchPeriod>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the raw active/inactive snapshots into the processed dataset
    Process,

    /// Train one model per market window from the processed dataset
    Train,

    /// Process, then train
    Run,

    /// Value a listing against every window's model
    Predict {
        #[arg(long)]
        bedrooms: u32,

        #[arg(long)]
        bathrooms: f64,

        /// Floor area in square feet
        #[arg(long)]
        sqft: Option<f64>,

        #[arg(long)]
        zip_code: String,

        #[arg(long)]
        year_built: Option<i32>,

        /// Asking rent
        #[arg(long)]
        rent: f64,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn summarize(report: &TrainingReport) -> Result<()> {
    for (window, metrics) in &report.completed {
        info!(
            "  {}d: RMSE {:.4}, R² {:.4}",
            window, metrics.rmse, metrics.r2
        );
    }
    if !report.all_succeeded() {
        let failed: Vec<String> = report
            .failed
            .iter()
            .map(|(window, reason)| format!("{window}d ({reason})"))
            .collect();
        bail!(
            "training failed for {} window(s) in {}: {}",
            failed.len(),
            report.period,
            failed.join("; ")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Rentval v{}", env!("CARGO_PKG_VERSION"));

    let config =
        PipelineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let period = resolve_period(args.period, &config.fetch_history)
        .context("Failed to determine fetch period")?;
    let pipeline = Pipeline::new(config);

    match args.command {
        Command::Process => {
            let cleaned = pipeline
                .process(period)
                .with_context(|| format!("Failed to process listings for {period}"))?;
            info!("✓ Processed {} listings for {}", cleaned.rows.len(), period);
        }
        Command::Train => {
            let report = pipeline
                .train(period)
                .with_context(|| format!("Failed to load processed listings for {period}"))?;
            summarize(&report)?;
            info!("✓ Training completed for {}", period);
        }
        Command::Run => {
            let report = pipeline
                .run(period)
                .with_context(|| format!("Pipeline failed for {period}"))?;
            summarize(&report)?;
            info!("✓ Pipeline completed for {}", period);
        }
        Command::Predict {
            bedrooms,
            bathrooms,
            sqft,
            zip_code,
            year_built,
            rent,
        } => {
            let listing = NewListing {
                bedrooms,
                bathrooms,
                sqft,
                zip_code,
                year_built,
                rent,
            };
            let valuations = pipeline
                .predict(&listing, period)
                .with_context(|| format!("Failed to value listing for {period}"))?;

            let output =
                serde_json::to_string_pretty(&valuations).context("Failed to serialize valuations")?;
            println!("{output}");
        }
    }

    Ok(())
}
