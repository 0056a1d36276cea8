//! battery-soh CLI

use anyhow::{Context, Result};
use battery_soh::config::PipelineConfig;
use battery_soh::health::HealthArtifact;
use battery_soh::pipeline::{build_health_dataset, extract_corpus};
use battery_soh::record::JsonDirSource;
use battery_soh::report::{ExtractReport, HealthReport};
use battery_soh::table::CycleIdCounter;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "battery-soh")]
#[command(about = "Battery cycling corpus extraction and state-of-health dataset builder")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error). RUST_LOG wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    /// Pipeline configuration (JSON). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write the batch report (pretty JSON) here
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Directory of raw per-battery records (<battery_id>.json)
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Directory for per-cycle tables, metadata index and dataset
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Averaged rows per accepted cycle
    #[arg(long, global = true)]
    num_bins: Option<usize>,

    /// Rated capacity (Ah)
    #[arg(long, global = true)]
    nominal_capacity: Option<f64>,

    /// Cycles at or below this capacity (Ah) are dropped
    #[arg(long, global = true)]
    min_capacity: Option<f64>,

    /// Discharge cut-off voltage (V)
    #[arg(long, global = true)]
    cutoff_voltage: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract raw records into per-cycle tables and the metadata index
    Extract,

    /// Build the state-of-health dataset from extracted tables
    Health {
        /// Dataset path (.csv or .parquet). Defaults to <output-dir>/battery_health_dataset.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract, then build the health dataset
    Run {
        /// Dataset path (.csv or .parquet). Defaults to <output-dir>/battery_health_dataset.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    extract: Option<&'a ExtractReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<&'a HealthReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = load_config(cli.config.as_deref(), &cli.overrides)?;

    let result = match &cli.command {
        Commands::Extract => cmd_extract(&config).map(|r| (Some(r), None)),
        Commands::Health { output } => {
            cmd_health(&config, output.as_deref()).map(|r| (None, Some(r)))
        }
        Commands::Run { output } => cmd_extract(&config).and_then(|extract| {
            let health = cmd_health(&config, output.as_deref())?;
            Ok((Some(extract), Some(health)))
        }),
    };

    let (extract, health) = match result {
        Ok(reports) => reports,
        Err(e) => {
            tracing::error!("{e:#}");
            return Err(e);
        }
    };

    if let Some(path) = &cli.report {
        let report = RunReport {
            extract: extract.as_ref(),
            health: health.as_ref(),
        };
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text).with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load_json(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &overrides.raw_dir {
        config.raw_dir.clone_from(dir);
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(n) = overrides.num_bins {
        config.health.num_bins = n;
    }
    if let Some(v) = overrides.nominal_capacity {
        config.health.nominal_capacity = v;
    }
    if let Some(v) = overrides.min_capacity {
        config.health.min_capacity = v;
    }
    if let Some(v) = overrides.cutoff_voltage {
        config.health.cutoff_voltage = v;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_extract(config: &PipelineConfig) -> Result<ExtractReport> {
    let layout = config.layout();
    let mut counter = CycleIdCounter::resume(layout.metadata_path())
        .with_context(|| format!("reading {}", layout.metadata_path().display()))?;
    tracing::info!(next_uid = counter.peek(), raw_dir = %config.raw_dir.display(), "starting extraction");

    let source = JsonDirSource::new(&config.raw_dir);
    let report = extract_corpus(&source, &layout, &mut counter)?;
    tracing::info!(output = %layout.root().display(), "processing complete");
    Ok(report)
}

fn cmd_health(config: &PipelineConfig, output: Option<&Path>) -> Result<HealthReport> {
    let layout = config.layout();
    let output = output.map_or_else(|| layout.health_path(), Path::to_path_buf);

    let (report, artifact) = build_health_dataset(&layout, &config.health, &output)?;
    match artifact {
        HealthArtifact::Written { path, rows } => {
            tracing::info!(path = %path.display(), rows, accepted = report.accepted_count(), "saved processed dataset");
        }
        HealthArtifact::NotProduced => {
            tracing::warn!(
                rejected = report.rejected_count(),
                failed = report.failed_count(),
                "no valid cycles found, no dataset produced"
            );
        }
    }
    Ok(report)
}
