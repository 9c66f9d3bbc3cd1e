//! CLI command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use booking_etl::pipeline::{PipelineConfig, PipelineExecutor, PipelineStage};
use clap::Args;
use tracing::info;

use crate::output;

/// Arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bookings file
    #[arg(long)]
    pub bookings: Option<PathBuf>,

    /// Users endpoint
    #[arg(long, conflicts_with = "users_file")]
    pub users_url: Option<String>,

    /// Users file instead of the endpoint
    #[arg(long)]
    pub users_file: Option<PathBuf>,

    /// Directory for the output tables
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also load into this DuckDB database
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Seed for agent imputation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stages to run, comma separated (default: all)
    #[arg(long = "stage", value_delimiter = ',')]
    pub stages: Vec<PipelineStage>,

    /// Skip the raw snapshot of the extracted tables
    #[arg(long)]
    pub no_snapshot: bool,

    /// Validate inputs without running
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging and progress output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Save the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Build the pipeline configuration: file first, then flags
    pub fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::new(),
        };

        if let Some(bookings) = &self.bookings {
            config = config.with_bookings(bookings);
        }
        if let Some(url) = &self.users_url {
            config = config.with_users_url(url);
        }
        if let Some(path) = &self.users_file {
            config = config.with_users_file(path);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(db) = &self.database {
            config = config.with_database(db);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if !self.stages.is_empty() {
            config = config.with_stages(self.stages.clone());
        }
        if self.no_snapshot {
            config = config.with_snapshot_dir(None);
        }
        if self.dry_run {
            config = config.with_dry_run(true);
        }
        if self.verbose {
            config = config.with_verbose(true);
        }
        Ok(config)
    }
}

/// Handle the `run` command
pub fn handle_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let mut executor = PipelineExecutor::new(config)?;
    info!(run_id = executor.run_id(), "Pipeline run created");

    let report = executor.run()?;

    if let Some(path) = &args.report {
        report.save_json(path)?;
    }
    output::print_report(&report, args.json)?;

    if !report.is_success() {
        bail!(
            "Pipeline finished with status '{}': {}",
            report.status,
            report.failed_tables().join(", ")
        );
    }
    Ok(())
}

/// Handle the `validate-config` command
pub fn handle_validate_config(file: &Path) -> anyhow::Result<()> {
    let config = PipelineConfig::from_file(file)?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("validating {}", file.display()))?;

    eprintln!("{} is valid", file.display());
    eprint!("{}", output::format_config_summary(&config));
    Ok(())
}
