//! Pipeline configuration types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use crate::extract::ExtractConfig;
use crate::load::LoadConfig;
use crate::transform::TransformConfig;

/// Main pipeline configuration
///
/// Every section is optional in a configuration file:
///
/// ```toml
/// name = "nightly"
///
/// [extract]
/// bookings_path = "data/hotel_bookings.csv"
/// users = { url = "https://jsonplaceholder.typicode.com/users" }
///
/// [transform]
/// seed = 42
///
/// [load]
/// output_dir = "data/transform"
/// delimiter = ";"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the pipeline run
    pub name: Option<String>,
    pub extract: ExtractConfig,
    pub transform: TransformConfig,
    pub load: LoadConfig,
    /// Stages to run (empty = all)
    pub stages: Vec<PipelineStage>,
    /// Validate inputs without running
    pub dry_run: bool,
    /// Progress output on stderr
    pub verbose: bool,
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io_with_path(path, "reading config", e))?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::ConfigError(format!("{}: {}", path.display(), e.message()))
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the bookings file
    pub fn with_bookings(mut self, path: impl Into<PathBuf>) -> Self {
        self.extract.bookings_path = path.into();
        self
    }

    /// Read users from an HTTP endpoint
    pub fn with_users_url(mut self, url: impl Into<String>) -> Self {
        self.extract = self.extract.with_users_url(url);
        self
    }

    /// Read users from a delimited file
    pub fn with_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.extract = self.extract.with_users_path(path);
        self
    }

    /// Set or disable the raw snapshot directory
    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.extract.snapshot_dir = dir;
        self
    }

    /// Pin the imputation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.transform.seed = Some(seed);
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.load.output_dir = path.into();
        self
    }

    /// Also load into a DuckDB database
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.load = self.load.with_database(path);
        self
    }

    /// Set specific stages to run
    pub fn with_stages(mut self, stages: Vec<PipelineStage>) -> Self {
        self.stages = stages;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Stages to run in execution order (all if empty)
    pub fn effective_stages(&self) -> Vec<PipelineStage> {
        if self.stages.is_empty() {
            PipelineStage::all()
        } else {
            let mut stages = self.stages.clone();
            stages.sort_by_key(PipelineStage::index);
            stages.dedup();
            stages
        }
    }

    /// Check if a specific stage should run
    pub fn should_run_stage(&self, stage: PipelineStage) -> bool {
        self.stages.is_empty() || self.stages.contains(&stage)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Stages hand their tables over in memory
        if self.should_run_stage(PipelineStage::Transform)
            && !self.should_run_stage(PipelineStage::Extract)
        {
            return Err("The transform stage requires the extract stage".to_string());
        }
        if self.should_run_stage(PipelineStage::Load)
            && !self.should_run_stage(PipelineStage::Transform)
        {
            return Err("The load stage requires the transform stage".to_string());
        }

        self.extract.validate()?;
        if self.should_run_stage(PipelineStage::Transform) {
            self.transform.schema.validate()?;
        }
        if self.should_run_stage(PipelineStage::Load) {
            self.load.validate()?;
        }
        Ok(())
    }
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Stage 1: Read bookings and users
    Extract,
    /// Stage 2: Normalize and build the star schema
    Transform,
    /// Stage 3: Persist the output tables
    Load,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![Self::Extract, Self::Transform, Self::Load]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Load => "load",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Extract => "Read bookings and users",
            Self::Transform => "Normalize inputs and build dimension and fact tables",
            Self::Load => "Write output tables",
        }
    }

    /// Get stage index (1-based)
    pub fn index(&self) -> usize {
        match self {
            Self::Extract => 1,
            Self::Transform => 2,
            Self::Load => 3,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extract" | "1" => Ok(Self::Extract),
            "transform" | "2" => Ok(Self::Transform),
            "load" | "3" => Ok(Self::Load),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
