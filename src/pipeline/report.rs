//! Run reporting: stage outputs, status and the final report

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::PipelineStage;
use super::error::{PipelineError, PipelineResult};
use crate::load::LoadReport;
use crate::transform::DataQualityReport;

/// Pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Pipeline is running
    Running,
    /// Pipeline completed successfully
    Completed,
    /// All stages ran, but some tables failed to load
    CompletedWithErrors,
    /// Pipeline failed
    Failed,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::CompletedWithErrors => write!(f, "completed with errors"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Output from a pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// Whether the stage was successful
    pub success: bool,
    /// Output file paths
    pub files: Vec<PathBuf>,
    /// Stage-specific metadata
    pub metadata: HashMap<String, serde_json::Value>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl StageOutput {
    fn with_status(success: bool) -> Self {
        Self {
            success,
            files: Vec::new(),
            metadata: HashMap::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Create a successful stage output
    pub fn success() -> Self {
        Self::with_status(true)
    }

    /// Create a failed stage output
    pub fn failed() -> Self {
        Self::with_status(false)
    }

    /// Add multiple output files
    pub fn with_files(mut self, paths: Vec<PathBuf>) -> Self {
        self.files.extend(paths);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set duration
    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Run ID
    pub run_id: String,
    /// Pipeline name
    pub name: Option<String>,
    /// Configuration fingerprint
    pub config_hash: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Final status
    pub status: PipelineStatus,
    /// Completed stages, in order
    pub stages_completed: Vec<PipelineStage>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Stage outputs keyed by stage name
    pub outputs: HashMap<String, StageOutput>,
    /// Anomalies recovered by the transform
    pub quality: Option<DataQualityReport>,
    /// Per-loader results
    pub loads: Vec<LoadReport>,
    /// Dry run: nothing was executed
    pub dry_run: bool,
}

impl PipelineReport {
    /// Start a report for a run
    pub fn new(run_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            name: None,
            config_hash: config_hash.into(),
            started_at: Utc::now(),
            status: PipelineStatus::Running,
            stages_completed: Vec::new(),
            duration_ms: 0,
            outputs: HashMap::new(),
            quality: None,
            loads: Vec::new(),
            dry_run: false,
        }
    }

    /// Record a finished stage
    pub fn complete_stage(&mut self, stage: PipelineStage, output: StageOutput) {
        self.stages_completed.push(stage);
        self.outputs.insert(stage.name().to_string(), output);
    }

    /// Record a failed stage
    pub fn fail_stage(&mut self, stage: PipelineStage, error: &str) {
        self.outputs.insert(
            stage.name().to_string(),
            StageOutput::failed().with_metadata("error", serde_json::json!(error)),
        );
        self.status = PipelineStatus::Failed;
    }

    /// Get output from a stage
    pub fn stage_output(&self, stage: PipelineStage) -> Option<&StageOutput> {
        self.outputs.get(stage.name())
    }

    /// Tables that failed to load, across all loaders
    pub fn failed_tables(&self) -> Vec<String> {
        self.loads
            .iter()
            .flat_map(|report| {
                report
                    .failed_tables()
                    .into_iter()
                    .map(move |t| format!("{}:{}", report.loader, t))
            })
            .collect()
    }

    /// Check if pipeline was successful
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Completed
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", self.duration_ms)
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the report as JSON
    pub fn save_json(&self, path: &Path) -> PipelineResult<()> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| PipelineError::io_with_path(path, "writing report", e))
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline {} - {}", self.run_id, self.status);
        if self.dry_run {
            eprintln!("Dry run: no stages executed");
        }
        eprintln!("Duration: {}", self.duration_formatted());
        eprintln!("Stages completed: {}", self.stages_completed.len());

        for stage in &self.stages_completed {
            if let Some(output) = self.outputs.get(stage.name()) {
                let status = if output.success { "ok" } else { "failed" };
                eprintln!("  - {}: {} ({}ms)", stage.name(), status, output.duration_ms);
            }
        }

        if let Some(quality) = &self.quality {
            eprintln!("Data quality:");
            let unparseable = quality.unparseable_arrival_dates + quality.unparseable_status_dates;
            eprintln!("  unparseable dates:   {unparseable}");
            eprintln!("  agents imputed:      {}", quality.agents_imputed);
            eprintln!("  countries filled:    {}", quality.countries_filled_unknown);
            eprintln!("  countries backfilled: {}", quality.countries_backfilled);
            eprintln!("  invalid e-mails:     {}", quality.invalid_emails);
            eprintln!("  invalid coordinates: {}", quality.invalid_coordinates);
            eprintln!("  duplicates dropped:  {}", quality.duplicate_bookings_dropped);
            eprintln!("  undated bookings:    {}", quality.bookings_without_arrival_date);
        }

        for table in self.failed_tables() {
            eprintln!("Failed to load {table}");
        }
    }
}
