//! Pipeline executor for running extract, transform and load

use std::path::Path;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::{PipelineConfig, PipelineStage};
use super::error::{PipelineError, PipelineResult};
use super::report::{PipelineReport, PipelineStatus, StageOutput};
use crate::extract::{BOOKINGS_SNAPSHOT, Extractor, SourceExtractor, USERS_SNAPSHOT, UsersSource};
use crate::load::{CsvLoader, DuckDbLoader, LoadReport, Loader};
use crate::staging::StagingDb;
use crate::transform::{RawTables, TransformEngine, TransformOutput, Transformer};

/// Data handed from one stage to the next. The staging database lives for
/// one run.
struct RunState {
    db: StagingDb,
    raw: Option<RawTables>,
    output: Option<TransformOutput>,
}

impl RunState {
    fn new() -> PipelineResult<Self> {
        Ok(Self {
            db: StagingDb::memory()?,
            raw: None,
            output: None,
        })
    }
}

/// Pipeline executor that runs all stages
pub struct PipelineExecutor {
    config: PipelineConfig,
    run_id: String,
    config_hash: String,
    extractor: Box<dyn Extractor>,
    transformer: Box<dyn Transformer>,
    loaders: Vec<Box<dyn Loader>>,
}

impl PipelineExecutor {
    /// Create an executor with the components named by the configuration
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let extractor = Box::new(SourceExtractor::new(config.extract.clone()));
        let transformer = Box::new(TransformEngine::new(config.transform.clone()));
        let loaders = Self::default_loaders(&config);
        Self::with_components(config, extractor, transformer, loaders)
    }

    /// Create an executor with injected components
    pub fn with_components(
        config: PipelineConfig,
        extractor: Box<dyn Extractor>,
        transformer: Box<dyn Transformer>,
        loaders: Vec<Box<dyn Loader>>,
    ) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;

        let config_hash = Self::hash_config(&config)?;
        let run_id = Uuid::new_v4().to_string();

        Ok(Self {
            config,
            run_id,
            config_hash,
            extractor,
            transformer,
            loaders,
        })
    }

    fn default_loaders(config: &PipelineConfig) -> Vec<Box<dyn Loader>> {
        let mut loaders: Vec<Box<dyn Loader>> =
            vec![Box::new(CsvLoader::from_config(&config.load))];
        if let Some(db) = &config.load.database {
            loaders.push(Box::new(DuckDbLoader::new(db.path.clone())));
        }
        loaders
    }

    /// Get the run ID
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline
    pub fn run(&mut self) -> PipelineResult<PipelineReport> {
        let _span = info_span!(
            "pipeline_run",
            run_id = %self.run_id,
            dry_run = self.config.dry_run
        )
        .entered();

        let start = Instant::now();
        let stages = self.config.effective_stages();
        let mut report = PipelineReport::new(&self.run_id, &self.config_hash);
        report.name = self.config.name.clone();

        info!(
            run_id = %self.run_id,
            stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            dry_run = self.config.dry_run,
            "Starting pipeline"
        );

        if self.config.verbose {
            eprintln!("Pipeline run: {}", self.run_id);
            eprintln!(
                "Stages to run: {:?}",
                stages.iter().map(|s| s.name()).collect::<Vec<_>>()
            );
            if self.config.dry_run {
                eprintln!("DRY RUN MODE - no changes will be made");
            }
        }

        if self.config.dry_run {
            return self.dry_run(&stages, report);
        }

        let mut state = RunState::new()?;
        for stage in &stages {
            let _stage_span = info_span!("pipeline_stage", stage = stage.name()).entered();
            info!(stage = stage.name(), "Starting stage");

            if self.config.verbose {
                eprintln!("Running stage {}...", stage.name());
            }

            let stage_start = Instant::now();
            match self.run_stage(*stage, &mut state, &mut report) {
                Ok(output) => {
                    let output = output.with_duration(stage_start.elapsed().as_millis() as u64);
                    info!(
                        stage = stage.name(),
                        duration_ms = output.duration_ms,
                        "Stage completed"
                    );
                    if self.config.verbose {
                        eprintln!(
                            "Stage {} completed in {}ms",
                            stage.name(),
                            output.duration_ms
                        );
                    }
                    report.complete_stage(*stage, output);
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    error!(stage = stage.name(), error = %error_msg, "Stage failed");
                    report.fail_stage(*stage, &error_msg);
                    return Err(e);
                }
            }
        }

        report.status = if report.failed_tables().is_empty() {
            PipelineStatus::Completed
        } else {
            PipelineStatus::CompletedWithErrors
        };
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            run_id = %self.run_id,
            status = %report.status,
            duration_ms = report.duration_ms,
            stages_completed = report.stages_completed.len(),
            "Pipeline completed"
        );

        Ok(report)
    }

    /// Run a single stage
    fn run_stage(
        &self,
        stage: PipelineStage,
        state: &mut RunState,
        report: &mut PipelineReport,
    ) -> PipelineResult<StageOutput> {
        match stage {
            PipelineStage::Extract => self.run_extract(state),
            PipelineStage::Transform => self.run_transform(state, report),
            PipelineStage::Load => self.run_load(state, report),
        }
    }

    /// Run the extract stage
    fn run_extract(&self, state: &mut RunState) -> PipelineResult<StageOutput> {
        let raw = self.extractor.extract(&state.db)?;

        let mut output = StageOutput::success()
            .with_metadata("bookings_rows", serde_json::json!(raw.bookings.rows))
            .with_metadata("users_rows", serde_json::json!(raw.users.rows));
        if let Some(dir) = &self.config.extract.snapshot_dir {
            output = output.with_files(vec![
                dir.join(format!("{BOOKINGS_SNAPSHOT}.csv")),
                dir.join(format!("{USERS_SNAPSHOT}.csv")),
            ]);
        }

        debug!(
            bookings = raw.bookings.rows,
            users = raw.users.rows,
            "Extraction complete"
        );
        state.raw = Some(raw);
        Ok(output)
    }

    /// Run the transform stage
    fn run_transform(
        &self,
        state: &mut RunState,
        report: &mut PipelineReport,
    ) -> PipelineResult<StageOutput> {
        let raw = state
            .raw
            .take()
            .ok_or_else(|| PipelineError::MissingInput("extracted tables".to_string()))?;

        let transformed = self.transformer.transform(&state.db, &raw)?;

        let mut output = StageOutput::success().with_metadata(
            "recovered_anomalies",
            serde_json::json!(transformed.quality.recovered_anomalies()),
        );
        for table in transformed.tables.iter() {
            output = output.with_metadata(table.name.as_str(), serde_json::json!(table.rows));
        }

        if transformed.quality.recovered_anomalies() > 0 {
            warn!(
                unparseable_arrival_dates = transformed.quality.unparseable_arrival_dates,
                unparseable_status_dates = transformed.quality.unparseable_status_dates,
                invalid_emails = transformed.quality.invalid_emails,
                invalid_coordinates = transformed.quality.invalid_coordinates,
                "Recovered data anomalies"
            );
        }

        report.quality = Some(transformed.quality.clone());
        state.output = Some(transformed);
        Ok(output)
    }

    /// Run the load stage
    fn run_load(
        &self,
        state: &mut RunState,
        report: &mut PipelineReport,
    ) -> PipelineResult<StageOutput> {
        let transformed = state
            .output
            .as_ref()
            .ok_or_else(|| PipelineError::MissingInput("transformed tables".to_string()))?;

        let mut loads: Vec<LoadReport> = Vec::with_capacity(self.loaders.len());
        for loader in &self.loaders {
            debug!(loader = loader.name(), "Running loader");
            loads.push(loader.load(&state.db, &transformed.tables)?);
        }

        let failed: usize = loads.iter().map(|l| l.failed_tables().len()).sum();
        let rows_written: usize = loads.iter().map(LoadReport::rows_written).sum();
        let mut output = StageOutput::success()
            .with_metadata("rows_written", serde_json::json!(rows_written))
            .with_metadata("failed_tables", serde_json::json!(failed))
            .with_files(loads.iter().flat_map(LoadReport::artifacts).collect());
        if failed > 0 {
            warn!(failed_tables = failed, "Some tables failed to load");
            output.success = false;
        }

        report.loads = loads;
        Ok(output)
    }

    /// Run in dry-run mode (validation only)
    fn dry_run(
        &self,
        stages: &[PipelineStage],
        mut report: PipelineReport,
    ) -> PipelineResult<PipelineReport> {
        let mut validation_errors = Vec::new();

        for stage in stages {
            if let Err(e) = self.validate_stage(*stage) {
                validation_errors.push(format!("{}: {}", stage.name(), e));
            }
        }

        if !validation_errors.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "Validation errors:\n  {}",
                validation_errors.join("\n  ")
            )));
        }

        eprintln!("Dry run validation passed for all stages");

        report.status = PipelineStatus::Completed;
        report.dry_run = true;
        Ok(report)
    }

    /// Validate a stage's inputs
    fn validate_stage(&self, stage: PipelineStage) -> PipelineResult<()> {
        match stage {
            PipelineStage::Extract => {
                let bookings = &self.config.extract.bookings_path;
                if !bookings.exists() {
                    return Err(PipelineError::FileNotFound(bookings.clone()));
                }
                if let UsersSource::Path(users) = &self.config.extract.users {
                    if !users.exists() {
                        return Err(PipelineError::FileNotFound(users.clone()));
                    }
                }
            }
            PipelineStage::Transform => {}
            PipelineStage::Load => {
                Self::check_creatable_dir(&self.config.load.output_dir)?;
            }
        }
        Ok(())
    }

    /// A directory is creatable when it exists as a directory or its
    /// nearest existing ancestor is a directory
    fn check_creatable_dir(dir: &Path) -> PipelineResult<()> {
        let existing = dir.ancestors().find(|p| p.exists());
        match existing {
            Some(p) if !p.is_dir() => Err(PipelineError::ConfigError(format!(
                "Output directory {} is blocked by the file {}",
                dir.display(),
                p.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Hash the config for change detection
    fn hash_config(config: &PipelineConfig) -> PipelineResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&config.extract)?);
        hasher.update(serde_json::to_vec(&config.transform)?);
        hasher.update(serde_json::to_vec(&config.load)?);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_hash() {
        let config1 = PipelineConfig::new().with_bookings("/data/a.csv").with_seed(1);
        let config2 = PipelineConfig::new().with_bookings("/data/a.csv").with_seed(1);
        let config3 = PipelineConfig::new().with_bookings("/data/b.csv").with_seed(1);

        assert_eq!(
            PipelineExecutor::hash_config(&config1).unwrap(),
            PipelineExecutor::hash_config(&config2).unwrap()
        );
        assert_ne!(
            PipelineExecutor::hash_config(&config1).unwrap(),
            PipelineExecutor::hash_config(&config3).unwrap()
        );
    }

    #[test]
    fn test_dry_run_reports_missing_inputs() {
        let temp = TempDir::new().unwrap();
        let config = PipelineConfig::new()
            .with_bookings(temp.path().join("missing.csv"))
            .with_users_file(temp.path().join("users.csv"))
            .with_output_dir(temp.path().join("out"))
            .with_dry_run(true);

        let mut executor = PipelineExecutor::new(config).unwrap();
        let err = executor.run().unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_dry_run_passes() {
        let temp = TempDir::new().unwrap();
        let bookings = temp.path().join("bookings.csv");
        std::fs::write(&bookings, "hotel\nResort Hotel\n").unwrap();

        let config = PipelineConfig::new()
            .with_bookings(&bookings)
            .with_users_url("http://localhost/users")
            .with_output_dir(temp.path().join("out"))
            .with_dry_run(true);

        let mut executor = PipelineExecutor::new(config).unwrap();
        let report = executor.run().unwrap();
        assert!(report.is_success());
        assert!(report.dry_run);
        assert!(report.stages_completed.is_empty());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_check_creatable_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        std::fs::write(&file, "x").unwrap();

        assert!(PipelineExecutor::check_creatable_dir(&temp.path().join("a/b")).is_ok());
        assert!(PipelineExecutor::check_creatable_dir(&file.join("out")).is_err());
    }
}
