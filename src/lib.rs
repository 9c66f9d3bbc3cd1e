//! Booking ETL - hotel bookings and user records to a star schema
//!
//! Provides:
//! - Extraction of bookings from delimited files and users from an HTTP API
//! - Normalization of both inputs (dates, categorical cleanup, imputation,
//!   structured field flattening, contact field standardization)
//! - Dimension and fact table construction with deterministic surrogate keys
//! - Loading to delimited files and DuckDB
//! - An in-memory DuckDB staging area that every stage works in
//! - A pipeline executor with per-stage reporting

pub mod extract;
pub mod load;
pub mod pipeline;
pub mod staging;
pub mod transform;

// Re-export commonly used types
pub use extract::{ExtractConfig, ExtractError, Extractor, SourceExtractor, UsersSource};
pub use load::{CsvLoader, DuckDbLoader, LoadConfig, LoadError, LoadReport, Loader};
pub use pipeline::{
    PipelineConfig, PipelineError, PipelineExecutor, PipelineReport, PipelineStage,
    PipelineStatus, run_pipeline,
};
pub use staging::{StagedTable, StagingDb, StagingError};
pub use transform::{
    DataQualityReport, OutputTables, RawTables, SchemaConfig, TransformConfig, TransformEngine,
    TransformError, TransformOutput, Transformer,
};
