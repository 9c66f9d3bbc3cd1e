//! Transform stage: from raw bookings and users to a star schema
//!
//! The stage runs four components in sequence:
//!
//! 1. **Booking normalizer**: date assembly, categorical cleanup, agent
//!    imputation, country back-fill and duplicate removal
//! 2. **User normalizer**: structured field flattening and contact field
//!    standardization
//! 3. **Dimension builder**: companies, hotels, meals, dates and users
//! 4. **Fact assembler**: surrogate key join and fact deduplication
//!
//! All steps run as SQL or keyed column rewrites over tables in the run's
//! [`StagingDb`]. Raw tables are copied to working tables first, so the
//! raw landing stays intact for snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use booking_etl::transform::{TransformConfig, TransformEngine, Transformer};
//!
//! let engine = TransformEngine::new(TransformConfig::new().with_seed(42));
//! let output = engine.transform(&db, &raw)?;
//!
//! for table in output.tables.iter() {
//!     println!("{}: {} rows", table.name, table.rows);
//! }
//! ```
//!
//! Agent imputation is the only randomized step. Pin `seed` to make runs
//! reproducible.

pub mod bookings;
mod config;
pub mod dimensions;
mod error;
pub mod facts;
pub mod keys;
pub mod literal;
mod quality;
pub mod users;

pub use bookings::BookingNormalizer;
pub use config::{
    DateDimensionSpec, DimensionSpec, FactSpec, ProjectionSpec, SchemaConfig, TextColumns,
    TransformConfig,
};
pub use dimensions::{DimensionBuilder, Dimensions, date_id};
pub use error::{ErrorKind, TransformError, TransformResult};
pub use facts::{assemble_facts, validate_integrity};
pub use quality::DataQualityReport;
pub use users::UserNormalizer;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, info_span};

use crate::staging::{StagedTable, StagingDb};

/// Working copy of the raw bookings table
pub const BOOKINGS_WORK: &str = "stg_bookings";
/// Working copy of the raw users table
pub const USERS_WORK: &str = "stg_users";

/// Raw input tables, as landed by an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTables {
    pub bookings: StagedTable,
    pub users: StagedTable,
}

impl RawTables {
    pub fn new(bookings: StagedTable, users: StagedTable) -> Self {
        Self { bookings, users }
    }
}

/// The six output tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTables {
    pub companies: StagedTable,
    pub hotels: StagedTable,
    pub meals: StagedTable,
    pub dates: StagedTable,
    pub users: StagedTable,
    pub facts: StagedTable,
}

impl OutputTables {
    /// Default table names with no rows
    pub fn empty() -> Self {
        let [companies, hotels, meals, dates, users, facts] =
            SchemaConfig::default().table_names().map(|name| StagedTable::new(name, 0));
        Self {
            companies,
            hotels,
            meals,
            dates,
            users,
            facts,
        }
    }

    fn from_parts(dimensions: Dimensions, facts: StagedTable) -> Self {
        Self {
            companies: dimensions.companies,
            hotels: dimensions.hotels,
            meals: dimensions.meals,
            dates: dimensions.dates,
            users: dimensions.users,
            facts,
        }
    }

    /// Tables in load order: dimensions first, facts last
    pub fn iter(&self) -> impl Iterator<Item = &StagedTable> {
        [
            &self.companies,
            &self.hotels,
            &self.meals,
            &self.dates,
            &self.users,
            &self.facts,
        ]
        .into_iter()
    }

    /// Find a table by name
    pub fn get(&self, name: &str) -> Option<&StagedTable> {
        self.iter().find(|t| t.name == name)
    }

    /// Total rows across all tables
    pub fn total_rows(&self) -> usize {
        self.iter().map(|t| t.rows).sum()
    }
}

/// Everything the transform stage produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub tables: OutputTables,
    /// Normalized bookings, carrying the dimension ids
    pub bookings: StagedTable,
    /// Normalized users, before projection
    pub users: StagedTable,
    pub quality: DataQualityReport,
}

/// Turns raw tables into output tables
pub trait Transformer {
    fn transform(&self, db: &StagingDb, input: &RawTables) -> TransformResult<TransformOutput>;
}

/// The booking star-schema transform
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    config: TransformConfig,
}

impl TransformEngine {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Copy a raw table to its working table and type its columns
    fn stage_working(
        &self,
        db: &StagingDb,
        raw: &StagedTable,
        work: &str,
        text_columns: &[String],
    ) -> TransformResult<()> {
        db.copy_table(&raw.name, work)?;
        let typed = db.type_columns(work, text_columns)?;
        debug!(table = work, columns = typed.len(), "Working table staged");
        Ok(())
    }

    /// Run the transform with an explicit random source
    pub fn transform_with_rng<R: Rng + ?Sized>(
        &self,
        db: &StagingDb,
        input: &RawTables,
        rng: &mut R,
    ) -> TransformResult<TransformOutput> {
        let schema = &self.config.schema;
        schema.validate().map_err(TransformError::InvalidSchema)?;
        let text = &self.config.text_columns;

        let mut quality = DataQualityReport::new();

        {
            let _span = info_span!("normalize_bookings", rows = input.bookings.rows).entered();
            self.stage_working(db, &input.bookings, BOOKINGS_WORK, &text.bookings)?;
            BookingNormalizer::new().normalize(db, BOOKINGS_WORK, rng, &mut quality)?;
        }
        {
            let _span = info_span!("normalize_users", rows = input.users.rows).entered();
            self.stage_working(db, &input.users, USERS_WORK, &text.users)?;
            UserNormalizer::new().normalize(db, USERS_WORK, &mut quality)?;
        }
        let bookings = StagedTable::refresh(db, BOOKINGS_WORK)?;
        let users = StagedTable::refresh(db, USERS_WORK)?;

        let dimensions = {
            let _span = info_span!("build_dimensions").entered();
            DimensionBuilder::new(schema).build(db, BOOKINGS_WORK, USERS_WORK)?
        };

        let facts = {
            let _span = info_span!("assemble_facts").entered();
            assemble_facts(
                db,
                BOOKINGS_WORK,
                &schema.facts,
                &schema.dates.id_column,
                &mut quality,
            )?
        };

        validate_integrity(db, schema)?;
        let tables = OutputTables::from_parts(dimensions, facts);

        info!(
            facts = tables.facts.rows,
            total_rows = tables.total_rows(),
            recovered_anomalies = quality.recovered_anomalies(),
            "Transform complete"
        );

        Ok(TransformOutput {
            tables,
            bookings,
            users,
            quality,
        })
    }
}

impl Transformer for TransformEngine {
    fn transform(&self, db: &StagingDb, input: &RawTables) -> TransformResult<TransformOutput> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.transform_with_rng(db, input, &mut rng)
    }
}
