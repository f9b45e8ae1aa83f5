//! Statcast loader - bulk acquisition and load pipeline for pitch-level data
//!
//! Provides:
//! - Monthly acquisition from a statistics provider into a staging file
//! - Schema inference from a uniform random sample of the staging file
//! - PostgreSQL provisioning (database, schemas, tables)
//! - Bulk loading through the `COPY ... FROM STDIN` protocol
//! - Identity reconciliation through a reverse lookup

pub mod acquisition;
pub mod config;
pub mod database;
pub mod error;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod staging;

// Re-export commonly used types
#[cfg(feature = "savant")]
pub use acquisition::SavantProvider;
pub use acquisition::{AcquisitionError, AcquisitionStats, MonthWindows, StatsProvider, Window};
pub use config::{ConfigError, Credentials, LoaderConfig};
pub use database::{
    BulkLoader, ConnectionManager, ConnectionParams, CopySource, DatabaseError, DatabaseResult,
    ExistsPolicy, Provisioner, StreamingLoader, TransactionalStore,
};
pub use error::{PipelineError, PipelineResult};
pub use inference::{ColumnDescriptor, ColumnType, SchemaDescriptor};
pub use models::{TabularDataset, Value};
pub use pipeline::{LoadReport, PipelineReport};
pub use reconcile::{ReconcileError, ReconcileStats, ReconcileTarget};
pub use staging::{StagingArtifact, StagingError};
